//! # DEX Staking Strategy
//!
//! Stakes the vault's asset in a DEX staking pool. Harvest claims the pool's
//! emissions and, when a bribe manager is configured, any bribes paid to the
//! strategy:
//! - bribes in the asset are kept as-is,
//! - bribes in the reward token join the reward swap,
//! - any other token is swapped one hop into the asset.

#![no_std]

use soroban_sdk::{
    contract, contractclient, contractimpl, contracttype, log, symbol_short, token::TokenClient,
    vec, Address, Env, Vec,
};
use yield_common::{
    clients::bribes::{self, BribeClaim},
    math::{min_after_slippage, require_positive},
    storage::{extend_instance_ttl, non_reentrant},
    strategy as base, Error,
};

#[contractclient(name = "StakingPoolClient")]
pub trait StakingPoolInterface {
    fn stake(env: Env, user: Address, amount: i128);
    fn unstake(env: Env, user: Address, amount: i128);
    fn claim_rewards(env: Env, user: Address) -> i128;
    fn pending_rewards(env: Env, user: Address) -> i128;
    fn staked(env: Env, user: Address) -> i128;
}

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Pool,
    BribeManager,
}

/// Payload of the `bribes` event.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BribesEvent {
    pub claims: Vec<BribeClaim>,
}

#[contract]
pub struct DexStakingStrategy;

#[contractimpl]
impl DexStakingStrategy {
    pub fn initialize(
        env: Env,
        owner: Address,
        asset: Address,
        reward_token: Address,
        router: Address,
        pool: Address,
    ) -> Result<(), Error> {
        base::init(&env, &owner, &asset, &reward_token, &router)?;
        env.storage().instance().set(&DataKey::Pool, &pool);
        extend_instance_ttl(&env);
        Ok(())
    }

    pub fn set_vault(env: Env, vault: Address) -> Result<(), Error> {
        base::link_vault(&env, &vault)?;
        extend_instance_ttl(&env);
        Ok(())
    }

    pub fn set_slippage_bps(env: Env, bps: u32) -> Result<(), Error> {
        base::set_slippage_bps(&env, bps)?;
        extend_instance_ttl(&env);
        Ok(())
    }

    pub fn set_path(env: Env, path: Vec<Address>) -> Result<(), Error> {
        base::set_path(&env, &path)?;
        extend_instance_ttl(&env);
        Ok(())
    }

    /// `None` turns bribe claiming off.
    pub fn set_bribe_manager(env: Env, manager: Option<Address>) -> Result<(), Error> {
        base::require_owner(&env)?;
        match manager {
            Some(manager) => env.storage().instance().set(&DataKey::BribeManager, &manager),
            None => env.storage().instance().remove(&DataKey::BribeManager),
        }
        extend_instance_ttl(&env);
        Ok(())
    }

    /// Moves the strategy to another staking pool. Only allowed with nothing staked.
    pub fn set_pool(env: Env, pool: Address) -> Result<(), Error> {
        base::require_owner(&env)?;
        if base::total_supplied(&env) != 0 {
            return Err(Error::StrategyNotEmpty);
        }
        env.storage().instance().set(&DataKey::Pool, &pool);
        extend_instance_ttl(&env);
        Ok(())
    }

    pub fn deposit(env: Env, caller: Address, amount: i128) -> Result<(), Error> {
        base::require_vault(&env, &caller)?;
        require_positive(amount)?;
        non_reentrant(&env, || {
            let pool = Self::load_pool(&env)?;
            let this = env.current_contract_address();
            base::set_total_supplied(&env, base::total_supplied(&env) + amount);
            TokenClient::new(&env, &base::asset(&env)?).transfer(&this, &pool, &amount);
            let client = StakingPoolClient::new(&env, &pool);
            client.stake(&this, &amount);
            base::reconcile(&env, client.staked(&this))
        })?;
        extend_instance_ttl(&env);
        Ok(())
    }

    pub fn withdraw(env: Env, caller: Address, amount: i128) -> Result<(), Error> {
        let vault = base::require_vault(&env, &caller)?;
        require_positive(amount)?;
        non_reentrant(&env, || {
            let supplied = base::total_supplied(&env);
            if amount > supplied {
                return Err(Error::InsufficientLiquidity);
            }
            let pool = Self::load_pool(&env)?;
            let this = env.current_contract_address();
            base::set_total_supplied(&env, supplied - amount);
            let client = StakingPoolClient::new(&env, &pool);
            client.unstake(&this, &amount);
            base::reconcile(&env, client.staked(&this))?;
            TokenClient::new(&env, &base::asset(&env)?).transfer(&this, &vault, &amount);
            Ok(())
        })?;
        extend_instance_ttl(&env);
        Ok(())
    }

    /// Claims emissions and bribes, converts them into the asset and sends the
    /// proceeds to the vault. `min_out` bounds the emission swap; bribe swaps
    /// use the configured slippage tolerance.
    pub fn harvest(env: Env, caller: Address, min_out: i128) -> Result<i128, Error> {
        let vault = base::require_vault(&env, &caller)?;
        if min_out < 0 {
            return Err(Error::NegativeAmount);
        }
        let proceeds = non_reentrant(&env, || {
            let pool = Self::load_pool(&env)?;
            let this = env.current_contract_address();
            let client = StakingPoolClient::new(&env, &pool);
            client.claim_rewards(&this);

            Self::convert_bribes(&env)?;
            base::convert_rewards(&env, min_out)?;

            let proceeds = base::sweep(&env, &base::asset(&env)?, &vault);
            base::reconcile(&env, client.staked(&this))?;
            Ok(proceeds)
        })?;
        if proceeds > 0 {
            base::publish_harvest(&env, &vault, proceeds);
        }
        extend_instance_ttl(&env);
        Ok(proceeds)
    }

    /// Unstakes everything and sends asset, emission and bribe balances to the
    /// vault without swapping.
    /// Failing emission or bribe claims are logged and skipped.
    pub fn emergency_withdraw(env: Env) -> Result<(), Error> {
        base::require_owner(&env)?;
        let vault = base::linked_vault(&env)?;
        let recovered = non_reentrant(&env, || {
            let pool = Self::load_pool(&env)?;
            let this = env.current_contract_address();
            let client = StakingPoolClient::new(&env, &pool);
            let staked = client.staked(&this);
            if staked > 0 {
                client.unstake(&this, &staked);
            }
            if client.try_claim_rewards(&this).is_err() {
                log!(&env, "emission claim failed");
            }
            let claims = Self::claim_bribes(&env);
            base::set_total_supplied(&env, 0);

            let asset = base::asset(&env)?;
            let reward = base::reward_token(&env)?;
            for claim in claims.iter() {
                if claim.token != asset && claim.token != reward {
                    base::sweep(&env, &claim.token, &vault);
                }
            }
            if reward != asset {
                base::sweep(&env, &reward, &vault);
            }
            Ok(base::sweep(&env, &asset, &vault))
        })?;
        base::publish_emergency(&env, &vault, recovered);
        extend_instance_ttl(&env);
        Ok(())
    }

    // ==========================================================================
    // VIEW FUNCTIONS
    // ==========================================================================

    pub fn vault(env: Env) -> Option<Address> {
        base::vault(&env)
    }

    pub fn asset(env: Env) -> Result<Address, Error> {
        base::asset(&env)
    }

    pub fn owner(env: Env) -> Result<Address, Error> {
        base::owner(&env)
    }

    pub fn slippage_bps(env: Env) -> u32 {
        base::slippage_bps(&env)
    }

    pub fn path(env: Env) -> Vec<Address> {
        base::path(&env)
    }

    pub fn pool(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::Pool)
    }

    pub fn bribe_manager(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::BribeManager)
    }

    pub fn total_supplied(env: Env) -> i128 {
        base::total_supplied(&env)
    }

    pub fn total_debt(_env: Env) -> i128 {
        0
    }

    /// Staked amount plus quoted pending emissions. Unclaimed bribes are not counted.
    pub fn total_assets(env: Env) -> i128 {
        let pending = match Self::load_pool(&env) {
            Ok(pool) => match StakingPoolClient::new(&env, &pool)
                .try_pending_rewards(&env.current_contract_address())
            {
                Ok(Ok(pending)) => pending,
                _ => 0,
            },
            Err(_) => 0,
        };
        base::total_supplied(&env) + base::pending_value(&env, pending)
    }

    // ==========================================================================
    // INTERNAL HELPERS
    // ==========================================================================

    fn load_pool(env: &Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::Pool)
            .ok_or(Error::NotInitialized)
    }

    fn claim_bribes(env: &Env) -> Vec<BribeClaim> {
        let manager: Option<Address> = env.storage().instance().get(&DataKey::BribeManager);
        let claims = match manager {
            Some(manager) => match bribes::Client::new(env, &manager)
                .try_claim_bribes(&env.current_contract_address())
            {
                Ok(Ok(claims)) => claims,
                _ => {
                    log!(env, "bribe claim failed");
                    vec![env]
                }
            },
            None => vec![env],
        };
        if !claims.is_empty() {
            env.events().publish(
                (symbol_short!("bribes"),),
                BribesEvent {
                    claims: claims.clone(),
                },
            );
        }
        claims
    }

    /// Swaps bribes paid in foreign tokens one hop into the asset. A bribe that
    /// cannot be quoted or swapped stays on the strategy and is skipped.
    fn convert_bribes(env: &Env) -> Result<(), Error> {
        let claims = Self::claim_bribes(env);
        if claims.is_empty() {
            return Ok(());
        }
        let asset = base::asset(env)?;
        let reward = base::reward_token(env)?;
        let router = base::router(env)?;
        let slippage = base::slippage_bps(env);
        for claim in claims.iter() {
            if claim.amount <= 0 || claim.token == asset || claim.token == reward {
                continue;
            }
            let hop = vec![env, claim.token.clone(), asset.clone()];
            let swapped = base::quote_path(env, &router, &hop, claim.amount)
                .and_then(|quoted| min_after_slippage(quoted, slippage))
                .and_then(|floor| base::swap_path(env, &router, &hop, claim.amount, floor));
            if let Err(err) = swapped {
                log!(env, "bribe skipped", claim.token, err);
            }
        }
        Ok(())
    }
}
