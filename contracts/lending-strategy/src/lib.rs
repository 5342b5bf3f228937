//! # Lending Strategy
//!
//! Supplies the vault's asset to a lending market and harvests the market's
//! incentive rewards back into the asset.
//!
//! Two backends are supported, chosen at initialization:
//! - [`MarketKind::Qi`]: cToken-style market with a reward comptroller.
//! - [`MarketKind::Pool`]: pool-style market with an incentives controller. This
//!   backend can also lever up the position with a flash loan (see [`LendingStrategy::leverage`]).
//!
//! `TotalSupplied` tracks the collateral placed with the market and is reconciled
//! against the market's reported balance after every state-changing call.

#![no_std]

use soroban_sdk::{
    auth::{ContractContext, InvokerContractAuthEntry, SubContractInvocation},
    contract, contractimpl, contracttype, log, symbol_short, token::TokenClient, vec, Address, Env,
    IntoVal, Symbol, Vec,
};
use yield_common::{
    math::require_positive,
    storage::{extend_instance_ttl, non_reentrant},
    strategy as base, Error,
};

mod market;

pub use market::{
    FlashLoanExecutorClient, LendingMarket, LendingPoolClient, Market, MarketKind, PoolMarket,
    QiMarket,
};

/// Upper bound on withdraw/repay rounds when unwinding a levered position.
const MAX_UNWIND_STEPS: u32 = 8;

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Kind,
    Market,
    Controller,
    FlashExecutor,
}

/// Payload of the `leverage` event.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LeverageEvent {
    pub flash_amount: i128,
    pub premium: i128,
    pub total_supplied: i128,
}

#[contract]
pub struct LendingStrategy;

#[contractimpl]
impl LendingStrategy {
    /// Configures the strategy. The vault is linked later with [`Self::set_vault`].
    ///
    /// # Arguments
    /// * `market` - The qi market or the lending pool, depending on `kind`
    /// * `controller` - The reward comptroller or incentives controller
    pub fn initialize(
        env: Env,
        owner: Address,
        asset: Address,
        reward_token: Address,
        router: Address,
        kind: MarketKind,
        market: Address,
        controller: Address,
    ) -> Result<(), Error> {
        base::init(&env, &owner, &asset, &reward_token, &router)?;
        let storage = env.storage().instance();
        storage.set(&DataKey::Kind, &kind);
        storage.set(&DataKey::Market, &market);
        storage.set(&DataKey::Controller, &controller);
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

    /// Sets the flash-loan executor used by [`Self::leverage`]. Pool backend only.
    pub fn set_flash_executor(env: Env, executor: Address) -> Result<(), Error> {
        base::require_owner(&env)?;
        if Self::market_kind(env.clone())? != MarketKind::Pool {
            return Err(Error::LeverageUnsupported);
        }
        env.storage().instance().set(&DataKey::FlashExecutor, &executor);
        extend_instance_ttl(&env);
        Ok(())
    }

    // ==========================================================================
    // VAULT ENTRY POINTS
    // ==========================================================================

    /// Supplies `amount`, already pushed here by the vault, to the market.
    pub fn deposit(env: Env, caller: Address, amount: i128) -> Result<(), Error> {
        base::require_vault(&env, &caller)?;
        require_positive(amount)?;
        non_reentrant(&env, || {
            let market = Self::load_market(&env)?;
            let lending = market.as_lending();
            base::set_total_supplied(&env, base::total_supplied(&env) + amount);
            lending.supply(&env, amount);
            base::reconcile(&env, lending.balance(&env))
        })?;
        extend_instance_ttl(&env);
        Ok(())
    }

    /// Redeems `amount` from the market and sends it to the vault.
    pub fn withdraw(env: Env, caller: Address, amount: i128) -> Result<(), Error> {
        let vault = base::require_vault(&env, &caller)?;
        require_positive(amount)?;
        non_reentrant(&env, || {
            let supplied = base::total_supplied(&env);
            if amount > supplied {
                return Err(Error::InsufficientLiquidity);
            }
            let market = Self::load_market(&env)?;
            let lending = market.as_lending();
            base::set_total_supplied(&env, supplied - amount);
            lending.withdraw(&env, amount);
            base::reconcile(&env, lending.balance(&env))?;
            TokenClient::new(&env, &base::asset(&env)?).transfer(
                &env.current_contract_address(),
                &vault,
                &amount,
            );
            Ok(())
        })?;
        extend_instance_ttl(&env);
        Ok(())
    }

    /// Claims market rewards, converts them to the asset and sends the proceeds
    /// to the vault.
    ///
    /// # Arguments
    /// * `min_out` - Minimum asset output; 0 applies the configured slippage to the quote
    ///
    /// # Errors
    /// - [`Error::InsufficientOutput`] if the swap falls below the floor
    pub fn harvest(env: Env, caller: Address, min_out: i128) -> Result<i128, Error> {
        let vault = base::require_vault(&env, &caller)?;
        if min_out < 0 {
            return Err(Error::NegativeAmount);
        }
        let proceeds = non_reentrant(&env, || {
            let market = Self::load_market(&env)?;
            let lending = market.as_lending();
            lending.claim_rewards(&env);
            base::convert_rewards(&env, min_out)?;
            let proceeds = base::sweep(&env, &base::asset(&env)?, &vault);
            base::reconcile(&env, lending.balance(&env))?;
            Ok(proceeds)
        })?;
        if proceeds > 0 {
            base::publish_harvest(&env, &vault, proceeds);
        }
        extend_instance_ttl(&env);
        Ok(proceeds)
    }

    /// Levers the position up by `flash_amount` through the flash-loan executor.
    ///
    /// The executor lends `flash_amount`, supplies it for this strategy, and
    /// recovers `flash_amount + premium` by borrowing against the strategy's
    /// collateral. The only borrow this strategy signs for is exactly that one.
    ///
    /// # Returns
    /// The premium paid.
    ///
    /// # Errors
    /// - [`Error::LeverageUnsupported`] on the qi backend or without an executor
    /// - [`Error::FlashLoanFailed`] / [`Error::FlashLoanNotRepaid`] from the executor
    pub fn leverage(env: Env, caller: Address, flash_amount: i128) -> Result<i128, Error> {
        base::require_vault(&env, &caller)?;
        require_positive(flash_amount)?;
        let premium = non_reentrant(&env, || {
            let pool = match Self::load_market(&env)? {
                Market::Pool(pool) => pool,
                Market::Qi(_) => return Err(Error::LeverageUnsupported),
            };
            let executor: Address = env
                .storage()
                .instance()
                .get(&DataKey::FlashExecutor)
                .ok_or(Error::LeverageUnsupported)?;
            let this = env.current_contract_address();
            let client = FlashLoanExecutorClient::new(&env, &executor);
            let premium = client.premium(&flash_amount);
            let owed = flash_amount + premium;

            env.authorize_as_current_contract(vec![
                &env,
                InvokerContractAuthEntry::Contract(SubContractInvocation {
                    context: ContractContext {
                        contract: pool.pool.clone(),
                        fn_name: Symbol::new(&env, "borrow"),
                        args: vec![
                            &env,
                            pool.asset.clone().into_val(&env),
                            owed.into_val(&env),
                            this.clone().into_val(&env),
                            executor.clone().into_val(&env),
                        ],
                    },
                    sub_invocations: vec![&env],
                }),
            ]);

            match client.try_execute_leverage(&this, &pool.pool, &pool.asset, &flash_amount) {
                Ok(Ok(_)) => {}
                Err(Ok(err)) => return Err(err),
                _ => return Err(Error::FlashLoanFailed),
            }

            let supplied = base::total_supplied(&env) + flash_amount;
            base::set_total_supplied(&env, supplied);
            base::reconcile(&env, pool.balance(&env))?;

            env.events().publish(
                (symbol_short!("leverage"),),
                LeverageEvent {
                    flash_amount,
                    premium,
                    total_supplied: supplied,
                },
            );
            Ok(premium)
        })?;
        extend_instance_ttl(&env);
        Ok(premium)
    }

    /// Pulls every unit out of the market (repaying debt first), claims rewards
    /// without swapping and sends all asset and reward balances to the vault.
    /// A failing reward claim is logged and does not block the withdrawal.
    pub fn emergency_withdraw(env: Env) -> Result<(), Error> {
        base::require_owner(&env)?;
        let vault = base::linked_vault(&env)?;
        let recovered = non_reentrant(&env, || {
            let market = Self::load_market(&env)?;
            match &market {
                Market::Pool(pool) => {
                    pool.unwind(&env, MAX_UNWIND_STEPS)?;
                }
                Market::Qi(qi) => {
                    let balance = qi.balance(&env);
                    if balance > 0 {
                        qi.withdraw(&env, balance);
                    }
                }
            }
            let lending = market.as_lending();
            if lending.try_claim_rewards(&env).is_none() {
                log!(&env, "reward claim failed");
            }
            base::set_total_supplied(&env, 0);
            base::reconcile(&env, lending.balance(&env))?;

            let asset = base::asset(&env)?;
            let reward = base::reward_token(&env)?;
            let recovered = base::sweep(&env, &asset, &vault);
            if reward != asset {
                base::sweep(&env, &reward, &vault);
            }
            Ok(recovered)
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

    pub fn market_kind(env: Env) -> Result<MarketKind, Error> {
        env.storage()
            .instance()
            .get(&DataKey::Kind)
            .ok_or(Error::NotInitialized)
    }

    pub fn total_supplied(env: Env) -> i128 {
        base::total_supplied(&env)
    }

    pub fn total_debt(env: Env) -> i128 {
        match Self::load_market(&env) {
            Ok(market) => market.as_lending().debt(&env),
            Err(_) => 0,
        }
    }

    /// Collateral net of debt plus the quoted value of pending rewards.
    pub fn total_assets(env: Env) -> i128 {
        let market = match Self::load_market(&env) {
            Ok(market) => market,
            Err(_) => return 0,
        };
        let lending = market.as_lending();
        base::total_supplied(&env) - lending.debt(&env)
            + base::pending_value(&env, lending.pending_rewards(&env))
    }

    // ==========================================================================
    // INTERNAL HELPERS
    // ==========================================================================

    fn load_market(env: &Env) -> Result<Market, Error> {
        let storage = env.storage().instance();
        let kind: MarketKind = storage.get(&DataKey::Kind).ok_or(Error::NotInitialized)?;
        let market: Address = storage.get(&DataKey::Market).ok_or(Error::NotInitialized)?;
        let controller: Address = storage
            .get(&DataKey::Controller)
            .ok_or(Error::NotInitialized)?;
        let asset = base::asset(env)?;
        Ok(match kind {
            MarketKind::Qi => Market::Qi(QiMarket {
                asset,
                market,
                controller,
            }),
            MarketKind::Pool => Market::Pool(PoolMarket {
                asset,
                pool: market,
                controller,
            }),
        })
    }
}
