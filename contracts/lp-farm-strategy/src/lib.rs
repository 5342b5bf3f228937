//! # LP Farm Strategy
//!
//! Stakes the vault's LP token in a MasterChef-style farm under a fixed pool id
//! and compounds the farm's reward token back into the LP token along the
//! configured reward-to-LP path.

#![no_std]

use soroban_sdk::{
    contract, contractclient, contractimpl, contracttype, log, token::TokenClient, Address, Env,
    Vec,
};
use yield_common::{
    math::require_positive,
    storage::{extend_instance_ttl, non_reentrant},
    strategy as base, Error,
};

#[contractclient(name = "FarmClient")]
pub trait FarmInterface {
    fn deposit(env: Env, pid: u32, user: Address, amount: i128);
    fn withdraw(env: Env, pid: u32, user: Address, amount: i128);
    fn harvest(env: Env, pid: u32, user: Address) -> i128;
    fn pending_reward(env: Env, pid: u32, user: Address) -> i128;
    fn user_info(env: Env, pid: u32, user: Address) -> i128;
}

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Farm,
    Pid,
}

#[contract]
pub struct LpFarmStrategy;

#[contractimpl]
impl LpFarmStrategy {
    /// Configures the strategy for `lp_token` staked in `farm` under `pid`.
    pub fn initialize(
        env: Env,
        owner: Address,
        lp_token: Address,
        reward_token: Address,
        router: Address,
        farm: Address,
        pid: u32,
    ) -> Result<(), Error> {
        base::init(&env, &owner, &lp_token, &reward_token, &router)?;
        env.storage().instance().set(&DataKey::Farm, &farm);
        env.storage().instance().set(&DataKey::Pid, &pid);
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

    /// Path from the reward token to the LP token. It must start at the reward
    /// token and end at the LP token.
    pub fn set_reward_to_lp_path(env: Env, path: Vec<Address>) -> Result<(), Error> {
        base::set_path(&env, &path)?;
        extend_instance_ttl(&env);
        Ok(())
    }

    pub fn deposit(env: Env, caller: Address, amount: i128) -> Result<(), Error> {
        base::require_vault(&env, &caller)?;
        require_positive(amount)?;
        non_reentrant(&env, || {
            let (farm, pid) = Self::farm_config(&env)?;
            let this = env.current_contract_address();
            base::set_total_supplied(&env, base::total_supplied(&env) + amount);
            TokenClient::new(&env, &base::asset(&env)?).transfer(&this, &farm, &amount);
            let client = FarmClient::new(&env, &farm);
            client.deposit(&pid, &this, &amount);
            base::reconcile(&env, client.user_info(&pid, &this))
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
            let (farm, pid) = Self::farm_config(&env)?;
            let this = env.current_contract_address();
            base::set_total_supplied(&env, supplied - amount);
            let client = FarmClient::new(&env, &farm);
            client.withdraw(&pid, &this, &amount);
            base::reconcile(&env, client.user_info(&pid, &this))?;
            TokenClient::new(&env, &base::asset(&env)?).transfer(&this, &vault, &amount);
            Ok(())
        })?;
        extend_instance_ttl(&env);
        Ok(())
    }

    /// Harvests farm rewards, converts them into LP tokens and sends them to the vault.
    pub fn harvest(env: Env, caller: Address, min_out: i128) -> Result<i128, Error> {
        let vault = base::require_vault(&env, &caller)?;
        if min_out < 0 {
            return Err(Error::NegativeAmount);
        }
        let proceeds = non_reentrant(&env, || {
            let (farm, pid) = Self::farm_config(&env)?;
            let this = env.current_contract_address();
            let client = FarmClient::new(&env, &farm);
            client.harvest(&pid, &this);
            base::convert_rewards(&env, min_out)?;
            let proceeds = base::sweep(&env, &base::asset(&env)?, &vault);
            base::reconcile(&env, client.user_info(&pid, &this))?;
            Ok(proceeds)
        })?;
        if proceeds > 0 {
            base::publish_harvest(&env, &vault, proceeds);
        }
        extend_instance_ttl(&env);
        Ok(proceeds)
    }

    pub fn emergency_withdraw(env: Env) -> Result<(), Error> {
        base::require_owner(&env)?;
        let vault = base::linked_vault(&env)?;
        let recovered = non_reentrant(&env, || {
            let (farm, pid) = Self::farm_config(&env)?;
            let this = env.current_contract_address();
            let client = FarmClient::new(&env, &farm);
            let staked = client.user_info(&pid, &this);
            if staked > 0 {
                client.withdraw(&pid, &this, &staked);
            }
            if client.try_harvest(&pid, &this).is_err() {
                log!(&env, "farm harvest failed");
            }
            base::set_total_supplied(&env, 0);

            let lp_token = base::asset(&env)?;
            let reward = base::reward_token(&env)?;
            let recovered = base::sweep(&env, &lp_token, &vault);
            if reward != lp_token {
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

    pub fn reward_to_lp_path(env: Env) -> Vec<Address> {
        base::path(&env)
    }

    pub fn farm(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::Farm)
    }

    pub fn pid(env: Env) -> Option<u32> {
        env.storage().instance().get(&DataKey::Pid)
    }

    pub fn total_supplied(env: Env) -> i128 {
        base::total_supplied(&env)
    }

    pub fn total_debt(_env: Env) -> i128 {
        0
    }

    /// Staked LP plus the quoted LP value of pending farm rewards.
    pub fn total_assets(env: Env) -> i128 {
        let pending = match Self::farm_config(&env) {
            Ok((farm, pid)) => match FarmClient::new(&env, &farm)
                .try_pending_reward(&pid, &env.current_contract_address())
            {
                Ok(Ok(pending)) => pending,
                _ => 0,
            },
            Err(_) => 0,
        };
        base::total_supplied(&env) + base::pending_value(&env, pending)
    }

    fn farm_config(env: &Env) -> Result<(Address, u32), Error> {
        let farm = env
            .storage()
            .instance()
            .get(&DataKey::Farm)
            .ok_or(Error::NotInitialized)?;
        let pid = env
            .storage()
            .instance()
            .get(&DataKey::Pid)
            .ok_or(Error::NotInitialized)?;
        Ok((farm, pid))
    }
}
