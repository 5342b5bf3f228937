use soroban_sdk::{contract, contractimpl, contracttype, token::TokenClient, Address, Env};
use yield_common::Error;

#[contracttype]
#[derive(Clone)]
enum FarmKey {
    RewardToken,
    PoolCount,
    LpToken(u32),
    Staked(u32, Address),
    Pending(u32, Address),
}

/// MasterChef-style farm: LP tokens staked per pool id earn a single reward token.
#[contract]
pub struct MockMasterChef;

fn lp_token(env: &Env, pid: u32) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&FarmKey::LpToken(pid))
        .ok_or(Error::InvalidAddress)
}

fn amount(env: &Env, key: &FarmKey) -> i128 {
    env.storage().instance().get(key).unwrap_or(0)
}

#[contractimpl]
impl MockMasterChef {
    pub fn initialize(env: Env, reward_token: Address) {
        env.storage().instance().set(&FarmKey::RewardToken, &reward_token);
        env.storage().instance().set(&FarmKey::PoolCount, &0u32);
    }

    /// Registers a pool and returns its id.
    pub fn add_pool(env: Env, lp_token: Address) -> u32 {
        let pid: u32 = env.storage().instance().get(&FarmKey::PoolCount).unwrap_or(0);
        env.storage().instance().set(&FarmKey::LpToken(pid), &lp_token);
        env.storage().instance().set(&FarmKey::PoolCount, &(pid + 1));
        pid
    }

    pub fn deposit(env: Env, pid: u32, user: Address, amount: i128) -> Result<(), Error> {
        user.require_auth();
        lp_token(&env, pid)?;
        let key = FarmKey::Staked(pid, user);
        let staked = self::amount(&env, &key);
        env.storage().instance().set(&key, &(staked + amount));
        Ok(())
    }

    pub fn withdraw(env: Env, pid: u32, user: Address, amount: i128) -> Result<(), Error> {
        user.require_auth();
        let lp = lp_token(&env, pid)?;
        let key = FarmKey::Staked(pid, user.clone());
        let staked = self::amount(&env, &key);
        if staked < amount {
            return Err(Error::InsufficientLiquidity);
        }
        env.storage().instance().set(&key, &(staked - amount));
        TokenClient::new(&env, &lp).transfer(&env.current_contract_address(), &user, &amount);
        Ok(())
    }

    pub fn harvest(env: Env, pid: u32, user: Address) -> i128 {
        let key = FarmKey::Pending(pid, user.clone());
        let pending = self::amount(&env, &key);
        if pending > 0 {
            let reward: Option<Address> = env.storage().instance().get(&FarmKey::RewardToken);
            if let Some(reward) = reward {
                env.storage().instance().set(&key, &0i128);
                TokenClient::new(&env, &reward).transfer(
                    &env.current_contract_address(),
                    &user,
                    &pending,
                );
                return pending;
            }
        }
        0
    }

    pub fn pending_reward(env: Env, pid: u32, user: Address) -> i128 {
        self::amount(&env, &FarmKey::Pending(pid, user))
    }

    pub fn user_info(env: Env, pid: u32, user: Address) -> i128 {
        self::amount(&env, &FarmKey::Staked(pid, user))
    }

    pub fn set_pending(env: Env, pid: u32, user: Address, amount: i128) {
        env.storage()
            .instance()
            .set(&FarmKey::Pending(pid, user), &amount);
    }
}
