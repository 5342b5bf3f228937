use soroban_sdk::{contract, contractimpl, contracttype, token::TokenClient, Address, Env};
use yield_common::Error;

#[contracttype]
#[derive(Clone)]
enum StakeKey {
    StakeToken,
    RewardToken,
    Staked(Address),
    Pending(Address),
}

fn get_i128(env: &Env, key: &StakeKey) -> i128 {
    env.storage().instance().get(key).unwrap_or(0)
}

fn token(env: &Env, key: &StakeKey) -> Address {
    env.storage()
        .instance()
        .get(key)
        .unwrap_or_else(|| panic!("pool not initialized"))
}

/// DEX staking pool emitting one reward token.
#[contract]
pub struct MockDexPool;

#[contractimpl]
impl MockDexPool {
    pub fn initialize(env: Env, stake_token: Address, reward_token: Address) {
        env.storage().instance().set(&StakeKey::StakeToken, &stake_token);
        env.storage().instance().set(&StakeKey::RewardToken, &reward_token);
    }

    pub fn stake(env: Env, user: Address, amount: i128) {
        user.require_auth();
        let key = StakeKey::Staked(user);
        env.storage()
            .instance()
            .set(&key, &(get_i128(&env, &key) + amount));
    }

    pub fn unstake(env: Env, user: Address, amount: i128) -> Result<(), Error> {
        user.require_auth();
        let key = StakeKey::Staked(user.clone());
        let staked = get_i128(&env, &key);
        if staked < amount {
            return Err(Error::InsufficientLiquidity);
        }
        env.storage().instance().set(&key, &(staked - amount));
        TokenClient::new(&env, &token(&env, &StakeKey::StakeToken)).transfer(
            &env.current_contract_address(),
            &user,
            &amount,
        );
        Ok(())
    }

    pub fn claim_rewards(env: Env, user: Address) -> i128 {
        let key = StakeKey::Pending(user.clone());
        let pending = get_i128(&env, &key);
        if pending > 0 {
            env.storage().instance().set(&key, &0i128);
            TokenClient::new(&env, &token(&env, &StakeKey::RewardToken)).transfer(
                &env.current_contract_address(),
                &user,
                &pending,
            );
        }
        pending
    }

    pub fn pending_rewards(env: Env, user: Address) -> i128 {
        get_i128(&env, &StakeKey::Pending(user))
    }

    pub fn staked(env: Env, user: Address) -> i128 {
        get_i128(&env, &StakeKey::Staked(user))
    }

    pub fn set_pending(env: Env, user: Address, amount: i128) {
        env.storage().instance().set(&StakeKey::Pending(user), &amount);
    }
}
