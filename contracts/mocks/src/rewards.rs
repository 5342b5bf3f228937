use soroban_sdk::{contract, contractimpl, contracttype, token::TokenClient, Address, Env};

#[contracttype]
#[derive(Clone)]
enum RewardKey {
    Token,
    Pending(Address),
}

fn pending(env: &Env, holder: &Address) -> i128 {
    env.storage()
        .instance()
        .get(&RewardKey::Pending(holder.clone()))
        .unwrap_or(0)
}

fn pay(env: &Env, holder: &Address) -> i128 {
    let amount = pending(env, holder);
    if amount > 0 {
        let token: Address = env
            .storage()
            .instance()
            .get(&RewardKey::Token)
            .unwrap_or_else(|| panic!("rewards not initialized"));
        env.storage()
            .instance()
            .set(&RewardKey::Pending(holder.clone()), &0i128);
        TokenClient::new(env, &token).transfer(&env.current_contract_address(), holder, &amount);
    }
    amount
}

mod qi {
    use super::*;

    /// Reward comptroller paired with [`crate::MockQiMarket`].
    #[contract]
    pub struct MockQiController;

    #[contractimpl]
    impl MockQiController {
        pub fn initialize(env: Env, reward_token: Address) {
            env.storage().instance().set(&RewardKey::Token, &reward_token);
        }

        pub fn set_pending(env: Env, holder: Address, amount: i128) {
            env.storage()
                .instance()
                .set(&RewardKey::Pending(holder), &amount);
        }

        pub fn pending_reward(env: Env, holder: Address) -> i128 {
            pending(&env, &holder)
        }

        pub fn claim_reward(env: Env, holder: Address) -> i128 {
            pay(&env, &holder)
        }
    }
}

pub use qi::{MockQiController, MockQiControllerClient};

mod pool {
    use super::*;

    /// Incentives controller paired with [`crate::MockLendingPool`].
    #[contract]
    pub struct MockRewardsController;

    #[contractimpl]
    impl MockRewardsController {
        pub fn initialize(env: Env, reward_token: Address) {
            env.storage().instance().set(&RewardKey::Token, &reward_token);
        }

        pub fn set_pending(env: Env, user: Address, amount: i128) {
            env.storage().instance().set(&RewardKey::Pending(user), &amount);
        }

        pub fn pending_rewards(env: Env, user: Address) -> i128 {
            pending(&env, &user)
        }

        pub fn claim_all_rewards(env: Env, user: Address) -> i128 {
            pay(&env, &user)
        }
    }
}

pub use pool::{MockRewardsController, MockRewardsControllerClient};
