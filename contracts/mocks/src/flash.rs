use soroban_sdk::{
    contract, contractclient, contractimpl, contracttype, symbol_short, token::TokenClient, Address,
    Env,
};
use yield_common::{constants::BPS_DENOMINATOR, Error};

#[contracttype]
#[derive(Clone)]
enum FlashKey {
    PremiumBps,
    ShouldFail,
}

#[contractclient(name = "PoolClient")]
#[allow(dead_code)]
trait LendingPool {
    fn supply(env: Env, asset: Address, amount: i128, on_behalf_of: Address);
    fn borrow(env: Env, asset: Address, amount: i128, on_behalf_of: Address, receiver: Address);
}

/// Lends `amount` from its own balance, supplies it for the strategy and
/// recovers `amount + premium` by borrowing against the strategy's collateral.
#[contract]
pub struct MockFlashLoanExecutor;

#[contractimpl]
impl MockFlashLoanExecutor {
    pub fn initialize(env: Env, premium_bps: u32) {
        env.storage().instance().set(&FlashKey::PremiumBps, &premium_bps);
        env.storage().instance().set(&FlashKey::ShouldFail, &false);
    }

    pub fn set_should_fail(env: Env, should_fail: bool) {
        env.storage().instance().set(&FlashKey::ShouldFail, &should_fail);
    }

    pub fn premium(env: Env, amount: i128) -> i128 {
        let bps: u32 = env.storage().instance().get(&FlashKey::PremiumBps).unwrap_or(9);
        amount * bps as i128 / BPS_DENOMINATOR
    }

    pub fn execute_leverage(
        env: Env,
        strategy: Address,
        pool: Address,
        asset: Address,
        amount: i128,
    ) -> Result<i128, Error> {
        strategy.require_auth();
        if env
            .storage()
            .instance()
            .get(&FlashKey::ShouldFail)
            .unwrap_or(false)
        {
            return Err(Error::FlashLoanFailed);
        }

        let this = env.current_contract_address();
        let token = TokenClient::new(&env, &asset);
        let premium = Self::premium(env.clone(), amount);
        let owed = amount + premium;

        token.transfer(&this, &pool, &amount);
        let pool_client = PoolClient::new(&env, &pool);
        pool_client.supply(&asset, &amount, &strategy);

        let before = token.balance(&this);
        pool_client.borrow(&asset, &owed, &strategy, &this);
        if token.balance(&this) - before < owed {
            return Err(Error::FlashLoanNotRepaid);
        }

        env.events()
            .publish((symbol_short!("flash"),), (strategy, amount, premium));
        Ok(premium)
    }
}
