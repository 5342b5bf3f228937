use soroban_sdk::{contract, contractimpl, contracttype, token::TokenClient, Address, Env};
use yield_common::{constants::BPS_DENOMINATOR, Error};

#[contracttype]
#[derive(Clone)]
enum StrategyKey {
    Vault,
    Asset,
    Supplied,
    CreditBps,
    PayoutBps,
}

fn read_bps(env: &Env, key: &StrategyKey) -> i128 {
    env.storage()
        .instance()
        .get::<_, u32>(key)
        .map(i128::from)
        .unwrap_or(BPS_DENOMINATOR)
}

fn supplied(env: &Env) -> i128 {
    env.storage().instance().get(&StrategyKey::Supplied).unwrap_or(0)
}

/// Strategy whose bookkeeping can be skewed away from the amounts it is handed.
///
/// `credit_bps` scales what a deposit adds to `total_supplied`; `payout_bps`
/// scales what a withdraw actually transfers back. Both default to 10_000.
#[contract]
pub struct MockStrategy;

#[contractimpl]
impl MockStrategy {
    pub fn initialize(env: Env, vault: Address, asset: Address) {
        env.storage().instance().set(&StrategyKey::Vault, &vault);
        env.storage().instance().set(&StrategyKey::Asset, &asset);
    }

    pub fn set_credit_bps(env: Env, bps: u32) {
        env.storage().instance().set(&StrategyKey::CreditBps, &bps);
    }

    pub fn set_payout_bps(env: Env, bps: u32) {
        env.storage().instance().set(&StrategyKey::PayoutBps, &bps);
    }

    pub fn vault(env: Env) -> Option<Address> {
        env.storage().instance().get(&StrategyKey::Vault)
    }

    pub fn asset(env: Env) -> Address {
        env.storage()
            .instance()
            .get(&StrategyKey::Asset)
            .unwrap_or_else(|| panic!("strategy not initialized"))
    }

    pub fn deposit(env: Env, caller: Address, amount: i128) -> Result<(), Error> {
        caller.require_auth();
        let credited = amount * read_bps(&env, &StrategyKey::CreditBps) / BPS_DENOMINATOR;
        env.storage()
            .instance()
            .set(&StrategyKey::Supplied, &(supplied(&env) + credited));
        Ok(())
    }

    pub fn withdraw(env: Env, caller: Address, amount: i128) -> Result<(), Error> {
        caller.require_auth();
        let current = supplied(&env);
        if amount > current {
            return Err(Error::InsufficientLiquidity);
        }
        env.storage()
            .instance()
            .set(&StrategyKey::Supplied, &(current - amount));
        let paid = amount * read_bps(&env, &StrategyKey::PayoutBps) / BPS_DENOMINATOR;
        TokenClient::new(&env, &Self::asset(env.clone())).transfer(
            &env.current_contract_address(),
            &caller,
            &paid,
        );
        Ok(())
    }

    pub fn harvest(_env: Env, caller: Address, _min_out: i128) -> Result<i128, Error> {
        caller.require_auth();
        Ok(0)
    }

    pub fn total_supplied(env: Env) -> i128 {
        supplied(&env)
    }

    pub fn total_debt(_env: Env) -> i128 {
        0
    }

    pub fn total_assets(env: Env) -> i128 {
        supplied(&env)
    }

    pub fn emergency_withdraw(_env: Env) -> Result<(), Error> {
        Ok(())
    }
}
