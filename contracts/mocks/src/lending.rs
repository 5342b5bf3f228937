use soroban_sdk::{contract, contractimpl, contracttype, token::TokenClient, Address, Env};
use yield_common::Error;

#[contracttype]
#[derive(Clone)]
enum MarketKey {
    Underlying,
    Cash,
    Supplied(Address),
    Debt(Address),
}

fn underlying(env: &Env) -> Address {
    env.storage()
        .instance()
        .get(&MarketKey::Underlying)
        .unwrap_or_else(|| panic!("market not initialized"))
}

fn read(env: &Env, key: &MarketKey) -> i128 {
    env.storage().instance().get(key).unwrap_or(0)
}

fn write(env: &Env, key: &MarketKey, value: i128) {
    env.storage().instance().set(key, &value);
}

fn pay_out(env: &Env, to: &Address, amount: i128) -> Result<(), Error> {
    let cash = read(env, &MarketKey::Cash);
    if cash < amount {
        return Err(Error::InsufficientLiquidity);
    }
    write(env, &MarketKey::Cash, cash - amount);
    TokenClient::new(env, &underlying(env)).transfer(&env.current_contract_address(), to, &amount);
    Ok(())
}

mod qi {
    use super::*;

    /// cToken-style market: balances are tracked in underlying units.
    #[contract]
    pub struct MockQiMarket;

    #[contractimpl]
    impl MockQiMarket {
        pub fn initialize(env: Env, underlying: Address) {
            env.storage().instance().set(&MarketKey::Underlying, &underlying);
        }

        /// Credits `amount` already transferred by `minter`.
        pub fn mint(env: Env, minter: Address, amount: i128) -> Result<(), Error> {
            minter.require_auth();
            let key = MarketKey::Supplied(minter);
            write(&env, &key, read(&env, &key) + amount);
            write(&env, &MarketKey::Cash, read(&env, &MarketKey::Cash) + amount);
            Ok(())
        }

        pub fn redeem_underlying(env: Env, redeemer: Address, amount: i128) -> Result<(), Error> {
            redeemer.require_auth();
            let key = MarketKey::Supplied(redeemer.clone());
            let supplied = read(&env, &key);
            if supplied < amount {
                return Err(Error::InsufficientLiquidity);
            }
            write(&env, &key, supplied - amount);
            pay_out(&env, &redeemer, amount)
        }

        pub fn balance_of_underlying(env: Env, account: Address) -> i128 {
            read(&env, &MarketKey::Supplied(account))
        }

        /// Test hook: moves the market's books without touching tokens.
        pub fn set_balance(env: Env, account: Address, amount: i128) {
            write(&env, &MarketKey::Supplied(account), amount);
        }
    }
}

pub use qi::{MockQiMarket, MockQiMarketClient};

mod pool {
    use super::*;

    /// Pool-style market with collateralised borrowing.
    #[contract]
    pub struct MockLendingPool;

    #[contractimpl]
    impl MockLendingPool {
        pub fn initialize(env: Env, asset: Address) {
            env.storage().instance().set(&MarketKey::Underlying, &asset);
        }

        /// Credits `amount` already transferred to the pool to `on_behalf_of`.
        pub fn supply(env: Env, asset: Address, amount: i128, on_behalf_of: Address) -> Result<(), Error> {
            if asset != underlying(&env) {
                return Err(Error::InvalidAddress);
            }
            let key = MarketKey::Supplied(on_behalf_of);
            write(&env, &key, read(&env, &key) + amount);
            write(&env, &MarketKey::Cash, read(&env, &MarketKey::Cash) + amount);
            Ok(())
        }

        /// Withdraws collateral to `to`. The remaining collateral must cover the debt.
        pub fn withdraw(env: Env, asset: Address, amount: i128, to: Address) -> Result<(), Error> {
            to.require_auth();
            if asset != underlying(&env) {
                return Err(Error::InvalidAddress);
            }
            let key = MarketKey::Supplied(to.clone());
            let supplied = read(&env, &key);
            let debt = read(&env, &MarketKey::Debt(to.clone()));
            if supplied - amount < debt {
                return Err(Error::InsufficientLiquidity);
            }
            write(&env, &key, supplied - amount);
            pay_out(&env, &to, amount)
        }

        /// Borrows against `on_behalf_of`'s collateral and sends the funds to `receiver`.
        pub fn borrow(
            env: Env,
            asset: Address,
            amount: i128,
            on_behalf_of: Address,
            receiver: Address,
        ) -> Result<(), Error> {
            on_behalf_of.require_auth();
            if asset != underlying(&env) {
                return Err(Error::InvalidAddress);
            }
            let key = MarketKey::Debt(on_behalf_of.clone());
            let debt = read(&env, &key) + amount;
            if debt > read(&env, &MarketKey::Supplied(on_behalf_of)) {
                return Err(Error::InsufficientLiquidity);
            }
            write(&env, &key, debt);
            pay_out(&env, &receiver, amount)
        }

        /// Applies a repayment already transferred to the pool. Returns the amount applied.
        pub fn repay(env: Env, asset: Address, amount: i128, on_behalf_of: Address) -> Result<i128, Error> {
            if asset != underlying(&env) {
                return Err(Error::InvalidAddress);
            }
            let key = MarketKey::Debt(on_behalf_of);
            let debt = read(&env, &key);
            let applied = amount.min(debt);
            write(&env, &key, debt - applied);
            write(&env, &MarketKey::Cash, read(&env, &MarketKey::Cash) + amount);
            Ok(applied)
        }

        pub fn balance(env: Env, asset: Address, account: Address) -> i128 {
            let _ = asset;
            read(&env, &MarketKey::Supplied(account))
        }

        pub fn debt(env: Env, asset: Address, account: Address) -> i128 {
            let _ = asset;
            read(&env, &MarketKey::Debt(account))
        }

        /// Test hook: moves the pool's books without touching tokens.
        pub fn set_balance(env: Env, account: Address, amount: i128) {
            write(&env, &MarketKey::Supplied(account), amount);
        }
    }
}

pub use pool::{MockLendingPool, MockLendingPoolClient};
