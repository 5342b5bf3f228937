//! Lending market backends.
//!
//! Both backends expose the same [`LendingMarket`] surface to the strategy. The
//! strategy always pushes the asset to the market before asking it to credit a
//! supply or a repayment.

use soroban_sdk::{contractclient, contracttype, token::TokenClient, Address, Env};
use yield_common::Error;

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MarketKind {
    /// cToken-style market with a reward comptroller
    Qi,
    /// Pool-style market with an incentives controller and borrowing
    Pool,
}

#[contractclient(name = "QiMarketClient")]
pub trait QiMarketInterface {
    fn mint(env: Env, minter: Address, amount: i128);
    fn redeem_underlying(env: Env, redeemer: Address, amount: i128);
    fn balance_of_underlying(env: Env, account: Address) -> i128;
}

#[contractclient(name = "QiControllerClient")]
pub trait QiControllerInterface {
    fn claim_reward(env: Env, holder: Address) -> i128;
    fn pending_reward(env: Env, holder: Address) -> i128;
}

#[contractclient(name = "LendingPoolClient")]
pub trait LendingPoolInterface {
    fn supply(env: Env, asset: Address, amount: i128, on_behalf_of: Address);
    fn withdraw(env: Env, asset: Address, amount: i128, to: Address);
    fn borrow(env: Env, asset: Address, amount: i128, on_behalf_of: Address, receiver: Address);
    fn repay(env: Env, asset: Address, amount: i128, on_behalf_of: Address) -> i128;
    fn balance(env: Env, asset: Address, account: Address) -> i128;
    fn debt(env: Env, asset: Address, account: Address) -> i128;
}

#[contractclient(name = "RewardsControllerClient")]
pub trait RewardsControllerInterface {
    fn claim_all_rewards(env: Env, user: Address) -> i128;
    fn pending_rewards(env: Env, user: Address) -> i128;
}

/// Executes the flash-loan leg of a leverage operation for a strategy.
#[contractclient(name = "FlashLoanExecutorClient")]
pub trait FlashLoanExecutorInterface {
    /// Fee charged on top of a flash loan of `amount`.
    fn premium(env: Env, amount: i128) -> i128;

    fn execute_leverage(
        env: Env,
        strategy: Address,
        pool: Address,
        asset: Address,
        amount: i128,
    ) -> Result<i128, Error>;
}

/// What the strategy needs from a lending venue.
pub trait LendingMarket {
    /// Pushes `amount` of the asset to the market and credits it.
    fn supply(&self, env: &Env, amount: i128);

    /// Pulls `amount` of the asset back to the strategy.
    fn withdraw(&self, env: &Env, amount: i128);

    /// Collateral the market holds for the strategy.
    fn balance(&self, env: &Env) -> i128;

    fn debt(&self, env: &Env) -> i128;

    /// Claims rewards to the strategy; returns the amount claimed.
    fn claim_rewards(&self, env: &Env) -> i128;

    /// [`claim_rewards`](Self::claim_rewards) that reports a failing
    /// controller as `None`.
    fn try_claim_rewards(&self, env: &Env) -> Option<i128>;

    fn pending_rewards(&self, env: &Env) -> i128;
}

pub struct QiMarket {
    pub asset: Address,
    pub market: Address,
    pub controller: Address,
}

impl LendingMarket for QiMarket {
    fn supply(&self, env: &Env, amount: i128) {
        let this = env.current_contract_address();
        TokenClient::new(env, &self.asset).transfer(&this, &self.market, &amount);
        QiMarketClient::new(env, &self.market).mint(&this, &amount);
    }

    fn withdraw(&self, env: &Env, amount: i128) {
        QiMarketClient::new(env, &self.market)
            .redeem_underlying(&env.current_contract_address(), &amount);
    }

    fn balance(&self, env: &Env) -> i128 {
        QiMarketClient::new(env, &self.market).balance_of_underlying(&env.current_contract_address())
    }

    fn debt(&self, _env: &Env) -> i128 {
        0
    }

    fn claim_rewards(&self, env: &Env) -> i128 {
        QiControllerClient::new(env, &self.controller).claim_reward(&env.current_contract_address())
    }

    fn try_claim_rewards(&self, env: &Env) -> Option<i128> {
        match QiControllerClient::new(env, &self.controller)
            .try_claim_reward(&env.current_contract_address())
        {
            Ok(Ok(claimed)) => Some(claimed),
            _ => None,
        }
    }

    fn pending_rewards(&self, env: &Env) -> i128 {
        match QiControllerClient::new(env, &self.controller)
            .try_pending_reward(&env.current_contract_address())
        {
            Ok(Ok(pending)) => pending,
            _ => 0,
        }
    }
}

pub struct PoolMarket {
    pub asset: Address,
    pub pool: Address,
    pub controller: Address,
}

impl PoolMarket {
    /// Pushes `amount` to the pool and applies it against the strategy's debt.
    pub fn repay(&self, env: &Env, amount: i128) -> i128 {
        let this = env.current_contract_address();
        TokenClient::new(env, &self.asset).transfer(&this, &self.pool, &amount);
        LendingPoolClient::new(env, &self.pool).repay(&self.asset, &amount, &this)
    }

    /// Withdraws everything, repaying debt out of freed collateral first.
    pub fn unwind(&self, env: &Env, max_steps: u32) -> Result<i128, Error> {
        for _ in 0..max_steps {
            let debt = self.debt(env);
            if debt == 0 {
                break;
            }
            let free = self.balance(env) - debt;
            if free <= 0 {
                return Err(Error::InsufficientLiquidity);
            }
            let step = free.min(debt);
            self.withdraw(env, step);
            self.repay(env, step);
        }
        if self.debt(env) > 0 {
            return Err(Error::InsufficientLiquidity);
        }
        let remaining = self.balance(env);
        if remaining > 0 {
            self.withdraw(env, remaining);
        }
        Ok(remaining)
    }
}

impl LendingMarket for PoolMarket {
    fn supply(&self, env: &Env, amount: i128) {
        let this = env.current_contract_address();
        TokenClient::new(env, &self.asset).transfer(&this, &self.pool, &amount);
        LendingPoolClient::new(env, &self.pool).supply(&self.asset, &amount, &this);
    }

    fn withdraw(&self, env: &Env, amount: i128) {
        LendingPoolClient::new(env, &self.pool).withdraw(
            &self.asset,
            &amount,
            &env.current_contract_address(),
        );
    }

    fn balance(&self, env: &Env) -> i128 {
        LendingPoolClient::new(env, &self.pool).balance(&self.asset, &env.current_contract_address())
    }

    fn debt(&self, env: &Env) -> i128 {
        LendingPoolClient::new(env, &self.pool).debt(&self.asset, &env.current_contract_address())
    }

    fn claim_rewards(&self, env: &Env) -> i128 {
        RewardsControllerClient::new(env, &self.controller)
            .claim_all_rewards(&env.current_contract_address())
    }

    fn try_claim_rewards(&self, env: &Env) -> Option<i128> {
        match RewardsControllerClient::new(env, &self.controller)
            .try_claim_all_rewards(&env.current_contract_address())
        {
            Ok(Ok(claimed)) => Some(claimed),
            _ => None,
        }
    }

    fn pending_rewards(&self, env: &Env) -> i128 {
        match RewardsControllerClient::new(env, &self.controller)
            .try_pending_rewards(&env.current_contract_address())
        {
            Ok(Ok(pending)) => pending,
            _ => 0,
        }
    }
}

/// The configured backend.
pub enum Market {
    Qi(QiMarket),
    Pool(PoolMarket),
}

impl Market {
    pub fn as_lending(&self) -> &dyn LendingMarket {
        match self {
            Market::Qi(market) => market,
            Market::Pool(market) => market,
        }
    }
}
