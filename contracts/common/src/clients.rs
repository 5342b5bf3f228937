//! Cross-contract interfaces consumed inside the workspace.
//!
//! Each module exposes a generated `Client` so call sites read as
//! `strategy::Client::new(&env, &address)`.

pub mod strategy {
    use soroban_sdk::{contractclient, Address, Env};

    use crate::error::Error;

    /// Capability set every strategy backend implements.
    #[contractclient(name = "Client")]
    pub trait StrategyInterface {
        /// The single address allowed to move principal, once linked.
        fn vault(env: Env) -> Option<Address>;

        /// Token the strategy accepts on deposit and returns on withdraw.
        fn asset(env: Env) -> Address;

        /// Places `amount` (already transferred to the strategy) with the yield source.
        fn deposit(env: Env, caller: Address, amount: i128) -> Result<(), Error>;

        /// Removes `amount` from the yield source and transfers it to the vault.
        fn withdraw(env: Env, caller: Address, amount: i128) -> Result<(), Error>;

        /// Claims and converts rewards, sends proceeds to the vault and returns them.
        fn harvest(env: Env, caller: Address, min_out: i128) -> Result<i128, Error>;

        /// Principal placed with the external source.
        fn total_supplied(env: Env) -> i128;

        /// Outstanding borrow against the principal (leveraged backends only).
        fn total_debt(env: Env) -> i128;

        /// Best-effort value including unclaimed rewards.
        fn total_assets(env: Env) -> i128;

        fn emergency_withdraw(env: Env) -> Result<(), Error>;
    }
}

pub mod router {
    use soroban_sdk::{contractclient, Address, Env};

    use crate::error::Error;

    #[contractclient(name = "Client")]
    pub trait SwapRouterInterface {
        fn quote(env: Env, token_in: Address, token_out: Address, amount_in: i128) -> Result<i128, Error>;

        fn swap(
            env: Env,
            caller: Address,
            token_in: Address,
            token_out: Address,
            amount_in: i128,
            min_out: i128,
            receiver: Address,
        ) -> Result<i128, Error>;
    }
}

pub mod registry {
    use soroban_sdk::{contractclient, Address, Env};

    #[contractclient(name = "Client")]
    pub trait KeeperRegistryInterface {
        fn is_active(env: Env, keeper: Address) -> bool;
    }
}

pub mod tips {
    use soroban_sdk::{contractclient, Address, Env};

    use crate::error::Error;

    #[contractclient(name = "Client")]
    pub trait TipVaultInterface {
        fn claim_tip(env: Env, keeper: Address) -> Result<i128, Error>;
    }
}

pub mod rebalancer {
    use soroban_sdk::{contractclient, Address, Env};

    use crate::error::Error;

    #[contractclient(name = "Client")]
    pub trait RebalancerInterface {
        fn rebalance(
            env: Env,
            vault: Address,
            from: Address,
            to: Address,
            amount: i128,
            slippage_bps: u32,
            buffer_bps: u32,
        ) -> Result<i128, Error>;
    }
}

pub mod bribes {
    use soroban_sdk::{contractclient, contracttype, Address, Env, Vec};

    /// One bribe payout delivered by a bribe manager.
    #[contracttype]
    #[derive(Clone, Debug, Eq, PartialEq)]
    pub struct BribeClaim {
        pub token: Address,
        pub amount: i128,
    }

    #[contractclient(name = "Client")]
    pub trait BribeManagerInterface {
        /// Transfers every pending bribe to `recipient` and reports what was paid.
        fn claim_bribes(env: Env, recipient: Address) -> Vec<BribeClaim>;
    }
}
