//! # Yield Vault Contract
//!
//! A share-issuing vault that deploys a single underlying asset into one active
//! strategy and compounds the strategy's harvested rewards back into principal.
//!
//! ## Share Accounting Model
//!
//! Shares represent a proportional claim on `total_assets`:
//! - the first deposit (or any deposit into an empty vault) mints 1 share per unit
//! - later deposits mint `amount * total_shares / total_assets`, rounded down
//! - `withdraw` burns `ceil(assets * total_shares / total_assets)`
//! - `redeem` pays `floor(shares * total_assets / total_shares)`
//!
//! Rounding always favours the vault, so the remaining holders are never diluted.
//! No per-user exchange rate is stored; every conversion is computed at call time.
//!
//! ```text
//! total_assets = float + strategy.total_supplied() - strategy.total_debt()
//! ```
//!
//! `float` is the vault's own asset balance. Rewards the strategy has not yet
//! harvested are not counted: they enter `total_assets` when `compound`
//! realizes them, after the performance fee and keeper tip are taken out.
//!
//! ## Asset Flow
//!
//! ```text
//! Deposit Flow:
//! User → [Asset] → [Vault] → [Asset] → [Strategy.deposit] → yield source
//!                     ↓
//!             shares minted to receiver
//!
//! Compound Flow (keeper):
//! Keeper → [Vault.compound] → [Strategy.harvest] → router → proceeds to Vault
//!                     ↓
//!          keeper tip → performance fee → remainder re-deposited
//!
//! Withdraw Flow:
//! User → [Vault.withdraw / redeem] → float first, then Strategy.withdraw → receiver
//!
//! Rebalance Flow (owner):
//! Owner → [Vault.rebalance] → [Rebalancer] → from.withdraw → to.deposit
//! ```
//!
//! ## Storage Layout
//!
//! ### Instance Storage
//! - `Owner`, `Asset`, `Strategy` (optional until linked), `TotalShares`
//! - `FeeRecipient`, `PerformanceFeeBps`
//! - `AutoCompound`, `KeeperRegistry`, `TipVault`, `KeeperTip`
//! - `Paused`, `TvlCap`
//!
//! ### Persistent Storage (Per-User)
//! - `Shares(user)`: share balance
//! - `FeeExempt(user)`: skips auto-compound on deposit and withdraw

#![no_std]

use soroban_sdk::{
    auth::{ContractContext, InvokerContractAuthEntry, SubContractInvocation},
    contract, contractclient, contractimpl, contracttype, log, symbol_short, token, vec,
    Address, Env, IntoVal, Symbol,
};
use yield_common::{
    clients::{rebalancer, registry, strategy, tips},
    constants::{
        DEFAULT_PERFORMANCE_FEE_BPS, MAX_PERFORMANCE_FEE_BPS, PERSISTENT_TTL_EXTEND_TO,
        PERSISTENT_TTL_THRESHOLD,
    },
    math::{bps_of, mul_div, mul_div_ceil, require_positive},
    storage::{extend_instance_ttl, non_reentrant},
    Error,
};

/// Leveraged strategies expose this on top of the common capability set.
#[contractclient(name = "LeverageClient")]
pub trait LeverageInterface {
    fn leverage(env: Env, caller: Address, flash_amount: i128) -> Result<i128, Error>;
}

// ============================================================================
// STORAGE KEYS
// ============================================================================

/// Storage keys for vault state.
///
/// Configuration lives in instance storage; per-user entries live in
/// persistent storage and have their TTL extended on every write.
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    /// Administrative address for every setter, rebalance and pause
    Owner,
    /// The only token the vault accepts
    Asset,
    /// Active strategy receiving deposits
    Strategy,
    /// Sum of all share balances
    TotalShares,
    /// Receiver of the performance fee
    FeeRecipient,
    /// Share of harvested yield taken as fee, in basis points
    PerformanceFeeBps,
    /// Harvest on deposit and withdraw
    AutoCompound,
    /// Optional registry gating `compound`
    KeeperRegistry,
    /// Optional escrow paying keeper tips
    TipVault,
    /// Tip paid out of harvested yield when no tip vault is set
    KeeperTip,
    Paused,
    /// Largest allowed `total_assets` after a deposit, 0 for no cap
    TvlCap,
    /// Share balance of a holder (persistent)
    Shares(Address),
    /// Holder skips auto-compound (persistent)
    FeeExempt(Address),
}

// ============================================================================
// EVENTS
// ============================================================================

/// Emitted when assets are deposited and shares minted.
///
/// # Topics
/// - `SymbolShort("deposit")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DepositEvent {
    /// Address that paid the assets
    pub caller: Address,
    /// Address credited with the shares
    pub receiver: Address,
    pub assets: i128,
    pub shares: i128,
}

/// Emitted by both `withdraw` and `redeem`.
///
/// # Topics
/// - `SymbolShort("withdraw")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithdrawEvent {
    pub owner: Address,
    pub receiver: Address,
    pub assets: i128,
    pub shares: i128,
}

/// Emitted when harvested yield is split and re-deposited.
///
/// # Topics
/// - `SymbolShort("compound")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompoundEvent {
    /// Caller of `compound`; `None` for auto-compound
    pub keeper: Option<Address>,
    pub harvested: i128,
    /// Tip paid out of harvested yield (tips from a tip vault are not included)
    pub tip: i128,
    pub fee: i128,
    pub reinvested: i128,
}

/// Emitted when principal moves to a new strategy.
///
/// # Topics
/// - `SymbolShort("rebalance")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RebalanceEvent {
    pub from: Address,
    pub to: Address,
    pub amount: i128,
    /// Increase booked by the destination strategy
    pub received: i128,
}

/// # Topics
/// - `SymbolShort("strategy")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StrategyEvent {
    pub previous: Option<Address>,
    pub strategy: Address,
}

/// Emitted when the vault is paused or unpaused.
///
/// # Topics
/// - `SymbolShort("pause")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PauseEvent {
    pub paused: bool,
    pub owner: Address,
}

// ============================================================================
// CONTRACT
// ============================================================================

/// Yield Vault - share-based vault over one pluggable strategy
///
/// # Security Model
///
/// - Holders can only move their own shares (`caller == owner`, `require_auth()`)
/// - Only the owner can link strategies, rebalance, pause and change fees
/// - When a keeper registry is configured, only active keepers can compound
/// - Every mutating entry point holds the vault's reentrancy lock
#[contract]
pub struct YieldVault;

#[contractimpl]
impl YieldVault {
    // ==========================================================================
    // INITIALIZATION
    // ==========================================================================

    /// Initializes the vault.
    ///
    /// Must be called exactly once. The vault accepts deposits only after a
    /// strategy has been linked with [`YieldVault::set_strategy`].
    ///
    /// # Arguments
    /// * `owner` - Administrative address
    /// * `asset` - The underlying token
    /// * `fee_recipient` - Receiver of the performance fee
    ///
    /// # Errors
    /// - [`Error::AlreadyInitialized`] on a second call
    pub fn initialize(
        env: Env,
        owner: Address,
        asset: Address,
        fee_recipient: Address,
    ) -> Result<(), Error> {
        let storage = env.storage().instance();
        if storage.has(&DataKey::Owner) {
            return Err(Error::AlreadyInitialized);
        }

        storage.set(&DataKey::Owner, &owner);
        storage.set(&DataKey::Asset, &asset);
        storage.set(&DataKey::FeeRecipient, &fee_recipient);
        storage.set(&DataKey::PerformanceFeeBps, &DEFAULT_PERFORMANCE_FEE_BPS);
        storage.set(&DataKey::TotalShares, &0_i128);
        storage.set(&DataKey::AutoCompound, &false);
        storage.set(&DataKey::KeeperTip, &0_i128);
        storage.set(&DataKey::Paused, &false);
        storage.set(&DataKey::TvlCap, &0_i128);
        extend_instance_ttl(&env);
        Ok(())
    }

    // ==========================================================================
    // CORE LIFECYCLE - DEPOSIT
    // ==========================================================================

    /// Deposits `amount` of the asset and mints shares to `receiver`.
    ///
    /// The assets are pulled from `caller` and pushed straight into the active
    /// strategy.
    ///
    /// # Arguments
    /// * `caller` - Payer of the assets (must authorize)
    /// * `amount` - Assets to deposit
    /// * `receiver` - Address credited with the minted shares
    ///
    /// # Returns
    /// The number of shares minted
    ///
    /// # Errors
    /// - [`Error::ZeroAmount`] / [`Error::NegativeAmount`] for a non-positive amount
    /// - [`Error::Paused`] while paused
    /// - [`Error::NotLinked`] without an active strategy
    /// - [`Error::ExceedsTvlCap`] if the deposit would lift `total_assets` above the cap
    /// - [`Error::ZeroShares`] if `amount` is worth less than one share, or the
    ///   outstanding shares are backed by no assets
    ///
    /// # Events
    /// Emits `DepositEvent`, preceded by `CompoundEvent` when auto-compound runs
    ///
    /// # Security
    /// - Shares are minted before the external transfers
    pub fn deposit(env: Env, caller: Address, amount: i128, receiver: Address) -> Result<i128, Error> {
        caller.require_auth();
        require_positive(amount)?;
        Self::require_not_paused(&env)?;
        let strategy_addr = Self::require_strategy(&env)?;
        Self::require_within_tvl_cap(&env, amount)?;

        let shares = non_reentrant(&env, || {
            Self::maybe_compound(&env, &caller)?;

            let shares = Self::preview_deposit(&env, amount)?;
            if shares == 0 {
                return Err(Error::ZeroShares);
            }
            Self::mint(&env, &receiver, shares)?;

            let this = env.current_contract_address();
            let asset = Self::asset_client(&env)?;
            asset.transfer(&caller, &this, &amount);
            asset.transfer(&this, &strategy_addr, &amount);
            strategy::Client::new(&env, &strategy_addr).deposit(&this, &amount);
            Ok(shares)
        })?;

        extend_instance_ttl(&env);
        env.events().publish(
            (symbol_short!("deposit"),),
            DepositEvent {
                caller,
                receiver,
                assets: amount,
                shares,
            },
        );
        Ok(shares)
    }

    // ==========================================================================
    // CORE LIFECYCLE - WITHDRAW / REDEEM
    // ==========================================================================

    /// Withdraws exactly `assets` to `receiver`, burning the shares they are worth.
    ///
    /// # Arguments
    /// * `caller` - Must authorize and be the share owner
    /// * `assets` - Amount of the asset to pay out
    /// * `receiver` - Destination of the assets
    /// * `owner` - Holder whose shares are burned
    ///
    /// # Returns
    /// The number of shares burned, rounded up
    ///
    /// # Errors
    /// - [`Error::NotAuthorized`] if `caller != owner`
    /// - [`Error::InsufficientShares`] if `owner` holds fewer shares than required
    /// - [`Error::InsufficientLiquidity`] if float and strategy cannot cover the payout
    ///
    /// # Events
    /// Emits `WithdrawEvent`
    ///
    /// # Security
    /// - Shares are burned before any asset leaves the vault
    pub fn withdraw(
        env: Env,
        caller: Address,
        assets: i128,
        receiver: Address,
        owner: Address,
    ) -> Result<i128, Error> {
        Self::require_holder(&caller, &owner)?;
        require_positive(assets)?;
        Self::require_not_paused(&env)?;

        let shares = non_reentrant(&env, || {
            Self::maybe_compound(&env, &caller)?;

            let total_shares = Self::read_total_shares(&env);
            let total_assets = Self::compute_total_assets(&env)?;
            if total_shares == 0 || total_assets == 0 {
                return Err(Error::InsufficientShares);
            }
            let shares = mul_div_ceil(assets, total_shares, total_assets)?;
            Self::burn(&env, &owner, shares)?;
            Self::pay_out(&env, &receiver, assets)?;
            Ok(shares)
        })?;

        extend_instance_ttl(&env);
        env.events().publish(
            (symbol_short!("withdraw"),),
            WithdrawEvent {
                owner,
                receiver,
                assets,
                shares,
            },
        );
        Ok(shares)
    }

    /// Burns exactly `shares` and pays the assets they are worth to `receiver`.
    ///
    /// # Returns
    /// The assets paid, rounded down
    ///
    /// # Errors
    /// Same as [`YieldVault::withdraw`], plus [`Error::ZeroAmount`] if the shares
    /// are worth nothing.
    pub fn redeem(
        env: Env,
        caller: Address,
        shares: i128,
        receiver: Address,
        owner: Address,
    ) -> Result<i128, Error> {
        Self::require_holder(&caller, &owner)?;
        require_positive(shares)?;
        Self::require_not_paused(&env)?;

        let assets = non_reentrant(&env, || {
            Self::maybe_compound(&env, &caller)?;

            let total_shares = Self::read_total_shares(&env);
            if shares > Self::read_shares(&env, &owner) || total_shares == 0 {
                return Err(Error::InsufficientShares);
            }
            let assets = mul_div(shares, Self::compute_total_assets(&env)?, total_shares)?;
            if assets == 0 {
                return Err(Error::ZeroAmount);
            }
            Self::burn(&env, &owner, shares)?;
            Self::pay_out(&env, &receiver, assets)?;
            Ok(assets)
        })?;

        extend_instance_ttl(&env);
        env.events().publish(
            (symbol_short!("withdraw"),),
            WithdrawEvent {
                owner,
                receiver,
                assets,
                shares,
            },
        );
        Ok(assets)
    }

    // ==========================================================================
    // CORE LIFECYCLE - COMPOUND
    // ==========================================================================

    /// Harvests the active strategy and re-deposits the proceeds.
    ///
    /// The harvested amount is split in this order:
    /// 1. keeper tip: claimed from the tip vault when one is configured,
    ///    otherwise `min(keeper_tip, harvested)` paid out of the yield, but
    ///    only while a keeper registry gates compounding
    /// 2. performance fee on what remains after a yield-funded tip
    /// 3. the rest goes back into the strategy
    ///
    /// A failed tip-vault claim (cooldown, empty escrow) is logged and does not
    /// stop compounding.
    ///
    /// # Arguments
    /// * `caller` - The keeper (must authorize)
    ///
    /// # Returns
    /// The harvested amount; 0 when there was nothing to harvest
    ///
    /// # Errors
    /// - [`Error::NotAuthorized`] if a registry is set and `caller` is not active in it
    /// - [`Error::NotLinked`] without an active strategy
    /// - any harvest error of the strategy, such as [`Error::InsufficientOutput`]
    ///
    /// # Events
    /// Emits `CompoundEvent` when something was harvested
    pub fn compound(env: Env, caller: Address) -> Result<i128, Error> {
        caller.require_auth();
        Self::require_not_paused(&env)?;
        if let Some(registry_addr) = Self::get_keeper_registry(env.clone()) {
            if !registry::Client::new(&env, &registry_addr).is_active(&caller) {
                return Err(Error::NotAuthorized);
            }
        }

        let harvested = non_reentrant(&env, || Self::run_compound(&env, Some(&caller)))?;
        extend_instance_ttl(&env);
        Ok(harvested)
    }

    // ==========================================================================
    // STRATEGY MANAGEMENT
    // ==========================================================================

    /// Links `strategy_addr` as the active strategy.
    ///
    /// # Errors
    /// - [`Error::InvalidStrategy`] if the strategy is not linked to this vault
    ///   or holds a different asset
    /// - [`Error::StrategyNotEmpty`] if the outgoing strategy still holds principal
    pub fn set_strategy(env: Env, strategy_addr: Address) -> Result<(), Error> {
        Self::require_is_owner(&env)?;
        Self::require_compatible(&env, &strategy_addr)?;

        let previous = Self::get_strategy(env.clone());
        if let Some(current) = &previous {
            if strategy::Client::new(&env, current).total_supplied() != 0 {
                return Err(Error::StrategyNotEmpty);
            }
        }

        env.storage().instance().set(&DataKey::Strategy, &strategy_addr);
        extend_instance_ttl(&env);
        env.events().publish(
            (symbol_short!("strategy"),),
            StrategyEvent {
                previous,
                strategy: strategy_addr,
            },
        );
        Ok(())
    }

    /// Moves `amount` of principal from the active strategy to `to` through the
    /// rebalancer, then makes `to` the active strategy.
    ///
    /// The vault signs for the three calls the rebalancer makes in its name:
    /// `from.withdraw(vault, amount)`, `asset.transfer(vault, to, amount)` and
    /// `to.deposit(vault, amount)`. Shares are untouched.
    ///
    /// # Arguments
    /// * `caller` - Must be the owner
    /// * `rebalancer_addr` - Rebalancer contract
    /// * `from` - The active strategy
    /// * `to` - Destination strategy, linked to this vault with the same asset
    /// * `amount` - Principal to move; must empty `from`
    /// * `slippage_bps` / `buffer_bps` - Tolerated band on the destination's booked increase
    ///
    /// # Returns
    /// The increase booked by `to`
    ///
    /// # Errors
    /// - [`Error::NotAuthorized`] if `caller` is not the owner
    /// - [`Error::InvalidStrategy`] if `from` is not active or `to` is incompatible
    /// - [`Error::StrategyNotEmpty`] if `from` still reports principal afterwards
    /// - [`Error::SlippageExceeded`] from the rebalancer
    ///
    /// # Events
    /// Emits `RebalanceEvent`
    pub fn rebalance(
        env: Env,
        caller: Address,
        rebalancer_addr: Address,
        from: Address,
        to: Address,
        amount: i128,
        slippage_bps: u32,
        buffer_bps: u32,
    ) -> Result<i128, Error> {
        caller.require_auth();
        if caller != Self::get_owner(env.clone())? {
            return Err(Error::NotAuthorized);
        }
        require_positive(amount)?;
        if Self::require_strategy(&env)? != from || from == to {
            return Err(Error::InvalidStrategy);
        }
        Self::require_compatible(&env, &to)?;

        let received = non_reentrant(&env, || {
            let this = env.current_contract_address();
            let asset = Self::get_asset(env.clone())?;
            env.authorize_as_current_contract(vec![
                &env,
                Self::auth_entry(&env, &from, "withdraw", &this, amount),
                InvokerContractAuthEntry::Contract(SubContractInvocation {
                    context: ContractContext {
                        contract: asset,
                        fn_name: Symbol::new(&env, "transfer"),
                        args: vec![
                            &env,
                            this.clone().into_val(&env),
                            to.clone().into_val(&env),
                            amount.into_val(&env),
                        ],
                    },
                    sub_invocations: vec![&env],
                }),
                Self::auth_entry(&env, &to, "deposit", &this, amount),
            ]);

            let received = rebalancer::Client::new(&env, &rebalancer_addr).rebalance(
                &this,
                &from,
                &to,
                &amount,
                &slippage_bps,
                &buffer_bps,
            );

            if strategy::Client::new(&env, &from).total_supplied() != 0 {
                return Err(Error::StrategyNotEmpty);
            }
            env.storage().instance().set(&DataKey::Strategy, &to);
            Ok(received)
        })?;

        extend_instance_ttl(&env);
        env.events().publish(
            (symbol_short!("rebalance"),),
            RebalanceEvent {
                from,
                to,
                amount,
                received,
            },
        );
        Ok(received)
    }

    /// Pushes the vault's idle float into the active strategy.
    ///
    /// # Returns
    /// The amount invested
    pub fn invest(env: Env) -> Result<i128, Error> {
        Self::require_is_owner(&env)?;
        let strategy_addr = Self::require_strategy(&env)?;
        let invested = non_reentrant(&env, || {
            let this = env.current_contract_address();
            let asset = Self::asset_client(&env)?;
            let float = asset.balance(&this);
            if float > 0 {
                asset.transfer(&this, &strategy_addr, &float);
                strategy::Client::new(&env, &strategy_addr).deposit(&this, &float);
            }
            Ok(float)
        })?;
        extend_instance_ttl(&env);
        Ok(invested)
    }

    /// Levers up the active strategy by `flash_amount`.
    ///
    /// # Returns
    /// The flash-loan premium paid, now carried as strategy debt
    ///
    /// # Errors
    /// - [`Error::LeverageUnsupported`] if the strategy has no leverage entry point
    /// - any error of the strategy's leverage call
    pub fn leverage(env: Env, flash_amount: i128) -> Result<i128, Error> {
        Self::require_is_owner(&env)?;
        let strategy_addr = Self::require_strategy(&env)?;
        let premium = non_reentrant(&env, || {
            match LeverageClient::new(&env, &strategy_addr)
                .try_leverage(&env.current_contract_address(), &flash_amount)
            {
                Ok(Ok(premium)) => Ok(premium),
                Err(Ok(err)) => Err(err),
                _ => Err(Error::LeverageUnsupported),
            }
        })?;
        extend_instance_ttl(&env);
        Ok(premium)
    }

    /// Asks the active strategy to unwind everything back to the vault.
    ///
    /// The strategy's own owner must also authorize. Recovered assets stay in
    /// the vault's float, so share values are preserved.
    pub fn emergency_withdraw(env: Env) -> Result<(), Error> {
        Self::require_is_owner(&env)?;
        let strategy_addr = Self::require_strategy(&env)?;
        non_reentrant(&env, || {
            strategy::Client::new(&env, &strategy_addr).emergency_withdraw();
            Ok(())
        })?;
        extend_instance_ttl(&env);
        Ok(())
    }

    // ==========================================================================
    // ADMINISTRATIVE - PAUSE CONTROL
    // ==========================================================================

    /// Pauses deposits, withdrawals and compounding. Reads remain available.
    ///
    /// # Events
    /// Emits `PauseEvent` with `paused: true`
    pub fn pause(env: Env) -> Result<(), Error> {
        let owner = Self::require_is_owner(&env)?;
        env.storage().instance().set(&DataKey::Paused, &true);
        extend_instance_ttl(&env);
        env.events()
            .publish((symbol_short!("pause"),), PauseEvent { paused: true, owner });
        Ok(())
    }

    /// # Errors
    /// - [`Error::NotAllowed`] if the vault is not paused
    pub fn unpause(env: Env) -> Result<(), Error> {
        let owner = Self::require_is_owner(&env)?;
        if !Self::is_paused(env.clone()) {
            return Err(Error::NotAllowed);
        }
        env.storage().instance().set(&DataKey::Paused, &false);
        extend_instance_ttl(&env);
        env.events()
            .publish((symbol_short!("pause"),), PauseEvent { paused: false, owner });
        Ok(())
    }

    // ==========================================================================
    // ADMINISTRATIVE - CONFIGURATION
    // ==========================================================================

    pub fn set_fee_recipient(env: Env, recipient: Address) -> Result<(), Error> {
        Self::require_is_owner(&env)?;
        env.storage().instance().set(&DataKey::FeeRecipient, &recipient);
        extend_instance_ttl(&env);
        Ok(())
    }

    /// # Errors
    /// - [`Error::BpsTooHigh`] above 5_000 (50%)
    pub fn set_performance_fee_bps(env: Env, bps: u32) -> Result<(), Error> {
        Self::require_is_owner(&env)?;
        if bps > MAX_PERFORMANCE_FEE_BPS {
            return Err(Error::BpsTooHigh);
        }
        env.storage().instance().set(&DataKey::PerformanceFeeBps, &bps);
        extend_instance_ttl(&env);
        Ok(())
    }

    pub fn set_fee_exempt(env: Env, account: Address, exempt: bool) -> Result<(), Error> {
        Self::require_is_owner(&env)?;
        let key = DataKey::FeeExempt(account);
        if exempt {
            env.storage().persistent().set(&key, &true);
            env.storage()
                .persistent()
                .extend_ttl(&key, PERSISTENT_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND_TO);
        } else {
            env.storage().persistent().remove(&key);
        }
        extend_instance_ttl(&env);
        Ok(())
    }

    pub fn set_auto_compound_enabled(env: Env, enabled: bool) -> Result<(), Error> {
        Self::require_is_owner(&env)?;
        env.storage().instance().set(&DataKey::AutoCompound, &enabled);
        extend_instance_ttl(&env);
        Ok(())
    }

    /// `None` removes the registry gate or the tip vault respectively.
    pub fn set_keeper_addresses(
        env: Env,
        keeper_registry: Option<Address>,
        tip_vault: Option<Address>,
    ) -> Result<(), Error> {
        Self::require_is_owner(&env)?;
        let storage = env.storage().instance();
        match keeper_registry {
            Some(addr) => storage.set(&DataKey::KeeperRegistry, &addr),
            None => storage.remove(&DataKey::KeeperRegistry),
        }
        match tip_vault {
            Some(addr) => storage.set(&DataKey::TipVault, &addr),
            None => storage.remove(&DataKey::TipVault),
        }
        extend_instance_ttl(&env);
        Ok(())
    }

    pub fn set_keeper_tip(env: Env, tip: i128) -> Result<(), Error> {
        Self::require_is_owner(&env)?;
        if tip < 0 {
            return Err(Error::NegativeAmount);
        }
        env.storage().instance().set(&DataKey::KeeperTip, &tip);
        extend_instance_ttl(&env);
        Ok(())
    }

    /// Setting to 0 removes the cap. Lowering it below current assets only
    /// blocks further deposits.
    pub fn set_tvl_cap(env: Env, cap: i128) -> Result<(), Error> {
        Self::require_is_owner(&env)?;
        if cap < 0 {
            return Err(Error::NegativeAmount);
        }
        env.storage().instance().set(&DataKey::TvlCap, &cap);
        extend_instance_ttl(&env);
        Ok(())
    }

    // ==========================================================================
    // READ FUNCTIONS - ACCOUNTING
    // ==========================================================================

    /// Float plus the active strategy's net principal.
    pub fn total_assets(env: Env) -> Result<i128, Error> {
        Self::compute_total_assets(&env)
    }

    pub fn total_shares(env: Env) -> i128 {
        Self::read_total_shares(&env)
    }

    pub fn balance_of(env: Env, user: Address) -> i128 {
        Self::read_shares(&env, &user)
    }

    /// Shares minted for `assets` at the current rate.
    pub fn convert_to_shares(env: Env, assets: i128) -> Result<i128, Error> {
        Self::preview_deposit(&env, assets)
    }

    /// Assets paid for `shares` at the current rate.
    pub fn convert_to_assets(env: Env, shares: i128) -> Result<i128, Error> {
        let total_shares = Self::read_total_shares(&env);
        if total_shares == 0 {
            return Ok(shares);
        }
        mul_div(shares, Self::compute_total_assets(&env)?, total_shares)
    }

    /// Assets currently backing `user`'s shares. Read hook for boost integrations.
    pub fn underlying_stake(env: Env, user: Address) -> Result<i128, Error> {
        let shares = Self::read_shares(&env, &user);
        Self::convert_to_assets(env, shares)
    }

    // ==========================================================================
    // READ FUNCTIONS - CONFIGURATION
    // ==========================================================================

    pub fn get_owner(env: Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::Owner)
            .ok_or(Error::NotInitialized)
    }

    pub fn get_asset(env: Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::Asset)
            .ok_or(Error::NotInitialized)
    }

    pub fn get_strategy(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::Strategy)
    }

    pub fn get_fee_recipient(env: Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::FeeRecipient)
            .ok_or(Error::NotInitialized)
    }

    pub fn get_performance_fee_bps(env: Env) -> u32 {
        env.storage()
            .instance()
            .get(&DataKey::PerformanceFeeBps)
            .unwrap_or(DEFAULT_PERFORMANCE_FEE_BPS)
    }

    pub fn is_fee_exempt(env: Env, account: Address) -> bool {
        env.storage()
            .persistent()
            .get(&DataKey::FeeExempt(account))
            .unwrap_or(false)
    }

    pub fn is_auto_compound_enabled(env: Env) -> bool {
        env.storage()
            .instance()
            .get(&DataKey::AutoCompound)
            .unwrap_or(false)
    }

    pub fn get_keeper_registry(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::KeeperRegistry)
    }

    pub fn get_tip_vault(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::TipVault)
    }

    pub fn get_keeper_tip(env: Env) -> i128 {
        env.storage().instance().get(&DataKey::KeeperTip).unwrap_or(0)
    }

    pub fn get_tvl_cap(env: Env) -> i128 {
        env.storage().instance().get(&DataKey::TvlCap).unwrap_or(0)
    }

    pub fn is_paused(env: Env) -> bool {
        env.storage()
            .instance()
            .get(&DataKey::Paused)
            .unwrap_or(false)
    }

    // ==========================================================================
    // INTERNAL - COMPOUNDING
    // ==========================================================================

    /// Compounds ahead of a deposit or withdrawal when auto-compound is on and
    /// `caller` is not fee-exempt. No keeper gate and no tip apply.
    fn maybe_compound(env: &Env, caller: &Address) -> Result<(), Error> {
        if !Self::is_auto_compound_enabled(env.clone())
            || Self::is_fee_exempt(env.clone(), caller.clone())
        {
            return Ok(());
        }
        Self::run_compound(env, None)?;
        Ok(())
    }

    fn run_compound(env: &Env, keeper: Option<&Address>) -> Result<i128, Error> {
        let strategy_addr = Self::require_strategy(env)?;
        let this = env.current_contract_address();
        let strategy_client = strategy::Client::new(env, &strategy_addr);

        let harvested = strategy_client.harvest(&this, &0);
        if harvested <= 0 {
            return Ok(0);
        }

        let asset = Self::asset_client(env)?;
        let mut tip_from_yield = 0;
        if let Some(keeper) = keeper {
            match Self::get_tip_vault(env.clone()) {
                Some(tip_vault) => {
                    match tips::Client::new(env, &tip_vault).try_claim_tip(keeper) {
                        Ok(Ok(_)) => {}
                        Err(Ok(err)) => log!(env, "tip claim failed", err),
                        _ => log!(env, "tip claim failed"),
                    }
                }
                None if Self::get_keeper_registry(env.clone()).is_some() => {
                    tip_from_yield = Self::get_keeper_tip(env.clone()).min(harvested);
                    if tip_from_yield > 0 {
                        asset.transfer(&this, keeper, &tip_from_yield);
                    }
                }
                None => {}
            }
        }

        let net = harvested - tip_from_yield;
        let fee = bps_of(net, Self::get_performance_fee_bps(env.clone()))?;
        if fee > 0 {
            asset.transfer(&this, &Self::get_fee_recipient(env.clone())?, &fee);
        }

        let reinvested = net - fee;
        if reinvested > 0 {
            asset.transfer(&this, &strategy_addr, &reinvested);
            strategy_client.deposit(&this, &reinvested);
        }

        env.events().publish(
            (symbol_short!("compound"),),
            CompoundEvent {
                keeper: keeper.cloned(),
                harvested,
                tip: tip_from_yield,
                fee,
                reinvested,
            },
        );
        Ok(harvested)
    }

    // ==========================================================================
    // INTERNAL - SHARE ACCOUNTING
    // ==========================================================================

    fn compute_total_assets(env: &Env) -> Result<i128, Error> {
        let float = Self::asset_client(env)?.balance(&env.current_contract_address());
        let deployed = match Self::get_strategy(env.clone()) {
            Some(addr) => {
                let client = strategy::Client::new(env, &addr);
                client
                    .total_supplied()
                    .checked_sub(client.total_debt())
                    .ok_or(Error::MathOverflow)?
            }
            None => 0,
        };
        float.checked_add(deployed).ok_or(Error::MathOverflow)
    }

    fn preview_deposit(env: &Env, assets: i128) -> Result<i128, Error> {
        let total_shares = Self::read_total_shares(env);
        let total_assets = Self::compute_total_assets(env)?;
        if total_shares == 0 {
            return Ok(assets);
        }
        // outstanding shares backed by nothing would absorb the deposit
        if total_assets == 0 {
            return Err(Error::ZeroShares);
        }
        mul_div(assets, total_shares, total_assets)
    }

    fn read_total_shares(env: &Env) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::TotalShares)
            .unwrap_or(0)
    }

    fn read_shares(env: &Env, user: &Address) -> i128 {
        env.storage()
            .persistent()
            .get(&DataKey::Shares(user.clone()))
            .unwrap_or(0)
    }

    fn write_shares(env: &Env, user: &Address, shares: i128) {
        let key = DataKey::Shares(user.clone());
        if shares == 0 {
            env.storage().persistent().remove(&key);
            return;
        }
        env.storage().persistent().set(&key, &shares);
        env.storage()
            .persistent()
            .extend_ttl(&key, PERSISTENT_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND_TO);
    }

    fn mint(env: &Env, to: &Address, shares: i128) -> Result<(), Error> {
        let balance = Self::read_shares(env, to)
            .checked_add(shares)
            .ok_or(Error::MathOverflow)?;
        let total = Self::read_total_shares(env)
            .checked_add(shares)
            .ok_or(Error::MathOverflow)?;
        Self::write_shares(env, to, balance);
        env.storage().instance().set(&DataKey::TotalShares, &total);
        Ok(())
    }

    fn burn(env: &Env, from: &Address, shares: i128) -> Result<(), Error> {
        let balance = Self::read_shares(env, from);
        if balance < shares {
            return Err(Error::InsufficientShares);
        }
        Self::write_shares(env, from, balance - shares);
        env.storage()
            .instance()
            .set(&DataKey::TotalShares, &(Self::read_total_shares(env) - shares));
        Ok(())
    }

    /// Pays `assets` to `receiver` from float, topping up from the strategy.
    fn pay_out(env: &Env, receiver: &Address, assets: i128) -> Result<(), Error> {
        let this = env.current_contract_address();
        let asset = Self::asset_client(env)?;
        let float = asset.balance(&this);
        if float < assets {
            let strategy_addr = Self::get_strategy(env.clone()).ok_or(Error::InsufficientLiquidity)?;
            strategy::Client::new(env, &strategy_addr).withdraw(&this, &(assets - float));
        }
        asset.transfer(&this, receiver, &assets);
        Ok(())
    }

    // ==========================================================================
    // INTERNAL VALIDATION HELPERS
    // ==========================================================================

    #[inline]
    fn require_not_paused(env: &Env) -> Result<(), Error> {
        if Self::is_paused(env.clone()) {
            return Err(Error::Paused);
        }
        Ok(())
    }

    #[inline]
    fn require_is_owner(env: &Env) -> Result<Address, Error> {
        let owner = Self::get_owner(env.clone())?;
        owner.require_auth();
        Ok(owner)
    }

    /// Share allowances are not supported: only the holder moves its shares.
    #[inline]
    fn require_holder(caller: &Address, owner: &Address) -> Result<(), Error> {
        caller.require_auth();
        if caller != owner {
            return Err(Error::NotAuthorized);
        }
        Ok(())
    }

    fn require_strategy(env: &Env) -> Result<Address, Error> {
        Self::get_strategy(env.clone()).ok_or(Error::NotLinked)
    }

    /// `candidate` must report this vault as its owner and hold the vault's asset.
    fn require_compatible(env: &Env, candidate: &Address) -> Result<(), Error> {
        let client = strategy::Client::new(env, candidate);
        if client.vault() != Some(env.current_contract_address())
            || client.asset() != Self::get_asset(env.clone())?
        {
            return Err(Error::InvalidStrategy);
        }
        Ok(())
    }

    fn require_within_tvl_cap(env: &Env, amount: i128) -> Result<(), Error> {
        let cap = Self::get_tvl_cap(env.clone());
        if cap > 0 {
            let after = Self::compute_total_assets(env)?
                .checked_add(amount)
                .ok_or(Error::MathOverflow)?;
            if after > cap {
                return Err(Error::ExceedsTvlCap);
            }
        }
        Ok(())
    }

    fn asset_client<'a>(env: &Env) -> Result<token::Client<'a>, Error> {
        Ok(token::Client::new(env, &Self::get_asset(env.clone())?))
    }

    /// Pre-authorization for `contract.fn_name(caller, amount)`.
    fn auth_entry(
        env: &Env,
        contract: &Address,
        fn_name: &str,
        caller: &Address,
        amount: i128,
    ) -> InvokerContractAuthEntry {
        InvokerContractAuthEntry::Contract(SubContractInvocation {
            context: ContractContext {
                contract: contract.clone(),
                fn_name: Symbol::new(env, fn_name),
                args: vec![env, caller.clone().into_val(env), amount.into_val(env)],
            },
            sub_invocations: vec![env],
        })
    }
}

#[cfg(test)]
mod test;
