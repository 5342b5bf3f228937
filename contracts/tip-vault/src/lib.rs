//! # Tip Vault
//!
//! Escrows the tips paid to keepers for compounding. Any active keeper in the
//! registry may claim the fixed tip once per cooldown window.

#![no_std]

use soroban_sdk::{contract, contractimpl, contracttype, symbol_short, token, Address, Env};
use yield_common::{
    clients::registry,
    constants::{PERSISTENT_TTL_EXTEND_TO, PERSISTENT_TTL_THRESHOLD},
    math::require_positive,
    storage::extend_instance_ttl,
    Error,
};

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Owner,
    Token,
    TipAmount,
    CooldownSeconds,
    Registry,
    /// Persistent, timestamp of the keeper's last claim
    LastClaim(Address),
}

/// # Topics
/// - `SymbolShort("fund")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FundEvent {
    pub from: Address,
    pub amount: i128,
}

/// # Topics
/// - `SymbolShort("tip")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TipEvent {
    pub keeper: Address,
    pub amount: i128,
}

#[contract]
pub struct TipVault;

#[contractimpl]
impl TipVault {
    pub fn initialize(
        env: Env,
        owner: Address,
        token: Address,
        tip_amount: i128,
        cooldown_seconds: u64,
        registry: Address,
    ) -> Result<(), Error> {
        let storage = env.storage().instance();
        if storage.has(&DataKey::Owner) {
            return Err(Error::AlreadyInitialized);
        }
        require_positive(tip_amount)?;
        storage.set(&DataKey::Owner, &owner);
        storage.set(&DataKey::Token, &token);
        storage.set(&DataKey::TipAmount, &tip_amount);
        storage.set(&DataKey::CooldownSeconds, &cooldown_seconds);
        storage.set(&DataKey::Registry, &registry);
        extend_instance_ttl(&env);
        Ok(())
    }

    /// Adds `amount` of the tip token to the escrow.
    pub fn fund_tips(env: Env, from: Address, amount: i128) -> Result<(), Error> {
        from.require_auth();
        require_positive(amount)?;
        let token = Self::tip_token(env.clone())?;
        token::Client::new(&env, &token).transfer(&from, &env.current_contract_address(), &amount);
        extend_instance_ttl(&env);
        env.events()
            .publish((symbol_short!("fund"),), FundEvent { from, amount });
        Ok(())
    }

    /// Pays the fixed tip to `keeper`.
    ///
    /// # Errors
    /// - [`Error::NotAllowed`] if `keeper` is not active in the registry
    /// - [`Error::CooldownActive`] if the previous claim is more recent than the cooldown
    /// - [`Error::InsufficientTipBalance`] if the escrow cannot cover the tip
    pub fn claim_tip(env: Env, keeper: Address) -> Result<i128, Error> {
        keeper.require_auth();
        let registry_addr: Address = env
            .storage()
            .instance()
            .get(&DataKey::Registry)
            .ok_or(Error::NotInitialized)?;
        if !registry::Client::new(&env, &registry_addr).is_active(&keeper) {
            return Err(Error::NotAllowed);
        }

        let now = env.ledger().timestamp();
        if let Some(last) = Self::last_claim(env.clone(), keeper.clone()) {
            if now.saturating_sub(last) < Self::cooldown(env.clone()) {
                return Err(Error::CooldownActive);
            }
        }

        let tip = Self::tip_amount(env.clone());
        let token = token::Client::new(&env, &Self::tip_token(env.clone())?);
        let this = env.current_contract_address();
        if token.balance(&this) < tip {
            return Err(Error::InsufficientTipBalance);
        }

        let key = DataKey::LastClaim(keeper.clone());
        env.storage().persistent().set(&key, &now);
        env.storage()
            .persistent()
            .extend_ttl(&key, PERSISTENT_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND_TO);
        token.transfer(&this, &keeper, &tip);

        extend_instance_ttl(&env);
        env.events()
            .publish((symbol_short!("tip"),), TipEvent { keeper, amount: tip });
        Ok(tip)
    }

    pub fn set_tip_amount(env: Env, amount: i128) -> Result<(), Error> {
        Self::require_owner(&env)?;
        require_positive(amount)?;
        env.storage().instance().set(&DataKey::TipAmount, &amount);
        extend_instance_ttl(&env);
        Ok(())
    }

    pub fn set_cooldown(env: Env, seconds: u64) -> Result<(), Error> {
        Self::require_owner(&env)?;
        env.storage().instance().set(&DataKey::CooldownSeconds, &seconds);
        extend_instance_ttl(&env);
        Ok(())
    }

    pub fn tip_balance(env: Env) -> Result<i128, Error> {
        let token = Self::tip_token(env.clone())?;
        Ok(token::Client::new(&env, &token).balance(&env.current_contract_address()))
    }

    pub fn last_claim(env: Env, keeper: Address) -> Option<u64> {
        env.storage().persistent().get(&DataKey::LastClaim(keeper))
    }

    pub fn tip_amount(env: Env) -> i128 {
        env.storage().instance().get(&DataKey::TipAmount).unwrap_or(0)
    }

    pub fn cooldown(env: Env) -> u64 {
        env.storage()
            .instance()
            .get(&DataKey::CooldownSeconds)
            .unwrap_or(0)
    }

    pub fn tip_token(env: Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::Token)
            .ok_or(Error::NotInitialized)
    }

    fn require_owner(env: &Env) -> Result<(), Error> {
        let owner: Address = env
            .storage()
            .instance()
            .get(&DataKey::Owner)
            .ok_or(Error::NotInitialized)?;
        owner.require_auth();
        Ok(())
    }
}
