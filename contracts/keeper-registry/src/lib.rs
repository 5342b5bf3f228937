//! # Keeper Registry
//!
//! Owner-curated allow list of keepers. A keeper is either unregistered,
//! active or banned; a ban is terminal.

#![no_std]

use soroban_sdk::{contract, contractimpl, contracttype, symbol_short, Address, Env};
use yield_common::{
    constants::{PERSISTENT_TTL_EXTEND_TO, PERSISTENT_TTL_THRESHOLD},
    storage::extend_instance_ttl,
    Error,
};

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Owner,
    /// Persistent, per keeper
    Status(Address),
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeeperStatus {
    Unregistered,
    Active,
    Banned,
}

/// Emitted on registration and on ban.
///
/// # Topics
/// - `SymbolShort("keeper")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeeperEvent {
    pub keeper: Address,
    pub status: KeeperStatus,
}

#[contract]
pub struct KeeperRegistry;

#[contractimpl]
impl KeeperRegistry {
    pub fn initialize(env: Env, owner: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Owner) {
            return Err(Error::AlreadyInitialized);
        }
        env.storage().instance().set(&DataKey::Owner, &owner);
        extend_instance_ttl(&env);
        Ok(())
    }

    /// Activates `keeper`. Registering an active keeper again is a no-op.
    ///
    /// # Errors
    /// - [`Error::KeeperBanned`] if the keeper was banned
    pub fn register_keeper(env: Env, keeper: Address) -> Result<(), Error> {
        Self::require_owner(&env)?;
        match Self::status(env.clone(), keeper.clone()) {
            KeeperStatus::Banned => return Err(Error::KeeperBanned),
            KeeperStatus::Active => return Ok(()),
            KeeperStatus::Unregistered => {}
        }
        Self::write_status(&env, &keeper, KeeperStatus::Active);
        Ok(())
    }

    /// Bans `keeper` for good, whatever its current status.
    pub fn ban_keeper(env: Env, keeper: Address) -> Result<(), Error> {
        Self::require_owner(&env)?;
        Self::write_status(&env, &keeper, KeeperStatus::Banned);
        Ok(())
    }

    pub fn is_active(env: Env, keeper: Address) -> bool {
        Self::status(env, keeper) == KeeperStatus::Active
    }

    pub fn status(env: Env, keeper: Address) -> KeeperStatus {
        env.storage()
            .persistent()
            .get(&DataKey::Status(keeper))
            .unwrap_or(KeeperStatus::Unregistered)
    }

    pub fn owner(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::Owner)
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

    fn write_status(env: &Env, keeper: &Address, status: KeeperStatus) {
        let key = DataKey::Status(keeper.clone());
        env.storage().persistent().set(&key, &status);
        env.storage()
            .persistent()
            .extend_ttl(&key, PERSISTENT_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND_TO);
        extend_instance_ttl(env);
        env.events().publish(
            (symbol_short!("keeper"),),
            KeeperEvent {
                keeper: keeper.clone(),
                status,
            },
        );
    }
}
