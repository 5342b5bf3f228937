use soroban_sdk::{contracttype, Env};

use crate::constants::{TTL_EXTEND_TO, TTL_THRESHOLD};
use crate::error::Error;

#[contracttype]
enum GuardKey {
    Locked,
}

pub fn extend_instance_ttl(env: &Env) {
    env.storage().instance().extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);
}

/// Runs `f` while holding the contract-wide entry lock.
///
/// The host already refuses contract re-entry; the lock makes the invariant
/// explicit for every state-mutating entry point and fails with
/// [`Error::Reentrant`] if a nested call reaches a guarded entry point.
pub fn non_reentrant<T>(env: &Env, f: impl FnOnce() -> Result<T, Error>) -> Result<T, Error> {
    let storage = env.storage().instance();
    if storage.get(&GuardKey::Locked).unwrap_or(false) {
        return Err(Error::Reentrant);
    }
    storage.set(&GuardKey::Locked, &true);
    let result = f();
    env.storage().instance().set(&GuardKey::Locked, &false);
    result
}
