//! # Reward Escrow
//!
//! Locks reward tokens for a beneficiary until an unlock time. Each deposit
//! creates its own vesting entry; `claim` pays every matured entry at once.

#![no_std]

use soroban_sdk::{contract, contractimpl, contracttype, symbol_short, token, vec, Address, Env, Vec};
use yield_common::{
    constants::{PERSISTENT_TTL_EXTEND_TO, PERSISTENT_TTL_THRESHOLD},
    math::require_positive,
    storage::extend_instance_ttl,
    Error,
};

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Token,
    TotalEscrowed,
    /// Persistent, vesting entries per beneficiary
    Entries(Address),
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VestingEntry {
    pub amount: i128,
    pub unlock_time: u64,
}

/// # Topics
/// - `SymbolShort("escrow")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EscrowEvent {
    pub beneficiary: Address,
    pub amount: i128,
    pub unlock_time: u64,
}

/// # Topics
/// - `SymbolShort("claim")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClaimEvent {
    pub beneficiary: Address,
    pub amount: i128,
}

#[contract]
pub struct RewardEscrow;

#[contractimpl]
impl RewardEscrow {
    pub fn initialize(env: Env, reward_token: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Token) {
            return Err(Error::AlreadyInitialized);
        }
        env.storage().instance().set(&DataKey::Token, &reward_token);
        env.storage().instance().set(&DataKey::TotalEscrowed, &0i128);
        extend_instance_ttl(&env);
        Ok(())
    }

    /// Pulls `amount` from `from` and locks it for `beneficiary` for `lock_seconds`.
    pub fn deposit(
        env: Env,
        from: Address,
        beneficiary: Address,
        amount: i128,
        lock_seconds: u64,
    ) -> Result<(), Error> {
        from.require_auth();
        require_positive(amount)?;
        let reward_token = Self::reward_token(env.clone())?;
        token::Client::new(&env, &reward_token).transfer(
            &from,
            &env.current_contract_address(),
            &amount,
        );

        let unlock_time = env
            .ledger()
            .timestamp()
            .checked_add(lock_seconds)
            .ok_or(Error::MathOverflow)?;
        let mut entries = Self::entries(env.clone(), beneficiary.clone());
        entries.push_back(VestingEntry {
            amount,
            unlock_time,
        });
        Self::write_entries(&env, &beneficiary, &entries);
        Self::adjust_total(&env, amount)?;

        extend_instance_ttl(&env);
        env.events().publish(
            (symbol_short!("escrow"),),
            EscrowEvent {
                beneficiary,
                amount,
                unlock_time,
            },
        );
        Ok(())
    }

    /// Pays out and removes every matured entry.
    ///
    /// # Errors
    /// - [`Error::NothingToClaim`] if no entry has matured
    pub fn claim(env: Env, beneficiary: Address) -> Result<i128, Error> {
        beneficiary.require_auth();
        let now = env.ledger().timestamp();
        let mut matured: i128 = 0;
        let mut pending: Vec<VestingEntry> = vec![&env];
        for entry in Self::entries(env.clone(), beneficiary.clone()).iter() {
            if entry.unlock_time <= now {
                matured = matured.checked_add(entry.amount).ok_or(Error::MathOverflow)?;
            } else {
                pending.push_back(entry);
            }
        }
        if matured == 0 {
            return Err(Error::NothingToClaim);
        }

        Self::write_entries(&env, &beneficiary, &pending);
        Self::adjust_total(&env, -matured)?;
        let reward_token = Self::reward_token(env.clone())?;
        token::Client::new(&env, &reward_token).transfer(
            &env.current_contract_address(),
            &beneficiary,
            &matured,
        );

        extend_instance_ttl(&env);
        env.events().publish(
            (symbol_short!("claim"),),
            ClaimEvent {
                beneficiary,
                amount: matured,
            },
        );
        Ok(matured)
    }

    pub fn total_escrowed(env: Env) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::TotalEscrowed)
            .unwrap_or(0)
    }

    /// Sum of the entries that would be paid by `claim` right now.
    pub fn claimable(env: Env, beneficiary: Address) -> i128 {
        let now = env.ledger().timestamp();
        Self::entries(env, beneficiary)
            .iter()
            .filter(|entry| entry.unlock_time <= now)
            .map(|entry| entry.amount)
            .sum()
    }

    pub fn entries(env: Env, beneficiary: Address) -> Vec<VestingEntry> {
        env.storage()
            .persistent()
            .get(&DataKey::Entries(beneficiary))
            .unwrap_or(vec![&env])
    }

    pub fn reward_token(env: Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::Token)
            .ok_or(Error::NotInitialized)
    }

    fn write_entries(env: &Env, beneficiary: &Address, entries: &Vec<VestingEntry>) {
        let key = DataKey::Entries(beneficiary.clone());
        if entries.is_empty() {
            env.storage().persistent().remove(&key);
            return;
        }
        env.storage().persistent().set(&key, entries);
        env.storage()
            .persistent()
            .extend_ttl(&key, PERSISTENT_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND_TO);
    }

    fn adjust_total(env: &Env, delta: i128) -> Result<(), Error> {
        let total = Self::total_escrowed(env.clone())
            .checked_add(delta)
            .ok_or(Error::MathOverflow)?;
        env.storage().instance().set(&DataKey::TotalEscrowed, &total);
        Ok(())
    }
}

#[cfg(test)]
mod test;
