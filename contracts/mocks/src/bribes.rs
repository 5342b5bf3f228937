use soroban_sdk::{contract, contractimpl, contracttype, token::TokenClient, vec, Address, Env, Vec};
use yield_common::clients::bribes::BribeClaim;

#[contracttype]
#[derive(Clone)]
enum BribeKey {
    Queued(Address),
}

/// Holds bribes queued for recipients until they are claimed.
#[contract]
pub struct MockBribeManager;

#[contractimpl]
impl MockBribeManager {
    /// Queues a bribe. The manager must already hold `amount` of `token`.
    pub fn add_bribe(env: Env, recipient: Address, token: Address, amount: i128) {
        let key = BribeKey::Queued(recipient);
        let mut queued: Vec<BribeClaim> = env.storage().instance().get(&key).unwrap_or(vec![&env]);
        queued.push_back(BribeClaim { token, amount });
        env.storage().instance().set(&key, &queued);
    }

    pub fn claim_bribes(env: Env, recipient: Address) -> Vec<BribeClaim> {
        let key = BribeKey::Queued(recipient.clone());
        let queued: Vec<BribeClaim> = env.storage().instance().get(&key).unwrap_or(vec![&env]);
        let this = env.current_contract_address();
        for claim in queued.iter() {
            TokenClient::new(&env, &claim.token).transfer(&this, &recipient, &claim.amount);
        }
        env.storage().instance().remove(&key);
        queued
    }
}
