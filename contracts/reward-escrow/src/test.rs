#![cfg(test)]
extern crate std;

use super::*;
use soroban_sdk::{
    testutils::{Address as _, Ledger},
    token::{StellarAssetClient, TokenClient},
    Address, Env,
};

const DAY: u64 = 86_400;

fn setup<'a>() -> (Env, Address, Address, RewardEscrowClient<'a>) {
    let env = Env::default();
    env.mock_all_auths();
    env.ledger().set_timestamp(10 * DAY);

    let treasury = Address::generate(&env);
    let token = env
        .register_stellar_asset_contract_v2(Address::generate(&env))
        .address();
    StellarAssetClient::new(&env, &token).mint(&treasury, &1_000);

    let escrow = RewardEscrowClient::new(&env, &env.register(RewardEscrow, ()));
    escrow.initialize(&token);
    (env, treasury, token, escrow)
}

#[test]
fn test_deposit_creates_entries() {
    let (env, treasury, token, escrow) = setup();
    let user = Address::generate(&env);

    escrow.deposit(&treasury, &user, &100, &DAY);
    escrow.deposit(&treasury, &user, &50, &(7 * DAY));

    let entries = escrow.entries(&user);
    assert_eq!(entries.len(), 2);
    assert_eq!(
        entries.get(0),
        Some(VestingEntry {
            amount: 100,
            unlock_time: 11 * DAY
        })
    );
    assert_eq!(escrow.total_escrowed(), 150);
    assert_eq!(TokenClient::new(&env, &token).balance(&escrow.address), 150);
}

#[test]
fn test_claim_pays_only_matured_entries() {
    let (env, treasury, token, escrow) = setup();
    let user = Address::generate(&env);
    escrow.deposit(&treasury, &user, &100, &DAY);
    escrow.deposit(&treasury, &user, &50, &(7 * DAY));

    assert_eq!(escrow.try_claim(&user), Err(Ok(Error::NothingToClaim)));

    env.ledger().set_timestamp(11 * DAY);
    assert_eq!(escrow.claimable(&user), 100);
    assert_eq!(escrow.claim(&user), 100);
    assert_eq!(TokenClient::new(&env, &token).balance(&user), 100);
    assert_eq!(escrow.entries(&user).len(), 1);
    assert_eq!(escrow.total_escrowed(), 50);

    assert_eq!(escrow.try_claim(&user), Err(Ok(Error::NothingToClaim)));

    env.ledger().set_timestamp(17 * DAY);
    assert_eq!(escrow.claim(&user), 50);
    assert_eq!(escrow.entries(&user).len(), 0);
    assert_eq!(escrow.total_escrowed(), 0);
}

#[test]
fn test_zero_deposit_rejected() {
    let (env, treasury, _, escrow) = setup();
    let user = Address::generate(&env);
    assert_eq!(
        escrow.try_deposit(&treasury, &user, &0, &DAY),
        Err(Ok(Error::ZeroAmount))
    );
}

#[test]
fn test_zero_lock_is_immediately_claimable() {
    let (env, treasury, _, escrow) = setup();
    let user = Address::generate(&env);
    escrow.deposit(&treasury, &user, &10, &0);
    assert_eq!(escrow.claim(&user), 10);
}
