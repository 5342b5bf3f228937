//! Interfaces of the swap venues the router aggregates.

use soroban_sdk::{contractclient, Address, Env};
use yield_common::Error;

/// A constant-function AMM. Input tokens are pushed to the venue before `swap`.
#[contractclient(name = "VenueClient")]
pub trait SwapVenue {
    fn quote(env: Env, token_in: Address, token_out: Address, amount_in: i128) -> i128;

    fn swap(
        env: Env,
        token_in: Address,
        token_out: Address,
        amount_in: i128,
        min_out: i128,
        receiver: Address,
    ) -> Result<i128, Error>;
}

/// A stable-swap pool whose per-token coverage ratio (scaled by 1e18) signals
/// solvency of each side of the pool.
#[contractclient(name = "StableVenueClient")]
pub trait StableSwapVenue {
    fn coverage_ratio(env: Env, token: Address) -> i128;
}
