use soroban_sdk::{contract, contractimpl, contracttype, token::TokenClient, Address, Env};
use yield_common::{
    constants::{BPS_DENOMINATOR, RATIO_SCALE},
    Error,
};

#[contracttype]
#[derive(Clone)]
enum VenueKey {
    Rate(Address, Address),
    Depth(Address, Address),
    FillBps,
    Coverage(Address),
}

/// `amount_in * rate / 1e18`, reduced by `depth / (depth + amount_in)` when a
/// depth is configured for the pair.
fn venue_quote(env: &Env, token_in: &Address, token_out: &Address, amount_in: i128) -> i128 {
    let storage = env.storage().instance();
    let rate: i128 = storage
        .get(&VenueKey::Rate(token_in.clone(), token_out.clone()))
        .unwrap_or(0);
    if rate == 0 || amount_in <= 0 {
        return 0;
    }
    let gross = amount_in * rate / RATIO_SCALE;
    let depth: i128 = storage
        .get(&VenueKey::Depth(token_in.clone(), token_out.clone()))
        .unwrap_or(0);
    if depth > 0 {
        gross * depth / (depth + amount_in)
    } else {
        gross
    }
}

fn venue_swap(
    env: &Env,
    token_in: &Address,
    token_out: &Address,
    amount_in: i128,
    min_out: i128,
    receiver: &Address,
) -> Result<i128, Error> {
    let quoted = venue_quote(env, token_in, token_out, amount_in);
    if quoted == 0 {
        return Err(Error::NoRoute);
    }
    let fill_bps: i128 = env
        .storage()
        .instance()
        .get(&VenueKey::FillBps)
        .unwrap_or(BPS_DENOMINATOR);
    let out = quoted * fill_bps / BPS_DENOMINATOR;
    if out < min_out {
        return Err(Error::InsufficientOutput);
    }
    TokenClient::new(env, token_out).transfer(&env.current_contract_address(), receiver, &out);
    Ok(out)
}

fn write_rate(env: &Env, token_in: Address, token_out: Address, rate: i128) {
    env.storage()
        .instance()
        .set(&VenueKey::Rate(token_in, token_out), &rate);
}

fn write_depth(env: &Env, token_in: Address, token_out: Address, depth: i128) {
    env.storage()
        .instance()
        .set(&VenueKey::Depth(token_in, token_out), &depth);
}

/// Share of the quote actually delivered on swap, in bps.
fn write_fill_bps(env: &Env, bps: i128) {
    env.storage().instance().set(&VenueKey::FillBps, &bps);
}

mod amm {
    use super::*;

    /// Constant-rate AMM. Output tokens must be pre-funded to the venue.
    #[contract]
    pub struct MockSwapVenue;

    #[contractimpl]
    impl MockSwapVenue {
        pub fn set_rate(env: Env, token_in: Address, token_out: Address, rate: i128) {
            write_rate(&env, token_in, token_out, rate);
        }

        pub fn set_depth(env: Env, token_in: Address, token_out: Address, depth: i128) {
            write_depth(&env, token_in, token_out, depth);
        }

        pub fn set_fill_bps(env: Env, bps: i128) {
            write_fill_bps(&env, bps);
        }

        pub fn quote(env: Env, token_in: Address, token_out: Address, amount_in: i128) -> i128 {
            venue_quote(&env, &token_in, &token_out, amount_in)
        }

        pub fn swap(
            env: Env,
            token_in: Address,
            token_out: Address,
            amount_in: i128,
            min_out: i128,
            receiver: Address,
        ) -> Result<i128, Error> {
            venue_swap(&env, &token_in, &token_out, amount_in, min_out, &receiver)
        }
    }
}

pub use amm::{MockSwapVenue, MockSwapVenueClient};

mod stable {
    use super::*;

    /// Stable-swap pool that also reports per-token coverage ratios.
    #[contract]
    pub struct MockStableSwapVenue;

    #[contractimpl]
    impl MockStableSwapVenue {
        pub fn set_rate(env: Env, token_in: Address, token_out: Address, rate: i128) {
            write_rate(&env, token_in, token_out, rate);
        }

        pub fn set_depth(env: Env, token_in: Address, token_out: Address, depth: i128) {
            write_depth(&env, token_in, token_out, depth);
        }

        pub fn set_fill_bps(env: Env, bps: i128) {
            write_fill_bps(&env, bps);
        }

        pub fn set_coverage_ratio(env: Env, token: Address, ratio: i128) {
            env.storage().instance().set(&VenueKey::Coverage(token), &ratio);
        }

        /// Defaults to fully covered (1e18).
        pub fn coverage_ratio(env: Env, token: Address) -> i128 {
            env.storage()
                .instance()
                .get(&VenueKey::Coverage(token))
                .unwrap_or(RATIO_SCALE)
        }

        pub fn quote(env: Env, token_in: Address, token_out: Address, amount_in: i128) -> i128 {
            venue_quote(&env, &token_in, &token_out, amount_in)
        }

        pub fn swap(
            env: Env,
            token_in: Address,
            token_out: Address,
            amount_in: i128,
            min_out: i128,
            receiver: Address,
        ) -> Result<i128, Error> {
            venue_swap(&env, &token_in, &token_out, amount_in, min_out, &receiver)
        }
    }
}

pub use stable::{MockStableSwapVenue, MockStableSwapVenueClient};
