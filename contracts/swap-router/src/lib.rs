//! # Swap Router
//!
//! Routes a token swap to the venue offering the best output among a stable-swap
//! pool and any number of AMM venues.
//!
//! ## Venue Selection
//!
//! Venues are evaluated in priority order: the stable venue first, then the AMM
//! venues in the order they were registered. The strictly highest quote wins, so
//! a tie goes to the earlier venue.
//!
//! The stable venue is skipped when:
//! - it has been disabled,
//! - the trade exceeds the stable trade cap (when a cap is set),
//! - either token's coverage ratio sits below the minimum coverage ratio.
//!
//! The last case is the kill switch. During `swap` it disables the stable venue
//! permanently and publishes a single `kill_sw` event, then the swap carries on
//! with the remaining venues. `quote` never mutates state and only skips the venue.
//!
//! ## Asset Flow
//!
//! ```text
//! caller ──transfer──> router ──transfer──> venue ──swap──> receiver
//! ```
//!
//! The router verifies the receiver's balance delta against `min_out` on top of
//! the venue's own check.

#![no_std]

use soroban_sdk::{
    contract, contractimpl, contracttype, log, symbol_short, token::TokenClient, vec, Address,
    Env, Symbol, Vec,
};
use yield_common::{
    constants::BPS_DENOMINATOR,
    math::{mul_div, require_positive},
    storage::extend_instance_ttl,
    Error,
};

mod venue;

pub use venue::{StableVenueClient, VenueClient};

// ============================================================================
// STORAGE KEYS
// ============================================================================

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Owner,
    /// Optional stable-swap venue, always first in priority
    StableVenue,
    /// Cleared permanently by the kill switch or by the owner
    StableEnabled,
    /// AMM venues in priority order
    Venues,
    /// Minimum coverage ratio (1e18 scale) for both tokens; 0 disables the check
    MinCoverageRatio,
    /// Largest `amount_in` routed to the stable venue; 0 means uncapped
    StableTradeCap,
    /// Largest tolerated gap between quote and probe spot rate; 0 disables the check
    MaxPriceImpactBps,
}

// ============================================================================
// EVENTS
// ============================================================================

/// Emitted for every executed swap.
///
/// # Topics
/// - `SymbolShort("swap")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SwapEvent {
    pub venue: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: i128,
    pub amount_out: i128,
}

/// Emitted once, when low coverage disables the stable venue.
///
/// # Topics
/// - `SymbolShort("kill_sw")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KillSwitchEvent {
    pub venue: Address,
    pub token: Address,
    pub coverage_ratio: i128,
}

/// Why the stable venue was left out of a routing decision.
enum StableExclusion {
    Ineligible,
    LowCoverage { token: Address, ratio: i128 },
}

#[contract]
pub struct SwapRouter;

#[contractimpl]
impl SwapRouter {
    // ==========================================================================
    // INITIALIZATION
    // ==========================================================================

    /// Initializes the router.
    ///
    /// # Arguments
    /// * `owner` - Address allowed to manage venues and guard parameters
    /// * `stable_venue` - Optional stable-swap pool, evaluated before the AMMs
    /// * `venues` - AMM venues in priority order
    ///
    /// # Errors
    /// - [`Error::AlreadyInitialized`] on a second call
    /// - [`Error::InvalidAddress`] if a venue is listed twice
    pub fn initialize(
        env: Env,
        owner: Address,
        stable_venue: Option<Address>,
        venues: Vec<Address>,
    ) -> Result<(), Error> {
        let storage = env.storage().instance();
        if storage.has(&DataKey::Owner) {
            return Err(Error::AlreadyInitialized);
        }

        let mut seen: Vec<Address> = vec![&env];
        if let Some(stable) = stable_venue.as_ref() {
            seen.push_back(stable.clone());
        }
        for venue in venues.iter() {
            if seen.contains(&venue) {
                return Err(Error::InvalidAddress);
            }
            seen.push_back(venue);
        }

        storage.set(&DataKey::Owner, &owner);
        if let Some(stable) = stable_venue {
            storage.set(&DataKey::StableVenue, &stable);
            storage.set(&DataKey::StableEnabled, &true);
        } else {
            storage.set(&DataKey::StableEnabled, &false);
        }
        storage.set(&DataKey::Venues, &venues);
        storage.set(&DataKey::MinCoverageRatio, &0i128);
        storage.set(&DataKey::StableTradeCap, &0i128);
        storage.set(&DataKey::MaxPriceImpactBps, &0u32);
        extend_instance_ttl(&env);
        Ok(())
    }

    // ==========================================================================
    // ROUTING
    // ==========================================================================

    /// Best eligible output for `amount_in` of `token_in`. Read-only.
    ///
    /// # Errors
    /// - [`Error::NoRoute`] if no venue quotes a positive amount
    pub fn quote(env: Env, token_in: Address, token_out: Address, amount_in: i128) -> Result<i128, Error> {
        require_positive(amount_in)?;
        let candidates = Self::candidates(&env, &token_in, &token_out, amount_in, false)?;
        let (_, quoted) = Self::best_quote(&env, &candidates, &token_in, &token_out, amount_in)
            .ok_or(Error::NoRoute)?;
        Ok(quoted)
    }

    /// Swaps `amount_in` of `token_in` pulled from `caller`, delivering at least
    /// `min_out` of `token_out` to `receiver`.
    ///
    /// # Returns
    /// The amount `receiver` actually received.
    ///
    /// # Errors
    /// - [`Error::ZeroAmount`] / [`Error::NegativeAmount`] for a bad `amount_in`
    /// - [`Error::NoRoute`] if no venue quotes a positive amount
    /// - [`Error::PriceImpactTooHigh`] if the winning quote strays too far from spot
    /// - [`Error::InsufficientOutput`] if the venue or the receiver delta falls short
    /// - [`Error::SwapFailed`] if the venue fails without a recognised error
    ///
    /// # Events
    /// Emits `SwapEvent`, and `KillSwitchEvent` when the kill switch trips.
    pub fn swap(
        env: Env,
        caller: Address,
        token_in: Address,
        token_out: Address,
        amount_in: i128,
        min_out: i128,
        receiver: Address,
    ) -> Result<i128, Error> {
        caller.require_auth();
        require_positive(amount_in)?;
        if min_out < 0 {
            return Err(Error::NegativeAmount);
        }
        if token_in == token_out {
            return Err(Error::NoRoute);
        }

        let this = env.current_contract_address();
        let input = TokenClient::new(&env, &token_in);
        input.transfer(&caller, &this, &amount_in);

        let candidates = Self::candidates(&env, &token_in, &token_out, amount_in, true)?;
        let (winner, quoted) = Self::best_quote(&env, &candidates, &token_in, &token_out, amount_in)
            .ok_or(Error::NoRoute)?;
        Self::check_price_impact(&env, &winner, &token_in, &token_out, amount_in, quoted)?;

        let output = TokenClient::new(&env, &token_out);
        let before = output.balance(&receiver);

        input.transfer(&this, &winner, &amount_in);
        match VenueClient::new(&env, &winner).try_swap(
            &token_in, &token_out, &amount_in, &min_out, &receiver,
        ) {
            Ok(Ok(_)) => {}
            Err(Ok(err)) => return Err(err),
            _ => return Err(Error::SwapFailed),
        }

        let received = output.balance(&receiver) - before;
        if received < min_out {
            return Err(Error::InsufficientOutput);
        }

        extend_instance_ttl(&env);
        env.events().publish(
            (symbol_short!("swap"),),
            SwapEvent {
                venue: winner,
                token_in,
                token_out,
                amount_in,
                amount_out: received,
            },
        );
        Ok(received)
    }

    // ==========================================================================
    // ADMINISTRATION
    // ==========================================================================

    /// Appends an AMM venue at the lowest priority.
    pub fn add_venue(env: Env, venue: Address) -> Result<(), Error> {
        Self::require_owner(&env)?;
        let mut venues = Self::venues(env.clone());
        let stable = Self::stable_venue(env.clone());
        if venues.contains(&venue)
            || stable.as_ref() == Some(&venue)
            || venue == env.current_contract_address()
        {
            return Err(Error::InvalidAddress);
        }
        venues.push_back(venue);
        env.storage().instance().set(&DataKey::Venues, &venues);
        extend_instance_ttl(&env);
        Ok(())
    }

    pub fn set_min_coverage_ratio(env: Env, ratio: i128) -> Result<(), Error> {
        Self::require_owner(&env)?;
        if ratio < 0 {
            return Err(Error::NegativeAmount);
        }
        env.storage().instance().set(&DataKey::MinCoverageRatio, &ratio);
        extend_instance_ttl(&env);
        Ok(())
    }

    pub fn set_stable_trade_cap(env: Env, cap: i128) -> Result<(), Error> {
        Self::require_owner(&env)?;
        if cap < 0 {
            return Err(Error::NegativeAmount);
        }
        env.storage().instance().set(&DataKey::StableTradeCap, &cap);
        extend_instance_ttl(&env);
        Ok(())
    }

    pub fn set_max_price_impact_bps(env: Env, bps: u32) -> Result<(), Error> {
        Self::require_owner(&env)?;
        if bps as i128 > BPS_DENOMINATOR {
            return Err(Error::BpsTooHigh);
        }
        env.storage().instance().set(&DataKey::MaxPriceImpactBps, &bps);
        extend_instance_ttl(&env);
        Ok(())
    }

    /// Turns the stable venue off for good. There is no way back.
    pub fn disable_stable_venue(env: Env) -> Result<(), Error> {
        let owner = Self::require_owner(&env)?;
        env.storage().instance().set(&DataKey::StableEnabled, &false);
        extend_instance_ttl(&env);
        env.events()
            .publish((Symbol::new(&env, "stable_off"),), owner);
        Ok(())
    }

    // ==========================================================================
    // VIEW FUNCTIONS
    // ==========================================================================

    pub fn owner(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::Owner)
    }

    pub fn stable_venue(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::StableVenue)
    }

    pub fn stable_enabled(env: Env) -> bool {
        env.storage()
            .instance()
            .get(&DataKey::StableEnabled)
            .unwrap_or(false)
    }

    pub fn venues(env: Env) -> Vec<Address> {
        env.storage()
            .instance()
            .get(&DataKey::Venues)
            .unwrap_or(vec![&env])
    }

    pub fn min_coverage_ratio(env: Env) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::MinCoverageRatio)
            .unwrap_or(0)
    }

    pub fn stable_trade_cap(env: Env) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::StableTradeCap)
            .unwrap_or(0)
    }

    pub fn max_price_impact_bps(env: Env) -> u32 {
        env.storage()
            .instance()
            .get(&DataKey::MaxPriceImpactBps)
            .unwrap_or(0)
    }

    // ==========================================================================
    // INTERNAL HELPERS
    // ==========================================================================

    fn require_owner(env: &Env) -> Result<Address, Error> {
        let owner: Address = env
            .storage()
            .instance()
            .get(&DataKey::Owner)
            .ok_or(Error::NotInitialized)?;
        owner.require_auth();
        Ok(owner)
    }

    /// Venues eligible for this trade, in priority order. With `trip` set, a
    /// coverage failure disables the stable venue and publishes `kill_sw`.
    fn candidates(
        env: &Env,
        token_in: &Address,
        token_out: &Address,
        amount_in: i128,
        trip: bool,
    ) -> Result<Vec<Address>, Error> {
        if !env.storage().instance().has(&DataKey::Owner) {
            return Err(Error::NotInitialized);
        }
        let mut candidates: Vec<Address> = vec![env];
        if let Some(stable) = Self::stable_venue(env.clone()) {
            match Self::stable_exclusion(env, &stable, token_in, token_out, amount_in) {
                None => candidates.push_back(stable),
                Some(StableExclusion::LowCoverage { token, ratio }) if trip => {
                    env.storage().instance().set(&DataKey::StableEnabled, &false);
                    log!(env, "stable venue coverage below minimum", ratio);
                    env.events().publish(
                        (symbol_short!("kill_sw"),),
                        KillSwitchEvent {
                            venue: stable,
                            token,
                            coverage_ratio: ratio,
                        },
                    );
                }
                Some(_) => {}
            }
        }
        candidates.append(&Self::venues(env.clone()));
        Ok(candidates)
    }

    fn stable_exclusion(
        env: &Env,
        stable: &Address,
        token_in: &Address,
        token_out: &Address,
        amount_in: i128,
    ) -> Option<StableExclusion> {
        if !Self::stable_enabled(env.clone()) {
            return Some(StableExclusion::Ineligible);
        }
        let cap = Self::stable_trade_cap(env.clone());
        if cap > 0 && amount_in > cap {
            return Some(StableExclusion::Ineligible);
        }
        let min_ratio = Self::min_coverage_ratio(env.clone());
        if min_ratio > 0 {
            let client = StableVenueClient::new(env, stable);
            for token in [token_in, token_out] {
                let ratio = match client.try_coverage_ratio(token) {
                    Ok(Ok(ratio)) => ratio,
                    _ => 0,
                };
                if ratio < min_ratio {
                    return Some(StableExclusion::LowCoverage {
                        token: token.clone(),
                        ratio,
                    });
                }
            }
        }
        None
    }

    /// Strictly highest positive quote; earlier venues win ties.
    fn best_quote(
        env: &Env,
        candidates: &Vec<Address>,
        token_in: &Address,
        token_out: &Address,
        amount_in: i128,
    ) -> Option<(Address, i128)> {
        let mut best: Option<(Address, i128)> = None;
        for venue in candidates.iter() {
            let quoted = Self::venue_quote(env, &venue, token_in, token_out, amount_in);
            let better = match &best {
                Some((_, current)) => quoted > *current,
                None => quoted > 0,
            };
            if better {
                best = Some((venue, quoted));
            }
        }
        best
    }

    fn venue_quote(env: &Env, venue: &Address, token_in: &Address, token_out: &Address, amount_in: i128) -> i128 {
        match VenueClient::new(env, venue).try_quote(token_in, token_out, &amount_in) {
            Ok(Ok(quoted)) if quoted > 0 => quoted,
            _ => 0,
        }
    }

    /// Compares the winning quote against the venue's rate for a 1% probe.
    fn check_price_impact(
        env: &Env,
        venue: &Address,
        token_in: &Address,
        token_out: &Address,
        amount_in: i128,
        quoted: i128,
    ) -> Result<(), Error> {
        let max_bps = Self::max_price_impact_bps(env.clone());
        if max_bps == 0 {
            return Ok(());
        }
        let probe = (amount_in / 100).max(1);
        let spot = Self::venue_quote(env, venue, token_in, token_out, probe);
        if spot == 0 {
            return Ok(());
        }
        let expected = mul_div(spot, amount_in, probe)?;
        if expected <= quoted {
            return Ok(());
        }
        let impact_bps = mul_div(expected - quoted, BPS_DENOMINATOR, expected)?;
        if impact_bps > max_bps as i128 {
            return Err(Error::PriceImpactTooHigh);
        }
        Ok(())
    }
}
