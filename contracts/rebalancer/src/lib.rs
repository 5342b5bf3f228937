//! # Rebalancer
//!
//! Moves principal from one strategy to another on behalf of a vault and
//! checks that the destination booked what it was sent.
//!
//! The vault signs for the three nested calls the rebalancer makes in its name
//! (`from.withdraw`, the asset transfer and `to.deposit`), so the rebalancer
//! never holds funds and keeps no state beyond its instance TTL.

#![no_std]

use soroban_sdk::{contract, contractimpl, contracttype, symbol_short, token::TokenClient, Address, Env};
use yield_common::{
    clients::strategy,
    constants::BPS_DENOMINATOR,
    math::{bps_of, min_after_slippage, require_positive},
    storage::extend_instance_ttl,
    Error,
};

/// # Topics
/// - `SymbolShort("rebal")`
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RebalanceEvent {
    pub vault: Address,
    pub from: Address,
    pub to: Address,
    pub amount: i128,
    pub received: i128,
}

#[contract]
pub struct Rebalancer;

#[contractimpl]
impl Rebalancer {
    /// Withdraws `amount` from `from` into `vault`, then deposits it into `to`.
    ///
    /// # Arguments
    /// * `vault` - Owner of the principal in both strategies; must authorize
    /// * `from` / `to` - Source and destination strategies
    /// * `amount` - Principal to move
    /// * `slippage_bps` - Largest tolerated shortfall of the destination's booked increase
    /// * `buffer_bps` - Largest tolerated excess of the destination's booked increase
    ///
    /// # Returns
    /// The increase in `to.total_supplied()`
    ///
    /// # Errors
    /// - [`Error::InvalidStrategy`] if `from == to`
    /// - [`Error::BpsTooHigh`] if either tolerance exceeds 10_000
    /// - [`Error::SlippageExceeded`] if the vault received less than `amount`
    ///   or the destination's increase falls outside the tolerated band
    pub fn rebalance(
        env: Env,
        vault: Address,
        from: Address,
        to: Address,
        amount: i128,
        slippage_bps: u32,
        buffer_bps: u32,
    ) -> Result<i128, Error> {
        vault.require_auth();
        require_positive(amount)?;
        if from == to {
            return Err(Error::InvalidStrategy);
        }
        if slippage_bps as i128 > BPS_DENOMINATOR || buffer_bps as i128 > BPS_DENOMINATOR {
            return Err(Error::BpsTooHigh);
        }

        let from_client = strategy::Client::new(&env, &from);
        let to_client = strategy::Client::new(&env, &to);
        let asset = TokenClient::new(&env, &from_client.asset());

        let before = asset.balance(&vault);
        from_client.withdraw(&vault, &amount);
        let freed = asset.balance(&vault) - before;
        if freed < amount {
            return Err(Error::SlippageExceeded);
        }

        let supplied_before = to_client.total_supplied();
        asset.transfer(&vault, &to, &amount);
        to_client.deposit(&vault, &amount);
        let received = to_client.total_supplied() - supplied_before;

        let lower = min_after_slippage(amount, slippage_bps)?;
        let upper = amount
            .checked_add(bps_of(amount, buffer_bps)?)
            .ok_or(Error::MathOverflow)?;
        if received < lower || received > upper {
            return Err(Error::SlippageExceeded);
        }

        extend_instance_ttl(&env);
        env.events().publish(
            (symbol_short!("rebal"),),
            RebalanceEvent {
                vault,
                from,
                to,
                amount,
                received,
            },
        );
        Ok(received)
    }
}
