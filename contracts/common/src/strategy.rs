//! State and behaviour shared by every strategy backend.
//!
//! A strategy contract stores its common configuration under [`StrategyKey`]
//! and delegates linkage, owner checks, path management and reward conversion
//! to the helpers in this module. Backend-specific state (market addresses,
//! farm pool ids, bribe managers) lives in the backend's own key enum.

use soroban_sdk::{
    auth::{ContractContext, InvokerContractAuthEntry, SubContractInvocation},
    contracttype, log,
    token::TokenClient,
    vec, Address, Env, IntoVal, Symbol, Vec,
};

use crate::clients::router;
use crate::constants::DEFAULT_SLIPPAGE_BPS;
use crate::error::Error;
use crate::math::{min_after_slippage, validate_slippage_bps};

#[contracttype]
#[derive(Clone)]
pub enum StrategyKey {
    Owner,
    Vault,
    Asset,
    RewardToken,
    Router,
    Path,
    SlippageBps,
    TotalSupplied,
}

/// Payload of the `linked` event.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LinkedEvent {
    pub vault: Address,
}

/// Payload of the `harvest` event.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HarvestEvent {
    pub vault: Address,
    pub proceeds: i128,
}

/// Payload of the `emergency` event.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EmergencyEvent {
    pub vault: Address,
    pub recovered: i128,
}

/// Stores the common configuration. The default path is `[reward, asset]`,
/// or `[asset]` when rewards are paid in the asset itself.
pub fn init(
    env: &Env,
    owner: &Address,
    asset: &Address,
    reward_token: &Address,
    router: &Address,
) -> Result<(), Error> {
    let storage = env.storage().instance();
    if storage.has(&StrategyKey::Owner) {
        return Err(Error::AlreadyInitialized);
    }

    let path = if reward_token == asset {
        vec![env, asset.clone()]
    } else {
        vec![env, reward_token.clone(), asset.clone()]
    };

    storage.set(&StrategyKey::Owner, owner);
    storage.set(&StrategyKey::Asset, asset);
    storage.set(&StrategyKey::RewardToken, reward_token);
    storage.set(&StrategyKey::Router, router);
    storage.set(&StrategyKey::Path, &path);
    storage.set(&StrategyKey::SlippageBps, &DEFAULT_SLIPPAGE_BPS);
    storage.set(&StrategyKey::TotalSupplied, &0i128);
    Ok(())
}

pub fn owner(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&StrategyKey::Owner)
        .ok_or(Error::NotInitialized)
}

pub fn require_owner(env: &Env) -> Result<Address, Error> {
    let owner = owner(env)?;
    owner.require_auth();
    Ok(owner)
}

pub fn vault(env: &Env) -> Option<Address> {
    env.storage().instance().get(&StrategyKey::Vault)
}

pub fn linked_vault(env: &Env) -> Result<Address, Error> {
    vault(env).ok_or(Error::NotLinked)
}

/// One-time linkage to the vault that owns this strategy's principal.
pub fn link_vault(env: &Env, vault_addr: &Address) -> Result<(), Error> {
    require_owner(env)?;
    if vault(env).is_some() {
        return Err(Error::AlreadyLinked);
    }
    if *vault_addr == env.current_contract_address() {
        return Err(Error::InvalidAddress);
    }
    env.storage().instance().set(&StrategyKey::Vault, vault_addr);
    env.events().publish(
        (Symbol::new(env, "linked"),),
        LinkedEvent {
            vault: vault_addr.clone(),
        },
    );
    Ok(())
}

/// Authenticates `caller` and checks it is the linked vault.
pub fn require_vault(env: &Env, caller: &Address) -> Result<Address, Error> {
    caller.require_auth();
    let linked = linked_vault(env)?;
    if linked != *caller {
        return Err(Error::NotAuthorized);
    }
    Ok(linked)
}

pub fn asset(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&StrategyKey::Asset)
        .ok_or(Error::NotInitialized)
}

pub fn reward_token(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&StrategyKey::RewardToken)
        .ok_or(Error::NotInitialized)
}

pub fn router(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&StrategyKey::Router)
        .ok_or(Error::NotInitialized)
}

pub fn total_supplied(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&StrategyKey::TotalSupplied)
        .unwrap_or(0)
}

pub fn set_total_supplied(env: &Env, amount: i128) {
    env.storage()
        .instance()
        .set(&StrategyKey::TotalSupplied, &amount);
}

/// Fails with [`Error::LedgerMismatch`] when the bookkeeping drifted from the
/// balance the external source reports.
pub fn reconcile(env: &Env, reported: i128) -> Result<(), Error> {
    let tracked = total_supplied(env);
    if tracked != reported {
        log!(env, "ledger mismatch", tracked, reported);
        return Err(Error::LedgerMismatch);
    }
    Ok(())
}

pub fn slippage_bps(env: &Env) -> u32 {
    env.storage()
        .instance()
        .get(&StrategyKey::SlippageBps)
        .unwrap_or(DEFAULT_SLIPPAGE_BPS)
}

pub fn set_slippage_bps(env: &Env, bps: u32) -> Result<(), Error> {
    require_owner(env)?;
    validate_slippage_bps(bps)?;
    env.storage().instance().set(&StrategyKey::SlippageBps, &bps);
    Ok(())
}

pub fn path(env: &Env) -> Vec<Address> {
    env.storage()
        .instance()
        .get(&StrategyKey::Path)
        .unwrap_or(vec![env])
}

pub fn set_path(env: &Env, new_path: &Vec<Address>) -> Result<(), Error> {
    require_owner(env)?;
    validate_path(env, new_path, &reward_token(env)?, &asset(env)?)?;
    env.storage().instance().set(&StrategyKey::Path, new_path);
    Ok(())
}

/// A conversion path starts at `from`, ends at `to`, and may only have a
/// single element when `from == to`.
pub fn validate_path(
    env: &Env,
    candidate: &Vec<Address>,
    from: &Address,
    to: &Address,
) -> Result<(), Error> {
    let first = candidate.first().ok_or(Error::InvalidPathStart)?;
    if first != *from {
        return Err(Error::InvalidPathStart);
    }
    let last = candidate.last().ok_or(Error::InvalidPathEnd)?;
    if last != *to {
        return Err(Error::InvalidPathEnd);
    }
    if candidate.len() == 1 && from != to {
        return Err(Error::InvalidPathEnd);
    }
    let this = env.current_contract_address();
    if candidate.iter().any(|hop| hop == this) {
        return Err(Error::InvalidAddress);
    }
    Ok(())
}

/// Chains router quotes hop by hop. A single-element path quotes 1:1.
pub fn quote_path(
    env: &Env,
    router_addr: &Address,
    hops: &Vec<Address>,
    amount_in: i128,
) -> Result<i128, Error> {
    let client = router::Client::new(env, router_addr);
    let mut amount = amount_in;
    for i in 1..hops.len() {
        let (token_in, token_out) = hop_pair(hops, i)?;
        amount = match client.try_quote(&token_in, &token_out, &amount) {
            Ok(Ok(out)) => out,
            Err(Ok(err)) => return Err(err),
            _ => return Err(Error::NoRoute),
        };
    }
    Ok(amount)
}

/// Swaps `amount_in` along `hops` through the router. Intermediate hops accept
/// any output; the last one must deliver at least `min_out` to this contract.
pub fn swap_path(
    env: &Env,
    router_addr: &Address,
    hops: &Vec<Address>,
    amount_in: i128,
    min_out: i128,
) -> Result<i128, Error> {
    let last = hops.len().saturating_sub(1);
    let mut amount = amount_in;
    for i in 1..hops.len() {
        let (token_in, token_out) = hop_pair(hops, i)?;
        let hop_min = if i == last { min_out } else { 0 };
        amount = swap_hop(env, router_addr, &token_in, &token_out, amount, hop_min)?;
    }
    if amount < min_out {
        return Err(Error::InsufficientOutput);
    }
    Ok(amount)
}

/// Single router swap on behalf of this contract, measured by balance delta.
pub fn swap_hop(
    env: &Env,
    router_addr: &Address,
    token_in: &Address,
    token_out: &Address,
    amount_in: i128,
    min_out: i128,
) -> Result<i128, Error> {
    let this = env.current_contract_address();
    let out_token = TokenClient::new(env, token_out);
    let before = out_token.balance(&this);

    // router.swap pulls `amount_in` from us with token.transfer(this, router, amount_in).
    // Nothing may be invoked between this and the swap.
    env.authorize_as_current_contract(vec![
        env,
        InvokerContractAuthEntry::Contract(SubContractInvocation {
            context: ContractContext {
                contract: token_in.clone(),
                fn_name: Symbol::new(env, "transfer"),
                args: vec![
                    env,
                    this.clone().into_val(env),
                    router_addr.clone().into_val(env),
                    amount_in.into_val(env),
                ],
            },
            sub_invocations: vec![env],
        }),
    ]);
    match router::Client::new(env, router_addr).try_swap(
        &this, token_in, token_out, &amount_in, &min_out, &this,
    ) {
        Ok(Ok(_)) => {}
        Err(Ok(err)) => return Err(err),
        _ => return Err(Error::SwapFailed),
    }
    let received = out_token.balance(&this) - before;
    if received < min_out {
        return Err(Error::InsufficientOutput);
    }
    Ok(received)
}

/// Converts this contract's whole reward-token balance into the asset along
/// the configured path. Returns the asset amount obtained (0 when there was
/// nothing to convert).
///
/// The floor is `min_out` when the caller supplies one, otherwise the path
/// quote reduced by the configured slippage tolerance.
pub fn convert_rewards(env: &Env, min_out: i128) -> Result<i128, Error> {
    let hops = path(env);
    let reward = reward_token(env)?;
    let this = env.current_contract_address();
    let amount_in = TokenClient::new(env, &reward).balance(&this);
    if amount_in <= 0 || hops.len() <= 1 {
        return Ok(amount_in.max(0));
    }

    let router_addr = router(env)?;
    let quoted = quote_path(env, &router_addr, &hops, amount_in)?;
    let floor = if min_out > 0 {
        min_out
    } else {
        min_after_slippage(quoted, slippage_bps(env))?
    };
    swap_path(env, &router_addr, &hops, amount_in, floor)
}

/// Best-effort asset value of `pending` reward tokens. Failed quotes count as 0.
pub fn pending_value(env: &Env, pending: i128) -> i128 {
    if pending <= 0 {
        return 0;
    }
    let hops = path(env);
    if hops.len() <= 1 {
        return pending;
    }
    match router(env) {
        Ok(router_addr) => quote_path(env, &router_addr, &hops, pending).unwrap_or(0),
        Err(_) => 0,
    }
}

/// Transfers this contract's entire `token` balance to `to`.
pub fn sweep(env: &Env, token: &Address, to: &Address) -> i128 {
    let client = TokenClient::new(env, token);
    let this = env.current_contract_address();
    let balance = client.balance(&this);
    if balance > 0 {
        client.transfer(&this, to, &balance);
    }
    balance
}

pub fn publish_harvest(env: &Env, vault_addr: &Address, proceeds: i128) {
    env.events().publish(
        (Symbol::new(env, "harvest"),),
        HarvestEvent {
            vault: vault_addr.clone(),
            proceeds,
        },
    );
}

pub fn publish_emergency(env: &Env, vault_addr: &Address, recovered: i128) {
    env.events().publish(
        (Symbol::new(env, "emergency"),),
        EmergencyEvent {
            vault: vault_addr.clone(),
            recovered,
        },
    );
}

fn hop_pair(hops: &Vec<Address>, i: u32) -> Result<(Address, Address), Error> {
    let token_in = hops.get(i - 1).ok_or(Error::InvalidPathStart)?;
    let token_out = hops.get(i).ok_or(Error::InvalidPathEnd)?;
    Ok((token_in, token_out))
}
