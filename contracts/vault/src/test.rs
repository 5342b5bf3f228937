#![cfg(test)]
extern crate std;

use super::*;
use dex_staking_strategy::{DexStakingStrategy, DexStakingStrategyClient};
use keeper_registry::{KeeperRegistry, KeeperRegistryClient};
use lending_strategy::{LendingStrategy, LendingStrategyClient, MarketKind};
use soroban_sdk::{
    testutils::{Address as _, Events, Ledger, MockAuth, MockAuthInvoke},
    token::{StellarAssetClient, TokenClient},
    vec, Address, Env, IntoVal, Symbol, TryFromVal,
};
use swap_router::{SwapRouter, SwapRouterClient};
use tip_vault::{TipVault, TipVaultClient};
use yield_common::constants::RATIO_SCALE;
use yield_mocks::{
    MockDexPool, MockDexPoolClient, MockFlashLoanExecutor, MockFlashLoanExecutorClient,
    MockLendingPool, MockLendingPoolClient, MockQiController, MockQiControllerClient,
    MockQiMarket, MockQiMarketClient, MockRewardsController, MockRewardsControllerClient,
    MockStrategy, MockStrategyClient, MockSwapVenue, MockSwapVenueClient,
};
use yield_rebalancer::{Rebalancer, RebalancerClient};

const UNIT: i128 = 10_000_000;

// ============================================================================
// HELPERS
// ============================================================================

fn create_token(env: &Env) -> Address {
    let admin = Address::generate(env);
    env.register_stellar_asset_contract_v2(admin).address()
}

fn mint(env: &Env, token: &Address, to: &Address, amount: i128) {
    StellarAssetClient::new(env, token).mint(to, &amount);
}

fn balance(env: &Env, token: &Address, of: &Address) -> i128 {
    TokenClient::new(env, token).balance(of)
}

/// A lending strategy together with the rewards controller feeding it.
struct Lending<'a> {
    kind: MarketKind,
    market: Address,
    controller: Address,
    strategy: LendingStrategyClient<'a>,
}

impl<'a> Lending<'a> {
    /// Makes `amount` of reward claimable by the strategy.
    fn accrue(&self, env: &Env, amount: i128) {
        match self.kind {
            MarketKind::Qi => MockQiControllerClient::new(env, &self.controller)
                .set_pending(&self.strategy.address, &amount),
            MarketKind::Pool => MockRewardsControllerClient::new(env, &self.controller)
                .set_pending(&self.strategy.address, &amount),
        }
    }
}

struct Setup<'a> {
    env: Env,
    owner: Address,
    fee_recipient: Address,
    asset: Address,
    reward: Address,
    router: Address,
    vault: YieldVaultClient<'a>,
    lending: Lending<'a>,
}

/// Vault over a lending strategy, with rewards swapped 1:1 into the asset.
fn setup<'a>(kind: MarketKind) -> Setup<'a> {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();

    let owner = Address::generate(&env);
    let fee_recipient = Address::generate(&env);
    let asset = create_token(&env);
    let reward = create_token(&env);

    let venue_id = env.register(MockSwapVenue, ());
    MockSwapVenueClient::new(&env, &venue_id).set_rate(&reward, &asset, &RATIO_SCALE);
    mint(&env, &asset, &venue_id, 1_000 * UNIT);
    let router = env.register(SwapRouter, ());
    SwapRouterClient::new(&env, &router).initialize(&owner, &None, &vec![&env, venue_id]);

    let vault = YieldVaultClient::new(&env, &env.register(YieldVault, ()));
    vault.initialize(&owner, &asset, &fee_recipient);

    let lending = deploy_lending(&env, &owner, &asset, &reward, &router, &vault.address, kind);
    vault.set_strategy(&lending.strategy.address);

    Setup {
        env,
        owner,
        fee_recipient,
        asset,
        reward,
        router,
        vault,
        lending,
    }
}

/// Deploys a lending strategy of `kind` linked to `vault`.
fn deploy_lending<'a>(
    env: &Env,
    owner: &Address,
    asset: &Address,
    reward: &Address,
    router: &Address,
    vault: &Address,
    kind: MarketKind,
) -> Lending<'a> {
    let (market, controller) = match kind {
        MarketKind::Qi => {
            let market = env.register(MockQiMarket, ());
            MockQiMarketClient::new(env, &market).initialize(asset);
            let controller = env.register(MockQiController, ());
            MockQiControllerClient::new(env, &controller).initialize(reward);
            (market, controller)
        }
        MarketKind::Pool => {
            let pool = env.register(MockLendingPool, ());
            MockLendingPoolClient::new(env, &pool).initialize(asset);
            let controller = env.register(MockRewardsController, ());
            MockRewardsControllerClient::new(env, &controller).initialize(reward);
            (pool, controller)
        }
    };
    mint(env, reward, &controller, 1_000 * UNIT);

    let strategy = LendingStrategyClient::new(env, &env.register(LendingStrategy, ()));
    strategy.initialize(owner, asset, reward, router, &kind, &market, &controller);
    strategy.set_vault(vault);
    Lending {
        kind,
        market,
        controller,
        strategy,
    }
}

impl<'a> Setup<'a> {
    /// A second lending strategy linked to the vault, not yet active.
    fn lending_strategy(&self, kind: MarketKind) -> Lending<'a> {
        deploy_lending(
            &self.env,
            &self.owner,
            &self.asset,
            &self.reward,
            &self.router,
            &self.vault.address,
            kind,
        )
    }

    fn user_with(&self, amount: i128) -> Address {
        let user = Address::generate(&self.env);
        mint(&self.env, &self.asset, &user, amount);
        user
    }

    fn deposit(&self, amount: i128) -> Address {
        let user = self.user_with(amount);
        self.vault.deposit(&user, &amount, &user);
        user
    }

    fn registry_with(&self, keeper: &Address) -> KeeperRegistryClient<'a> {
        let registry = KeeperRegistryClient::new(&self.env, &self.env.register(KeeperRegistry, ()));
        registry.initialize(&self.owner);
        registry.register_keeper(keeper);
        registry
    }
}

// ============================================================================
// INITIALIZATION & LINKAGE
// ============================================================================

#[test]
fn test_initialize_defaults() {
    let s = setup(MarketKind::Qi);
    assert_eq!(s.vault.get_owner(), s.owner);
    assert_eq!(s.vault.get_asset(), s.asset);
    assert_eq!(s.vault.get_fee_recipient(), s.fee_recipient);
    assert_eq!(s.vault.get_performance_fee_bps(), 500);
    assert_eq!(s.vault.get_strategy(), Some(s.lending.strategy.address.clone()));
    assert!(!s.vault.is_auto_compound_enabled());
    assert!(!s.vault.is_paused());
    assert_eq!(s.vault.get_tvl_cap(), 0);
    assert_eq!(s.vault.get_keeper_tip(), 0);
    assert_eq!(s.vault.total_shares(), 0);
    assert_eq!(s.vault.total_assets(), 0);

    assert_eq!(
        s.vault.try_initialize(&s.owner, &s.asset, &s.fee_recipient),
        Err(Ok(Error::AlreadyInitialized))
    );
}

#[test]
fn test_deposit_requires_linked_strategy() {
    let s = setup(MarketKind::Qi);
    let bare = YieldVaultClient::new(&s.env, &s.env.register(YieldVault, ()));
    bare.initialize(&s.owner, &s.asset, &s.fee_recipient);
    let user = s.user_with(10 * UNIT);

    assert_eq!(
        bare.try_deposit(&user, &(10 * UNIT), &user),
        Err(Ok(Error::NotLinked))
    );
    assert_eq!(bare.try_compound(&user), Err(Ok(Error::NotLinked)));
}

#[test]
fn test_set_strategy_checks_linkage_and_asset() {
    let s = setup(MarketKind::Qi);

    // linked to another vault
    let stranger = LendingStrategyClient::new(&s.env, &s.env.register(LendingStrategy, ()));
    stranger.initialize(
        &s.owner,
        &s.asset,
        &s.reward,
        &s.router,
        &MarketKind::Qi,
        &s.lending.market,
        &s.lending.controller,
    );
    stranger.set_vault(&Address::generate(&s.env));
    assert_eq!(
        s.vault.try_set_strategy(&stranger.address),
        Err(Ok(Error::InvalidStrategy))
    );

    // linked to this vault, wrong asset
    let other_asset = create_token(&s.env);
    let mismatched = LendingStrategyClient::new(&s.env, &s.env.register(LendingStrategy, ()));
    mismatched.initialize(
        &s.owner,
        &other_asset,
        &s.reward,
        &s.router,
        &MarketKind::Qi,
        &s.lending.market,
        &s.lending.controller,
    );
    mismatched.set_vault(&s.vault.address);
    assert_eq!(
        s.vault.try_set_strategy(&mismatched.address),
        Err(Ok(Error::InvalidStrategy))
    );
}

#[test]
fn test_strategy_replacement_requires_empty_outgoing() {
    let s = setup(MarketKind::Qi);
    let next = s.lending_strategy(MarketKind::Qi);
    s.deposit(100 * UNIT);

    assert_eq!(
        s.vault.try_set_strategy(&next.strategy.address),
        Err(Ok(Error::StrategyNotEmpty))
    );

    s.vault.emergency_withdraw();
    s.vault.set_strategy(&next.strategy.address);
    assert_eq!(s.vault.get_strategy(), Some(next.strategy.address.clone()));

    // float recovered by the emergency exit goes into the new strategy
    assert_eq!(s.vault.invest(), 100 * UNIT);
    assert_eq!(next.strategy.total_supplied(), 100 * UNIT);
    assert_eq!(s.vault.total_assets(), 100 * UNIT);
}

// ============================================================================
// DEPOSIT / WITHDRAW / REDEEM
// ============================================================================

#[test]
fn test_first_deposit_mints_one_to_one() {
    let s = setup(MarketKind::Qi);
    let user = s.user_with(100 * UNIT);

    let shares = s.vault.deposit(&user, &(100 * UNIT), &user);

    let events = s.env.events().all();
    let (contract, topics, _) = events.last().unwrap();
    assert_eq!(contract, s.vault.address);
    assert_eq!(
        Symbol::try_from_val(&s.env, &topics.get(0).unwrap()).ok(),
        Some(symbol_short!("deposit"))
    );

    assert_eq!(shares, 100 * UNIT);
    assert_eq!(s.vault.balance_of(&user), 100 * UNIT);
    assert_eq!(s.vault.total_shares(), 100 * UNIT);
    assert_eq!(s.vault.total_assets(), 100 * UNIT);
    assert_eq!(s.lending.strategy.total_supplied(), 100 * UNIT);
    assert_eq!(balance(&s.env, &s.asset, &s.vault.address), 0);
}

#[test]
fn test_deposit_rejected_when_shares_back_nothing() {
    let s = setup(MarketKind::Qi);
    let strategy = MockStrategyClient::new(&s.env, &s.env.register(MockStrategy, ()));
    strategy.initialize(&s.vault.address, &s.asset);
    s.vault.set_strategy(&strategy.address);

    // the strategy books nothing for what it receives
    strategy.set_credit_bps(&0);
    s.deposit(100 * UNIT);
    assert_eq!(s.vault.total_shares(), 100 * UNIT);
    assert_eq!(s.vault.total_assets(), 0);

    let late = s.user_with(50 * UNIT);
    assert_eq!(
        s.vault.try_deposit(&late, &(50 * UNIT), &late),
        Err(Ok(Error::ZeroShares))
    );
    assert_eq!(balance(&s.env, &s.asset, &late), 50 * UNIT);
}

#[test]
fn test_deposit_to_other_receiver() {
    let s = setup(MarketKind::Qi);
    let payer = s.user_with(10 * UNIT);
    let receiver = Address::generate(&s.env);

    s.vault.deposit(&payer, &(10 * UNIT), &receiver);
    assert_eq!(s.vault.balance_of(&payer), 0);
    assert_eq!(s.vault.balance_of(&receiver), 10 * UNIT);
}

#[test]
fn test_deposit_rejects_bad_amounts() {
    let s = setup(MarketKind::Qi);
    let user = s.user_with(10 * UNIT);
    assert_eq!(s.vault.try_deposit(&user, &0, &user), Err(Ok(Error::ZeroAmount)));
    assert_eq!(
        s.vault.try_deposit(&user, &-5, &user),
        Err(Ok(Error::NegativeAmount))
    );
}

#[test]
fn test_deposit_then_redeem_round_trips() {
    let s = setup(MarketKind::Qi);
    let user = s.user_with(100 * UNIT);
    let shares = s.vault.deposit(&user, &(100 * UNIT), &user);

    let assets = s.vault.redeem(&user, &shares, &user, &user);

    assert_eq!(assets, 100 * UNIT);
    assert_eq!(balance(&s.env, &s.asset, &user), 100 * UNIT);
    assert_eq!(s.vault.balance_of(&user), 0);
    assert_eq!(s.vault.total_shares(), 0);
    assert_eq!(s.lending.strategy.total_supplied(), 0);
}

#[test]
fn test_withdraw_burns_shares_rounded_up() {
    let s = setup(MarketKind::Qi);
    let user = s.deposit(100 * UNIT);
    s.lending.accrue(&s.env, 20 * UNIT);
    s.vault.compound(&Address::generate(&s.env));
    assert_eq!(s.vault.total_assets(), 119 * UNIT);

    // 10 * 100 / 119 = 8.4033613445...
    let burned = s.vault.withdraw(&user, &(10 * UNIT), &user, &user);

    assert_eq!(burned, 84_033_614);
    assert_eq!(balance(&s.env, &s.asset, &user), 10 * UNIT);
    assert_eq!(s.vault.balance_of(&user), 100 * UNIT - 84_033_614);
    assert_eq!(s.vault.total_assets(), 109 * UNIT);
}

#[test]
fn test_withdraw_requires_holder_and_balance() {
    let s = setup(MarketKind::Qi);
    let user = s.deposit(100 * UNIT);
    let other = Address::generate(&s.env);

    assert_eq!(
        s.vault.try_withdraw(&other, &UNIT, &other, &user),
        Err(Ok(Error::NotAuthorized))
    );
    assert_eq!(
        s.vault.try_redeem(&other, &UNIT, &other, &user),
        Err(Ok(Error::NotAuthorized))
    );
    assert_eq!(
        s.vault.try_withdraw(&user, &(101 * UNIT), &user, &user),
        Err(Ok(Error::InsufficientShares))
    );
    assert_eq!(
        s.vault.try_redeem(&user, &(101 * UNIT), &user, &user),
        Err(Ok(Error::InsufficientShares))
    );
}

#[test]
fn test_redeemable_assets_sum_to_total() {
    let s = setup(MarketKind::Qi);
    let a = s.deposit(100 * UNIT);
    s.lending.accrue(&s.env, 20 * UNIT);
    s.vault.compound(&Address::generate(&s.env));

    let b = s.deposit(37 * UNIT + 3);
    let c = s.deposit(250 * UNIT + 1);
    s.vault.withdraw(&a, &(13 * UNIT), &a, &a);
    s.vault.redeem(&c, &(11 * UNIT + 7), &c, &c);

    let holders = [a, b, c];
    let total = s.vault.total_assets();
    let sum: i128 = holders.iter().map(|h| s.vault.underlying_stake(h)).sum();
    let shares: i128 = holders.iter().map(|h| s.vault.balance_of(h)).sum();

    assert_eq!(shares, s.vault.total_shares());
    assert!(sum <= total);
    assert!(total - sum <= holders.len() as i128);
}

#[test]
fn test_withdraw_pays_float_first() {
    let s = setup(MarketKind::Qi);
    let user = s.deposit(100 * UNIT);
    // a donation sits in the vault as float
    mint(&s.env, &s.asset, &s.vault.address, 10 * UNIT);
    assert_eq!(s.vault.total_assets(), 110 * UNIT);

    s.vault.withdraw(&user, &(10 * UNIT), &user, &user);
    assert_eq!(s.lending.strategy.total_supplied(), 100 * UNIT);
    assert_eq!(balance(&s.env, &s.asset, &s.vault.address), 0);

    s.vault.withdraw(&user, &(30 * UNIT), &user, &user);
    assert_eq!(s.lending.strategy.total_supplied(), 70 * UNIT);
}

// ============================================================================
// COMPOUND
// ============================================================================

#[test]
fn test_compound_takes_fee_and_reinvests() {
    let s = setup(MarketKind::Qi);
    s.deposit(100 * UNIT);
    s.lending.accrue(&s.env, 20 * UNIT);

    let harvested = s.vault.compound(&Address::generate(&s.env));

    assert_eq!(harvested, 20 * UNIT);
    assert_eq!(balance(&s.env, &s.asset, &s.fee_recipient), UNIT);
    assert_eq!(s.lending.strategy.total_supplied(), 119 * UNIT);
    assert_eq!(s.vault.total_assets(), 119 * UNIT);
    assert_eq!(s.vault.total_shares(), 100 * UNIT);
}

#[test]
fn test_compound_with_pool_backend() {
    let s = setup(MarketKind::Pool);
    s.deposit(100 * UNIT);
    s.lending.accrue(&s.env, 20 * UNIT);

    s.vault.compound(&Address::generate(&s.env));
    assert_eq!(balance(&s.env, &s.asset, &s.fee_recipient), UNIT);
    assert_eq!(s.lending.strategy.total_supplied(), 119 * UNIT);
}

#[test]
fn test_compound_twice_moves_nothing() {
    let s = setup(MarketKind::Qi);
    s.deposit(100 * UNIT);
    s.lending.accrue(&s.env, 20 * UNIT);
    let keeper = Address::generate(&s.env);
    s.vault.compound(&keeper);

    assert_eq!(s.vault.compound(&keeper), 0);
    assert_eq!(balance(&s.env, &s.asset, &s.fee_recipient), UNIT);
    assert_eq!(s.vault.total_assets(), 119 * UNIT);
}

#[test]
fn test_keeper_tip_paid_from_yield() {
    let s = setup(MarketKind::Qi);
    let keeper = Address::generate(&s.env);
    let registry = s.registry_with(&keeper);
    s.vault.set_keeper_addresses(&Some(registry.address.clone()), &None);
    s.vault.set_keeper_tip(&UNIT);
    s.deposit(100 * UNIT);
    s.lending.accrue(&s.env, 20 * UNIT);

    s.vault.compound(&keeper);

    // fee is 5% of 20 - 1
    assert_eq!(balance(&s.env, &s.asset, &keeper), UNIT);
    assert_eq!(balance(&s.env, &s.asset, &s.fee_recipient), 9_500_000);
    assert_eq!(s.vault.total_assets(), 100 * UNIT + 19 * UNIT - 9_500_000);
}

#[test]
fn test_keeper_tip_capped_by_yield() {
    let s = setup(MarketKind::Qi);
    let keeper = Address::generate(&s.env);
    let registry = s.registry_with(&keeper);
    s.vault.set_keeper_addresses(&Some(registry.address.clone()), &None);
    s.vault.set_keeper_tip(&(5 * UNIT));
    s.vault.set_performance_fee_bps(&0);
    s.deposit(100 * UNIT);
    s.lending.accrue(&s.env, 2 * UNIT);

    s.vault.compound(&keeper);
    assert_eq!(balance(&s.env, &s.asset, &keeper), 2 * UNIT);
    assert_eq!(s.vault.total_assets(), 100 * UNIT);
}

#[test]
fn test_keeper_tip_needs_registry() {
    let s = setup(MarketKind::Qi);
    s.vault.set_keeper_tip(&UNIT);
    s.deposit(100 * UNIT);
    s.lending.accrue(&s.env, 20 * UNIT);
    let caller = Address::generate(&s.env);

    s.vault.compound(&caller);

    assert_eq!(balance(&s.env, &s.asset, &caller), 0);
    assert_eq!(balance(&s.env, &s.asset, &s.fee_recipient), UNIT);
    assert_eq!(s.vault.total_assets(), 119 * UNIT);
}

#[test]
fn test_compound_with_keeper_signature_only() {
    let s = setup(MarketKind::Qi);
    s.deposit(100 * UNIT);
    s.lending.accrue(&s.env, 20 * UNIT);
    let keeper = Address::generate(&s.env);

    // only the keeper signs; the strategy's swap runs on its own pre-authorization
    let harvested = s
        .vault
        .mock_auths(&[MockAuth {
            address: &keeper,
            invoke: &MockAuthInvoke {
                contract: &s.vault.address,
                fn_name: "compound",
                args: (&keeper,).into_val(&s.env),
                sub_invokes: &[],
            },
        }])
        .compound(&keeper);

    assert_eq!(harvested, 20 * UNIT);
    assert_eq!(balance(&s.env, &s.asset, &s.fee_recipient), UNIT);
    assert_eq!(s.lending.strategy.total_supplied(), 119 * UNIT);
}

#[test]
fn test_tip_vault_pays_registered_keeper() {
    let s = setup(MarketKind::Qi);
    let keeper = Address::generate(&s.env);
    let registry = s.registry_with(&keeper);

    let tip_token = create_token(&s.env);
    let tips = TipVaultClient::new(&s.env, &s.env.register(TipVault, ()));
    tips.initialize(&s.owner, &tip_token, &UNIT, &3_600, &registry.address);
    let treasury = Address::generate(&s.env);
    mint(&s.env, &tip_token, &treasury, 3 * UNIT);
    tips.fund_tips(&treasury, &(3 * UNIT));

    s.vault
        .set_keeper_addresses(&Some(registry.address.clone()), &Some(tips.address.clone()));
    s.deposit(100 * UNIT);
    s.lending.accrue(&s.env, 20 * UNIT);
    s.vault.compound(&keeper);

    assert_eq!(balance(&s.env, &tip_token, &keeper), UNIT);
    assert_eq!(balance(&s.env, &s.asset, &keeper), 0);
    // the tip did not come out of yield
    assert_eq!(balance(&s.env, &s.asset, &s.fee_recipient), UNIT);
    assert_eq!(s.vault.total_assets(), 119 * UNIT);

    // inside the cooldown the tip fails but compounding goes ahead
    s.lending.accrue(&s.env, 20 * UNIT);
    assert_eq!(s.vault.compound(&keeper), 20 * UNIT);
    assert_eq!(balance(&s.env, &tip_token, &keeper), UNIT);
    assert_eq!(balance(&s.env, &s.asset, &s.fee_recipient), 2 * UNIT);

    s.env.ledger().set_timestamp(s.env.ledger().timestamp() + 3_600);
    s.lending.accrue(&s.env, 20 * UNIT);
    s.vault.compound(&keeper);
    assert_eq!(balance(&s.env, &tip_token, &keeper), 2 * UNIT);
}

#[test]
fn test_compound_gated_by_registry() {
    let s = setup(MarketKind::Qi);
    let keeper = Address::generate(&s.env);
    let registry = s.registry_with(&keeper);
    s.vault.set_keeper_addresses(&Some(registry.address.clone()), &None);
    s.deposit(100 * UNIT);
    s.lending.accrue(&s.env, 20 * UNIT);

    let stranger = Address::generate(&s.env);
    assert_eq!(s.vault.try_compound(&stranger), Err(Ok(Error::NotAuthorized)));

    registry.ban_keeper(&keeper);
    assert_eq!(s.vault.try_compound(&keeper), Err(Ok(Error::NotAuthorized)));

    s.vault.set_keeper_addresses(&None, &None);
    assert_eq!(s.vault.compound(&stranger), 20 * UNIT);
}

#[test]
fn test_compound_fails_below_slippage_floor() {
    let s = setup(MarketKind::Qi);
    s.deposit(100 * UNIT);
    s.lending.accrue(&s.env, 20 * UNIT);
    let venue = SwapRouterClient::new(&s.env, &s.router).venues().get(0).unwrap();
    MockSwapVenueClient::new(&s.env, &venue).set_fill_bps(&9_900);

    assert_eq!(
        s.vault.try_compound(&Address::generate(&s.env)),
        Err(Ok(Error::InsufficientOutput))
    );
    assert_eq!(s.vault.total_assets(), 100 * UNIT);
}

#[test]
fn test_auto_compound_before_deposit() {
    let s = setup(MarketKind::Qi);
    s.vault.set_auto_compound_enabled(&true);
    s.deposit(100 * UNIT);
    s.lending.accrue(&s.env, 20 * UNIT);

    let late = s.user_with(119 * UNIT);
    let shares = s.vault.deposit(&late, &(119 * UNIT), &late);

    // yield was realized at 119 before pricing the new shares
    assert_eq!(shares, 100 * UNIT);
    assert_eq!(balance(&s.env, &s.asset, &s.fee_recipient), UNIT);
    assert_eq!(s.vault.total_assets(), 238 * UNIT);
}

#[test]
fn test_fee_exempt_skips_auto_compound() {
    let s = setup(MarketKind::Qi);
    s.vault.set_auto_compound_enabled(&true);
    s.deposit(100 * UNIT);
    s.lending.accrue(&s.env, 20 * UNIT);

    let exempt = s.user_with(100 * UNIT);
    s.vault.set_fee_exempt(&exempt, &true);
    assert!(s.vault.is_fee_exempt(&exempt));

    let shares = s.vault.deposit(&exempt, &(100 * UNIT), &exempt);
    assert_eq!(shares, 100 * UNIT);
    assert_eq!(balance(&s.env, &s.asset, &s.fee_recipient), 0);
    assert_eq!(s.lending.strategy.total_assets(), 220 * UNIT);
    assert_eq!(s.vault.total_assets(), 200 * UNIT);
}

#[test]
fn test_auto_compound_before_withdraw() {
    let s = setup(MarketKind::Qi);
    let user = s.deposit(100 * UNIT);
    s.vault.set_auto_compound_enabled(&true);
    s.lending.accrue(&s.env, 20 * UNIT);

    let assets = s.vault.redeem(&user, &(100 * UNIT), &user, &user);
    assert_eq!(assets, 119 * UNIT);
    assert_eq!(s.vault.total_assets(), 0);
}

// ============================================================================
// OTHER STRATEGY KINDS
// ============================================================================

#[test]
fn test_leverage_through_vault() {
    let s = setup(MarketKind::Pool);
    s.deposit(100 * UNIT);

    let executor = MockFlashLoanExecutorClient::new(&s.env, &s.env.register(MockFlashLoanExecutor, ()));
    executor.initialize(&9);
    mint(&s.env, &s.asset, &executor.address, 100 * UNIT);
    s.lending.strategy.set_flash_executor(&executor.address);

    assert_eq!(s.vault.leverage(&(50 * UNIT)), 450_000);
    assert_eq!(s.lending.strategy.total_supplied(), 150 * UNIT);
    assert_eq!(s.lending.strategy.total_debt(), 50 * UNIT + 450_000);
    assert_eq!(s.vault.total_assets(), 100 * UNIT - 450_000);
}

#[test]
fn test_leverage_with_owner_signature_only() {
    let s = setup(MarketKind::Pool);
    s.deposit(100 * UNIT);

    let executor = MockFlashLoanExecutorClient::new(&s.env, &s.env.register(MockFlashLoanExecutor, ()));
    executor.initialize(&9);
    mint(&s.env, &s.asset, &executor.address, 100 * UNIT);
    s.lending.strategy.set_flash_executor(&executor.address);

    let flash_amount = 50 * UNIT;
    let premium = s
        .vault
        .mock_auths(&[MockAuth {
            address: &s.owner,
            invoke: &MockAuthInvoke {
                contract: &s.vault.address,
                fn_name: "leverage",
                args: (flash_amount,).into_val(&s.env),
                sub_invokes: &[],
            },
        }])
        .leverage(&flash_amount);

    assert_eq!(premium, 450_000);
    assert_eq!(s.lending.strategy.total_debt(), 50 * UNIT + 450_000);
}

#[test]
fn test_leverage_failure_leaves_position_untouched() {
    let s = setup(MarketKind::Pool);
    s.deposit(100 * UNIT);

    let executor = MockFlashLoanExecutorClient::new(&s.env, &s.env.register(MockFlashLoanExecutor, ()));
    executor.initialize(&9);
    executor.set_should_fail(&true);
    mint(&s.env, &s.asset, &executor.address, 100 * UNIT);
    s.lending.strategy.set_flash_executor(&executor.address);

    assert_eq!(
        s.vault.try_leverage(&(50 * UNIT)),
        Err(Ok(Error::FlashLoanFailed))
    );
    assert_eq!(s.lending.strategy.total_supplied(), 100 * UNIT);
    assert_eq!(s.lending.strategy.total_debt(), 0);
}

#[test]
fn test_leverage_unsupported_on_qi() {
    let s = setup(MarketKind::Qi);
    s.deposit(100 * UNIT);
    assert_eq!(
        s.vault.try_leverage(&(50 * UNIT)),
        Err(Ok(Error::LeverageUnsupported))
    );
}

#[test]
fn test_dex_staking_compound() {
    let s = setup(MarketKind::Qi);
    let pool_id = s.env.register(MockDexPool, ());
    let pool = MockDexPoolClient::new(&s.env, &pool_id);
    pool.initialize(&s.asset, &s.reward);
    mint(&s.env, &s.reward, &pool_id, 1_000 * UNIT);

    let staking = DexStakingStrategyClient::new(&s.env, &s.env.register(DexStakingStrategy, ()));
    staking.initialize(&s.owner, &s.asset, &s.reward, &s.router, &pool_id);
    staking.set_vault(&s.vault.address);
    s.vault.set_strategy(&staking.address);

    s.deposit(100 * UNIT);
    pool.set_pending(&staking.address, &(15 * UNIT));
    s.vault.compound(&Address::generate(&s.env));

    // 100 + 15 * 0.95
    assert_eq!(s.vault.total_assets(), 100 * UNIT + 14 * UNIT + 2_500_000);
    assert_eq!(pool.staked(&staking.address), 100 * UNIT + 14 * UNIT + 2_500_000);
}

// ============================================================================
// REBALANCE
// ============================================================================

#[test]
fn test_rebalance_keeps_assets_and_shares() {
    let s = setup(MarketKind::Qi);
    let next = s.lending_strategy(MarketKind::Pool);
    let rebalancer = RebalancerClient::new(&s.env, &s.env.register(Rebalancer, ()));
    s.deposit(100 * UNIT);
    s.deposit(40 * UNIT);
    let from = s.lending.strategy.address.clone();

    let received = s.vault.rebalance(
        &s.owner,
        &rebalancer.address,
        &from,
        &next.strategy.address,
        &(140 * UNIT),
        &50,
        &50,
    );

    assert_eq!(received, 140 * UNIT);
    assert_eq!(s.lending.strategy.total_supplied(), 0);
    assert_eq!(next.strategy.total_supplied(), 140 * UNIT);
    assert_eq!(s.vault.total_assets(), 140 * UNIT);
    assert_eq!(s.vault.total_shares(), 140 * UNIT);
    assert_eq!(s.vault.get_strategy(), Some(next.strategy.address.clone()));
}

#[test]
fn test_rebalance_with_owner_signature_only() {
    let s = setup(MarketKind::Qi);
    let next = s.lending_strategy(MarketKind::Pool);
    let rebalancer = RebalancerClient::new(&s.env, &s.env.register(Rebalancer, ()));
    s.deposit(100 * UNIT);
    let from = s.lending.strategy.address.clone();
    let amount = 100 * UNIT;

    let received = s
        .vault
        .mock_auths(&[MockAuth {
            address: &s.owner,
            invoke: &MockAuthInvoke {
                contract: &s.vault.address,
                fn_name: "rebalance",
                args: (
                    &s.owner,
                    &rebalancer.address,
                    &from,
                    &next.strategy.address,
                    amount,
                    50u32,
                    50u32,
                )
                    .into_val(&s.env),
                sub_invokes: &[],
            },
        }])
        .rebalance(
            &s.owner,
            &rebalancer.address,
            &from,
            &next.strategy.address,
            &amount,
            &50,
            &50,
        );

    assert_eq!(received, amount);
    assert_eq!(next.strategy.total_supplied(), amount);
    assert_eq!(s.vault.get_strategy(), Some(next.strategy.address.clone()));
}

#[test]
fn test_rebalance_must_empty_source() {
    let s = setup(MarketKind::Qi);
    let next = s.lending_strategy(MarketKind::Qi);
    let rebalancer = RebalancerClient::new(&s.env, &s.env.register(Rebalancer, ()));
    s.deposit(100 * UNIT);

    assert_eq!(
        s.vault.try_rebalance(
            &s.owner,
            &rebalancer.address,
            &s.lending.strategy.address,
            &next.strategy.address,
            &(40 * UNIT),
            &50,
            &50,
        ),
        Err(Ok(Error::StrategyNotEmpty))
    );
    assert_eq!(s.lending.strategy.total_supplied(), 100 * UNIT);
    assert_eq!(
        s.vault.get_strategy(),
        Some(s.lending.strategy.address.clone())
    );
}

#[test]
fn test_rebalance_validates_parties() {
    let s = setup(MarketKind::Qi);
    let next = s.lending_strategy(MarketKind::Qi);
    let rebalancer = RebalancerClient::new(&s.env, &s.env.register(Rebalancer, ()));
    s.deposit(100 * UNIT);
    let active = s.lending.strategy.address.clone();

    let outsider = Address::generate(&s.env);
    assert_eq!(
        s.vault.try_rebalance(
            &outsider,
            &rebalancer.address,
            &active,
            &next.strategy.address,
            &(100 * UNIT),
            &50,
            &50,
        ),
        Err(Ok(Error::NotAuthorized))
    );

    // `from` must be the active strategy
    assert_eq!(
        s.vault.try_rebalance(
            &s.owner,
            &rebalancer.address,
            &next.strategy.address,
            &active,
            &(100 * UNIT),
            &50,
            &50,
        ),
        Err(Ok(Error::InvalidStrategy))
    );

    // destination linked elsewhere
    let foreign = LendingStrategyClient::new(&s.env, &s.env.register(LendingStrategy, ()));
    foreign.initialize(
        &s.owner,
        &s.asset,
        &s.reward,
        &s.router,
        &MarketKind::Qi,
        &next.market,
        &next.controller,
    );
    foreign.set_vault(&Address::generate(&s.env));
    assert_eq!(
        s.vault.try_rebalance(
            &s.owner,
            &rebalancer.address,
            &active,
            &foreign.address,
            &(100 * UNIT),
            &50,
            &50,
        ),
        Err(Ok(Error::InvalidStrategy))
    );
}

// ============================================================================
// ADMINISTRATION
// ============================================================================

#[test]
fn test_pause_blocks_user_flows() {
    let s = setup(MarketKind::Qi);
    let user = s.deposit(10 * UNIT);
    s.vault.pause();
    assert!(s.vault.is_paused());

    let late = s.user_with(UNIT);
    assert_eq!(s.vault.try_deposit(&late, &UNIT, &late), Err(Ok(Error::Paused)));
    assert_eq!(
        s.vault.try_withdraw(&user, &UNIT, &user, &user),
        Err(Ok(Error::Paused))
    );
    assert_eq!(s.vault.try_compound(&user), Err(Ok(Error::Paused)));
    assert_eq!(s.vault.underlying_stake(&user), 10 * UNIT);

    s.vault.unpause();
    assert_eq!(s.vault.try_unpause(), Err(Ok(Error::NotAllowed)));
    s.vault.deposit(&late, &UNIT, &late);
}

#[test]
fn test_tvl_cap() {
    let s = setup(MarketKind::Qi);
    s.vault.set_tvl_cap(&(150 * UNIT));
    s.deposit(100 * UNIT);

    let user = s.user_with(60 * UNIT);
    assert_eq!(
        s.vault.try_deposit(&user, &(60 * UNIT), &user),
        Err(Ok(Error::ExceedsTvlCap))
    );
    s.vault.deposit(&user, &(50 * UNIT), &user);

    s.vault.set_tvl_cap(&0);
    s.vault.deposit(&user, &(10 * UNIT), &user);
    assert_eq!(s.vault.try_set_tvl_cap(&-1), Err(Ok(Error::NegativeAmount)));
}

#[test]
fn test_fee_configuration_bounds() {
    let s = setup(MarketKind::Qi);
    assert_eq!(
        s.vault.try_set_performance_fee_bps(&5_001),
        Err(Ok(Error::BpsTooHigh))
    );
    s.vault.set_performance_fee_bps(&5_000);
    assert_eq!(s.vault.get_performance_fee_bps(), 5_000);

    let recipient = Address::generate(&s.env);
    s.vault.set_fee_recipient(&recipient);
    assert_eq!(s.vault.get_fee_recipient(), recipient);

    assert_eq!(s.vault.try_set_keeper_tip(&-1), Err(Ok(Error::NegativeAmount)));
}

#[test]
fn test_emergency_withdraw_preserves_share_value() {
    let s = setup(MarketKind::Qi);
    let user = s.deposit(100 * UNIT);

    s.vault.emergency_withdraw();

    assert_eq!(s.lending.strategy.total_supplied(), 0);
    assert_eq!(balance(&s.env, &s.asset, &s.vault.address), 100 * UNIT);
    assert_eq!(s.vault.total_assets(), 100 * UNIT);
    assert_eq!(s.vault.redeem(&user, &(100 * UNIT), &user, &user), 100 * UNIT);
}

#[test]
#[should_panic]
fn test_setters_require_owner_auth() {
    let env = Env::default();
    let vault = YieldVaultClient::new(&env, &env.register(YieldVault, ()));
    vault.initialize(
        &Address::generate(&env),
        &create_token(&env),
        &Address::generate(&env),
    );
    vault.set_performance_fee_bps(&100);
}
