#![no_std]

//! Stand-ins for the external protocols the strategies and the router talk to.
//!
//! Every mock follows the push model used across the workspace: the caller
//! transfers tokens to the mock first and then invokes it. Reward emitters
//! must be funded (minted to) before pending amounts are set.

pub mod bribes;
pub mod farm;
pub mod flash;
pub mod lending;
pub mod rewards;
pub mod staking;
pub mod strategy;
pub mod venue;

pub use bribes::{MockBribeManager, MockBribeManagerClient};
pub use farm::{MockMasterChef, MockMasterChefClient};
pub use flash::{MockFlashLoanExecutor, MockFlashLoanExecutorClient};
pub use lending::{MockLendingPool, MockLendingPoolClient, MockQiMarket, MockQiMarketClient};
pub use rewards::{
    MockQiController, MockQiControllerClient, MockRewardsController, MockRewardsControllerClient,
};
pub use staking::{MockDexPool, MockDexPoolClient};
pub use strategy::{MockStrategy, MockStrategyClient};
pub use venue::{
    MockStableSwapVenue, MockStableSwapVenueClient, MockSwapVenue, MockSwapVenueClient,
};
