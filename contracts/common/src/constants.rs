//! Deployment defaults and fixed-point scales.

/// One hundred percent in basis points.
pub const BPS_DENOMINATOR: i128 = 10_000;

/// Harvest slippage tolerance used until the owner sets one (0.5%).
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50;

/// Share of harvested yield sent to the fee recipient (5%).
pub const DEFAULT_PERFORMANCE_FEE_BPS: u32 = 500;

/// Upper bound accepted by `set_performance_fee_bps`.
pub const MAX_PERFORMANCE_FEE_BPS: u32 = 5_000;

/// Fixed-point scale for coverage ratios and venue rates (1.0 == 1e18).
pub const RATIO_SCALE: i128 = 1_000_000_000_000_000_000;

// TTL constants: extend instance storage proactively to prevent archival
pub const TTL_THRESHOLD: u32 = 17_280; // ~1 day at 5s/ledger
pub const TTL_EXTEND_TO: u32 = 518_400; // ~30 days

pub const PERSISTENT_TTL_THRESHOLD: u32 = 120_960; // ~7 days
pub const PERSISTENT_TTL_EXTEND_TO: u32 = 1_036_800; // ~60 days
