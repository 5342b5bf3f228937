use soroban_sdk::contracterror;

/// Error codes shared by every contract in the workspace.
///
/// A single enum keeps codes stable across contract boundaries: an error raised
/// by a strategy, the router or a keeper contract surfaces to the top-level
/// caller with the same numeric value.
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    // Authorization
    NotAuthorized = 1,
    NotAllowed = 2,

    // Lifecycle
    AlreadyInitialized = 3,
    NotInitialized = 4,
    NotLinked = 5,
    AlreadyLinked = 6,

    // Validation
    ZeroAmount = 10,
    NegativeAmount = 11,
    BpsTooLow = 12,
    BpsTooHigh = 13,
    InvalidPathStart = 14,
    InvalidPathEnd = 15,
    InvalidAddress = 16,
    InvalidStrategy = 17,

    // Accounting
    InsufficientShares = 20,
    ZeroShares = 21,
    StrategyNotEmpty = 22,
    LedgerMismatch = 23,
    InsufficientLiquidity = 24,
    ExceedsTvlCap = 25,
    Paused = 26,
    MathOverflow = 27,

    // Economic guards
    InsufficientOutput = 30,
    PriceImpactTooHigh = 31,
    NoRoute = 32,
    SlippageExceeded = 33,
    SwapFailed = 34,

    // Atomic sequences
    FlashLoanFailed = 40,
    FlashLoanNotRepaid = 41,
    LeverageUnsupported = 42,

    // Keeper incentives
    CooldownActive = 50,
    InsufficientTipBalance = 51,
    NothingToClaim = 52,
    KeeperBanned = 53,

    Reentrant = 60,
}
