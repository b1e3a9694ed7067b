use soroban_sdk::contracterror;

/// Codes are shared with the vault so strategy failures surface unchanged.
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    InvalidAmount = 3,
    SlippageExceeded = 5,
    LtvOutOfBounds = 6,
    InsufficientHistory = 7,
    InvalidState = 8,
    IterationLimitReached = 9,
    OperationInFlight = 10,
    InvalidParameter = 11,
    ArithmeticOverflow = 12,
}
