pub const WAD: u128 = 1_000_000_000_000_000_000u128; // 1e18
pub const BPS: u128 = 10_000u128;

// Deposit and withdrawal fees are each capped at 10%.
pub const MAX_FEE_BPS: u32 = 1_000;

pub const TTL_THRESHOLD: u32 = 100_000;
pub const TTL_EXTEND_TO: u32 = 200_000;
