pub const WAD: u128 = 1_000_000_000_000_000_000u128; // 1e18
pub const BPS: u128 = 10_000u128;
pub const SECONDS_PER_YEAR: u128 = 365 * 24 * 60 * 60;

// Leverage defaults (WAD ratios)
pub const DEFAULT_TARGET_LTV: u128 = 730_000_000_000_000_000u128; // 0.73
pub const DEFAULT_ALLOWED_DRIFT: u128 = 10_000_000_000_000_000u128; // 0.01
pub const DEFAULT_SAFETY_MARGIN: u128 = 20_000_000_000_000_000u128; // 0.02
pub const MAX_ALLOWED_DRIFT: u128 = 100_000_000_000_000_000u128; // 0.10
pub const DEFAULT_MIN_LEVERAGE_AMOUNT: u128 = 1_000u128;
pub const MAX_LEVER_ITERATIONS: u32 = 20;
pub const MAX_DELEVER_ITERATIONS: u32 = 20;

// Slippage (bps)
pub const DEFAULT_WITHDRAW_SLIPPAGE_BPS: u32 = 50;
pub const PANIC_SLIPPAGE_CEILING_BPS: u32 = 1_000;

// Performance fee split (bps)
pub const DEFAULT_TOTAL_FEE_BPS: u32 = 450;
pub const DEFAULT_CALL_FEE_BPS: u32 = 1_000;
pub const DEFAULT_TREASURY_FEE_BPS: u32 = 9_000;
pub const DEFAULT_STRATEGIST_FEE_BPS: u32 = 2_500;
pub const MAX_TOTAL_FEE_BPS: u32 = 1_000;
pub const MAX_STRATEGIST_FEE_BPS: u32 = 5_000;

// Harvest log
pub const HARVEST_LOG_CAPACITY: u32 = 16;
pub const DEFAULT_HARVEST_LOG_CADENCE: u64 = 3_600;

pub const TTL_THRESHOLD: u32 = 100_000;
pub const TTL_EXTEND_TO: u32 = 200_000;
