#![no_std]

mod constants;
mod contract;
mod error;
mod events;
mod harvest_log;
mod helpers;
mod leverage;
mod math;
mod storage;

pub use constants::*;
pub use contract::{LeverageStrategy, LeverageStrategyClient};
pub use error::Error;
pub use storage::{
    FeeConfig, HarvestEntry, HarvestLogState, HarvestReport, LeverageConfig, PositionSnapshot,
    StrategyStatus,
};
