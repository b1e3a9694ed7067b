#![no_std]

mod constants;
mod contract;
mod error;
mod events;
mod helpers;
mod storage;

pub use constants::*;
pub use contract::{LeverageVault, LeverageVaultClient};
pub use error::Error;
pub use storage::VaultConfig;

#[cfg(test)]
mod test;
