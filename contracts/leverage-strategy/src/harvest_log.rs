//! Fixed-capacity ring of recent harvests used for APR reporting.
//!
//! Harvests closer together than the cadence fold into the newest entry so a
//! burst of keeper calls cannot flush older history out of the ring.

use soroban_sdk::{Env, Vec};

use crate::constants::*;
use crate::error::Error;
use crate::helpers::bump_harvest_entry_ttl;
use crate::storage::{DataKey, HarvestEntry, HarvestLogState};

pub fn init(env: &Env, now: u64) {
    save_state(
        env,
        &HarvestLogState {
            cursor: 0,
            len: 0,
            cadence: DEFAULT_HARVEST_LOG_CADENCE,
            last_harvest: now,
        },
    );
}

pub fn state(env: &Env) -> Result<HarvestLogState, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::HarvestLog)
        .ok_or(Error::NotInitialized)
}

fn save_state(env: &Env, state: &HarvestLogState) {
    env.storage().persistent().set(&DataKey::HarvestLog, state);
}

fn load_entry(env: &Env, slot: u32) -> Result<HarvestEntry, Error> {
    bump_harvest_entry_ttl(env, slot);
    env.storage()
        .persistent()
        .get(&DataKey::HarvestEntry(slot))
        .ok_or(Error::InsufficientHistory)
}

fn save_entry(env: &Env, slot: u32, entry: &HarvestEntry) {
    env.storage()
        .persistent()
        .set(&DataKey::HarvestEntry(slot), entry);
    bump_harvest_entry_ttl(env, slot);
}

/// Slot of the `age`-th newest entry (0 = newest).
fn slot_from_newest(state: &HarvestLogState, age: u32) -> u32 {
    (state.cursor + HARVEST_LOG_CAPACITY - 1 - age) % HARVEST_LOG_CAPACITY
}

pub fn record(env: &Env, now: u64, yield_wad: u128) -> Result<(), Error> {
    let mut state = state(env)?;
    let elapsed = now.saturating_sub(state.last_harvest);
    state.last_harvest = now;

    if state.len > 0 {
        let slot = slot_from_newest(&state, 0);
        let mut newest = load_entry(env, slot)?;
        if now.saturating_sub(newest.timestamp) < state.cadence {
            newest.yield_wad = newest.yield_wad.saturating_add(yield_wad);
            newest.duration = newest.duration.saturating_add(elapsed);
            save_entry(env, slot, &newest);
            save_state(env, &state);
            return Ok(());
        }
    }

    save_entry(
        env,
        state.cursor,
        &HarvestEntry {
            timestamp: now,
            duration: elapsed,
            yield_wad,
        },
    );
    state.cursor = (state.cursor + 1) % HARVEST_LOG_CAPACITY;
    if state.len < HARVEST_LOG_CAPACITY {
        state.len += 1;
    }
    save_state(env, &state);
    Ok(())
}

pub fn set_cadence(env: &Env, cadence: u64) -> Result<(), Error> {
    let mut state = state(env)?;
    state.cadence = cadence;
    save_state(env, &state);
    Ok(())
}

/// Entries oldest first.
pub fn entries(env: &Env) -> Result<Vec<HarvestEntry>, Error> {
    let state = state(env)?;
    let mut out = Vec::new(env);
    for age in (0..state.len).rev() {
        out.push_back(load_entry(env, slot_from_newest(&state, age))?);
    }
    Ok(out)
}

/// Annualized yield over the newest `n` entries, in bps.
pub fn average_apr(env: &Env, n: u32) -> Result<u128, Error> {
    if n == 0 {
        return Err(Error::InvalidParameter);
    }
    let state = state(env)?;
    if n > state.len {
        return Err(Error::InsufficientHistory);
    }
    let mut total_yield: u128 = 0;
    let mut total_duration: u128 = 0;
    for age in 0..n {
        let entry = load_entry(env, slot_from_newest(&state, age))?;
        total_yield = total_yield
            .checked_add(entry.yield_wad)
            .ok_or(Error::ArithmeticOverflow)?;
        total_duration = total_duration.saturating_add(entry.duration as u128);
    }
    if total_duration == 0 {
        return Ok(0);
    }
    let annualized = total_yield
        .checked_mul(SECONDS_PER_YEAR)
        .and_then(|v| v.checked_mul(BPS))
        .ok_or(Error::ArithmeticOverflow)?;
    let denom = WAD
        .checked_mul(total_duration)
        .ok_or(Error::ArithmeticOverflow)?;
    Ok(annualized / denom)
}
