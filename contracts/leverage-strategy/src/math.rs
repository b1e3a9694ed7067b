use crate::constants::*;
use crate::error::Error;

pub fn mul_div(a: u128, b: u128, denom: u128) -> Result<u128, Error> {
    if denom == 0 {
        return Err(Error::ArithmeticOverflow);
    }
    a.checked_mul(b)
        .map(|v| v / denom)
        .ok_or(Error::ArithmeticOverflow)
}

pub fn mul_div_ceil(a: u128, b: u128, denom: u128) -> Result<u128, Error> {
    if denom == 0 {
        return Err(Error::ArithmeticOverflow);
    }
    let product = a.checked_mul(b).ok_or(Error::ArithmeticOverflow)?;
    let q = product / denom;
    if product % denom == 0 {
        Ok(q)
    } else {
        q.checked_add(1).ok_or(Error::ArithmeticOverflow)
    }
}

pub fn bps_floor(amount: u128, bps: u32) -> Result<u128, Error> {
    mul_div(amount, bps as u128, BPS)
}

pub fn bps_ceil(amount: u128, bps: u32) -> Result<u128, Error> {
    mul_div_ceil(amount, bps as u128, BPS)
}

/// Borrowed over supplied, WAD scaled. An empty position has zero LTV.
pub fn ltv(supplied: u128, borrowed: u128) -> Result<u128, Error> {
    if supplied == 0 {
        return Ok(0);
    }
    mul_div(borrowed, WAD, supplied)
}

/// Debt that puts `equity` at `target_ltv`: b / (e + b) = t  =>  b = t * e / (1 - t).
pub fn target_debt(equity: u128, target_ltv: u128) -> Result<u128, Error> {
    if target_ltv == 0 {
        return Ok(0);
    }
    if target_ltv >= WAD {
        return Err(Error::LtvOutOfBounds);
    }
    mul_div(equity, target_ltv, WAD - target_ltv)
}

/// Smallest supply that keeps `borrowed` under the liquidation threshold.
pub fn min_collateral(borrowed: u128, threshold: u128) -> Result<u128, Error> {
    if borrowed == 0 {
        return Ok(0);
    }
    mul_div_ceil(borrowed, WAD, threshold)
}

/// `received >= requested * (1 - tolerance)`.
pub fn within_tolerance(received: u128, requested: u128, tolerance_bps: u32) -> Result<bool, Error> {
    if received >= requested {
        return Ok(true);
    }
    let floor_bps = BPS.saturating_sub(tolerance_bps as u128);
    let lhs = received.checked_mul(BPS).ok_or(Error::ArithmeticOverflow)?;
    let rhs = requested
        .checked_mul(floor_bps)
        .ok_or(Error::ArithmeticOverflow)?;
    Ok(lhs >= rhs)
}

/// Seconds until accrued interest pushes the position over the liquidation
/// threshold, assuming current per-second rates (WAD) hold. `u64::MAX` means
/// never: no debt, or collateral capacity grows at least as fast as the debt.
pub fn seconds_until_liquidation(
    supplied: u128,
    borrowed: u128,
    threshold: u128,
    supply_rate: u128,
    borrow_rate: u128,
) -> Result<u64, Error> {
    if borrowed == 0 {
        return Ok(u64::MAX);
    }
    let max_debt = mul_div(supplied, threshold, WAD)?;
    if borrowed >= max_debt {
        return Ok(0);
    }
    let debt_growth = borrowed
        .checked_mul(borrow_rate)
        .ok_or(Error::ArithmeticOverflow)?;
    let capacity_growth = max_debt
        .checked_mul(supply_rate)
        .ok_or(Error::ArithmeticOverflow)?;
    if debt_growth <= capacity_growth {
        return Ok(u64::MAX);
    }
    let seconds = mul_div(max_debt - borrowed, WAD, debt_growth - capacity_growth)?;
    Ok(if seconds > u64::MAX as u128 {
        u64::MAX
    } else {
        seconds as u64
    })
}
