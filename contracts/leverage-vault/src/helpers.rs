use soroban_sdk::InvokeError;

use crate::constants::BPS;
use crate::error::Error;

/// Flattens a `try_` strategy call. Contract errors keep their code; host
/// failures and undecodable results become `StrategyCallFailed`.
pub fn strategy_result<T, C>(
    res: Result<Result<T, C>, Result<Error, InvokeError>>,
) -> Result<T, Error> {
    match res {
        Ok(Ok(val)) => Ok(val),
        Err(Ok(err)) => Err(err),
        Ok(Err(_)) | Err(Err(_)) => Err(Error::StrategyCallFailed),
    }
}

pub fn to_i128(amount: u128) -> Result<i128, Error> {
    if amount > i128::MAX as u128 {
        return Err(Error::ArithmeticOverflow);
    }
    Ok(amount as i128)
}

pub fn mul_div(a: u128, b: u128, denom: u128) -> Result<u128, Error> {
    if denom == 0 {
        return Err(Error::ArithmeticOverflow);
    }
    a.checked_mul(b)
        .map(|v| v / denom)
        .ok_or(Error::ArithmeticOverflow)
}

/// Fee on `amount`, rounded up and never more than `amount`.
pub fn fee_ceil(amount: u128, fee_bps: u32) -> Result<u128, Error> {
    let product = amount
        .checked_mul(fee_bps as u128)
        .ok_or(Error::ArithmeticOverflow)?;
    let fee = product / BPS + u128::from(product % BPS != 0);
    Ok(fee.min(amount))
}
