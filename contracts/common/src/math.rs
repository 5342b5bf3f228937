use crate::constants::BPS_DENOMINATOR;
use crate::error::Error;

/// `a * b / c`, rounded toward zero.
pub fn mul_div(a: i128, b: i128, c: i128) -> Result<i128, Error> {
    if c == 0 {
        return Err(Error::MathOverflow);
    }
    a.checked_mul(b)
        .and_then(|p| p.checked_div(c))
        .ok_or(Error::MathOverflow)
}

/// `a * b / c`, rounded up. Operands are expected to be non-negative.
pub fn mul_div_ceil(a: i128, b: i128, c: i128) -> Result<i128, Error> {
    if c == 0 {
        return Err(Error::MathOverflow);
    }
    let product = a.checked_mul(b).ok_or(Error::MathOverflow)?;
    let quotient = product / c;
    if product % c == 0 {
        Ok(quotient)
    } else {
        quotient.checked_add(1).ok_or(Error::MathOverflow)
    }
}

/// Portion of `amount` expressed by `bps`.
pub fn bps_of(amount: i128, bps: u32) -> Result<i128, Error> {
    mul_div(amount, bps as i128, BPS_DENOMINATOR)
}

/// Lowest acceptable output for `quoted` under a `slippage_bps` tolerance.
pub fn min_after_slippage(quoted: i128, slippage_bps: u32) -> Result<i128, Error> {
    let keep = BPS_DENOMINATOR
        .checked_sub(slippage_bps as i128)
        .ok_or(Error::BpsTooHigh)?;
    mul_div(quoted, keep, BPS_DENOMINATOR)
}

/// Slippage tolerances live in `(0, 10000]`.
pub fn validate_slippage_bps(bps: u32) -> Result<(), Error> {
    if bps == 0 {
        return Err(Error::BpsTooLow);
    }
    if bps as i128 > BPS_DENOMINATOR {
        return Err(Error::BpsTooHigh);
    }
    Ok(())
}

pub fn require_positive(amount: i128) -> Result<(), Error> {
    if amount < 0 {
        return Err(Error::NegativeAmount);
    }
    if amount == 0 {
        return Err(Error::ZeroAmount);
    }
    Ok(())
}
