//! Uniswap V2 constant-product swap math on integer amounts.
//!
//! Mirrors `UniswapV2Library.getAmountOut` / `getAmountIn`, with the fee in
//! basis points (30 = 0.3%). Every step is checked so oversized inputs yield
//! `None` instead of wrapping.

use alloy::primitives::U256;

pub const FEE_DENOMINATOR: u64 = 10_000;

/// Output received for `amount_in`, after fee.
pub fn get_amount_out(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
    fee_bps: u32,
) -> Option<U256> {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return None;
    }
    let fee_multiplier = U256::from(FEE_DENOMINATOR.checked_sub(fee_bps as u64)?);

    let amount_in_with_fee = amount_in.checked_mul(fee_multiplier)?;
    let numerator = amount_in_with_fee.checked_mul(reserve_out)?;
    let denominator = reserve_in
        .checked_mul(U256::from(FEE_DENOMINATOR))?
        .checked_add(amount_in_with_fee)?;

    Some(numerator / denominator)
}

/// Input required to receive exactly `amount_out`, after fee. Rounds up.
pub fn get_amount_in(
    amount_out: U256,
    reserve_in: U256,
    reserve_out: U256,
    fee_bps: u32,
) -> Option<U256> {
    if amount_out.is_zero() || reserve_in.is_zero() || amount_out >= reserve_out {
        return None;
    }
    let fee_multiplier = U256::from(FEE_DENOMINATOR.checked_sub(fee_bps as u64)?);
    if fee_multiplier.is_zero() {
        return None;
    }

    let numerator = reserve_in
        .checked_mul(amount_out)?
        .checked_mul(U256::from(FEE_DENOMINATOR))?;
    let denominator = (reserve_out - amount_out).checked_mul(fee_multiplier)?;

    (numerator / denominator).checked_add(U256::from(1))
}
