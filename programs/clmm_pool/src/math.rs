//! Fixed point math for the pool engine.
//!
//! Everything here works on Q64.64 square-root prices. The module covers
//! the tick <-> sqrt price conversions, the token amount deltas implied
//! by a liquidity amount over a price interval, the next-price formulas
//! used while swapping, and the single-interval swap step that the pool
//! loop drives until an amount or price limit is exhausted.
//!
//! Intermediate products widen to `U256` so that no legitimate input can
//! wrap silently; anything that still cannot be represented surfaces as
//! `ErrorCode::MathOverflow`.

use crate::constants::*;
use crate::errors::ErrorCode;
use anchor_lang::prelude::*;
use primitive_types::U256;

/// Narrows a `U256` back to `u128`, erroring when the value does not fit.
#[inline(always)]
fn u256_to_u128(x: U256) -> Result<u128> {
    if x.bits() > 128 {
        return Err(ErrorCode::MathOverflow.into());
    }
    Ok(x.as_u128())
}

/// Ceiling division on `U256`.
#[inline(always)]
fn div_rounding_up(a: U256, b: U256) -> U256 {
    let (quotient, remainder) = a.div_mod(b);
    if remainder.is_zero() {
        quotient
    } else {
        quotient + U256::one()
    }
}

/// Multiplies two Q64.64 fixed-point numbers, rounding down.
///
/// # Arguments
/// * `a` - The first Q64.64 fixed-point number
/// * `b` - The second Q64.64 fixed-point number
///
/// # Returns
/// * `Result<u128>` - The product as a Q64.64 fixed-point number
#[inline(always)]
pub(crate) fn mul_fixed(a: u128, b: u128) -> Result<u128> {
    let product = U256::from(a) * U256::from(b);
    u256_to_u128(product >> 64)
}

/// Divides two Q64.64 fixed-point numbers, rounding down.
///
/// # Arguments
/// * `a` - The dividend (Q64.64 fixed-point number)
/// * `b` - The divisor (Q64.64 fixed-point number), must be non-zero
///
/// # Returns
/// * `Result<u128>` - The quotient as a Q64.64 fixed-point number
#[inline(always)]
pub(crate) fn div_fixed(a: u128, b: u128) -> Result<u128> {
    if b == 0 {
        return Err(ErrorCode::MathOverflow.into());
    }
    u256_to_u128((U256::from(a) << 64) / U256::from(b))
}

/// Raises sqrt(1.0001) to `exp` by binary exponentiation over the
/// precomputed [`SQRT_PRICE_POWERS`] table.
fn binary_pow(exp: u32) -> Result<u128> {
    let mut result = Q64;
    let mut remaining = exp;
    let mut bit = 0usize;
    while remaining > 0 {
        if remaining & 1 == 1 {
            result = mul_fixed(result, SQRT_PRICE_POWERS[bit])?;
        }
        remaining >>= 1;
        bit += 1;
    }
    Ok(result)
}

/// Converts a tick index to its sqrt price in Q64.64 fixed-point format.
///
/// The price at a tick is 1.0001^tick, so the sqrt price is
/// sqrt(1.0001)^tick. Negative ticks invert the positive-tick result.
///
/// # Arguments
/// * `tick` - The tick index to convert, in [MIN_TICK, MAX_TICK]
///
/// # Returns
/// * `Result<u128>` - The sqrt price in Q64.64 format, or
///   `TickOutOfBounds` when the tick is outside the supported range
pub fn tick_to_sqrt_price_q64(tick: i32) -> Result<u128> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(ErrorCode::TickOutOfBounds.into());
    }

    let sqrt_price_abs_tick = binary_pow(tick.unsigned_abs())?;

    if tick < 0 {
        div_fixed(Q64, sqrt_price_abs_tick)
    } else {
        Ok(sqrt_price_abs_tick)
    }
}

/// Converts a Q64.64 sqrt price to the greatest tick whose sqrt price is
/// less than or equal to it.
///
/// Together with [`tick_to_sqrt_price_q64`] this keeps the pool's tick
/// and price consistent: after any swap,
/// `tick_to_sqrt_price_q64(tick) <= sqrt_price < tick_to_sqrt_price_q64(tick + 1)`.
///
/// # Arguments
/// * `sqrt_price_q64` - The sqrt price in Q64.64 format
///
/// # Returns
/// * `Result<i32>` - The floor tick index, or `InvalidPrice` when the
///   price is outside [MIN_SQRT_PRICE, MAX_SQRT_PRICE]
pub fn sqrt_price_q64_to_tick(sqrt_price_q64: u128) -> Result<i32> {
    if !(MIN_SQRT_PRICE..=MAX_SQRT_PRICE).contains(&sqrt_price_q64) {
        return Err(ErrorCode::InvalidPrice.into());
    }

    // Binary search for the largest tick whose sqrt price does not
    // exceed the input. The Q64.64 mapping is strictly monotone over
    // the supported tick range, so the search is exact.
    let mut low = MIN_TICK;
    let mut high = MAX_TICK;
    let mut ans = MIN_TICK;

    while low <= high {
        let mid = low + (high - low) / 2;
        let mid_sqrt_price = tick_to_sqrt_price_q64(mid)?;

        if mid_sqrt_price <= sqrt_price_q64 {
            ans = mid;
            low = mid + 1;
        } else {
            high = mid - 1;
        }
    }

    Ok(ans)
}

/// Calculates the amount of token 0 covered by `liquidity` between two
/// sqrt prices.
///
/// Token 0 amounts follow `L * (sqrt_upper - sqrt_lower) / (sqrt_upper * sqrt_lower)`;
/// the two divisions are applied separately, each rounded in the caller's
/// favor, so rounding never credits more than the exact value when
/// rounding down and never charges less when rounding up.
///
/// # Arguments
/// * `sqrt_price_a_q64` - One interval bound in Q64.64 format
/// * `sqrt_price_b_q64` - The other interval bound in Q64.64 format
/// * `liquidity` - The liquidity amount over the interval
/// * `round_up` - Whether to round the result up
///
/// # Returns
/// * `Result<u128>` - The token 0 amount
pub fn get_amount_0_delta(
    sqrt_price_a_q64: u128,
    sqrt_price_b_q64: u128,
    liquidity: u128,
    round_up: bool,
) -> Result<u128> {
    let (lower, upper) = if sqrt_price_a_q64 <= sqrt_price_b_q64 {
        (sqrt_price_a_q64, sqrt_price_b_q64)
    } else {
        (sqrt_price_b_q64, sqrt_price_a_q64)
    };
    if lower == 0 {
        return Err(ErrorCode::InvalidPrice.into());
    }

    let numerator1 = U256::from(liquidity) << 64;
    let numerator2 = U256::from(upper - lower);
    let product = numerator1
        .checked_mul(numerator2)
        .ok_or(ErrorCode::MathOverflow)?;

    let amount = if round_up {
        div_rounding_up(
            div_rounding_up(product, U256::from(upper)),
            U256::from(lower),
        )
    } else {
        product / U256::from(upper) / U256::from(lower)
    };
    u256_to_u128(amount)
}

/// Calculates the amount of token 1 covered by `liquidity` between two
/// sqrt prices.
///
/// Token 1 amounts follow `L * (sqrt_upper - sqrt_lower)`.
///
/// # Arguments
/// * `sqrt_price_a_q64` - One interval bound in Q64.64 format
/// * `sqrt_price_b_q64` - The other interval bound in Q64.64 format
/// * `liquidity` - The liquidity amount over the interval
/// * `round_up` - Whether to round the result up
///
/// # Returns
/// * `Result<u128>` - The token 1 amount
pub fn get_amount_1_delta(
    sqrt_price_a_q64: u128,
    sqrt_price_b_q64: u128,
    liquidity: u128,
    round_up: bool,
) -> Result<u128> {
    let (lower, upper) = if sqrt_price_a_q64 <= sqrt_price_b_q64 {
        (sqrt_price_a_q64, sqrt_price_b_q64)
    } else {
        (sqrt_price_b_q64, sqrt_price_a_q64)
    };

    let product = U256::from(liquidity)
        .checked_mul(U256::from(upper - lower))
        .ok_or(ErrorCode::MathOverflow)?;

    let amount = if round_up {
        div_rounding_up(product, U256::from(Q64))
    } else {
        product >> 64
    };
    u256_to_u128(amount)
}

/// Computes the sqrt price after moving `amount` of token 0 into or out
/// of the active range, rounding up so the price never undercharges.
///
/// Adding token 0 pushes the price down; removing it pushes the price
/// up. When the exact `liquidity * sqrt_price` numerator would not fit
/// in 256 bits on the add side, an algebraically equal formulation that
/// divides first is used instead.
///
/// # Arguments
/// * `sqrt_price_q64` - The starting sqrt price in Q64.64 format
/// * `liquidity` - The active liquidity, must be non-zero
/// * `amount` - The token 0 amount to apply
/// * `add` - Whether the amount is being added (true) or removed (false)
///
/// # Returns
/// * `Result<u128>` - The resulting sqrt price in Q64.64 format
pub fn compute_next_sqrt_price_from_amount0(
    sqrt_price_q64: u128,
    liquidity: u128,
    amount: u128,
    add: bool,
) -> Result<u128> {
    if sqrt_price_q64 == 0 {
        return Err(ErrorCode::InvalidPrice.into());
    }
    if liquidity == 0 {
        return Err(ErrorCode::InsufficientLiquidity.into());
    }
    if amount == 0 {
        return Ok(sqrt_price_q64);
    }
    let numerator1 = U256::from(liquidity) << 64;
    let price = U256::from(sqrt_price_q64);

    if add {
        if let Some(product) = U256::from(amount).checked_mul(price) {
            let denominator = numerator1
                .checked_add(product)
                .ok_or(ErrorCode::MathOverflow)?;
            if let Some(numerator) = numerator1.checked_mul(price) {
                return u256_to_u128(div_rounding_up(numerator, denominator));
            }
        }
        // Divide-first fallback, exact whenever numerator1 is a
        // multiple of the price and otherwise rounded in the pool's
        // favor.
        let denominator = (numerator1 / price)
            .checked_add(U256::from(amount))
            .ok_or(ErrorCode::MathOverflow)?;
        u256_to_u128(div_rounding_up(numerator1, denominator))
    } else {
        let product = U256::from(amount)
            .checked_mul(price)
            .ok_or(ErrorCode::MathOverflow)?;
        if numerator1 <= product {
            return Err(ErrorCode::InsufficientLiquidity.into());
        }
        let denominator = numerator1 - product;
        let numerator = numerator1
            .checked_mul(price)
            .ok_or(ErrorCode::MathOverflow)?;
        u256_to_u128(div_rounding_up(numerator, denominator))
    }
}

/// Computes the sqrt price after moving `amount` of token 1 into or out
/// of the active range, rounding down so the price never overcredits.
///
/// Adding token 1 pushes the price up; removing it pushes the price
/// down.
///
/// # Arguments
/// * `sqrt_price_q64` - The starting sqrt price in Q64.64 format
/// * `liquidity` - The active liquidity, must be non-zero
/// * `amount` - The token 1 amount to apply
/// * `add` - Whether the amount is being added (true) or removed (false)
///
/// # Returns
/// * `Result<u128>` - The resulting sqrt price in Q64.64 format
pub fn compute_next_sqrt_price_from_amount1(
    sqrt_price_q64: u128,
    liquidity: u128,
    amount: u128,
    add: bool,
) -> Result<u128> {
    if liquidity == 0 {
        return Err(ErrorCode::InsufficientLiquidity.into());
    }
    let shifted = U256::from(amount) << 64;

    if add {
        let quotient = u256_to_u128(shifted / U256::from(liquidity))?;
        sqrt_price_q64
            .checked_add(quotient)
            .ok_or_else(|| ErrorCode::MathOverflow.into())
    } else {
        let quotient = u256_to_u128(div_rounding_up(shifted, U256::from(liquidity)))?;
        if sqrt_price_q64 <= quotient {
            return Err(ErrorCode::InsufficientLiquidity.into());
        }
        Ok(sqrt_price_q64 - quotient)
    }
}

/// Computes the sqrt price reached after spending an exact input amount.
///
/// # Arguments
/// * `sqrt_price_q64` - The starting sqrt price in Q64.64 format
/// * `liquidity` - The active liquidity
/// * `amount_in` - The input amount, net of fees
/// * `zero_for_one` - Swap direction; token 0 in when true
///
/// # Returns
/// * `Result<u128>` - The resulting sqrt price in Q64.64 format
pub fn compute_next_sqrt_price_from_input(
    sqrt_price_q64: u128,
    liquidity: u128,
    amount_in: u128,
    zero_for_one: bool,
) -> Result<u128> {
    if zero_for_one {
        compute_next_sqrt_price_from_amount0(sqrt_price_q64, liquidity, amount_in, true)
    } else {
        compute_next_sqrt_price_from_amount1(sqrt_price_q64, liquidity, amount_in, true)
    }
}

/// Computes the sqrt price reached after withdrawing an exact output
/// amount.
///
/// # Arguments
/// * `sqrt_price_q64` - The starting sqrt price in Q64.64 format
/// * `liquidity` - The active liquidity
/// * `amount_out` - The output amount to withdraw
/// * `zero_for_one` - Swap direction; token 1 out when true
///
/// # Returns
/// * `Result<u128>` - The resulting sqrt price in Q64.64 format
pub fn compute_next_sqrt_price_from_output(
    sqrt_price_q64: u128,
    liquidity: u128,
    amount_out: u128,
    zero_for_one: bool,
) -> Result<u128> {
    if zero_for_one {
        compute_next_sqrt_price_from_amount1(sqrt_price_q64, liquidity, amount_out, false)
    } else {
        compute_next_sqrt_price_from_amount0(sqrt_price_q64, liquidity, amount_out, false)
    }
}

/// Applies a signed liquidity delta to a liquidity amount.
///
/// # Arguments
/// * `liquidity` - The current liquidity
/// * `delta` - The signed change to apply
///
/// # Returns
/// * `Result<u128>` - The adjusted liquidity; `InsufficientLiquidity`
///   when the delta underflows, `LiquidityOverflow` when it overflows
pub fn add_liquidity_delta(liquidity: u128, delta: i128) -> Result<u128> {
    if delta < 0 {
        liquidity
            .checked_sub(delta.unsigned_abs())
            .ok_or_else(|| ErrorCode::InsufficientLiquidity.into())
    } else {
        liquidity
            .checked_add(delta as u128)
            .ok_or_else(|| ErrorCode::LiquidityOverflow.into())
    }
}

/// Outcome of swapping as far as possible within a single price
/// interval.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SwapStep {
    /// Sqrt price after the step, clamped to the step target.
    pub sqrt_price_next_q64: u128,
    /// Input amount consumed by the step, excluding the fee.
    pub amount_in: u128,
    /// Output amount produced by the step.
    pub amount_out: u128,
    /// Fee charged on the step's input.
    pub fee_amount: u128,
}

/// Swaps within a single price interval until the target price or the
/// remaining amount is exhausted, whichever comes first.
///
/// The sign of `amount_remaining` selects the swap mode: positive means
/// exact input (fee taken from the input), negative means exact output.
/// On an exact-input step that stops short of the target, the entire
/// unconsumed remainder is taken as the fee so that input accounting is
/// exact; otherwise the fee is grossed up from the consumed input.
///
/// # Arguments
/// * `sqrt_price_current_q64` - The current sqrt price in Q64.64 format
/// * `sqrt_price_target_q64` - The price bound for this step (next
///   initialized tick or the swap's price limit, whichever is nearer)
/// * `liquidity` - The active liquidity over the interval
/// * `amount_remaining` - Remaining swap amount; sign selects the mode
/// * `fee_rate` - Swap fee in parts per million
///
/// # Returns
/// * `Result<SwapStep>` - The step outcome
pub fn compute_swap_step(
    sqrt_price_current_q64: u128,
    sqrt_price_target_q64: u128,
    liquidity: u128,
    amount_remaining: i128,
    fee_rate: u32,
) -> Result<SwapStep> {
    if fee_rate >= FEE_RATE_DENOMINATOR {
        return Err(ErrorCode::InvalidFee.into());
    }
    let zero_for_one = sqrt_price_current_q64 >= sqrt_price_target_q64;
    let exact_in = amount_remaining >= 0;
    let fee_denominator = FEE_RATE_DENOMINATOR as u128;
    let fee_complement = (FEE_RATE_DENOMINATOR - fee_rate) as u128;

    let mut step = SwapStep::default();

    if exact_in {
        let amount_remaining_less_fee = (amount_remaining as u128)
            .checked_mul(fee_complement)
            .ok_or(ErrorCode::MathOverflow)?
            / fee_denominator;
        let amount_in = if zero_for_one {
            get_amount_0_delta(
                sqrt_price_target_q64,
                sqrt_price_current_q64,
                liquidity,
                true,
            )?
        } else {
            get_amount_1_delta(
                sqrt_price_current_q64,
                sqrt_price_target_q64,
                liquidity,
                true,
            )?
        };
        step.sqrt_price_next_q64 = if amount_remaining_less_fee >= amount_in {
            step.amount_in = amount_in;
            sqrt_price_target_q64
        } else {
            compute_next_sqrt_price_from_input(
                sqrt_price_current_q64,
                liquidity,
                amount_remaining_less_fee,
                zero_for_one,
            )?
        };
    } else {
        let amount_out = if zero_for_one {
            get_amount_1_delta(
                sqrt_price_target_q64,
                sqrt_price_current_q64,
                liquidity,
                false,
            )?
        } else {
            get_amount_0_delta(
                sqrt_price_current_q64,
                sqrt_price_target_q64,
                liquidity,
                false,
            )?
        };
        step.sqrt_price_next_q64 = if amount_remaining.unsigned_abs() >= amount_out {
            step.amount_out = amount_out;
            sqrt_price_target_q64
        } else {
            compute_next_sqrt_price_from_output(
                sqrt_price_current_q64,
                liquidity,
                amount_remaining.unsigned_abs(),
                zero_for_one,
            )?
        };
    }

    let reached_target = sqrt_price_target_q64 == step.sqrt_price_next_q64;

    if zero_for_one {
        if !(reached_target && exact_in) {
            step.amount_in = get_amount_0_delta(
                step.sqrt_price_next_q64,
                sqrt_price_current_q64,
                liquidity,
                true,
            )?;
        }
        if !(reached_target && !exact_in) {
            step.amount_out = get_amount_1_delta(
                step.sqrt_price_next_q64,
                sqrt_price_current_q64,
                liquidity,
                false,
            )?;
        }
    } else {
        if !(reached_target && exact_in) {
            step.amount_in = get_amount_1_delta(
                sqrt_price_current_q64,
                step.sqrt_price_next_q64,
                liquidity,
                true,
            )?;
        }
        if !(reached_target && !exact_in) {
            step.amount_out = get_amount_0_delta(
                sqrt_price_current_q64,
                step.sqrt_price_next_q64,
                liquidity,
                false,
            )?;
        }
    }

    // Exact output never hands back more than was asked for.
    if !exact_in && step.amount_out > amount_remaining.unsigned_abs() {
        step.amount_out = amount_remaining.unsigned_abs();
    }

    if exact_in && step.sqrt_price_next_q64 != sqrt_price_target_q64 {
        // The interval absorbed everything; the rounding remainder is
        // collected as fee so the caller's input accounting stays exact.
        step.fee_amount = (amount_remaining as u128)
            .checked_sub(step.amount_in)
            .ok_or(ErrorCode::MathOverflow)?;
    } else {
        step.fee_amount = u256_to_u128(div_rounding_up(
            U256::from(step.amount_in)
                .checked_mul(U256::from(fee_rate))
                .ok_or(ErrorCode::MathOverflow)?,
            U256::from(fee_complement),
        ))?;
    }

    Ok(step)
}
