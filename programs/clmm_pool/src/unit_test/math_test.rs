use crate::constants::*;
use crate::math::*;
use anchor_lang::prelude::*;

/// Tests for the fixed point math underpinning swaps and liquidity
/// accounting. Reference values were computed with arbitrary precision
/// integer arithmetic outside the crate.
mod math_tests {
    use super::*;

    /// Tests for tick index to sqrt price conversion
    mod tick_to_sqrt_price_tests {
        use super::*;

        #[test]
        fn test_tick_zero_is_unit_price() -> Result<()> {
            // sqrt(1.0001^0) == 1.0 == 1 << 64
            assert_eq!(tick_to_sqrt_price_q64(0)?, Q64);
            Ok(())
        }

        #[test]
        fn test_single_tick_matches_table() -> Result<()> {
            // Tick 1 is exactly the first power table entry
            assert_eq!(tick_to_sqrt_price_q64(1)?, SQRT_PRICE_POWERS[0]);
            Ok(())
        }

        #[test]
        fn test_known_positive_ticks() -> Result<()> {
            assert_eq!(tick_to_sqrt_price_q64(60)?, 18502164624211761446);
            assert_eq!(tick_to_sqrt_price_q64(100)?, 18539204128674405812);
            assert_eq!(tick_to_sqrt_price_q64(600)?, 19008502556559666132);
            Ok(())
        }

        #[test]
        fn test_known_negative_ticks() -> Result<()> {
            assert_eq!(tick_to_sqrt_price_q64(-1)?, 18445821805675392311);
            assert_eq!(tick_to_sqrt_price_q64(-60)?, 18391489527427947883);
            assert_eq!(tick_to_sqrt_price_q64(-600)?, 17901587245414554125);
            Ok(())
        }

        #[test]
        fn test_extreme_ticks_match_price_bounds() -> Result<()> {
            assert_eq!(tick_to_sqrt_price_q64(MIN_TICK)?, MIN_SQRT_PRICE);
            assert_eq!(tick_to_sqrt_price_q64(MAX_TICK)?, MAX_SQRT_PRICE);
            Ok(())
        }

        #[test]
        fn test_out_of_bounds_tick_rejected() {
            assert!(tick_to_sqrt_price_q64(MIN_TICK - 1).is_err());
            let result = tick_to_sqrt_price_q64(MAX_TICK + 1);
            assert!(result.is_err());
            assert!(result
                .unwrap_err()
                .to_string()
                .contains("TickOutOfBounds"));
        }

        #[test]
        fn test_negative_tick_is_reciprocal() -> Result<()> {
            // price(t) * price(-t) should reconstruct 1.0 up to rounding
            let pos = tick_to_sqrt_price_q64(600)? as f64 / Q64 as f64;
            let neg = tick_to_sqrt_price_q64(-600)? as f64 / Q64 as f64;
            let product = pos * neg;
            assert!((product - 1.0).abs() < 1e-12, "reciprocal drift: {product}");
            Ok(())
        }
    }

    /// Tests for sqrt price to tick index conversion
    mod sqrt_price_to_tick_tests {
        use super::*;

        #[test]
        fn test_round_trips_exact_tick_prices() -> Result<()> {
            for tick in [-600, -60, -1, 0, 1, 60, 100, 600] {
                let price = tick_to_sqrt_price_q64(tick)?;
                assert_eq!(
                    sqrt_price_q64_to_tick(price)?,
                    tick,
                    "round trip failed at tick {tick}"
                );
            }
            Ok(())
        }

        #[test]
        fn test_floors_between_ticks() -> Result<()> {
            // One unit above tick 600's price still floors to 600, and one
            // unit below tick 601's price does too
            assert_eq!(sqrt_price_q64_to_tick(tick_to_sqrt_price_q64(600)? + 1)?, 600);
            assert_eq!(sqrt_price_q64_to_tick(tick_to_sqrt_price_q64(601)? - 1)?, 600);
            Ok(())
        }

        #[test]
        fn test_bounds_map_to_extreme_ticks() -> Result<()> {
            assert_eq!(sqrt_price_q64_to_tick(MIN_SQRT_PRICE)?, MIN_TICK);
            assert_eq!(sqrt_price_q64_to_tick(MAX_SQRT_PRICE)?, MAX_TICK);
            Ok(())
        }

        #[test]
        fn test_out_of_bounds_price_rejected() {
            assert!(sqrt_price_q64_to_tick(MIN_SQRT_PRICE - 1).is_err());
            assert!(sqrt_price_q64_to_tick(MAX_SQRT_PRICE + 1).is_err());
            assert!(sqrt_price_q64_to_tick(0).is_err());
        }
    }

    /// Tests for token amount deltas over a price interval
    mod amount_delta_tests {
        use super::*;

        #[test]
        fn test_amount_0_known_interval() -> Result<()> {
            let upper = tick_to_sqrt_price_q64(600)?;
            assert_eq!(get_amount_0_delta(Q64, upper, 1_000_000, true)?, 29554);
            assert_eq!(get_amount_0_delta(Q64, upper, 1_000_000, false)?, 29553);
            Ok(())
        }

        #[test]
        fn test_amount_1_known_interval() -> Result<()> {
            let lower = tick_to_sqrt_price_q64(-600)?;
            assert_eq!(get_amount_1_delta(lower, Q64, 1_000_000, true)?, 29554);
            assert_eq!(get_amount_1_delta(lower, Q64, 1_000_000, false)?, 29553);
            Ok(())
        }

        #[test]
        fn test_argument_order_is_irrelevant() -> Result<()> {
            let a = tick_to_sqrt_price_q64(-60)?;
            let b = tick_to_sqrt_price_q64(60)?;
            assert_eq!(
                get_amount_0_delta(a, b, 1_000_000, true)?,
                get_amount_0_delta(b, a, 1_000_000, true)?
            );
            assert_eq!(
                get_amount_1_delta(a, b, 1_000_000, false)?,
                get_amount_1_delta(b, a, 1_000_000, false)?
            );
            Ok(())
        }

        #[test]
        fn test_empty_interval_is_zero() -> Result<()> {
            assert_eq!(get_amount_0_delta(Q64, Q64, 1_000_000, true)?, 0);
            assert_eq!(get_amount_1_delta(Q64, Q64, 1_000_000, true)?, 0);
            Ok(())
        }

        #[test]
        fn test_zero_liquidity_is_zero() -> Result<()> {
            let upper = tick_to_sqrt_price_q64(600)?;
            assert_eq!(get_amount_0_delta(Q64, upper, 0, true)?, 0);
            assert_eq!(get_amount_1_delta(Q64, upper, 0, true)?, 0);
            Ok(())
        }

        #[test]
        fn test_zero_lower_price_rejected() {
            assert!(get_amount_0_delta(0, Q64, 1_000_000, true).is_err());
        }
    }

    /// Tests for the next-price formulas used inside a swap step
    mod next_sqrt_price_tests {
        use super::*;

        #[test]
        fn test_input_token0_moves_price_down() -> Result<()> {
            let next = compute_next_sqrt_price_from_input(Q64, 1_000_000, 997, true)?;
            assert_eq!(next, 18428370987834680440);
            assert!(next < Q64);
            Ok(())
        }

        #[test]
        fn test_input_token1_moves_price_up() -> Result<()> {
            let next = compute_next_sqrt_price_from_input(Q64, 1_000_000, 997, false)?;
            assert_eq!(next, 18465135477551040038);
            assert!(next > Q64);
            Ok(())
        }

        #[test]
        fn test_output_token1_moves_price_down() -> Result<()> {
            let next = compute_next_sqrt_price_from_output(Q64, 1_000_000, 500, true)?;
            assert_eq!(next, 18437520701672696840);
            assert!(next < Q64);
            Ok(())
        }

        #[test]
        fn test_output_token0_moves_price_up() -> Result<()> {
            let next = compute_next_sqrt_price_from_output(Q64, 1_000_000, 500, false)?;
            assert_eq!(next, 18455972059739421327);
            assert!(next > Q64);
            Ok(())
        }

        #[test]
        fn test_zero_amount_keeps_price() -> Result<()> {
            assert_eq!(compute_next_sqrt_price_from_input(Q64, 1_000_000, 0, true)?, Q64);
            assert_eq!(compute_next_sqrt_price_from_input(Q64, 1_000_000, 0, false)?, Q64);
            Ok(())
        }

        #[test]
        fn test_zero_liquidity_rejected() {
            let result = compute_next_sqrt_price_from_input(Q64, 0, 100, true);
            assert!(result.is_err());
            assert!(result
                .unwrap_err()
                .to_string()
                .contains("InsufficientLiquidity"));
            assert!(compute_next_sqrt_price_from_input(Q64, 0, 100, false).is_err());
        }

        #[test]
        fn test_draining_more_than_reserves_rejected() {
            // Withdrawing far more token1 than the range holds
            assert!(compute_next_sqrt_price_from_output(Q64, 1_000, u64::MAX as u128, true).is_err());
        }

        #[test]
        fn test_zero_price_rejected() {
            let result = compute_next_sqrt_price_from_amount0(0, 1_000_000, 100, true);
            assert!(result.is_err());
            assert!(result.unwrap_err().to_string().contains("InvalidPrice"));
        }
    }

    /// Tests for the single-interval swap step
    mod compute_swap_step_tests {
        use super::*;

        #[test]
        fn test_exact_in_stops_inside_interval() -> Result<()> {
            // 1000 in at 0.3%: 997 net input, 3 fee, price falls short of
            // the target so the whole remainder is consumed
            let target = tick_to_sqrt_price_q64(-600)?;
            let step = compute_swap_step(Q64, target, 1_000_000, 1000, 3000)?;

            assert_eq!(step.sqrt_price_next_q64, 18428370987834680440);
            assert_eq!(step.amount_in, 997);
            assert_eq!(step.amount_out, 996);
            assert_eq!(step.fee_amount, 3);
            assert!(step.sqrt_price_next_q64 > target);
            Ok(())
        }

        #[test]
        fn test_exact_in_reaches_target() -> Result<()> {
            // Plenty of input; the step stops at the target price and the
            // fee is grossed up from the consumed input
            let target = tick_to_sqrt_price_q64(-60)?;
            let step = compute_swap_step(Q64, target, 1_000_000, 1_000_000, 3000)?;

            assert_eq!(step.sqrt_price_next_q64, target);
            assert_eq!(step.amount_in, 3005);
            assert_eq!(step.amount_out, 2995);
            assert_eq!(step.fee_amount, 10);
            Ok(())
        }

        #[test]
        fn test_exact_out_stops_inside_interval() -> Result<()> {
            let target = tick_to_sqrt_price_q64(60)?;
            let step = compute_swap_step(Q64, target, 1_000_000, -500, 3000)?;

            assert_eq!(step.sqrt_price_next_q64, 18455972059739421327);
            assert_eq!(step.amount_in, 501);
            assert_eq!(step.amount_out, 500);
            assert_eq!(step.fee_amount, 2);
            Ok(())
        }

        #[test]
        fn test_exact_out_reaches_target() -> Result<()> {
            // The interval cannot produce 100000 of token0, so the step
            // caps at the target price
            let target = tick_to_sqrt_price_q64(60)?;
            let step = compute_swap_step(Q64, target, 5_000_000, -100_000, 500)?;

            assert_eq!(step.sqrt_price_next_q64, target);
            assert_eq!(step.amount_in, 15022);
            assert_eq!(step.amount_out, 14976);
            assert_eq!(step.fee_amount, 8);
            Ok(())
        }

        #[test]
        fn test_zero_width_step_is_free() -> Result<()> {
            // Target equal to the current price moves nothing
            let step = compute_swap_step(Q64, Q64, 1_000_000, 1000, 3000)?;
            assert_eq!(step.sqrt_price_next_q64, Q64);
            assert_eq!(step.amount_in, 0);
            assert_eq!(step.amount_out, 0);
            assert_eq!(step.fee_amount, 0);
            Ok(())
        }

        #[test]
        fn test_zero_liquidity_jumps_to_target() -> Result<()> {
            // An empty interval is traversed without consuming anything
            let target = tick_to_sqrt_price_q64(-600)?;
            let step = compute_swap_step(Q64, target, 0, 1000, 3000)?;
            assert_eq!(step.sqrt_price_next_q64, target);
            assert_eq!(step.amount_in, 0);
            assert_eq!(step.amount_out, 0);
            assert_eq!(step.fee_amount, 0);
            Ok(())
        }

        #[test]
        fn test_input_accounting_is_exact_when_stopping_short() -> Result<()> {
            // Whatever is not spent as amount_in must be the fee
            let target = tick_to_sqrt_price_q64(-600)?;
            for amount in [1i128, 7, 100, 999, 12345] {
                let step = compute_swap_step(Q64, target, 1_000_000, amount, 3000)?;
                if step.sqrt_price_next_q64 != target {
                    assert_eq!(
                        step.amount_in + step.fee_amount,
                        amount as u128,
                        "leaky input accounting for amount {amount}"
                    );
                }
            }
            Ok(())
        }

        #[test]
        fn test_degenerate_fee_rate_rejected() {
            let result = compute_swap_step(Q64, Q64, 1_000_000, 1000, FEE_RATE_DENOMINATOR);
            assert!(result.is_err());
            assert!(result.unwrap_err().to_string().contains("InvalidFee"));
        }
    }

    /// Tests for signed liquidity arithmetic
    mod add_liquidity_delta_tests {
        use super::*;

        #[test]
        fn test_add_and_remove() -> Result<()> {
            assert_eq!(add_liquidity_delta(1000, 500)?, 1500);
            assert_eq!(add_liquidity_delta(1000, -500)?, 500);
            assert_eq!(add_liquidity_delta(1000, -1000)?, 0);
            assert_eq!(add_liquidity_delta(0, 0)?, 0);
            Ok(())
        }

        #[test]
        fn test_underflow_rejected() {
            let result = add_liquidity_delta(100, -101);
            assert!(result.is_err());
            assert!(result
                .unwrap_err()
                .to_string()
                .contains("InsufficientLiquidity"));
        }

        #[test]
        fn test_overflow_rejected() {
            let result = add_liquidity_delta(u128::MAX, 1);
            assert!(result.is_err());
            assert!(result
                .unwrap_err()
                .to_string()
                .contains("LiquidityOverflow"));
        }
    }
}
