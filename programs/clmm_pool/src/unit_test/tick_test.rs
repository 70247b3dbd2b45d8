use crate::fee_growth::FeeGrowth;
use crate::tick::*;
use anchor_lang::prelude::*;

/// Tests for tick state transitions and the sparse tick registry
mod tick_tests {
    use super::*;

    fn growth(raw: u128) -> FeeGrowth {
        FeeGrowth::from_raw(raw)
    }

    /// Tests for the per-spacing liquidity cap
    mod max_liquidity_tests {
        use super::*;

        #[test]
        fn test_cap_for_known_spacings() {
            // With spacing 60 the usable ticks are -443580..=443580, which
            // is 14787 boundaries
            assert_eq!(max_liquidity_per_tick(60), u128::MAX / 14787);
            assert_eq!(max_liquidity_per_tick(1), u128::MAX / 887273);
        }

        #[test]
        fn test_wider_spacing_allows_more_liquidity() {
            assert!(max_liquidity_per_tick(200) > max_liquidity_per_tick(60));
            assert!(max_liquidity_per_tick(60) > max_liquidity_per_tick(10));
            assert!(max_liquidity_per_tick(10) > max_liquidity_per_tick(1));
        }
    }

    /// Tests for previewing tick updates
    mod updated_tests {
        use super::*;

        #[test]
        fn test_first_add_on_lower_tick() -> Result<()> {
            let registry = TickRegistry::default();
            let (data, flipped) = registry.updated(
                -60,
                0,
                1000,
                growth(500),
                growth(700),
                false,
                u128::MAX,
            )?;

            assert_eq!(data.liquidity_gross, 1000);
            assert_eq!(data.liquidity_net, 1000);
            assert!(flipped, "first liquidity must flip the tick on");
            // Tick at or below the current tick adopts the globals
            assert_eq!(data.fee_growth_outside_0, growth(500));
            assert_eq!(data.fee_growth_outside_1, growth(700));
            Ok(())
        }

        #[test]
        fn test_first_add_on_upper_tick() -> Result<()> {
            let registry = TickRegistry::default();
            let (data, flipped) =
                registry.updated(60, 0, 1000, growth(500), growth(700), true, u128::MAX)?;

            assert_eq!(data.liquidity_gross, 1000);
            assert_eq!(data.liquidity_net, -1000);
            assert!(flipped);
            // Tick above the current tick starts with zero outside growth
            assert_eq!(data.fee_growth_outside_0, FeeGrowth::ZERO);
            assert_eq!(data.fee_growth_outside_1, FeeGrowth::ZERO);
            Ok(())
        }

        #[test]
        fn test_second_add_does_not_flip_or_reseed() -> Result<()> {
            let mut registry = TickRegistry::default();
            let (data, _) =
                registry.updated(-60, 0, 1000, growth(500), growth(700), false, u128::MAX)?;
            registry.store(-60, data);

            // Globals have moved on; a second add must not reseed
            let (data, flipped) =
                registry.updated(-60, 0, 500, growth(900), growth(950), false, u128::MAX)?;
            assert_eq!(data.liquidity_gross, 1500);
            assert_eq!(data.liquidity_net, 1500);
            assert!(!flipped);
            assert_eq!(data.fee_growth_outside_0, growth(500));
            Ok(())
        }

        #[test]
        fn test_removing_last_liquidity_flips_off() -> Result<()> {
            let mut registry = TickRegistry::default();
            let (data, _) =
                registry.updated(-60, 0, 1000, growth(0), growth(0), false, u128::MAX)?;
            registry.store(-60, data);

            let (data, flipped) =
                registry.updated(-60, 0, -1000, growth(0), growth(0), false, u128::MAX)?;
            assert_eq!(data.liquidity_gross, 0);
            assert!(flipped, "removing the last liquidity must flip the tick off");

            registry.store(-60, data);
            assert_eq!(registry.get(-60), None, "cleared tick must be erased");
            assert_eq!(registry.initialized_count(), 0);
            Ok(())
        }

        #[test]
        fn test_gross_cap_enforced() {
            let registry = TickRegistry::default();
            let result = registry.updated(-60, 0, 1001, growth(0), growth(0), false, 1000);
            assert!(result.is_err());
            assert!(result
                .unwrap_err()
                .to_string()
                .contains("LiquidityOverflow"));
        }

        #[test]
        fn test_removing_from_empty_tick_rejected() {
            let registry = TickRegistry::default();
            let result = registry.updated(-60, 0, -1, growth(0), growth(0), false, u128::MAX);
            assert!(result.is_err());
            assert!(result
                .unwrap_err()
                .to_string()
                .contains("InsufficientLiquidity"));
        }

        #[test]
        fn test_same_tick_as_lower_and_upper_nets_out() -> Result<()> {
            // The same tick used as a lower bound by one position and an
            // upper bound by another accumulates gross but cancels net
            let mut registry = TickRegistry::default();
            let (data, _) =
                registry.updated(0, 10, 1000, growth(0), growth(0), false, u128::MAX)?;
            registry.store(0, data);
            let (data, _) = registry.updated(0, 10, 1000, growth(0), growth(0), true, u128::MAX)?;
            registry.store(0, data);

            let stored = registry.get(0).ok_or(crate::errors::ErrorCode::NotInitialized)?;
            assert_eq!(stored.liquidity_gross, 2000);
            assert_eq!(stored.liquidity_net, 0);
            Ok(())
        }
    }

    /// Tests for crossing a tick during a swap
    mod cross_tests {
        use super::*;

        #[test]
        fn test_cross_flips_outside_counters() -> Result<()> {
            let mut registry = TickRegistry::default();
            let (data, _) =
                registry.updated(-60, 0, 1000, growth(100), growth(40), false, u128::MAX)?;
            registry.store(-60, data);

            // Crossing with globals at 300/90 leaves outside = global - old
            let net = registry.cross(-60, growth(300), growth(90));
            assert_eq!(net, 1000);
            let stored = registry.get(-60).ok_or(crate::errors::ErrorCode::NotInitialized)?;
            assert_eq!(stored.fee_growth_outside_0, growth(200));
            assert_eq!(stored.fee_growth_outside_1, growth(50));

            // Crossing back restores the original counters
            let net = registry.cross(-60, growth(300), growth(90));
            assert_eq!(net, 1000);
            let stored = registry.get(-60).ok_or(crate::errors::ErrorCode::NotInitialized)?;
            assert_eq!(stored.fee_growth_outside_0, growth(100));
            assert_eq!(stored.fee_growth_outside_1, growth(40));
            Ok(())
        }

        #[test]
        fn test_cross_missing_tick_is_noop() {
            let mut registry = TickRegistry::default();
            assert_eq!(registry.cross(-60, growth(300), growth(90)), 0);
            assert_eq!(registry.get(-60), None);
        }
    }

    /// Tests for reconstructing fee growth inside a range
    mod fee_growth_inside_tests {
        use super::*;

        fn boundary(outside_0: u128, outside_1: u128) -> Tick {
            Tick {
                liquidity_gross: 1,
                liquidity_net: 1,
                fee_growth_outside_0: growth(outside_0),
                fee_growth_outside_1: growth(outside_1),
            }
        }

        #[test]
        fn test_current_inside_range() {
            let lower = boundary(30, 3);
            let upper = boundary(20, 2);
            let (inside_0, inside_1) =
                fee_growth_inside(-60, &lower, 60, &upper, 0, growth(100), growth(10));
            assert_eq!(inside_0, growth(50));
            assert_eq!(inside_1, growth(5));
        }

        #[test]
        fn test_current_below_range() {
            let lower = boundary(30, 0);
            let upper = boundary(20, 0);
            // below = global - lower.outside = 70, above = 20
            let (inside_0, _) =
                fee_growth_inside(-60, &lower, 60, &upper, -100, growth(100), growth(0));
            assert_eq!(inside_0, growth(10));
        }

        #[test]
        fn test_current_above_range() {
            let lower = boundary(30, 0);
            let upper = boundary(20, 0);
            // above = global - upper.outside = 80; 100 - 30 - 80 wraps
            let (inside_0, _) =
                fee_growth_inside(-60, &lower, 60, &upper, 100, growth(100), growth(0));
            assert_eq!(inside_0, growth(u128::MAX - 9));
        }

        #[test]
        fn test_wrapped_counters_still_difference_cleanly() {
            // Growth deltas survive the global counter wrapping past zero
            let before = growth(u128::MAX - 5);
            let after = growth(14);
            assert_eq!(after.growth_since(before), growth(20));
        }

        #[test]
        fn test_registry_wrapper_uses_stored_ticks() -> Result<()> {
            let mut registry = TickRegistry::default();
            let (data, _) =
                registry.updated(-60, 0, 1000, growth(30), growth(0), false, u128::MAX)?;
            registry.store(-60, data);
            let (data, _) =
                registry.updated(60, 0, 1000, growth(30), growth(0), true, u128::MAX)?;
            registry.store(60, data);

            // Lower seeded with the globals at creation, upper with zero
            let (inside_0, _) =
                registry.fee_growth_inside(-60, 60, 0, growth(100), growth(0));
            assert_eq!(inside_0, growth(70));
            Ok(())
        }
    }
}
