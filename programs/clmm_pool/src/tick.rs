//! Tick state and the tick registry.
//!
//! A tick becomes interesting the moment some position uses it as a
//! range boundary: it then carries the net liquidity change applied
//! when the price crosses it, the gross liquidity referencing it, and
//! the "fee growth outside" counters that let any range reconstruct the
//! fees earned strictly inside itself from two boundary reads.
//!
//! The registry is sparse. Ticks with no referencing liquidity do not
//! exist, and deleting the last unit of liquidity at a tick erases its
//! entry entirely so a later re-initialization starts from a clean
//! slate.

use std::collections::BTreeMap;

use anchor_lang::prelude::*;

use crate::constants::{MAX_TICK, MIN_TICK};
use crate::errors::ErrorCode;
use crate::fee_growth::FeeGrowth;
use crate::math;

/// The greatest total liquidity one tick may reference, given a tick
/// spacing. Dividing `u128::MAX` across every usable tick bounds the
/// pool-wide active liquidity away from overflow.
pub fn max_liquidity_per_tick(tick_spacing: u16) -> u128 {
    let spacing = tick_spacing as i32;
    let min_tick = (MIN_TICK / spacing) * spacing;
    let max_tick = (MAX_TICK / spacing) * spacing;
    let num_ticks = ((max_tick - min_tick) / spacing + 1) as u128;
    u128::MAX / num_ticks
}

/// Per-tick accounting state.
///
/// `fee_growth_outside_*` is interpreted relative to the current tick:
/// it holds the growth accumulated on the far side of this tick, where
/// "far side" flips every time the price crosses. Only differences of
/// these counters are meaningful, matching [`FeeGrowth`] semantics.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tick {
    /// Total liquidity of all positions using this tick as a boundary.
    pub liquidity_gross: u128,
    /// Liquidity added when crossing left to right, negated right to
    /// left. Lower bounds contribute positively, upper bounds
    /// negatively.
    pub liquidity_net: i128,
    /// Token 0 fee growth on the far side of this tick.
    pub fee_growth_outside_0: FeeGrowth,
    /// Token 1 fee growth on the far side of this tick.
    pub fee_growth_outside_1: FeeGrowth,
}

impl Tick {
    pub fn is_initialized(&self) -> bool {
        self.liquidity_gross > 0
    }
}

/// Fee growth accumulated strictly inside `[tick_lower, tick_upper)`,
/// reconstructed from the boundary ticks' outside counters.
///
/// Callers pass the tick data explicitly so the same formula serves
/// both stored ticks and staged copies that have not been committed
/// yet.
pub fn fee_growth_inside(
    tick_lower: i32,
    lower: &Tick,
    tick_upper: i32,
    upper: &Tick,
    tick_current: i32,
    fee_growth_global_0: FeeGrowth,
    fee_growth_global_1: FeeGrowth,
) -> (FeeGrowth, FeeGrowth) {
    let (below_0, below_1) = if tick_current >= tick_lower {
        (lower.fee_growth_outside_0, lower.fee_growth_outside_1)
    } else {
        (
            fee_growth_global_0.growth_since(lower.fee_growth_outside_0),
            fee_growth_global_1.growth_since(lower.fee_growth_outside_1),
        )
    };

    let (above_0, above_1) = if tick_current < tick_upper {
        (upper.fee_growth_outside_0, upper.fee_growth_outside_1)
    } else {
        (
            fee_growth_global_0.growth_since(upper.fee_growth_outside_0),
            fee_growth_global_1.growth_since(upper.fee_growth_outside_1),
        )
    };

    (
        fee_growth_global_0.growth_since(below_0).growth_since(above_0),
        fee_growth_global_1.growth_since(below_1).growth_since(above_1),
    )
}

/// Sparse map from tick index to tick state.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default)]
pub struct TickRegistry {
    ticks: BTreeMap<i32, Tick>,
}

impl TickRegistry {
    /// Copies out the state at `tick`, if the tick is initialized.
    pub fn get(&self, tick: i32) -> Option<Tick> {
        self.ticks.get(&tick).copied()
    }

    /// Net liquidity change at `tick`, zero for uninitialized ticks.
    pub fn liquidity_net(&self, tick: i32) -> i128 {
        self.ticks.get(&tick).map_or(0, |t| t.liquidity_net)
    }

    /// Number of initialized ticks, for introspection and tests.
    pub fn initialized_count(&self) -> usize {
        self.ticks.len()
    }

    /// Computes the tick state after applying `liquidity_delta`, without
    /// committing it.
    ///
    /// Returns the updated state and whether the update flips the
    /// tick's initialized status. Every way this can fail is checked
    /// here, so a later [`store`] of the returned state cannot fail.
    ///
    /// On first initialization the outside counters adopt the current
    /// globals when the tick is at or below the current tick, encoding
    /// the convention that all past growth happened below.
    ///
    /// [`store`]: TickRegistry::store
    pub fn updated(
        &self,
        tick: i32,
        tick_current: i32,
        liquidity_delta: i128,
        fee_growth_global_0: FeeGrowth,
        fee_growth_global_1: FeeGrowth,
        upper: bool,
        max_liquidity: u128,
    ) -> Result<(Tick, bool)> {
        let mut data = self.ticks.get(&tick).copied().unwrap_or_default();

        let gross_before = data.liquidity_gross;
        let gross_after = math::add_liquidity_delta(gross_before, liquidity_delta)?;
        if gross_after > max_liquidity {
            return Err(ErrorCode::LiquidityOverflow.into());
        }
        data.liquidity_gross = gross_after;

        data.liquidity_net = if upper {
            data.liquidity_net.checked_sub(liquidity_delta)
        } else {
            data.liquidity_net.checked_add(liquidity_delta)
        }
        .ok_or_else(|| error!(ErrorCode::MathOverflow))?;

        if gross_before == 0 {
            if tick <= tick_current {
                data.fee_growth_outside_0 = fee_growth_global_0;
                data.fee_growth_outside_1 = fee_growth_global_1;
            } else {
                data.fee_growth_outside_0 = FeeGrowth::ZERO;
                data.fee_growth_outside_1 = FeeGrowth::ZERO;
            }
        }

        let flipped = (gross_after == 0) != (gross_before == 0);
        Ok((data, flipped))
    }

    /// Commits tick state produced by [`updated`], erasing the entry
    /// when the tick is no longer referenced by any position.
    ///
    /// [`updated`]: TickRegistry::updated
    pub fn store(&mut self, tick: i32, data: Tick) {
        if data.is_initialized() {
            self.ticks.insert(tick, data);
        } else {
            self.ticks.remove(&tick);
        }
    }

    /// Crosses `tick` during a swap: flips its outside counters against
    /// the provided globals and returns the net liquidity to apply.
    ///
    /// Crossing an uninitialized tick is a no-op that contributes zero
    /// liquidity.
    pub fn cross(
        &mut self,
        tick: i32,
        fee_growth_global_0: FeeGrowth,
        fee_growth_global_1: FeeGrowth,
    ) -> i128 {
        match self.ticks.get_mut(&tick) {
            Some(data) => {
                data.fee_growth_outside_0 =
                    fee_growth_global_0.growth_since(data.fee_growth_outside_0);
                data.fee_growth_outside_1 =
                    fee_growth_global_1.growth_since(data.fee_growth_outside_1);
                data.liquidity_net
            }
            None => 0,
        }
    }

    /// Fee growth inside `[tick_lower, tick_upper)` from stored state.
    pub fn fee_growth_inside(
        &self,
        tick_lower: i32,
        tick_upper: i32,
        tick_current: i32,
        fee_growth_global_0: FeeGrowth,
        fee_growth_global_1: FeeGrowth,
    ) -> (FeeGrowth, FeeGrowth) {
        let lower = self.get(tick_lower).unwrap_or_default();
        let upper = self.get(tick_upper).unwrap_or_default();
        fee_growth_inside(
            tick_lower,
            &lower,
            tick_upper,
            &upper,
            tick_current,
            fee_growth_global_0,
            fee_growth_global_1,
        )
    }
}
