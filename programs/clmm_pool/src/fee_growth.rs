//! Wrapping fee growth accumulators.
//!
//! Fee growth counters record cumulative fees per unit of liquidity in
//! Q64.64. They are modular: the counters may wrap around `u128`, and
//! only the difference between two readings of the same counter carries
//! meaning. Wrapping subtraction keeps those differences correct across
//! a wrap, and it is also what makes the "growth outside" bookkeeping
//! for ticks sound even when a tick initializes after the global
//! counter has already grown.

use anchor_lang::prelude::*;
use primitive_types::U256;

/// A Q64.64 fees-per-liquidity accumulator with modular semantics.
///
/// The raw value is private; arithmetic goes through [`accrue`] and the
/// wrapping [`growth_since`] so no caller can compare two accumulators
/// by magnitude, which would be meaningless after a wrap.
///
/// [`accrue`]: FeeGrowth::accrue
/// [`growth_since`]: FeeGrowth::growth_since
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeeGrowth(u128);

impl FeeGrowth {
    pub const ZERO: FeeGrowth = FeeGrowth(0);

    pub fn from_raw(raw: u128) -> Self {
        FeeGrowth(raw)
    }

    pub fn raw(self) -> u128 {
        self.0
    }

    /// Accrues `fee_amount` spread over `liquidity` units, in Q64.64.
    ///
    /// The increment truncates to the counter's modulus, which is the
    /// intended wrapping behavior. A zero liquidity accrues nothing;
    /// callers route fees elsewhere when no liquidity is active.
    pub fn accrue(self, fee_amount: u128, liquidity: u128) -> FeeGrowth {
        if liquidity == 0 {
            return self;
        }
        let delta = (U256::from(fee_amount) << 64) / U256::from(liquidity);
        FeeGrowth(self.0.wrapping_add(delta.low_u128()))
    }

    /// Growth accumulated since `snapshot` was taken from this counter.
    ///
    /// Wrapping subtraction: correct as long as real accrual between
    /// the two readings stays below 2^128 Q64.64 units.
    pub fn growth_since(self, snapshot: FeeGrowth) -> FeeGrowth {
        FeeGrowth(self.0.wrapping_sub(snapshot.0))
    }

    /// Tokens owed to `liquidity` units held across this much growth.
    ///
    /// Rounds down, and saturates at `u64::MAX` rather than wrapping a
    /// balance.
    pub fn fees_owed(self, liquidity: u128) -> u64 {
        let owed = (U256::from(self.0) * U256::from(liquidity)) >> 64;
        if owed > U256::from(u64::MAX) {
            u64::MAX
        } else {
            owed.as_u64()
        }
    }
}
