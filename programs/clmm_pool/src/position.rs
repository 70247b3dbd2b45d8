//! Position ledger types.
//!
//! A position is liquidity owned by someone over a half-open tick range
//! `[tick_lower, tick_upper)`. The ledger tracks, per position, the
//! inside fee growth at last settlement and the token amounts already
//! earned but not yet collected.

use anchor_lang::prelude::*;

use crate::fee_growth::FeeGrowth;
use crate::math;

/// Identity of a position.
///
/// Owner and range plus a caller-chosen index, so one owner can hold
/// several independent positions over the same range.
#[derive(
    AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct PositionKey {
    pub owner: Pubkey,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub index: u32,
}

/// Per-position accounting state.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    /// Liquidity currently provided by this position.
    pub liquidity: u128,
    /// Inside fee growth for token 0 at the last settlement.
    pub fee_growth_inside_0_last: FeeGrowth,
    /// Inside fee growth for token 1 at the last settlement.
    pub fee_growth_inside_1_last: FeeGrowth,
    /// Token 0 fees earned and not yet collected.
    pub tokens_owed_0: u64,
    /// Token 1 fees earned and not yet collected.
    pub tokens_owed_1: u64,
}

impl Position {
    /// Settles fees at the given inside-growth readings, then applies
    /// the liquidity delta.
    ///
    /// Settlement happens first so fees accrued by the old liquidity
    /// amount are credited at the old amount. Owed balances saturate
    /// rather than wrap.
    pub fn update(
        &mut self,
        liquidity_delta: i128,
        inside_0: FeeGrowth,
        inside_1: FeeGrowth,
    ) -> Result<()> {
        let owed_0 = inside_0
            .growth_since(self.fee_growth_inside_0_last)
            .fees_owed(self.liquidity);
        let owed_1 = inside_1
            .growth_since(self.fee_growth_inside_1_last)
            .fees_owed(self.liquidity);

        self.fee_growth_inside_0_last = inside_0;
        self.fee_growth_inside_1_last = inside_1;
        self.tokens_owed_0 = self.tokens_owed_0.saturating_add(owed_0);
        self.tokens_owed_1 = self.tokens_owed_1.saturating_add(owed_1);
        self.liquidity = math::add_liquidity_delta(self.liquidity, liquidity_delta)?;
        Ok(())
    }

    /// True when the entry carries no liquidity and no uncollected
    /// fees, meaning the ledger can drop it.
    pub fn is_empty(&self) -> bool {
        self.liquidity == 0 && self.tokens_owed_0 == 0 && self.tokens_owed_1 == 0
    }
}
