//! Tick bitmap module.
//!
//! A space-efficient index of initialized ticks. Each bit records
//! whether the tick at one spacing step is initialized, packed into
//! 64-bit words keyed by word index, so the swap loop can find the next
//! boundary with two shifts and a count-zeros instead of scanning every
//! tick in between.
//!
//! Only words containing at least one set bit are stored; a missing
//! word reads as all zeros.

use std::collections::BTreeMap;

use anchor_lang::prelude::*;

use crate::errors::ErrorCode;

/// Position of a compressed tick inside the bitmap: word index and bit
/// index within the word. Arithmetic shift keeps the word index a floor
/// division for negative ticks.
fn position(compressed: i32) -> (i16, u8) {
    ((compressed >> 6) as i16, (compressed & 63) as u8)
}

/// Sparse bitmap over compressed ticks (tick / spacing).
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default)]
pub struct TickBitmap {
    words: BTreeMap<i16, u64>,
}

impl TickBitmap {
    /// Flips the initialized bit for `tick`, which must be a multiple
    /// of the tick spacing.
    pub fn flip(&mut self, tick: i32, tick_spacing: u16) -> Result<()> {
        let spacing = tick_spacing as i32;
        if tick % spacing != 0 {
            return Err(ErrorCode::InvalidTick.into());
        }
        let (word_pos, bit_pos) = position(tick / spacing);
        let mask = 1u64 << bit_pos;

        let word = self.words.entry(word_pos).or_insert(0);
        *word ^= mask;
        let cleared = *word == 0;
        if cleared {
            self.words.remove(&word_pos);
        }
        Ok(())
    }

    /// Whether `tick` has its initialized bit set.
    pub fn is_initialized(&self, tick: i32, tick_spacing: u16) -> bool {
        let spacing = tick_spacing as i32;
        if tick % spacing != 0 {
            return false;
        }
        let (word_pos, bit_pos) = position(tick / spacing);
        self.words
            .get(&word_pos)
            .is_some_and(|word| word & (1u64 << bit_pos) != 0)
    }

    /// Finds the next initialized tick no further than one word away.
    ///
    /// With `lte` true the search runs at or below `tick` (the
    /// zero-for-one direction), otherwise strictly above it. Returns
    /// the tick and whether it is actually initialized; when no bit is
    /// set in the examined word the boundary of that word comes back
    /// with `false`, letting the swap loop hop word by word without
    /// unbounded scans.
    pub fn next_initialized_tick_within_one_word(
        &self,
        tick: i32,
        tick_spacing: u16,
        lte: bool,
    ) -> (i32, bool) {
        let spacing = tick_spacing as i32;
        let mut compressed = tick / spacing;
        if tick < 0 && tick % spacing != 0 {
            compressed -= 1;
        }

        if lte {
            let (word_pos, bit_pos) = position(compressed);
            // All bits at or below the current position.
            let mask = (1u64 << bit_pos) | ((1u64 << bit_pos) - 1);
            let masked = self.words.get(&word_pos).copied().unwrap_or(0) & mask;

            if masked != 0 {
                let msb = 63 - masked.leading_zeros() as i32;
                ((compressed - (bit_pos as i32 - msb)) * spacing, true)
            } else {
                ((compressed - bit_pos as i32) * spacing, false)
            }
        } else {
            let next = compressed + 1;
            let (word_pos, bit_pos) = position(next);
            // All bits at or above the next position.
            let mask = !((1u64 << bit_pos) - 1);
            let masked = self.words.get(&word_pos).copied().unwrap_or(0) & mask;

            if masked != 0 {
                let lsb = masked.trailing_zeros() as i32;
                ((next + (lsb - bit_pos as i32)) * spacing, true)
            } else {
                ((next + (63 - bit_pos as i32)) * spacing, false)
            }
        }
    }
}
