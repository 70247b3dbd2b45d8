//! Time-weighted average price oracle.
//!
//! A ring buffer of cumulative observations. Each write extends two
//! running sums, tick-seconds and Q64.64 seconds-per-liquidity, so any
//! window average is one subtraction and one division over two reads.
//! Queries between recorded observations interpolate linearly; queries
//! newer than the latest observation extrapolate from it at the current
//! tick and liquidity.
//!
//! Capacity grows in two phases: `grow` stages a larger cardinality,
//! and writes activate it only when the write index wraps into the
//! staged region. Until then queries keep operating on the old ring.

use anchor_lang::prelude::*;
use bytemuck::{Pod, Zeroable};
use primitive_types::U256;

use crate::constants::MAX_OBSERVATION_CARDINALITY;
use crate::errors::ErrorCode;

/// One oracle observation.
///
/// POD layout with explicit tail padding so the record can be moved
/// around as raw bytes. `initialized` distinguishes written slots from
/// slots reserved by a staged capacity that have not wrapped into use
/// yet.
#[repr(C)]
#[derive(
    AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable,
)]
pub struct Observation {
    /// Unix timestamp this observation was recorded at.
    pub block_timestamp: i64,
    /// Running sum of tick * elapsed seconds, wrapping.
    pub tick_cumulative: i64,
    /// Running sum of (elapsed seconds << 64) / active liquidity,
    /// wrapping.
    pub seconds_per_liquidity_cumulative: u128,
    /// 1 once the slot has been written.
    pub initialized: u8,
    pub _padding: [u8; 15],
}

impl Observation {
    pub fn is_initialized(&self) -> bool {
        self.initialized == 1
    }

    /// Extends this observation's running sums to `now` assuming the
    /// tick and liquidity held constant since it was recorded.
    fn transform(&self, now: i64, tick: i32, liquidity: u128) -> Observation {
        let elapsed = now - self.block_timestamp;
        Observation {
            block_timestamp: now,
            tick_cumulative: self.tick_cumulative.wrapping_add(tick as i64 * elapsed),
            seconds_per_liquidity_cumulative: self
                .seconds_per_liquidity_cumulative
                .wrapping_add(((elapsed as u128) << 64) / liquidity.max(1)),
            initialized: 1,
            _padding: [0; 15],
        }
    }
}

/// The observation ring buffer.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default)]
pub struct ObservationBuffer {
    observations: Vec<Observation>,
    /// Slot holding the most recent observation.
    index: u16,
    /// Live ring capacity.
    cardinality: u16,
    /// Staged ring capacity; equals `cardinality` when nothing is
    /// staged.
    cardinality_next: u16,
}

impl ObservationBuffer {
    /// Records the first observation and opens the ring at capacity 1.
    pub fn initialize(&mut self, now: i64) {
        self.observations = vec![Observation {
            block_timestamp: now,
            tick_cumulative: 0,
            seconds_per_liquidity_cumulative: 0,
            initialized: 1,
            _padding: [0; 15],
        }];
        self.index = 0;
        self.cardinality = 1;
        self.cardinality_next = 1;
    }

    pub fn cardinality(&self) -> u16 {
        self.cardinality
    }

    pub fn cardinality_next(&self) -> u16 {
        self.cardinality_next
    }

    /// The most recent observation, if the buffer is initialized.
    pub fn newest(&self) -> Option<Observation> {
        self.observations.get(self.index as usize).copied()
    }

    /// Stages a larger capacity. Takes effect as writes wrap into the
    /// staged region; requests at or below the current staging are
    /// accepted and ignored.
    pub fn grow(&mut self, new_cardinality: u16) -> Result<()> {
        if new_cardinality > MAX_OBSERVATION_CARDINALITY {
            return Err(ErrorCode::InvalidCardinality.into());
        }
        if new_cardinality > self.cardinality_next {
            self.cardinality_next = new_cardinality;
        }
        Ok(())
    }

    /// Records an observation at `now` for the given pre-interaction
    /// tick and liquidity.
    ///
    /// Same-second writes collapse into the existing slot, and a
    /// timestamp behind the newest observation writes nothing; callers
    /// validate monotonicity ahead of time, which is what keeps this
    /// infallible inside a commit phase.
    pub fn write(&mut self, now: i64, tick: i32, liquidity: u128) {
        let last = match self.newest() {
            Some(obs) => obs,
            None => return,
        };
        if now <= last.block_timestamp {
            return;
        }
        let updated = last.transform(now, tick, liquidity);

        let (index_next, cardinality_next) =
            if self.cardinality_next > self.cardinality && self.index == self.cardinality - 1 {
                (self.cardinality, self.cardinality_next)
            } else {
                ((self.index + 1) % self.cardinality, self.cardinality)
            };

        if self.observations.len() < cardinality_next as usize {
            self.observations
                .resize(cardinality_next as usize, Observation::default());
        }
        self.observations[index_next as usize] = updated;
        self.index = index_next;
        self.cardinality = cardinality_next;
    }

    /// Oldest observation still held by the ring.
    fn oldest(&self) -> Observation {
        let candidate = self
            .observations
            .get(((self.index + 1) % self.cardinality) as usize)
            .copied()
            .unwrap_or_default();
        if candidate.is_initialized() {
            candidate
        } else {
            self.observations[0]
        }
    }

    /// Cumulative sums as of `now - seconds_ago`.
    ///
    /// `tick` and `liquidity` are the pool's current values, used to
    /// extrapolate past the newest observation.
    pub fn observe_single(
        &self,
        now: i64,
        seconds_ago: u32,
        tick: i32,
        liquidity: u128,
    ) -> Result<(i64, u128)> {
        let newest = self.newest().ok_or(ErrorCode::NotInitialized)?;
        let target = now - seconds_ago as i64;

        if target >= newest.block_timestamp {
            return Ok(if target == newest.block_timestamp {
                (
                    newest.tick_cumulative,
                    newest.seconds_per_liquidity_cumulative,
                )
            } else {
                let t = newest.transform(target, tick, liquidity);
                (t.tick_cumulative, t.seconds_per_liquidity_cumulative)
            });
        }

        let oldest = self.oldest();
        if target < oldest.block_timestamp {
            return Err(ErrorCode::OracleTooOld.into());
        }

        let (before, at_or_after) = self.surrounding(target);
        if before.block_timestamp == target {
            return Ok((before.tick_cumulative, before.seconds_per_liquidity_cumulative));
        }
        if at_or_after.block_timestamp == target {
            return Ok((
                at_or_after.tick_cumulative,
                at_or_after.seconds_per_liquidity_cumulative,
            ));
        }

        // Strictly between two observations: interpolate at the
        // per-second rate recorded over the bracketing interval.
        let observation_delta = at_or_after.block_timestamp - before.block_timestamp;
        let target_delta = target - before.block_timestamp;
        let tick_cumulative = before.tick_cumulative
            + ((at_or_after.tick_cumulative - before.tick_cumulative) / observation_delta)
                * target_delta;
        let spl_delta = at_or_after
            .seconds_per_liquidity_cumulative
            .wrapping_sub(before.seconds_per_liquidity_cumulative);
        let spl_cumulative = before.seconds_per_liquidity_cumulative.wrapping_add(
            (U256::from(spl_delta) * U256::from(target_delta as u128)
                / U256::from(observation_delta as u128))
            .low_u128(),
        );
        Ok((tick_cumulative, spl_cumulative))
    }

    /// Cumulative sums at each of `now - seconds_agos[i]`.
    pub fn observe(
        &self,
        now: i64,
        seconds_agos: &[u32],
        tick: i32,
        liquidity: u128,
    ) -> Result<(Vec<i64>, Vec<u128>)> {
        let mut tick_cumulatives = Vec::with_capacity(seconds_agos.len());
        let mut spl_cumulatives = Vec::with_capacity(seconds_agos.len());
        for &seconds_ago in seconds_agos {
            let (tick_cumulative, spl_cumulative) =
                self.observe_single(now, seconds_ago, tick, liquidity)?;
            tick_cumulatives.push(tick_cumulative);
            spl_cumulatives.push(spl_cumulative);
        }
        Ok((tick_cumulatives, spl_cumulatives))
    }

    /// Arithmetic mean tick over the trailing `window` seconds, rounded
    /// toward negative infinity.
    pub fn twap_tick(&self, now: i64, window: u32, tick: i32, liquidity: u128) -> Result<i32> {
        if window == 0 {
            return Err(ErrorCode::ZeroAmount.into());
        }
        let (cum_start, _) = self.observe_single(now, window, tick, liquidity)?;
        let (cum_end, _) = self.observe_single(now, 0, tick, liquidity)?;

        let delta = cum_end - cum_start;
        let window = window as i64;
        let mut mean = delta / window;
        if delta < 0 && delta % window != 0 {
            mean -= 1;
        }
        Ok(mean as i32)
    }

    /// Finds the two recorded observations bracketing `target`.
    ///
    /// Preconditions, enforced by the caller: the ring holds at least
    /// one observation, `target` is at or after the oldest observation
    /// and strictly before the newest.
    fn surrounding(&self, target: i64) -> (Observation, Observation) {
        let cardinality = self.cardinality as i64;
        let mut l = ((self.index + 1) % self.cardinality) as i64;
        let mut r = l + cardinality - 1;

        loop {
            let i = (l + r) / 2;
            let before = self.observations[(i % cardinality) as usize];
            if !before.is_initialized() {
                // Staged slots that have not wrapped into use yet sit
                // between the oldest and slot zero; skip past them.
                l = i + 1;
                continue;
            }
            let at_or_after = self.observations[((i + 1) % cardinality) as usize];

            let target_at_or_after = before.block_timestamp <= target;
            if target_at_or_after && target <= at_or_after.block_timestamp {
                return (before, at_or_after);
            }
            if !target_at_or_after {
                r = i - 1;
            } else {
                l = i + 1;
            }
        }
    }
}
