//! The pool itself: swap execution, position changes, fee collection,
//! period rollover and the administrative surface.
//!
//! Every mutating operation runs in two phases. Validation and
//! computation happen first against staged copies (the swap loop walks
//! a `SwapState`, liquidity changes preview tick updates without
//! storing them); only once nothing can fail anymore does the commit
//! phase write the pool, so a rejected operation leaves no trace.
//! A pool-wide lock flag rejects reentrant mutation outright.

use std::collections::BTreeMap;

use anchor_lang::prelude::*;

use crate::constants::*;
use crate::errors::ErrorCode;
use crate::fee_growth::FeeGrowth;
use crate::math;
use crate::oracle::ObservationBuffer;
use crate::position::{Position, PositionKey};
use crate::roles::{Role, RoleChange, RoleTable};
use crate::tick::{self, Tick, TickRegistry};
use crate::tick_bitmap::TickBitmap;

/// Read-only view of the pool's scalar state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub sqrt_price_q64: u128,
    pub tick_current: i32,
    pub liquidity: u128,
    pub fee_rate: u32,
    pub tick_spacing: u16,
    pub fee_protocol: u8,
    pub period: u64,
}

/// State frozen for a finished period: the active liquidity and global
/// fee growth at the moment the first interaction of the next period
/// rolled it over.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PeriodInfo {
    pub liquidity: u128,
    pub fee_growth_global_0: u128,
    pub fee_growth_global_1: u128,
    pub finalized_at: i64,
}

/// Result of a swap.
///
/// Amounts are signed from the pool's perspective: positive means the
/// pool received that token, negative means it paid it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapOutcome {
    pub amount_0: i64,
    pub amount_1: i64,
    pub sqrt_price_after_q64: u128,
    pub tick_after: i32,
    pub liquidity_after: u128,
    /// Total swap fee charged, protocol share included.
    pub fee_amount: u64,
    /// Portion of the fee diverted to the protocol.
    pub protocol_fee: u64,
    /// Number of tick intervals the swap stepped through.
    pub steps: u32,
    /// Number of initialized ticks crossed.
    pub ticks_crossed: u32,
}

/// Running state of a swap while the loop walks tick intervals.
#[derive(Debug, Clone)]
struct SwapState {
    /// Amount still to be satisfied; counts down toward zero from the
    /// specified amount (down in magnitude for exact output).
    amount_specified_remaining: i128,
    /// Amount accumulated on the unspecified side.
    amount_calculated: i128,
    sqrt_price_q64: u128,
    tick: i32,
    liquidity: u128,
    /// Fee growth for the input token, staged until commit.
    fee_growth_global: FeeGrowth,
    /// Protocol's cut of the fees, staged until commit.
    protocol_fee: u128,
    /// Total fee charged so far.
    fee_amount: u128,
    steps: u32,
    crossed: Vec<CrossedTick>,
}

/// A tick crossing recorded during the staged phase of a swap, with the
/// global growth values to flip the tick's outside counters against.
#[derive(Debug, Clone, Copy)]
struct CrossedTick {
    tick: i32,
    fee_growth_global_0: FeeGrowth,
    fee_growth_global_1: FeeGrowth,
}

/// Per-interval bookkeeping for one iteration of the swap loop.
#[derive(Debug, Default, Clone, Copy)]
struct StepComputations {
    sqrt_price_start_q64: u128,
    tick_next: i32,
    initialized: bool,
    sqrt_price_next_q64: u128,
}

/// Whether the swap loop has more intervals to walk.
enum SwapProgress {
    Continue,
    Done,
}

/// A concentrated liquidity pool.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug)]
pub struct Pool {
    /// Swap fee in parts per million.
    pub fee_rate: u32,
    /// Spacing between usable range boundary ticks.
    pub tick_spacing: u16,
    /// Protocol share of swap fees, percent numerator over 100.
    pub fee_protocol: u8,
    /// Current sqrt price, zero until `initialize`.
    pub sqrt_price_q64: u128,
    /// Floor tick of the current price.
    pub tick_current: i32,
    /// Liquidity active at the current tick.
    pub liquidity: u128,
    /// Global fee growth for token 0, Q64.64 per liquidity unit.
    pub fee_growth_global_0: FeeGrowth,
    /// Global fee growth for token 1, Q64.64 per liquidity unit.
    pub fee_growth_global_1: FeeGrowth,
    /// Uncollected protocol fees in token 0.
    pub protocol_fees_0: u64,
    /// Uncollected protocol fees in token 1.
    pub protocol_fees_1: u64,
    /// Current fee accounting period index.
    pub period: u64,
    /// Gross liquidity cap per tick for this pool's spacing.
    pub max_liquidity_per_tick: u128,
    pub(crate) unlocked: bool,
    pub(crate) ticks: TickRegistry,
    pub(crate) tick_bitmap: TickBitmap,
    pub(crate) positions: BTreeMap<PositionKey, Position>,
    pub(crate) observations: ObservationBuffer,
    pub(crate) periods: BTreeMap<u64, PeriodInfo>,
    pub(crate) roles: RoleTable,
}

impl Pool {
    /// Creates a pool shell with its fee configuration and owner. The
    /// pool accepts no liquidity or swaps until [`initialize`] sets a
    /// starting price.
    ///
    /// [`initialize`]: Pool::initialize
    pub fn new(owner: Pubkey, fee_rate: u32, tick_spacing: u16) -> Result<Pool> {
        if !(MIN_FEE_RATE..=MAX_FEE_RATE).contains(&fee_rate) {
            return Err(ErrorCode::InvalidFee.into());
        }
        if tick_spacing == 0 || tick_spacing > MAX_TICK_SPACING {
            return Err(ErrorCode::InvalidTickSpacing.into());
        }

        Ok(Pool {
            fee_rate,
            tick_spacing,
            fee_protocol: DEFAULT_PROTOCOL_FEE,
            sqrt_price_q64: 0,
            tick_current: 0,
            liquidity: 0,
            fee_growth_global_0: FeeGrowth::ZERO,
            fee_growth_global_1: FeeGrowth::ZERO,
            protocol_fees_0: 0,
            protocol_fees_1: 0,
            period: 0,
            max_liquidity_per_tick: tick::max_liquidity_per_tick(tick_spacing),
            unlocked: true,
            ticks: TickRegistry::default(),
            tick_bitmap: TickBitmap::default(),
            positions: BTreeMap::new(),
            observations: ObservationBuffer::default(),
            periods: BTreeMap::new(),
            roles: RoleTable::new(owner),
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.sqrt_price_q64 != 0
    }

    /// Sets the starting price, records the first oracle observation
    /// and opens the current period. Callable exactly once.
    pub fn initialize(&mut self, sqrt_price_q64: u128, now: i64) -> Result<()> {
        if self.is_initialized() {
            return Err(ErrorCode::AlreadyInitialized.into());
        }
        if now < 0 {
            return Err(ErrorCode::InvalidTimestamp.into());
        }
        if !(MIN_SQRT_PRICE..=MAX_SQRT_PRICE).contains(&sqrt_price_q64) {
            return Err(ErrorCode::InvalidPrice.into());
        }

        let tick = math::sqrt_price_q64_to_tick(sqrt_price_q64)?;
        self.sqrt_price_q64 = sqrt_price_q64;
        self.tick_current = tick;
        self.period = (now / PERIOD_DURATION) as u64;
        self.observations.initialize(now);

        emit!(PoolInitialized {
            sqrt_price_q64,
            tick,
            timestamp: now,
        });
        msg!("Pool initialized at sqrt price {} (tick {})", sqrt_price_q64, tick);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Swapping
    // ------------------------------------------------------------------

    /// Executes a swap.
    ///
    /// `amount_specified > 0` is exact input of the sold token,
    /// `amount_specified < 0` is exact output of the bought token.
    /// `zero_for_one` sets the direction (selling token 0 moves the
    /// price down). The swap stops early when the price reaches
    /// `sqrt_price_limit_q64`; a limit equal to the current price is a
    /// no-op. `callback_data` is opaque to the engine and is echoed on
    /// the emitted event for settlement layers to consume.
    pub fn swap(
        &mut self,
        recipient: Pubkey,
        zero_for_one: bool,
        amount_specified: i64,
        sqrt_price_limit_q64: u128,
        callback_data: Vec<u8>,
        now: i64,
    ) -> Result<SwapOutcome> {
        self.lock()?;
        let result = self.swap_inner(
            recipient,
            zero_for_one,
            amount_specified,
            sqrt_price_limit_q64,
            callback_data,
            now,
        );
        self.unlocked = true;
        result
    }

    fn swap_inner(
        &mut self,
        recipient: Pubkey,
        zero_for_one: bool,
        amount_specified: i64,
        sqrt_price_limit_q64: u128,
        callback_data: Vec<u8>,
        now: i64,
    ) -> Result<SwapOutcome> {
        if !self.is_initialized() {
            return Err(ErrorCode::NotInitialized.into());
        }
        if amount_specified == 0 {
            return Err(ErrorCode::ZeroAmount.into());
        }
        self.check_timestamp(now)?;

        if sqrt_price_limit_q64 == self.sqrt_price_q64 {
            return Ok(SwapOutcome {
                amount_0: 0,
                amount_1: 0,
                sqrt_price_after_q64: self.sqrt_price_q64,
                tick_after: self.tick_current,
                liquidity_after: self.liquidity,
                fee_amount: 0,
                protocol_fee: 0,
                steps: 0,
                ticks_crossed: 0,
            });
        }

        let limit_valid = if zero_for_one {
            sqrt_price_limit_q64 < self.sqrt_price_q64 && sqrt_price_limit_q64 > MIN_SQRT_PRICE
        } else {
            sqrt_price_limit_q64 > self.sqrt_price_q64 && sqrt_price_limit_q64 < MAX_SQRT_PRICE
        };
        if !limit_valid {
            return Err(ErrorCode::InvalidPriceLimit.into());
        }

        let rollover = self.period_rollover(now);
        let exact_input = amount_specified > 0;
        let sqrt_price_before = self.sqrt_price_q64;
        let tick_before = self.tick_current;
        let liquidity_before = self.liquidity;

        let mut state = SwapState {
            amount_specified_remaining: amount_specified as i128,
            amount_calculated: 0,
            sqrt_price_q64: self.sqrt_price_q64,
            tick: self.tick_current,
            liquidity: self.liquidity,
            fee_growth_global: if zero_for_one {
                self.fee_growth_global_0
            } else {
                self.fee_growth_global_1
            },
            protocol_fee: 0,
            fee_amount: 0,
            steps: 0,
            crossed: Vec::new(),
        };

        loop {
            match self.swap_step(&mut state, zero_for_one, exact_input, sqrt_price_limit_q64)? {
                SwapProgress::Done => break,
                SwapProgress::Continue => {}
            }
        }

        let consumed = (amount_specified as i128) - state.amount_specified_remaining;
        let (amount_0, amount_1) = if zero_for_one == exact_input {
            (consumed, state.amount_calculated)
        } else {
            (state.amount_calculated, consumed)
        };
        if amount_0 == 0 && amount_1 == 0 {
            // The first interval had no liquidity and none was found
            // before the price limit; nothing was swapped.
            return Err(ErrorCode::InsufficientLiquidity.into());
        }

        let amount_0 = i64::try_from(amount_0).map_err(|_| error!(ErrorCode::MathOverflow))?;
        let amount_1 = i64::try_from(amount_1).map_err(|_| error!(ErrorCode::MathOverflow))?;
        let fee_amount =
            u64::try_from(state.fee_amount).map_err(|_| error!(ErrorCode::MathOverflow))?;
        let protocol_fee =
            u64::try_from(state.protocol_fee).map_err(|_| error!(ErrorCode::MathOverflow))?;
        let protocol_fees_next = if zero_for_one {
            self.protocol_fees_0
                .checked_add(protocol_fee)
                .ok_or_else(|| error!(ErrorCode::MathOverflow))?
        } else {
            self.protocol_fees_1
                .checked_add(protocol_fee)
                .ok_or_else(|| error!(ErrorCode::MathOverflow))?
        };

        // Commit. Nothing below can fail.
        self.apply_period_rollover(rollover);
        self.observations.write(now, tick_before, liquidity_before);
        for crossing in &state.crossed {
            self.ticks.cross(
                crossing.tick,
                crossing.fee_growth_global_0,
                crossing.fee_growth_global_1,
            );
        }
        self.sqrt_price_q64 = state.sqrt_price_q64;
        self.tick_current = state.tick;
        self.liquidity = state.liquidity;
        if zero_for_one {
            self.fee_growth_global_0 = state.fee_growth_global;
            self.protocol_fees_0 = protocol_fees_next;
        } else {
            self.fee_growth_global_1 = state.fee_growth_global;
            self.protocol_fees_1 = protocol_fees_next;
        }

        emit!(SwapExecuted {
            recipient,
            zero_for_one,
            amount_specified,
            amount_0,
            amount_1,
            sqrt_price_before_q64: sqrt_price_before,
            sqrt_price_after_q64: state.sqrt_price_q64,
            tick_before,
            tick_after: state.tick,
            liquidity_before,
            liquidity_after: state.liquidity,
            fee_amount,
            protocol_fee,
            callback_data,
            timestamp: now,
        });
        msg!(
            "Swap settled in {} steps, {} ticks crossed: {} / {}",
            state.steps,
            state.crossed.len(),
            amount_0,
            amount_1
        );

        Ok(SwapOutcome {
            amount_0,
            amount_1,
            sqrt_price_after_q64: state.sqrt_price_q64,
            tick_after: state.tick,
            liquidity_after: state.liquidity,
            fee_amount,
            protocol_fee,
            steps: state.steps,
            ticks_crossed: state.crossed.len() as u32,
        })
    }

    /// One iteration of the swap loop: find the next boundary, swap up
    /// to it, accrue fees and cross the boundary if it was reached.
    fn swap_step(
        &self,
        state: &mut SwapState,
        zero_for_one: bool,
        exact_input: bool,
        sqrt_price_limit_q64: u128,
    ) -> Result<SwapProgress> {
        if state.amount_specified_remaining == 0 || state.sqrt_price_q64 == sqrt_price_limit_q64 {
            return Ok(SwapProgress::Done);
        }

        let mut step = StepComputations {
            sqrt_price_start_q64: state.sqrt_price_q64,
            ..Default::default()
        };

        let (tick_next, initialized) = self.tick_bitmap.next_initialized_tick_within_one_word(
            state.tick,
            self.tick_spacing,
            zero_for_one,
        );
        step.initialized = initialized;
        step.tick_next = tick_next.clamp(MIN_TICK, MAX_TICK);
        step.sqrt_price_next_q64 = math::tick_to_sqrt_price_q64(step.tick_next)?;

        // Swap no further than the nearer of the boundary and the limit.
        let target = if zero_for_one {
            step.sqrt_price_next_q64.max(sqrt_price_limit_q64)
        } else {
            step.sqrt_price_next_q64.min(sqrt_price_limit_q64)
        };
        let computed = math::compute_swap_step(
            state.sqrt_price_q64,
            target,
            state.liquidity,
            state.amount_specified_remaining,
            self.fee_rate,
        )?;
        state.sqrt_price_q64 = computed.sqrt_price_next_q64;

        let amount_in_with_fee = i128::try_from(
            computed
                .amount_in
                .checked_add(computed.fee_amount)
                .ok_or_else(|| error!(ErrorCode::MathOverflow))?,
        )
        .map_err(|_| error!(ErrorCode::MathOverflow))?;
        let amount_out = i128::try_from(computed.amount_out)
            .map_err(|_| error!(ErrorCode::MathOverflow))?;

        if exact_input {
            state.amount_specified_remaining = state
                .amount_specified_remaining
                .checked_sub(amount_in_with_fee)
                .ok_or_else(|| error!(ErrorCode::MathOverflow))?;
            state.amount_calculated = state
                .amount_calculated
                .checked_sub(amount_out)
                .ok_or_else(|| error!(ErrorCode::MathOverflow))?;
        } else {
            state.amount_specified_remaining = state
                .amount_specified_remaining
                .checked_add(amount_out)
                .ok_or_else(|| error!(ErrorCode::MathOverflow))?;
            state.amount_calculated = state
                .amount_calculated
                .checked_add(amount_in_with_fee)
                .ok_or_else(|| error!(ErrorCode::MathOverflow))?;
        }

        // Protocol fee is diverted at accrual, before the growth
        // accumulator sees the remainder.
        let mut fee = computed.fee_amount;
        if self.fee_protocol > 0 {
            let delta = fee
                .checked_mul(self.fee_protocol as u128)
                .ok_or_else(|| error!(ErrorCode::MathOverflow))?
                / PROTOCOL_FEE_DENOMINATOR as u128;
            fee -= delta;
            state.protocol_fee = state
                .protocol_fee
                .checked_add(delta)
                .ok_or_else(|| error!(ErrorCode::MathOverflow))?;
        }
        state.fee_amount = state
            .fee_amount
            .checked_add(computed.fee_amount)
            .ok_or_else(|| error!(ErrorCode::MathOverflow))?;
        if state.liquidity > 0 {
            state.fee_growth_global = state.fee_growth_global.accrue(fee, state.liquidity);
        }

        if state.sqrt_price_q64 == step.sqrt_price_next_q64 {
            // Reached the boundary tick. Crossing is staged with the
            // globals as of this instant; the commit phase flips the
            // tick's outside counters with exactly these values.
            if step.initialized {
                let (fee_growth_global_0, fee_growth_global_1) = if zero_for_one {
                    (state.fee_growth_global, self.fee_growth_global_1)
                } else {
                    (self.fee_growth_global_0, state.fee_growth_global)
                };
                state.crossed.push(CrossedTick {
                    tick: step.tick_next,
                    fee_growth_global_0,
                    fee_growth_global_1,
                });

                let mut liquidity_net = self.ticks.liquidity_net(step.tick_next);
                if zero_for_one {
                    liquidity_net = -liquidity_net;
                }
                state.liquidity = math::add_liquidity_delta(state.liquidity, liquidity_net)?;
            }
            state.tick = if zero_for_one {
                step.tick_next - 1
            } else {
                step.tick_next
            };
        } else if state.sqrt_price_q64 != step.sqrt_price_start_q64 {
            state.tick = math::sqrt_price_q64_to_tick(state.sqrt_price_q64)?;
        }

        state.steps += 1;
        Ok(SwapProgress::Continue)
    }

    // ------------------------------------------------------------------
    // Liquidity and fees
    // ------------------------------------------------------------------

    /// Adds or removes liquidity on a position, creating it on first
    /// add and settling its fees along the way. A zero delta is a poke:
    /// it settles fees on an existing position without changing
    /// liquidity.
    ///
    /// Returns the token amounts the position owes the pool (on add) or
    /// the pool owes the position (on remove); removal proceeds are
    /// credited to the position's owed balances for later `collect`.
    pub fn modify_liquidity(
        &mut self,
        owner: Pubkey,
        tick_lower: i32,
        tick_upper: i32,
        index: u32,
        liquidity_delta: i128,
        now: i64,
    ) -> Result<(u64, u64)> {
        self.lock()?;
        let result =
            self.modify_liquidity_inner(owner, tick_lower, tick_upper, index, liquidity_delta, now);
        self.unlocked = true;
        result
    }

    fn modify_liquidity_inner(
        &mut self,
        owner: Pubkey,
        tick_lower: i32,
        tick_upper: i32,
        index: u32,
        liquidity_delta: i128,
        now: i64,
    ) -> Result<(u64, u64)> {
        if !self.is_initialized() {
            return Err(ErrorCode::NotInitialized.into());
        }
        self.check_range(tick_lower, tick_upper)?;
        self.check_timestamp(now)?;

        let key = PositionKey {
            owner,
            tick_lower,
            tick_upper,
            index,
        };
        let existing = self.positions.get(&key).copied();
        if liquidity_delta == 0 && existing.is_none() {
            return Err(ErrorCode::PositionNotFound.into());
        }

        let rollover = self.period_rollover(now);
        let in_range = tick_lower <= self.tick_current && self.tick_current < tick_upper;

        // Stage the boundary tick updates without committing them.
        let staged_ticks = if liquidity_delta != 0 {
            let (lower_data, lower_flipped) = self.ticks.updated(
                tick_lower,
                self.tick_current,
                liquidity_delta,
                self.fee_growth_global_0,
                self.fee_growth_global_1,
                false,
                self.max_liquidity_per_tick,
            )?;
            let (upper_data, upper_flipped) = self.ticks.updated(
                tick_upper,
                self.tick_current,
                liquidity_delta,
                self.fee_growth_global_0,
                self.fee_growth_global_1,
                true,
                self.max_liquidity_per_tick,
            )?;
            Some((lower_data, lower_flipped, upper_data, upper_flipped))
        } else {
            None
        };

        let (inside_0, inside_1) = match &staged_ticks {
            Some((lower_data, _, upper_data, _)) => tick::fee_growth_inside(
                tick_lower,
                lower_data,
                tick_upper,
                upper_data,
                self.tick_current,
                self.fee_growth_global_0,
                self.fee_growth_global_1,
            ),
            None => self.ticks.fee_growth_inside(
                tick_lower,
                tick_upper,
                self.tick_current,
                self.fee_growth_global_0,
                self.fee_growth_global_1,
            ),
        };

        let mut position = existing.unwrap_or_default();
        position.update(liquidity_delta, inside_0, inside_1)?;

        let sqrt_price_lower = math::tick_to_sqrt_price_q64(tick_lower)?;
        let sqrt_price_upper = math::tick_to_sqrt_price_q64(tick_upper)?;
        let round_up = liquidity_delta > 0;
        let liquidity_abs = liquidity_delta.unsigned_abs();

        // Which tokens the delta moves depends on where the current
        // price sits relative to the range.
        let (amount_0, amount_1, liquidity_next) = if liquidity_delta == 0 {
            (0, 0, self.liquidity)
        } else if self.tick_current < tick_lower {
            (
                math::get_amount_0_delta(sqrt_price_lower, sqrt_price_upper, liquidity_abs, round_up)?,
                0,
                self.liquidity,
            )
        } else if self.tick_current < tick_upper {
            (
                math::get_amount_0_delta(
                    self.sqrt_price_q64,
                    sqrt_price_upper,
                    liquidity_abs,
                    round_up,
                )?,
                math::get_amount_1_delta(
                    sqrt_price_lower,
                    self.sqrt_price_q64,
                    liquidity_abs,
                    round_up,
                )?,
                math::add_liquidity_delta(self.liquidity, liquidity_delta)?,
            )
        } else {
            (
                0,
                math::get_amount_1_delta(sqrt_price_lower, sqrt_price_upper, liquidity_abs, round_up)?,
                self.liquidity,
            )
        };
        let amount_0 = u64::try_from(amount_0).map_err(|_| error!(ErrorCode::MathOverflow))?;
        let amount_1 = u64::try_from(amount_1).map_err(|_| error!(ErrorCode::MathOverflow))?;

        // On removal the tokens released by the liquidity come back to
        // the owner through the owed balances, capped at u64.
        if liquidity_delta < 0 {
            position.tokens_owed_0 = position.tokens_owed_0.saturating_add(amount_0);
            position.tokens_owed_1 = position.tokens_owed_1.saturating_add(amount_1);
        }

        // Commit. Nothing below can fail except bitmap flips on ticks
        // whose alignment was already validated.
        self.apply_period_rollover(rollover);
        if let Some((lower_data, lower_flipped, upper_data, upper_flipped)) = staged_ticks {
            if in_range {
                // Oracle sees the liquidity that held until this moment.
                self.observations.write(now, self.tick_current, self.liquidity);
            }
            self.ticks.store(tick_lower, lower_data);
            self.ticks.store(tick_upper, upper_data);
            if lower_flipped {
                self.tick_bitmap.flip(tick_lower, self.tick_spacing)?;
            }
            if upper_flipped {
                self.tick_bitmap.flip(tick_upper, self.tick_spacing)?;
            }
            self.liquidity = liquidity_next;
        }
        if position.is_empty() {
            self.positions.remove(&key);
        } else {
            self.positions.insert(key, position);
        }

        emit!(LiquidityModified {
            owner,
            tick_lower,
            tick_upper,
            index,
            liquidity_delta,
            amount_0,
            amount_1,
            timestamp: now,
        });
        msg!(
            "Liquidity changed by {} in [{}, {}): amounts {} / {}",
            liquidity_delta,
            tick_lower,
            tick_upper,
            amount_0,
            amount_1
        );
        Ok((amount_0, amount_1))
    }

    /// Pays out fees owed to a position, up to the requested amounts.
    ///
    /// Settles pending fee growth first so the payout includes
    /// everything earned up to now. Collecting from a position that
    /// does not exist returns zero amounts.
    pub fn collect(
        &mut self,
        owner: Pubkey,
        tick_lower: i32,
        tick_upper: i32,
        index: u32,
        amount_0_requested: u64,
        amount_1_requested: u64,
    ) -> Result<(u64, u64)> {
        self.lock()?;
        let result = self.collect_inner(
            owner,
            tick_lower,
            tick_upper,
            index,
            amount_0_requested,
            amount_1_requested,
        );
        self.unlocked = true;
        result
    }

    fn collect_inner(
        &mut self,
        owner: Pubkey,
        tick_lower: i32,
        tick_upper: i32,
        index: u32,
        amount_0_requested: u64,
        amount_1_requested: u64,
    ) -> Result<(u64, u64)> {
        if !self.is_initialized() {
            return Err(ErrorCode::NotInitialized.into());
        }
        let key = PositionKey {
            owner,
            tick_lower,
            tick_upper,
            index,
        };
        let Some(&existing) = self.positions.get(&key) else {
            return Ok((0, 0));
        };

        let mut position = existing;
        if position.liquidity > 0 {
            let (inside_0, inside_1) = self.ticks.fee_growth_inside(
                tick_lower,
                tick_upper,
                self.tick_current,
                self.fee_growth_global_0,
                self.fee_growth_global_1,
            );
            position.update(0, inside_0, inside_1)?;
        }

        let amount_0 = amount_0_requested.min(position.tokens_owed_0);
        let amount_1 = amount_1_requested.min(position.tokens_owed_1);
        position.tokens_owed_0 -= amount_0;
        position.tokens_owed_1 -= amount_1;

        if position.is_empty() {
            self.positions.remove(&key);
        } else {
            self.positions.insert(key, position);
        }

        if amount_0 > 0 || amount_1 > 0 {
            emit!(FeesCollected {
                owner,
                tick_lower,
                tick_upper,
                index,
                amount_0,
                amount_1,
            });
        }
        Ok((amount_0, amount_1))
    }

    /// Withdraws accumulated protocol fees, up to the requested caps.
    /// Requires the protocol collector role.
    pub fn collect_protocol_fees(
        &mut self,
        caller: Pubkey,
        recipient: Pubkey,
        amount_0_requested: u64,
        amount_1_requested: u64,
    ) -> Result<(u64, u64)> {
        self.lock()?;
        let result =
            self.collect_protocol_fees_inner(caller, recipient, amount_0_requested, amount_1_requested);
        self.unlocked = true;
        result
    }

    fn collect_protocol_fees_inner(
        &mut self,
        caller: Pubkey,
        recipient: Pubkey,
        amount_0_requested: u64,
        amount_1_requested: u64,
    ) -> Result<(u64, u64)> {
        self.roles.require(caller, Role::ProtocolCollector)?;

        let amount_0 = amount_0_requested.min(self.protocol_fees_0);
        let amount_1 = amount_1_requested.min(self.protocol_fees_1);
        self.protocol_fees_0 -= amount_0;
        self.protocol_fees_1 -= amount_1;

        if amount_0 > 0 || amount_1 > 0 {
            emit!(ProtocolFeesCollected {
                caller,
                recipient,
                amount_0,
                amount_1,
            });
        }
        Ok((amount_0, amount_1))
    }

    // ------------------------------------------------------------------
    // Parameters and roles
    // ------------------------------------------------------------------

    /// Changes the swap fee rate. Requires the fee setter role.
    pub fn set_fee(&mut self, caller: Pubkey, fee_rate: u32) -> Result<()> {
        self.lock()?;
        let result = self.set_fee_inner(caller, fee_rate);
        self.unlocked = true;
        result
    }

    fn set_fee_inner(&mut self, caller: Pubkey, fee_rate: u32) -> Result<()> {
        self.roles.require(caller, Role::FeeSetter)?;
        if !(MIN_FEE_RATE..=MAX_FEE_RATE).contains(&fee_rate) {
            return Err(ErrorCode::InvalidFee.into());
        }
        let previous_fee_rate = self.fee_rate;
        self.fee_rate = fee_rate;
        emit!(FeeSet {
            caller,
            previous_fee_rate,
            fee_rate,
        });
        Ok(())
    }

    /// Changes the protocol's share of swap fees. Requires the fee
    /// setter role.
    pub fn set_fee_protocol(&mut self, caller: Pubkey, fee_protocol: u8) -> Result<()> {
        self.lock()?;
        let result = self.set_fee_protocol_inner(caller, fee_protocol);
        self.unlocked = true;
        result
    }

    fn set_fee_protocol_inner(&mut self, caller: Pubkey, fee_protocol: u8) -> Result<()> {
        self.roles.require(caller, Role::FeeSetter)?;
        if fee_protocol > PROTOCOL_FEE_DENOMINATOR {
            return Err(ErrorCode::InvalidProtocolFee.into());
        }
        let previous_fee_protocol = self.fee_protocol;
        self.fee_protocol = fee_protocol;
        emit!(FeeProtocolSet {
            caller,
            previous_fee_protocol,
            fee_protocol,
        });
        Ok(())
    }

    /// Stages a larger oracle ring capacity. Requires the owner role.
    pub fn grow_observations(&mut self, caller: Pubkey, new_cardinality: u16) -> Result<()> {
        self.lock()?;
        let result = self.grow_observations_inner(caller, new_cardinality);
        self.unlocked = true;
        result
    }

    fn grow_observations_inner(&mut self, caller: Pubkey, new_cardinality: u16) -> Result<()> {
        self.roles.require(caller, Role::Owner)?;
        if !self.is_initialized() {
            return Err(ErrorCode::NotInitialized.into());
        }
        let previous_cardinality_next = self.observations.cardinality_next();
        self.observations.grow(new_cardinality)?;
        let cardinality_next = self.observations.cardinality_next();
        if cardinality_next != previous_cardinality_next {
            emit!(ObservationCardinalityGrown {
                caller,
                previous_cardinality_next,
                cardinality_next,
            });
        }
        Ok(())
    }

    /// Grants a role. Owner only.
    pub fn grant_role(&mut self, actor: Pubkey, target: Pubkey, role: Role, now: i64) -> Result<()> {
        self.lock()?;
        let result = if now < 0 {
            Err(ErrorCode::InvalidTimestamp.into())
        } else {
            self.roles.grant(actor, target, role, now)
        };
        self.unlocked = true;
        result
    }

    /// Revokes a role. Owner only.
    pub fn revoke_role(
        &mut self,
        actor: Pubkey,
        target: Pubkey,
        role: Role,
        now: i64,
    ) -> Result<()> {
        self.lock()?;
        let result = if now < 0 {
            Err(ErrorCode::InvalidTimestamp.into())
        } else {
            self.roles.revoke(actor, target, role, now)
        };
        self.unlocked = true;
        result
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            sqrt_price_q64: self.sqrt_price_q64,
            tick_current: self.tick_current,
            liquidity: self.liquidity,
            fee_rate: self.fee_rate,
            tick_spacing: self.tick_spacing,
            fee_protocol: self.fee_protocol,
            period: self.period,
        }
    }

    pub fn owner(&self) -> Pubkey {
        self.roles.owner()
    }

    /// Raw global fee growth counters, token 0 then token 1.
    pub fn fee_growth_global(&self) -> (u128, u128) {
        (self.fee_growth_global_0.raw(), self.fee_growth_global_1.raw())
    }

    pub fn protocol_fees(&self) -> (u64, u64) {
        (self.protocol_fees_0, self.protocol_fees_1)
    }

    pub fn tick_state(&self, tick: i32) -> Option<Tick> {
        self.ticks.get(tick)
    }

    pub fn position_state(
        &self,
        owner: Pubkey,
        tick_lower: i32,
        tick_upper: i32,
        index: u32,
    ) -> Option<Position> {
        self.positions
            .get(&PositionKey {
                owner,
                tick_lower,
                tick_upper,
                index,
            })
            .copied()
    }

    /// Snapshot of a finalized period, if that period has rolled over.
    pub fn period_info(&self, period: u64) -> Option<PeriodInfo> {
        self.periods.get(&period).copied()
    }

    /// Cumulative oracle sums at each `now - seconds_agos[i]`.
    pub fn observe(&self, now: i64, seconds_agos: &[u32]) -> Result<(Vec<i64>, Vec<u128>)> {
        self.observations
            .observe(now, seconds_agos, self.tick_current, self.liquidity)
    }

    /// Arithmetic mean tick over the trailing `window` seconds.
    pub fn twap_tick(&self, now: i64, window: u32) -> Result<i32> {
        self.observations
            .twap_tick(now, window, self.tick_current, self.liquidity)
    }

    /// Administrative grant/revoke history.
    pub fn audit_log(&self) -> &[RoleChange] {
        self.roles.audit_log()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn lock(&mut self) -> Result<()> {
        require!(self.unlocked, ErrorCode::Reentrancy);
        self.unlocked = false;
        Ok(())
    }

    fn check_timestamp(&self, now: i64) -> Result<()> {
        if now < 0 {
            return Err(ErrorCode::InvalidTimestamp.into());
        }
        if let Some(newest) = self.observations.newest() {
            if now < newest.block_timestamp {
                return Err(ErrorCode::InvalidTimestamp.into());
            }
        }
        Ok(())
    }

    fn check_range(&self, tick_lower: i32, tick_upper: i32) -> Result<()> {
        if tick_lower >= tick_upper {
            return Err(ErrorCode::InvalidRange.into());
        }
        if tick_lower < MIN_TICK || tick_upper > MAX_TICK {
            return Err(ErrorCode::TickOutOfBounds.into());
        }
        let spacing = self.tick_spacing as i32;
        if tick_lower % spacing != 0 || tick_upper % spacing != 0 {
            return Err(ErrorCode::InvalidTick.into());
        }
        Ok(())
    }

    /// Snapshot to take if `now` falls in a later period than the
    /// pool's current one. Pure; committed via
    /// [`apply_period_rollover`].
    ///
    /// [`apply_period_rollover`]: Pool::apply_period_rollover
    fn period_rollover(&self, now: i64) -> Option<(u64, PeriodInfo)> {
        let current = (now / PERIOD_DURATION) as u64;
        if current > self.period {
            Some((
                current,
                PeriodInfo {
                    liquidity: self.liquidity,
                    fee_growth_global_0: self.fee_growth_global_0.raw(),
                    fee_growth_global_1: self.fee_growth_global_1.raw(),
                    finalized_at: now,
                },
            ))
        } else {
            None
        }
    }

    fn apply_period_rollover(&mut self, rollover: Option<(u64, PeriodInfo)>) {
        if let Some((next_period, info)) = rollover {
            let timestamp = info.finalized_at;
            self.periods.insert(self.period, info);
            emit!(PeriodFinalized {
                period: self.period,
                next_period,
                liquidity: info.liquidity,
                fee_growth_global_0: info.fee_growth_global_0,
                fee_growth_global_1: info.fee_growth_global_1,
                timestamp,
            });
            self.period = next_period;
        }
    }
}

// ----------------------------------------------------------------------
// Events
// ----------------------------------------------------------------------

/// Emitted once when the pool receives its starting price.
#[event]
pub struct PoolInitialized {
    pub sqrt_price_q64: u128,
    pub tick: i32,
    pub timestamp: i64,
}

/// Emitted after every successful swap.
#[event]
pub struct SwapExecuted {
    /// Account the output is destined for.
    pub recipient: Pubkey,
    /// Swap direction; token 0 in, token 1 out when true.
    pub zero_for_one: bool,
    /// Signed amount the caller specified; positive for exact input.
    pub amount_specified: i64,
    /// Token 0 delta from the pool's perspective.
    pub amount_0: i64,
    /// Token 1 delta from the pool's perspective.
    pub amount_1: i64,
    pub sqrt_price_before_q64: u128,
    pub sqrt_price_after_q64: u128,
    pub tick_before: i32,
    pub tick_after: i32,
    pub liquidity_before: u128,
    pub liquidity_after: u128,
    /// Total fee charged, protocol share included.
    pub fee_amount: u64,
    pub protocol_fee: u64,
    /// Opaque payload passed through from the caller.
    pub callback_data: Vec<u8>,
    pub timestamp: i64,
}

/// Emitted after liquidity is added, removed or poked.
#[event]
pub struct LiquidityModified {
    pub owner: Pubkey,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub index: u32,
    pub liquidity_delta: i128,
    pub amount_0: u64,
    pub amount_1: u64,
    pub timestamp: i64,
}

/// Emitted when a position collects owed fees.
#[event]
pub struct FeesCollected {
    pub owner: Pubkey,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub index: u32,
    pub amount_0: u64,
    pub amount_1: u64,
}

/// Emitted when protocol fees are withdrawn.
#[event]
pub struct ProtocolFeesCollected {
    pub caller: Pubkey,
    pub recipient: Pubkey,
    pub amount_0: u64,
    pub amount_1: u64,
}

/// Emitted when the swap fee rate changes.
#[event]
pub struct FeeSet {
    pub caller: Pubkey,
    pub previous_fee_rate: u32,
    pub fee_rate: u32,
}

/// Emitted when the protocol fee split changes.
#[event]
pub struct FeeProtocolSet {
    pub caller: Pubkey,
    pub previous_fee_protocol: u8,
    pub fee_protocol: u8,
}

/// Emitted when the oracle ring capacity is staged to grow.
#[event]
pub struct ObservationCardinalityGrown {
    pub caller: Pubkey,
    pub previous_cardinality_next: u16,
    pub cardinality_next: u16,
}

/// Emitted when an interaction finalizes an elapsed period.
#[event]
pub struct PeriodFinalized {
    pub period: u64,
    pub next_period: u64,
    pub liquidity: u128,
    pub fee_growth_global_0: u128,
    pub fee_growth_global_1: u128,
    pub timestamp: i64,
}
