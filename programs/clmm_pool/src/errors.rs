//! Error codes surfaced by the pool engine.
//!
//! Every fallible operation returns one of these through the standard
//! `Result` alias; callers can match on the code to distinguish caller
//! mistakes (bad ranges, stale timestamps) from arithmetic failure.

use anchor_lang::prelude::*;

#[error_code]
pub enum ErrorCode {
    /// A tick index is not aligned to the pool's tick spacing.
    #[msg("Tick index is not a multiple of the pool tick spacing")]
    InvalidTick,

    /// A position range has lower >= upper.
    #[msg("Lower tick must be strictly below upper tick")]
    InvalidRange,

    /// A tick index falls outside [MIN_TICK, MAX_TICK].
    #[msg("Tick index out of bounds")]
    TickOutOfBounds,

    /// An operation that requires a non-zero amount was given zero.
    #[msg("Amount must be non-zero")]
    ZeroAmount,

    /// The pool has not been initialized with a starting price yet.
    #[msg("Pool is not initialized")]
    NotInitialized,

    /// `initialize` was called on a pool that already has a price.
    #[msg("Pool is already initialized")]
    AlreadyInitialized,

    /// Liquidity to remove exceeds what the position holds, or a swap
    /// ran out of liquidity before consuming the specified amount.
    #[msg("Insufficient liquidity")]
    InsufficientLiquidity,

    /// A tick's gross liquidity would exceed the per-tick maximum.
    #[msg("Liquidity at tick exceeds the per-tick maximum")]
    LiquidityOverflow,

    /// No position exists under the given key.
    #[msg("Position not found")]
    PositionNotFound,

    /// The swap price limit is on the wrong side of the current price
    /// or outside the representable price range.
    #[msg("Invalid sqrt price limit")]
    InvalidPriceLimit,

    /// A sqrt price is outside [MIN_SQRT_PRICE, MAX_SQRT_PRICE].
    #[msg("Sqrt price out of range")]
    InvalidPrice,

    /// A fee rate is outside the allowed bounds.
    #[msg("Fee rate out of bounds")]
    InvalidFee,

    /// A protocol fee numerator exceeds the denominator.
    #[msg("Protocol fee out of bounds")]
    InvalidProtocolFee,

    /// A tick spacing of zero or above the maximum was supplied.
    #[msg("Invalid tick spacing")]
    InvalidTickSpacing,

    /// Checked arithmetic overflowed or a conversion lost range.
    #[msg("Math operation overflowed")]
    MathOverflow,

    /// The caller lacks the role required for this operation.
    #[msg("Caller is not authorized")]
    Unauthorized,

    /// A state-mutating call re-entered while the pool was locked.
    #[msg("Pool is locked")]
    Reentrancy,

    /// Requested observation cardinality exceeds the supported maximum.
    #[msg("Observation cardinality out of bounds")]
    InvalidCardinality,

    /// A supplied timestamp is negative or precedes recorded history.
    #[msg("Timestamp is out of order")]
    InvalidTimestamp,

    /// The oracle has no observation old enough for the requested query.
    #[msg("Requested observation predates the oldest recorded one")]
    OracleTooOld,
}
