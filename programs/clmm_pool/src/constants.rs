//! Protocol constants for the concentrated liquidity pool engine.
//!
//! These values pin down the numeric surface of the engine: the Q64.64
//! square-root price representation, the usable tick range, the fee tier
//! table and the epoch length for period accounting.

/// Fixed point scale for square-root prices and fee growth accumulators.
///
/// All sqrt prices are unsigned Q64.64: 64 integer bits, 64 fractional
/// bits, stored in a `u128`.
pub const Q64: u128 = 1u128 << 64;

/// The minimum tick index supported by the engine.
///
/// Price at a tick is 1.0001^tick. The range is bounded at +/-443636 so
/// that price spans 2^-64 .. 2^64, the widest symmetric range over which
/// adjacent ticks still map to distinct Q64.64 sqrt prices.
pub const MIN_TICK: i32 = -443_636;

/// The maximum tick index supported by the engine.
///
/// Mirror of [`MIN_TICK`]; sqrt(1.0001)^MAX_TICK in Q64.64 still fits a
/// `u128` with headroom.
pub const MAX_TICK: i32 = 443_636;

/// Square-root price at [`MIN_TICK`], in Q64.64.
///
/// Lowest price reachable by a swap; used as the open lower bound for
/// price limits on zero-for-one swaps.
pub const MIN_SQRT_PRICE: u128 = 4_295_048_016;

/// Square-root price at [`MAX_TICK`], in Q64.64.
///
/// Highest price reachable by a swap; used as the open upper bound for
/// price limits on one-for-zero swaps.
pub const MAX_SQRT_PRICE: u128 = 79_226_673_515_401_279_988_681_420_430;

/// Precomputed sqrt(1.0001)^(2^i) in Q64.64 for i in 0..19.
///
/// Binary exponentiation over this table turns a tick index into its
/// sqrt price with one fixed-point multiply per set bit. 19 entries
/// cover every exponent up to [`MAX_TICK`] (443636 < 2^19).
pub const SQRT_PRICE_POWERS: [u128; 19] = [
    18_447_666_387_855_959_851,
    18_448_588_748_116_922_571,
    18_450_433_606_991_734_263,
    18_454_123_878_217_468_680,
    18_461_506_635_090_006_702,
    18_476_281_010_653_910_145,
    18_505_865_242_158_250_042,
    18_565_175_891_880_433_523,
    18_684_368_066_214_940_583,
    18_925_053_041_275_764_672,
    19_415_764_168_677_886_927,
    20_435_687_552_633_177_495,
    22_639_080_592_224_303_007,
    27_784_196_929_998_399_742,
    41_848_122_137_994_986_129,
    94_936_283_578_220_370_716,
    488_590_176_327_622_479_861,
    12_941_056_668_319_229_769_860,
    9_078_618_265_828_848_800_676_189,
];

/// Denominator for swap fee rates, which are quoted in parts per million.
///
/// A fee rate of 3000 is 0.30% of the input amount per swap.
pub const FEE_RATE_DENOMINATOR: u32 = 1_000_000;

/// Lowest swap fee rate a pool may be configured with (0.01%).
pub const MIN_FEE_RATE: u32 = 100;

/// Highest swap fee rate a pool may be configured with (10%).
pub const MAX_FEE_RATE: u32 = 100_000;

/// Low fee tier (0.05%), intended for tightly correlated pairs.
pub const FEE_TIER_LOW: u32 = 500;

/// Medium fee tier (0.30%), the default for mainstream pairs.
pub const FEE_TIER_MEDIUM: u32 = 3_000;

/// High fee tier (1.00%), for volatile or exotic pairs.
pub const FEE_TIER_HIGH: u32 = 10_000;

/// Tick spacing paired with [`FEE_TIER_LOW`].
pub const TICK_SPACING_LOW: u16 = 10;

/// Tick spacing paired with [`FEE_TIER_MEDIUM`].
pub const TICK_SPACING_MEDIUM: u16 = 60;

/// Tick spacing paired with [`FEE_TIER_HIGH`].
pub const TICK_SPACING_HIGH: u16 = 200;

/// Widest tick spacing a pool may be configured with.
pub const MAX_TICK_SPACING: u16 = 16_384;

/// Denominator for the protocol fee split.
///
/// The protocol share is `fee_protocol / 100` of every swap fee, diverted
/// at accrual time before the remainder reaches the fee growth
/// accumulators.
pub const PROTOCOL_FEE_DENOMINATOR: u8 = 100;

/// Protocol fee numerator a pool starts with (5%).
pub const DEFAULT_PROTOCOL_FEE: u8 = 5;

/// Length of one fee accounting period in seconds (one week).
///
/// Period index is `timestamp / PERIOD_DURATION`; rollover snapshots are
/// taken lazily on the first interaction of a new period.
pub const PERIOD_DURATION: i64 = 604_800;

/// Upper bound on the oracle observation ring buffer capacity.
pub const MAX_OBSERVATION_CARDINALITY: u16 = 1_024;
