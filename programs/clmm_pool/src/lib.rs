#![allow(unexpected_cfgs)]

//! Concentrated liquidity pool engine.
//!
//! A pool holds two tokens and lets providers concentrate liquidity
//! into chosen tick ranges. Swaps walk the tick ladder interval by
//! interval, accruing fees per unit of in-range liquidity, while a ring
//! buffer of cumulative observations backs time-weighted average price
//! queries. Settlement of token balances is the caller's concern: the
//! engine computes and records, and reports amounts to move.

pub mod constants;
pub mod errors;
pub mod fee_growth;
pub mod math;
pub mod oracle;
pub mod pool;
pub mod position;
pub mod roles;
pub mod tick;
pub mod tick_bitmap;

#[cfg(test)]
pub mod unit_test;


pub use pool::{Pool, PoolSnapshot, SwapOutcome};
