//! Precision constants and integer math helpers
//!
//! The on-chain program stores every amount as a scaled integer: prices in
//! `PRICE_PRECISION`, base sizes in `BASE_PRECISION`, quote amounts in
//! `QUOTE_PRECISION`. Intermediate math widens to `u128`/`i128` so products
//! of two scaled u64 values cannot overflow. JSON output stringifies these
//! integers (see the serde helper modules) — a JSON number would lose
//! precision past 2^53 in common clients.

use serde::{Deserialize, Deserializer, Serializer};

/// Scale factor for prices: 1.0 == 1_000_000.
pub const PRICE_PRECISION: u64 = 1_000_000;

/// Scale factor for base asset amounts: 1.0 == 1_000_000_000.
pub const BASE_PRECISION: u64 = 1_000_000_000;

/// Scale factor for quote asset amounts: 1.0 == 1_000_000.
pub const QUOTE_PRECISION: u64 = 1_000_000;

/// Scale factor for ratios (spreads, margins): 100% == 1_000_000.
pub const PERCENTAGE_PRECISION: u64 = 1_000_000;

/// `a * b / c` with a u128 intermediate.
///
/// Returns `None` on division by zero or if the result does not fit in u64.
pub fn mul_div_u64(a: u64, b: u64, c: u64) -> Option<u64> {
    if c == 0 {
        return None;
    }
    let wide = (a as u128).checked_mul(b as u128)? / (c as u128);
    u64::try_from(wide).ok()
}

/// Round a price down to the nearest multiple of `tick`.
pub fn standardize_price_down(price: u64, tick: u64) -> u64 {
    if tick == 0 {
        return price;
    }
    price - price % tick
}

/// Round a price up to the nearest multiple of `tick`.
pub fn standardize_price_up(price: u64, tick: u64) -> u64 {
    if tick == 0 {
        return price;
    }
    match price % tick {
        0 => price,
        rem => price.saturating_add(tick - rem),
    }
}

/// Linear interpolation between two i64 endpoints by `elapsed / duration`.
///
/// `elapsed` is clamped to `duration`; a zero duration returns `end`.
pub fn interpolate_i64(start: i64, end: i64, elapsed: u64, duration: u64) -> i64 {
    if duration == 0 || elapsed >= duration {
        return end;
    }
    let delta = (end as i128) - (start as i128);
    let stepped = (start as i128) + delta * (elapsed as i128) / (duration as i128);
    stepped as i64
}

/// Serde adapter: u64 as a decimal string.
pub mod u64_string {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: i64 as a decimal string.
pub mod i64_string {
    use super::*;

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
