//! Query-parameter parsing and validation
//!
//! Market selection accepts either `marketName` (case-insensitive) or the
//! `marketType` + `marketIndex` pair. Batch endpoints take list-valued
//! params, comma-joined or repeated; all provided lists must be the same
//! length and missing params become all-`None` lists of that length. Every
//! violation surfaces as a 400 with a message naming the offending param.

use types::market::{MarketId, MarketRegistry, MarketType};

use crate::http::error::AppError;

/// Parse a boolean query param (`true`/`false`, `1`/`0`).
pub fn parse_bool(name: &str, value: &str) -> Result<bool, AppError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(AppError::bad_request(format!(
            "invalid boolean for {name}: {value}"
        ))),
    }
}

pub fn parse_u64(name: &str, value: &str) -> Result<u64, AppError> {
    value
        .parse()
        .map_err(|_| AppError::bad_request(format!("invalid integer for {name}: {value}")))
}

pub fn parse_u16(name: &str, value: &str) -> Result<u16, AppError> {
    value
        .parse()
        .map_err(|_| AppError::bad_request(format!("invalid integer for {name}: {value}")))
}

/// Resolve a market from the three selection params.
pub fn resolve_market(
    registry: &MarketRegistry,
    market_name: Option<&str>,
    market_type: Option<&str>,
    market_index: Option<&str>,
) -> Result<MarketId, AppError> {
    if let Some(name) = market_name {
        return registry
            .by_name(name)
            .map(|m| m.market_id)
            .ok_or_else(|| AppError::bad_request(format!("unknown marketName: {name}")));
    }

    let (Some(type_raw), Some(index_raw)) = (market_type, market_index) else {
        return Err(AppError::bad_request(
            "must provide marketName or both marketType and marketIndex",
        ));
    };
    let market_type = MarketType::parse(type_raw).ok_or_else(|| {
        AppError::bad_request(format!(
            "invalid marketType: {type_raw} (expected perp or spot)"
        ))
    })?;
    let market_index = parse_u16("marketIndex", index_raw)?;
    let id = MarketId {
        market_type,
        market_index,
    };
    registry
        .get(id)
        .map(|m| m.market_id)
        .ok_or_else(|| AppError::bad_request(format!("unknown market: {id}")))
}

/// Raw query pairs in arrival order, for the list-valued batch endpoints.
pub struct BatchParams {
    pairs: Vec<(String, String)>,
}

impl BatchParams {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// All values for `key`, flattening comma-joined entries. Empty slots
    /// (`a,,b`) become `None`.
    fn values(&self, key: &str) -> Option<Vec<Option<String>>> {
        let mut out = Vec::new();
        let mut present = false;
        for (k, v) in &self.pairs {
            if k != key {
                continue;
            }
            present = true;
            for part in v.split(',') {
                if part.is_empty() {
                    out.push(None);
                } else {
                    out.push(Some(part.to_string()));
                }
            }
        }
        present.then_some(out)
    }

    /// Normalize every requested key to equal-length lists.
    ///
    /// The batch length comes from the first provided key; mismatched
    /// lengths are a validation error, and missing keys pad out with `None`.
    pub fn normalize(&self, keys: &[&str]) -> Result<Vec<Vec<Option<String>>>, AppError> {
        let mut length: Option<usize> = None;
        let provided: Vec<Option<Vec<Option<String>>>> =
            keys.iter().map(|key| self.values(key)).collect();

        for (key, values) in keys.iter().zip(&provided) {
            if let Some(values) = values {
                match length {
                    None => length = Some(values.len()),
                    Some(expected) if expected != values.len() => {
                        return Err(AppError::bad_request(format!(
                            "mismatched list lengths: {key} has {} entries, expected {expected}",
                            values.len()
                        )));
                    }
                    Some(_) => {}
                }
            }
        }

        let length = length.ok_or_else(|| {
            AppError::bad_request("batch request requires at least one list-valued param")
        })?;

        Ok(provided
            .into_iter()
            .map(|values| values.unwrap_or_else(|| vec![None; length]))
            .collect())
    }
}
