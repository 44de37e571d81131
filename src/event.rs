//! Validation of incoming build events.
//!
//! The upstream detector reaches us through an API Gateway mapping template,
//! so everything we care about arrives as strings nested in
//! `params.querystring`. We check the envelope in a fixed order and stop at the
//! first problem, before anything is sent downstream.

use serde_json::Value;
use std::fmt;

/// Tiles are numbered from zero up to and including this value.
pub const MAX_TILE_INDEX: u16 = 1088;

/// The geometry schema versions that we know how to build.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Version {
    V0_9,
    V1_0,
    V1_1,
    V1_2,
}

impl Version {
    pub const ALL: [Version; 4] = [Version::V0_9, Version::V1_0, Version::V1_1, Version::V1_2];

    /// Only the exact literals are accepted: `"1"` or `"1.00"` are not versions.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "0.9" => Some(Version::V0_9),
            "1.0" => Some(Version::V1_0),
            "1.1" => Some(Version::V1_1),
            "1.2" => Some(Version::V1_2),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Version::V0_9 => "0.9",
            Version::V1_0 => "1.0",
            Version::V1_1 => "1.1",
            Version::V1_2 => "1.2",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an event was rejected.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum InvalidEvent {
    #[error("no event data provided")]
    EmptyEvent,

    #[error("event has no `params` object")]
    MissingParams,

    #[error("event has no `params.querystring` object")]
    MissingQuerystring,

    #[error("`tileIndex` must be a non-negative whole number given as a string")]
    InvalidTileIndex,

    #[error("`tileIndex` {0} is out of range (maximum is {})", MAX_TILE_INDEX)]
    TileIndexOutOfRange(String),

    #[error("`blockNumber` must be a non-negative whole number given as a string")]
    InvalidBlockNumber,

    #[error("`hexString` is missing or empty")]
    MissingHexString,

    #[error("`version` must be one of \"0.9\", \"1.0\", \"1.1\" or \"1.2\"")]
    InvalidVersion,
}

/// A build request that has passed validation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuildEvent {
    pub hex_string: String,
    pub tile_index: u16,
    pub block_number: u64,
    pub version: Version,
}

impl BuildEvent {
    pub fn from_payload(payload: Option<&Value>) -> Result<Self, InvalidEvent> {
        let event = match payload {
            None | Some(Value::Null) => return Err(InvalidEvent::EmptyEvent),
            Some(Value::Object(m)) if m.is_empty() => return Err(InvalidEvent::EmptyEvent),
            Some(v) => v,
        };

        let params = event
            .get("params")
            .filter(|v| !v.is_null())
            .ok_or(InvalidEvent::MissingParams)?;

        let query = params
            .get("querystring")
            .filter(|v| !v.is_null())
            .ok_or(InvalidEvent::MissingQuerystring)?;

        let tile_index = match query.get("tileIndex") {
            Some(v) if is_numeric(v) => v,
            _ => return Err(InvalidEvent::InvalidTileIndex),
        };
        let tile_number = numeric_value(tile_index);

        if tile_number > MAX_TILE_INDEX as f64 {
            return Err(InvalidEvent::TileIndexOutOfRange(
                tile_index.as_str().unwrap_or_default().trim().to_owned(),
            ));
        }

        let tile_index = whole_number(tile_number).ok_or(InvalidEvent::InvalidTileIndex)? as u16;

        let block_number = match query.get("blockNumber") {
            Some(v) if is_numeric(v) => {
                exact_whole_number(v).ok_or(InvalidEvent::InvalidBlockNumber)?
            }
            _ => return Err(InvalidEvent::InvalidBlockNumber),
        };

        let hex_string = match query.get("hexString").and_then(Value::as_str) {
            Some(s) if !s.is_empty() => s.to_owned(),
            _ => return Err(InvalidEvent::MissingHexString),
        };

        let version = query
            .get("version")
            .and_then(Value::as_str)
            .and_then(Version::parse)
            .ok_or(InvalidEvent::InvalidVersion)?;

        Ok(BuildEvent {
            hex_string,
            tile_index,
            block_number,
            version,
        })
    }
}

/// Does this JSON value hold a string that reads as a finite number in its
/// entirety? Surrounding whitespace is tolerated; a blank string is not.
pub fn is_numeric(value: &Value) -> bool {
    let Some(text) = value.as_str() else {
        return false;
    };

    let text = text.trim();

    if text.is_empty() {
        return false;
    }

    matches!(text.parse::<f64>(), Ok(n) if n.is_finite())
}

// Only call after `is_numeric` has approved the value.
fn numeric_value(value: &Value) -> f64 {
    value
        .as_str()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(f64::NAN)
}

// Integer text is parsed exactly, since block numbers can exceed the 2^53
// that an f64 holds without rounding. Forms like "12.0" still go through f64.
fn exact_whole_number(value: &Value) -> Option<u64> {
    let text = value.as_str()?.trim();

    match text.parse::<u64>() {
        Ok(n) => Some(n),
        Err(_) => whole_number(numeric_value(value)),
    }
}

fn whole_number(n: f64) -> Option<u64> {
    // NaN-sensitive: NaN fails both comparisons.
    if n >= 0. && n.fract() == 0. && n <= u64::MAX as f64 {
        Some(n as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(query: Value) -> Value {
        json!({ "params": { "querystring": query } })
    }

    fn valid_query() -> Value {
        json!({
            "tileIndex": "17",
            "blockNumber": "4193021",
            "hexString": "0x00ff10",
            "version": "1.1",
        })
    }

    fn check(query: Value) -> Result<BuildEvent, InvalidEvent> {
        BuildEvent::from_payload(Some(&envelope(query)))
    }

    fn without(field: &str) -> Value {
        let mut q = valid_query();
        q.as_object_mut().unwrap().remove(field);
        q
    }

    fn with(field: &str, value: Value) -> Value {
        let mut q = valid_query();
        q[field] = value;
        q
    }

    #[test]
    fn numeric_check() {
        assert!(is_numeric(&json!("42")));
        assert!(is_numeric(&json!("3.14")));
        assert!(is_numeric(&json!("-7")));
        assert!(is_numeric(&json!(" 12 ")));
        assert!(!is_numeric(&json!("abc")));
        assert!(!is_numeric(&json!("  ")));
        assert!(!is_numeric(&json!("")));
        assert!(!is_numeric(&json!("12abc")));
        assert!(!is_numeric(&json!("NaN")));
        assert!(!is_numeric(&json!("inf")));
        assert!(!is_numeric(&json!(42)));
        assert!(!is_numeric(&json!(null)));
        assert!(!is_numeric(&json!(["1"])));
    }

    #[test]
    fn accepts_valid_event() {
        let ev = check(valid_query()).unwrap();
        assert_eq!(
            ev,
            BuildEvent {
                hex_string: "0x00ff10".to_owned(),
                tile_index: 17,
                block_number: 4193021,
                version: Version::V1_1,
            }
        );
    }

    #[test]
    fn boundary_tile_is_accepted() {
        let ev = check(with("tileIndex", json!("1088"))).unwrap();
        assert_eq!(ev.tile_index, 1088);

        let ev = check(with("tileIndex", json!("0"))).unwrap();
        assert_eq!(ev.tile_index, 0);
    }

    #[test]
    fn empty_events() {
        assert_eq!(
            BuildEvent::from_payload(None),
            Err(InvalidEvent::EmptyEvent)
        );
        assert_eq!(
            BuildEvent::from_payload(Some(&Value::Null)),
            Err(InvalidEvent::EmptyEvent)
        );
        assert_eq!(
            BuildEvent::from_payload(Some(&json!({}))),
            Err(InvalidEvent::EmptyEvent)
        );
    }

    #[test]
    fn missing_envelope_parts() {
        assert_eq!(
            BuildEvent::from_payload(Some(&json!({ "body-json": {} }))),
            Err(InvalidEvent::MissingParams)
        );
        assert_eq!(
            BuildEvent::from_payload(Some(&json!({ "params": { "path": {} } }))),
            Err(InvalidEvent::MissingQuerystring)
        );
    }

    #[test]
    fn tile_index_checks() {
        assert_eq!(
            check(without("tileIndex")),
            Err(InvalidEvent::InvalidTileIndex)
        );
        assert_eq!(
            check(with("tileIndex", json!("x12"))),
            Err(InvalidEvent::InvalidTileIndex)
        );
        assert_eq!(
            check(with("tileIndex", json!(12))),
            Err(InvalidEvent::InvalidTileIndex)
        );
        assert_eq!(
            check(with("tileIndex", json!("1089"))),
            Err(InvalidEvent::TileIndexOutOfRange("1089".to_owned()))
        );
        assert_eq!(
            check(with("tileIndex", json!("2.5"))),
            Err(InvalidEvent::InvalidTileIndex)
        );
        assert_eq!(
            check(with("tileIndex", json!("-1"))),
            Err(InvalidEvent::InvalidTileIndex)
        );
    }

    #[test]
    fn block_number_checks() {
        assert_eq!(
            check(without("blockNumber")),
            Err(InvalidEvent::InvalidBlockNumber)
        );
        assert_eq!(
            check(with("blockNumber", json!("12 34"))),
            Err(InvalidEvent::InvalidBlockNumber)
        );
        assert_eq!(
            check(with("blockNumber", json!("-3"))),
            Err(InvalidEvent::InvalidBlockNumber)
        );
    }

    #[test]
    fn block_number_keeps_full_precision() {
        let ev = check(with("blockNumber", json!("9007199254740993"))).unwrap();
        assert_eq!(ev.block_number, 9_007_199_254_740_993);

        let ev = check(with("blockNumber", json!(" 18446744073709551615 "))).unwrap();
        assert_eq!(ev.block_number, u64::MAX);

        let ev = check(with("blockNumber", json!("12.0"))).unwrap();
        assert_eq!(ev.block_number, 12);
    }

    #[test]
    fn hex_string_checks() {
        assert_eq!(
            check(without("hexString")),
            Err(InvalidEvent::MissingHexString)
        );
        assert_eq!(
            check(with("hexString", json!(""))),
            Err(InvalidEvent::MissingHexString)
        );
    }

    #[test]
    fn version_checks() {
        assert_eq!(check(without("version")), Err(InvalidEvent::InvalidVersion));

        for bad in ["1", "2.0", "1.00", " 1.0", "v1.0"] {
            assert_eq!(
                check(with("version", json!(bad))),
                Err(InvalidEvent::InvalidVersion),
                "{bad}"
            );
        }

        for v in Version::ALL {
            assert_eq!(
                check(with("version", json!(v.as_str()))).unwrap().version,
                v
            );
        }
    }

    #[test]
    fn first_failure_wins() {
        let q = json!({ "tileIndex": "5000", "version": "9.9" });
        assert_eq!(
            check(q),
            Err(InvalidEvent::TileIndexOutOfRange("5000".to_owned()))
        );
    }
}
