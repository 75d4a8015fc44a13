// src/engine/fill.rs

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One execution, with every field already coerced to a usable value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FillRecord {
    pub timestamp:       i64,     // ms since epoch, 0 when absent
    pub instrument:      String,  // "" when absent
    pub realized_pnl:    f64,     // closed PnL carried by this fill
    pub position_before: f64,     // signed net position before the fill
    pub size:            f64,     // traded quantity
    pub price:           f64,     // execution price
    pub direction_label: String,  // e.g. "Open Long", "Close Short"
}

// Canonical name first, then the exchange wire alias.
pub const TIMESTAMP_KEYS:       &[&str] = &["timestamp", "time"];
pub const INSTRUMENT_KEYS:      &[&str] = &["instrument", "coin"];
pub const REALIZED_PNL_KEYS:    &[&str] = &["realized_pnl", "closedPnl"];
pub const POSITION_BEFORE_KEYS: &[&str] = &["position_before", "startPosition"];
pub const SIZE_KEYS:            &[&str] = &["size", "sz"];
pub const PRICE_KEYS:           &[&str] = &["price", "px"];
pub const DIRECTION_KEYS:       &[&str] = &["direction_label", "dir"];

/// A field value as found on the wire, before coercion.
#[derive(Clone, Debug, PartialEq)]
pub enum RawField<'a> {
    Absent,
    Int(i64),
    Float(f64),
    Text(Cow<'a, str>),
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

fn truncate_to_millis(v: f64) -> i64 {
    if v.is_finite() { v.trunc() as i64 } else { 0 }
}

impl RawField<'_> {
    /// Numbers and numeric strings; anything else, or a non-finite result, is 0.
    pub fn to_f64(&self) -> f64 {
        let v = match self {
            RawField::Absent   => 0.0,
            RawField::Int(i)   => *i as f64,
            RawField::Float(f) => *f,
            RawField::Text(s)  => s.trim().parse::<f64>().unwrap_or(0.0),
        };
        finite_or_zero(v)
    }

    pub fn to_timestamp(&self) -> i64 {
        match self {
            RawField::Absent   => 0,
            RawField::Int(i)   => *i,
            RawField::Float(f) => truncate_to_millis(*f),
            RawField::Text(s)  => {
                let s = s.trim();
                s.parse::<i64>()
                    .unwrap_or_else(|_| s.parse::<f64>().map(truncate_to_millis).unwrap_or(0))
            }
        }
    }

    pub fn into_text(self) -> String {
        match self {
            RawField::Text(s) => s.into_owned(),
            _                 => String::new(),
        }
    }
}

impl FillRecord {
    /// Build a record from a key lookup. `lookup` receives the accepted
    /// keys for one field and returns whatever it found under the first
    /// key present.
    pub fn from_fields<'a, F>(mut lookup: F) -> Self
    where
        F: FnMut(&[&str]) -> RawField<'a>,
    {
        FillRecord {
            timestamp:       lookup(TIMESTAMP_KEYS).to_timestamp(),
            instrument:      lookup(INSTRUMENT_KEYS).into_text(),
            realized_pnl:    lookup(REALIZED_PNL_KEYS).to_f64(),
            position_before: lookup(POSITION_BEFORE_KEYS).to_f64(),
            size:            lookup(SIZE_KEYS).to_f64(),
            price:           lookup(PRICE_KEYS).to_f64(),
            direction_label: lookup(DIRECTION_KEYS).into_text(),
        }
    }

    /// `None` for anything that is not a JSON object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self::from_fields(|keys| json_field(obj, keys)))
    }

    /// `|size| * price`
    pub fn notional(&self) -> f64 {
        self.size.abs() * self.price
    }

    pub fn is_flat_before(&self, flat_epsilon: f64) -> bool {
        self.position_before.abs() < flat_epsilon
    }

    pub fn is_closing(&self) -> bool {
        self.direction_label.to_ascii_lowercase().contains("close")
    }

    /// Closing label, long position before, and a size that consumes all
    /// of it within `tolerance` (relative).
    pub fn closes_entire_position(&self, tolerance: f64) -> bool {
        self.is_closing()
            && self.position_before > 0.0
            && ((self.position_before - self.size) / self.position_before).abs() < tolerance
    }
}

fn json_field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> RawField<'a> {
    match keys.iter().find_map(|k| obj.get(*k)) {
        Some(Value::Number(n)) => n
            .as_i64()
            .map(RawField::Int)
            .or_else(|| n.as_f64().map(RawField::Float))
            .unwrap_or(RawField::Absent),
        Some(Value::String(s)) => RawField::Text(Cow::Borrowed(s.as_str())),
        _ => RawField::Absent,
    }
}

/// Decode a batch, skipping entries that are not objects.
pub fn parse_fills(values: &[Value]) -> Vec<FillRecord> {
    let fills: Vec<FillRecord> = values.iter().filter_map(FillRecord::from_json).collect();
    if fills.len() < values.len() {
        log::debug!("skipped {} malformed fill entries", values.len() - fills.len());
    }
    fills
}

/// Decode a JSON document holding an array of fills. A top-level value
/// that is not an array decodes to no fills.
pub fn parse_fills_json(text: &str) -> Result<Vec<FillRecord>, serde_json::Error> {
    let doc: Value = serde_json::from_str(text)?;
    Ok(match doc {
        Value::Array(items) => parse_fills(&items),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn decodes_canonical_keys() {
        let fill = FillRecord::from_json(&json!({
            "timestamp": 1704067200000_i64,
            "instrument": "BTC",
            "realized_pnl": 12.5,
            "position_before": 0.1,
            "size": 0.1,
            "price": 42000,
            "direction_label": "Close Long",
        }))
        .unwrap();

        assert_eq!(fill.timestamp, 1704067200000);
        assert_eq!(fill.instrument, "BTC");
        assert_eq!(fill.realized_pnl, 12.5);
        assert_eq!(fill.position_before, 0.1);
        assert_eq!(fill.size, 0.1);
        assert_eq!(fill.price, 42000.0);
        assert!(fill.is_closing());
    }

    #[test]
    fn decodes_wire_aliases_with_string_numbers() {
        let fill = FillRecord::from_json(&json!({
            "time": 1704067200000_i64,
            "coin": "ETH",
            "closedPnl": "-3.25",
            "startPosition": " -2.0 ",
            "sz": "2.0",
            "px": "2300.5",
            "dir": "Close Short",
        }))
        .unwrap();

        assert_eq!(fill.instrument, "ETH");
        assert_eq!(fill.realized_pnl, -3.25);
        assert_eq!(fill.position_before, -2.0);
        assert_eq!(fill.size, 2.0);
        assert_eq!(fill.price, 2300.5);
        assert_eq!(fill.direction_label, "Close Short");
    }

    #[test]
    fn missing_and_garbage_fields_coerce_to_neutral_values() {
        let fill = FillRecord::from_json(&json!({
            "closedPnl": "abc",
            "sz": null,
            "px": [1, 2],
            "startPosition": true,
            "coin": 7,
        }))
        .unwrap();

        assert_eq!(fill, FillRecord::default());
    }

    #[rstest]
    #[case(json!(null))]
    #[case(json!(42))]
    #[case(json!("fill"))]
    #[case(json!([1, 2, 3]))]
    fn non_objects_are_not_fills(#[case] value: Value) {
        assert!(FillRecord::from_json(&value).is_none());
    }

    #[rstest]
    #[case(RawField::Int(5), 5.0)]
    #[case(RawField::Float(-1.5), -1.5)]
    #[case(RawField::Text(Cow::Borrowed("1e3")), 1000.0)]
    #[case(RawField::Text(Cow::Borrowed("NaN")), 0.0)]
    #[case(RawField::Text(Cow::Borrowed("inf")), 0.0)]
    #[case(RawField::Float(f64::NAN), 0.0)]
    #[case(RawField::Absent, 0.0)]
    fn numeric_coercion(#[case] raw: RawField<'static>, #[case] expected: f64) {
        assert_eq!(raw.to_f64(), expected);
    }

    #[rstest]
    #[case(RawField::Int(17), 17)]
    #[case(RawField::Float(17.9), 17)]
    #[case(RawField::Text(Cow::Borrowed("1704067200000")), 1704067200000)]
    #[case(RawField::Text(Cow::Borrowed("12.7")), 12)]
    #[case(RawField::Text(Cow::Borrowed("soon")), 0)]
    #[case(RawField::Float(f64::INFINITY), 0)]
    fn timestamp_coercion(#[case] raw: RawField<'static>, #[case] expected: i64) {
        assert_eq!(raw.to_timestamp(), expected);
    }

    #[test]
    fn full_close_detection() {
        let mut fill = FillRecord {
            position_before: 10.0,
            size: 10.0,
            direction_label: "Close Long".into(),
            ..FillRecord::default()
        };
        assert!(fill.closes_entire_position(1e-6));

        fill.size = 9.0;
        assert!(!fill.closes_entire_position(1e-6));

        fill.size = 10.0;
        fill.direction_label = "Open Long".into();
        assert!(!fill.closes_entire_position(1e-6));

        fill.direction_label = "close long".into();
        fill.position_before = -10.0;
        assert!(!fill.closes_entire_position(1e-6));
    }

    #[test]
    fn notional_uses_absolute_size() {
        let fill = FillRecord { size: -3.0, price: 10.0, ..FillRecord::default() };
        assert_eq!(fill.notional(), 30.0);
    }

    #[test]
    fn parse_batch_skips_malformed_entries() {
        let fills = parse_fills(&[json!({"coin": "A"}), json!("junk"), json!({"coin": "B"})]);
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[1].instrument, "B");
    }

    #[test]
    fn parse_json_document() {
        let fills = parse_fills_json(r#"[{"coin": "A", "px": "1"}, 5]"#).unwrap();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, 1.0);

        assert!(parse_fills_json(r#"{"coin": "A"}"#).unwrap().is_empty());
        assert!(parse_fills_json("not json").is_err());
    }
}
