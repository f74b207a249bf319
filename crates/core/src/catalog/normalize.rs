//! Upstream product records arrive in whatever shape the platform happens to
//! return. Normalisation is total: a field that is missing or unreadable
//! becomes `None`, never an error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

static PCT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").unwrap());

static TENOR_MONTHS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:months?|m)").unwrap());

static TENOR_YEARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:years?|y)").unwrap());

static UNDERLIER_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,|]").unwrap());

const COUPON_FIELDS: [&str; 4] = ["couponPct", "coupon_pa", "coupon", "yield"];
const COUPON_TEXT_FIELDS: [&str; 3] = ["title", "name", "description"];
const TENOR_FIELDS: [&str; 4] = ["tenor", "tenorMonths", "term", "maturity"];
const UNDERLIER_FIELDS: [&str; 4] = ["underliers", "underlying", "underlyingAssets", "assets"];
const DESCRIPTOR_FIELDS: [&str; 6] = ["productType", "type", "category", "family", "name", "title"];
const CURRENCY_FIELDS: [&str; 2] = ["currency", "ccy"];
const CREATED_AT_FIELDS: [&str; 3] = ["createdAt", "issueDate", "updatedAt"];
const ID_FIELDS: [&str; 3] = ["id", "productId", "_id"];
const NAME_FIELDS: [&str; 2] = ["name", "title"];
const UNDERLIER_OBJECT_KEYS: [&str; 4] = ["code", "ticker", "symbol", "name"];

/// Canonical view of one upstream structured product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedProduct {
    pub id: Option<String>,
    pub name: Option<String>,
    /// Space-joined bag of every descriptive upstream field; only ever
    /// pattern-matched, never displayed.
    #[serde(rename = "type")]
    pub descriptor: Option<String>,
    pub currency: Option<String>,
    pub tenor_months: Option<u32>,
    pub underliers: Vec<String>,
    pub coupon_pct: Option<f64>,
    /// Epoch milliseconds.
    pub created_at: i64,
}

pub fn normalize_product(raw: &Value) -> NormalizedProduct {
    normalize_product_at(raw, Utc::now())
}

/// `now` is the `createdAt` used when the record carries no usable date.
pub fn normalize_product_at(raw: &Value, now: DateTime<Utc>) -> NormalizedProduct {
    let created_at = first_truthy(raw, &CREATED_AT_FIELDS)
        .and_then(parse_timestamp_ms)
        .filter(|ms| DateTime::<Utc>::from_timestamp_millis(*ms).is_some())
        .unwrap_or_else(|| now.timestamp_millis());

    let coupon_pct = COUPON_FIELDS
        .iter()
        .find_map(|key| raw.get(*key).and_then(parse_pct))
        .or_else(|| pct_from_text(raw));

    let tenor_months = first_truthy(raw, &TENOR_FIELDS).and_then(months_from_tenor);

    let underliers = first_truthy(raw, &UNDERLIER_FIELDS)
        .map(normalize_underliers)
        .unwrap_or_default();

    let descriptor = DESCRIPTOR_FIELDS
        .iter()
        .filter_map(|key| raw.get(*key).filter(|v| is_truthy(v)).and_then(scalar_text))
        .collect::<Vec<_>>()
        .join(" ");

    let currency = first_truthy(raw, &CURRENCY_FIELDS)
        .and_then(scalar_text)
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty());

    NormalizedProduct {
        id: first_truthy(raw, &ID_FIELDS).and_then(scalar_text),
        name: first_truthy(raw, &NAME_FIELDS).and_then(scalar_text),
        descriptor: Some(descriptor).filter(|s| !s.is_empty()),
        currency,
        tenor_months,
        underliers,
        coupon_pct,
        created_at,
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && f.is_finite()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn first_truthy<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| raw.get(*key).filter(|v| is_truthy(v)))
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_pct(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            if let Some(caps) = PCT_RE.captures(s) {
                return caps[1].parse::<f64>().ok();
            }
            parse_finite(s)
        }
        _ => None,
    }
}

fn pct_from_text(raw: &Value) -> Option<f64> {
    let text = COUPON_TEXT_FIELDS
        .iter()
        .filter_map(|key| raw.get(*key).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let caps = PCT_RE.captures(&text)?;
    caps[1].parse::<f64>().ok()
}

fn months_from_tenor(v: &Value) -> Option<u32> {
    let months = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            if let Some(caps) = TENOR_MONTHS_RE.captures(s) {
                caps[1].parse::<f64>().ok()?.round()
            } else if let Some(caps) = TENOR_YEARS_RE.captures(s) {
                (caps[1].parse::<f64>().ok()? * 12.0).round()
            } else {
                parse_finite(s)?
            }
        }
        _ => return None,
    };
    // A zero or negative tenor carries no signal.
    (months.is_finite() && months >= 1.0).then(|| months.round() as u32)
}

fn normalize_underliers(v: &Value) -> Vec<String> {
    let entries: Vec<String> = match v {
        Value::Array(items) => items.iter().filter_map(underlier_text).collect(),
        Value::String(s) => UNDERLIER_SPLIT_RE.split(s).map(str::to_string).collect(),
        _ => Vec::new(),
    };
    entries
        .into_iter()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn underlier_text(v: &Value) -> Option<String> {
    match v {
        Value::Object(map) => UNDERLIER_OBJECT_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        other => scalar_text(other),
    }
}

fn parse_timestamp_ms(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.timestamp_millis());
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(dt.and_utc().timestamp_millis());
            }
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return d
                    .and_hms_opt(0, 0, 0)
                    .map(|dt| dt.and_utc().timestamp_millis());
            }
            s.parse::<i64>().ok()
        }
        _ => None,
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok().filter(|f| f.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn created_at_defaults_to_now_when_every_date_is_missing() {
        let p = normalize_product_at(&json!({"name": "FCN on SPX"}), now());
        assert_eq!(p.created_at, now().timestamp_millis());

        let p = normalize_product_at(&json!({"createdAt": "not a date"}), now());
        assert_eq!(p.created_at, now().timestamp_millis());
    }

    #[test]
    fn created_at_accepts_iso_and_epoch_forms() {
        let iso = normalize_product_at(&json!({"createdAt": "2025-11-02T10:00:00Z"}), now());
        assert_eq!(
            iso.created_at,
            Utc.with_ymd_and_hms(2025, 11, 2, 10, 0, 0).unwrap().timestamp_millis()
        );

        let date = normalize_product_at(&json!({"issueDate": "2025-11-02"}), now());
        assert_eq!(
            date.created_at,
            Utc.with_ymd_and_hms(2025, 11, 2, 0, 0, 0).unwrap().timestamp_millis()
        );

        let epoch = normalize_product_at(&json!({"updatedAt": 1_700_000_000_000_i64}), now());
        assert_eq!(epoch.created_at, 1_700_000_000_000);
    }

    #[test]
    fn out_of_range_created_at_falls_back_to_now() {
        for raw in [
            json!({"createdAt": -1e300}),
            json!({"createdAt": 1e300}),
            json!({"createdAt": "-9223372036854775808"}),
            json!({"createdAt": i64::MAX}),
        ] {
            let p = normalize_product_at(&raw, now());
            assert_eq!(p.created_at, now().timestamp_millis(), "{raw}");
        }
    }

    #[test]
    fn coupon_prefers_structured_fields_in_order() {
        let p = normalize_product_at(
            &json!({"coupon": "9%", "coupon_pa": 8.25, "title": "FCN 12% p.a."}),
            now(),
        );
        assert_eq!(p.coupon_pct, Some(8.25));

        let p = normalize_product_at(&json!({"yield": "7.1"}), now());
        assert_eq!(p.coupon_pct, Some(7.1));
    }

    #[test]
    fn coupon_falls_back_to_percentage_in_text() {
        let p = normalize_product_at(
            &json!({"name": "Autocall", "description": "Pays 12.5% p.a. quarterly"}),
            now(),
        );
        assert_eq!(p.coupon_pct, Some(12.5));
    }

    #[test]
    fn missing_coupon_is_none_not_zero() {
        let p = normalize_product_at(&json!({"name": "Hedge", "coupon": ""}), now());
        assert_eq!(p.coupon_pct, None);
    }

    #[test]
    fn tenor_parses_numbers_months_and_years() {
        let cases = [
            (json!({"tenor": 18}), Some(18)),
            (json!({"tenor": "24 months"}), Some(24)),
            (json!({"term": "6m"}), Some(6)),
            (json!({"maturity": "1.5 years"}), Some(18)),
            (json!({"tenorMonths": "36"}), Some(36)),
            (json!({"tenor": "soon"}), None),
            (json!({"tenor": 0}), None),
        ];
        for (raw, expected) in cases {
            assert_eq!(normalize_product_at(&raw, now()).tenor_months, expected, "{raw}");
        }
    }

    #[test]
    fn underliers_accept_lists_and_delimited_strings() {
        let p = normalize_product_at(&json!({"underliers": [" spx", "", null, "ndx"]}), now());
        assert_eq!(p.underliers, vec!["SPX", "NDX"]);

        let p = normalize_product_at(&json!({"underlying": "bhp | rio,cba,cba"}), now());
        assert_eq!(p.underliers, vec!["BHP", "RIO", "CBA", "CBA"]);

        let p = normalize_product_at(&json!({"assets": [{"ticker": "aapl"}]}), now());
        assert_eq!(p.underliers, vec!["AAPL"]);
    }

    #[test]
    fn descriptor_concatenates_every_descriptive_field() {
        let p = normalize_product_at(
            &json!({
                "productType": "Note",
                "category": "Autocall",
                "name": "Worst-of FCN",
                "title": "SPX/NDX"
            }),
            now(),
        );
        assert_eq!(p.descriptor.as_deref(), Some("Note Autocall Worst-of FCN SPX/NDX"));
        assert_eq!(p.name.as_deref(), Some("Worst-of FCN"));
    }

    #[test]
    fn currency_and_id_are_read_from_alternates() {
        let p = normalize_product_at(&json!({"ccy": "aud", "productId": 42}), now());
        assert_eq!(p.currency.as_deref(), Some("AUD"));
        assert_eq!(p.id.as_deref(), Some("42"));
    }

    #[test]
    fn non_object_records_still_normalise() {
        let p = normalize_product_at(&json!("garbage"), now());
        assert_eq!(p.id, None);
        assert!(p.underliers.is_empty());
        assert_eq!(p.created_at, now().timestamp_millis());
    }
}
