use serde_json::Value;

use crate::error::HubError;

use super::model::{Bar, RawBar};

/// Shape a stored record into a chart bar.
///
/// `shift_s` is subtracted from the timestamp before scaling to
/// milliseconds; count-back queries pass `0`.
pub fn format_bar(raw: &RawBar, shift_s: i64) -> Result<Bar, HubError> {
    let time = raw
        .ti
        .checked_sub(shift_s)
        .and_then(|t| t.checked_mul(1000))
        .ok_or_else(|| {
            HubError::DataIntegrity(format!("timestamp {} out of range", raw.ti))
        })?;

    Ok(Bar {
        time,
        open: price(&raw.o, "o", raw.ti)?,
        high: price(&raw.h, "h", raw.ti)?,
        low: price(&raw.l, "l", raw.ti)?,
        close: price(&raw.c, "c", raw.ti)?,
        volume: volume(&raw.v, raw.ti)?,
    })
}

pub fn format_bars(raws: &[RawBar], shift_s: i64) -> Result<Vec<Bar>, HubError> {
    raws.iter().map(|r| format_bar(r, shift_s)).collect()
}

fn price(val: &Value, field: &str, ti: i64) -> Result<f64, HubError> {
    let parsed = match val {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| not_numeric(field, ti, val))
}

// Missing volume is normal for index series; a present one must be numeric.
fn volume(val: &Value, ti: i64) -> Result<i64, HubError> {
    match val {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .ok_or_else(|| not_numeric("v", ti, val)),
        Value::String(s) if s.trim().is_empty() => Ok(0),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| not_numeric("v", ti, val)),
        _ => Err(not_numeric("v", ti, val)),
    }
}

fn not_numeric(field: &str, ti: i64, val: &Value) -> HubError {
    HubError::DataIntegrity(format!("field '{field}' of bar ti={ti} is not numeric: {val}"))
}
