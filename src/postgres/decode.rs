//! Decoding of result columns into [`RowValues`].

use std::error::Error;
use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Kind, Type};

use crate::types::RowValues;

type BoxError = Box<dyn Error + Sync + Send>;

/// Decode column `idx` of `row` by its server type.
///
/// Types without a dedicated `RowValues` variant are decoded by [`AnyValue`],
/// so every column type can be read.
///
/// # Errors
/// Returns the driver error if the column cannot be decoded.
pub fn extract_value(row: &Row, idx: usize) -> Result<RowValues, tokio_postgres::Error> {
    let value = match *row.columns()[idx].type_() {
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        Type::INT8 => row
            .try_get::<_, Option<i64>>(idx)?
            .map_or(RowValues::Null, RowValues::Int),
        Type::OID => row
            .try_get::<_, Option<u32>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Float(f64::from(v))),
        Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(idx)?
            .map_or(RowValues::Null, RowValues::Float),
        Type::BOOL => row
            .try_get::<_, Option<bool>>(idx)?
            .map_or(RowValues::Null, RowValues::Bool),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map_or(RowValues::Null, RowValues::Timestamp),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map_or(RowValues::Null, |v| RowValues::Timestamp(v.naive_utc())),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map_or(RowValues::Null, |d| {
                RowValues::Timestamp(d.and_time(NaiveTime::MIN))
            }),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<Value>>(idx)?
            .map_or(RowValues::Null, RowValues::JSON),
        Type::BYTEA => row
            .try_get::<_, Option<Vec<u8>>>(idx)?
            .map_or(RowValues::Null, RowValues::Blob),
        _ => row.try_get::<_, AnyValue>(idx)?.0,
    };
    Ok(value)
}

/// Column value of any server type.
///
/// Text-like and enum types become `Text`. `numeric`, `uuid`, `time` and
/// `interval` are rendered as text the way the server prints them. Anything
/// else is kept as its raw binary representation in a `Blob`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnyValue(pub RowValues);

impl<'a> FromSql<'a> for AnyValue {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let value = match *ty {
            Type::NUMERIC => RowValues::Text(decode_numeric(raw)?),
            Type::UUID => RowValues::Text(decode_uuid(raw)?),
            Type::TIME => RowValues::Text(NaiveTime::from_sql(ty, raw)?.to_string()),
            Type::INTERVAL => RowValues::Text(decode_interval(raw)?),
            _ if <String as FromSql>::accepts(ty) || matches!(ty.kind(), Kind::Enum(_)) => {
                RowValues::Text(std::str::from_utf8(raw)?.to_string())
            }
            _ => RowValues::Blob(raw.to_vec()),
        };
        Ok(AnyValue(value))
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(AnyValue(RowValues::Null))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn word(raw: &[u8], idx: usize) -> Result<[u8; 2], BoxError> {
    raw.get(idx * 2..idx * 2 + 2)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| "truncated numeric value".into())
}

/// Binary `numeric`: digit count, weight, sign and display scale, then
/// base-10000 digits, the first of which has the given weight.
fn decode_numeric(raw: &[u8]) -> Result<String, BoxError> {
    let ndigits = usize::try_from(i16::from_be_bytes(word(raw, 0)?))?;
    let weight = i32::from(i16::from_be_bytes(word(raw, 1)?));
    let sign = u16::from_be_bytes(word(raw, 2)?);
    let dscale = usize::from(u16::from_be_bytes(word(raw, 3)?));

    match sign {
        0x0000 | 0x4000 => {}
        0xC000 => return Ok("NaN".into()),
        0xD000 => return Ok("Infinity".into()),
        0xF000 => return Ok("-Infinity".into()),
        other => return Err(format!("invalid numeric sign {other:#06x}").into()),
    }

    let digits = (0..ndigits)
        .map(|i| word(raw, 4 + i).map(i16::from_be_bytes))
        .collect::<Result<Vec<_>, _>>()?;
    let digit = |pos: i32| {
        usize::try_from(pos)
            .ok()
            .and_then(|p| digits.get(p))
            .copied()
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == 0x4000 {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        for pos in 0..=weight {
            if pos == 0 {
                let _ = write!(out, "{}", digit(pos));
            } else {
                let _ = write!(out, "{:04}", digit(pos));
            }
        }
    }
    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut pos = weight + 1;
        while fraction.len() < dscale {
            let _ = write!(fraction, "{:04}", digit(pos));
            pos += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }
    Ok(out)
}

fn decode_uuid(raw: &[u8]) -> Result<String, BoxError> {
    if raw.len() != 16 {
        return Err(format!("invalid uuid length {}", raw.len()).into());
    }
    let mut out = String::with_capacity(36);
    for (i, b) in raw.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        let _ = write!(out, "{b:02x}");
    }
    Ok(out)
}

/// Binary `interval`: microseconds (i64), days (i32), months (i32).
/// Rendered in the server's default `postgres` interval style.
fn decode_interval(raw: &[u8]) -> Result<String, BoxError> {
    let bytes: [u8; 16] = raw
        .try_into()
        .map_err(|_| format!("invalid interval length {}", raw.len()))?;
    let (micros, rest) = bytes.split_at(8);
    let (days, months) = rest.split_at(4);
    let micros = i64::from_be_bytes(micros.try_into()?);
    let days = i32::from_be_bytes(days.try_into()?);
    let months = i32::from_be_bytes(months.try_into()?);

    let mut parts = Vec::new();
    let plural = |n: i32, unit: &str, units: &str| {
        format!("{n} {}", if n.abs() == 1 { unit } else { units })
    };
    if months / 12 != 0 {
        parts.push(plural(months / 12, "year", "years"));
    }
    if months % 12 != 0 {
        parts.push(plural(months % 12, "mon", "mons"));
    }
    if days != 0 {
        parts.push(plural(days, "day", "days"));
    }
    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        let total = micros.unsigned_abs();
        let seconds = total / 1_000_000;
        let mut time = format!(
            "{sign}{:02}:{:02}:{:02}",
            seconds / 3600,
            seconds / 60 % 60,
            seconds % 60
        );
        let fraction = total % 1_000_000;
        if fraction != 0 {
            let digits = format!("{fraction:06}");
            time.push('.');
            time.push_str(digits.trim_end_matches('0'));
        }
        parts.push(time);
    }
    Ok(parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(ndigits: i16, weight: i16, sign: u16, dscale: u16, digits: &[i16]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&ndigits.to_be_bytes());
        raw.extend_from_slice(&weight.to_be_bytes());
        raw.extend_from_slice(&sign.to_be_bytes());
        raw.extend_from_slice(&dscale.to_be_bytes());
        for d in digits {
            raw.extend_from_slice(&d.to_be_bytes());
        }
        raw
    }

    fn any(ty: &Type, raw: &[u8]) -> RowValues {
        AnyValue::from_sql(ty, raw).unwrap().0
    }

    #[test]
    fn numeric_renders_like_the_server() {
        let render = |raw: Vec<u8>| decode_numeric(&raw).unwrap();
        assert_eq!(render(numeric(2, 0, 0, 2, &[123, 4500])), "123.45");
        assert_eq!(render(numeric(3, 1, 0, 1, &[1, 0, 5000])), "10000.5");
        assert_eq!(render(numeric(1, -1, 0x4000, 2, &[500])), "-0.05");
        assert_eq!(render(numeric(1, 1, 0, 0, &[12])), "120000");
        assert_eq!(render(numeric(0, 0, 0, 3, &[])), "0.000");
        assert_eq!(render(numeric(0, 0, 0xC000, 0, &[])), "NaN");
    }

    #[test]
    fn truncated_numeric_is_an_error() {
        assert!(decode_numeric(&[0, 2, 0, 0]).is_err());
        assert!(decode_numeric(&numeric(2, 0, 0, 0, &[1])).is_err());
    }

    #[test]
    fn uuid_is_hyphenated_lowercase() {
        let raw: Vec<u8> = (0x10..0x20).collect();
        assert_eq!(
            any(&Type::UUID, &raw),
            RowValues::Text("10111213-1415-1617-1819-1a1b1c1d1e1f".into())
        );
        assert!(decode_uuid(&raw[..15]).is_err());
    }

    #[test]
    fn interval_uses_postgres_style() {
        let interval = |micros: i64, days: i32, months: i32| {
            let mut raw = micros.to_be_bytes().to_vec();
            raw.extend_from_slice(&days.to_be_bytes());
            raw.extend_from_slice(&months.to_be_bytes());
            decode_interval(&raw).unwrap()
        };
        assert_eq!(interval(14_706_500_000, 3, 14), "1 year 2 mons 3 days 04:05:06.5");
        assert_eq!(interval(0, 1, 0), "1 day");
        assert_eq!(interval(0, 0, 0), "00:00:00");
        assert_eq!(interval(-90_000_000, 0, 0), "-00:01:30");
    }

    #[test]
    fn time_and_text_like_types() {
        let micros = 13_i64 * 3_600_000_000 + 5 * 60_000_000;
        assert_eq!(
            any(&Type::TIME, &micros.to_be_bytes()),
            RowValues::Text("13:05:00".into())
        );
        assert_eq!(any(&Type::VARCHAR, b"abc"), RowValues::Text("abc".into()));
    }

    #[test]
    fn unknown_binary_types_become_blobs() {
        let raw = [2, 32, 0, 4, 10, 0, 0, 1];
        assert_eq!(any(&Type::INET, &raw), RowValues::Blob(raw.to_vec()));
    }

    #[test]
    fn null_of_any_type_is_null() {
        let value = AnyValue::from_sql_null(&Type::NUMERIC).unwrap();
        assert_eq!(value.0, RowValues::Null);
    }
}
