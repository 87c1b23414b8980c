use std::error::Error;

use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::types::RowValues;

type BoxError = Box<dyn Error + Sync + Send>;

/// Borrow a parameter list as the trait objects tokio-postgres expects.
#[must_use]
pub fn as_refs(params: &[RowValues]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

impl ToSql for RowValues {
    fn to_sql(&self, ty: &Type, out: &mut bytes::BytesMut) -> Result<IsNull, BoxError> {
        match self {
            RowValues::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                _ => encode(i, "integer", ty, out),
            },
            #[allow(clippy::cast_possible_truncation)]
            RowValues::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                _ => encode(f, "float", ty, out),
            },
            RowValues::Text(s) => encode(s, "text", ty, out),
            RowValues::Bool(b) => encode(b, "bool", ty, out),
            RowValues::Timestamp(dt) => match *ty {
                Type::TIMESTAMPTZ => dt.and_utc().to_sql(ty, out),
                Type::DATE => dt.date().to_sql(ty, out),
                _ => encode(dt, "timestamp", ty, out),
            },
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::JSON(value) => encode(value, "json", ty, out),
            RowValues::Blob(bytes) => encode(bytes, "blob", ty, out),
        }
    }

    // Any server type may receive NULL; per-variant checks happen in `to_sql`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Encode `value` after checking that its Rust type can represent `ty`.
fn encode<T: ToSql>(
    value: &T,
    kind: &str,
    ty: &Type,
    out: &mut bytes::BytesMut,
) -> Result<IsNull, BoxError> {
    if !T::accepts(ty) {
        return Err(format!("cannot bind {kind} value to parameter of type {ty}").into());
    }
    value.to_sql(ty, out)
}
