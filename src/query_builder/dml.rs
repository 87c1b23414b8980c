use crate::error::DbcError;

use super::filter::{FilterCondition, bind_filter};
use super::{
    ColumnValues, PreparedStatement, push_placeholder, push_quoted_ident, quoted_field_list,
};

/// Build `INSERT INTO <table> ("f1", ...) VALUES ($1, ...)`.
///
/// Parameter order follows the row's field order. `table` and the field
/// names are embedded unescaped and must be trusted identifiers.
///
/// # Errors
/// Returns `DbcError::InvalidArgument` if `row` is empty.
pub fn build_insert(table: &str, row: ColumnValues) -> Result<PreparedStatement, DbcError> {
    if row.is_empty() {
        return Err(DbcError::invalid("insert row must contain at least one field"));
    }

    let fields = quoted_field_list(row.iter().map(|(f, _)| f));
    let mut values = String::new();
    let mut params = Vec::with_capacity(row.len());
    for (i, (_, value)) in row.into_iter().enumerate() {
        if i > 0 {
            values.push_str(", ");
        }
        push_placeholder(&mut values, i + 1);
        params.push(value);
    }

    Ok(PreparedStatement::new(
        format!("INSERT INTO {table} ({fields}) VALUES ({values})"),
        params,
    ))
}

/// Build `UPDATE <table> SET "f" = $k+1, ... WHERE <filter>`.
///
/// The filter is bound first and owns `$1..$k`; assignments follow with
/// `$k+1..$k+m`, so the parameter list is the filter values then the
/// assignment values.
///
/// # Errors
/// Returns `DbcError::InvalidArgument` if `updates` is empty.
pub fn build_update(
    table: &str,
    filter: &FilterCondition,
    updates: ColumnValues,
) -> Result<PreparedStatement, DbcError> {
    if updates.is_empty() {
        return Err(DbcError::invalid("update must assign at least one field"));
    }

    let (filter_sql, mut params) = bind_filter(filter).into_parts();
    let mut next = params.len() + 1;

    let mut set_sql = String::new();
    for (i, (field, value)) in updates.into_iter().enumerate() {
        if i > 0 {
            set_sql.push_str(", ");
        }
        push_quoted_ident(&mut set_sql, &field);
        set_sql.push_str(" = ");
        push_placeholder(&mut set_sql, next);
        next += 1;
        params.push(value);
    }

    Ok(PreparedStatement::new(
        format!("UPDATE {table} SET {set_sql} WHERE {filter_sql}"),
        params,
    ))
}

/// Build `DELETE FROM <table> WHERE <filter>`.
///
/// An empty filter deletes every row (`WHERE true`).
#[must_use]
pub fn build_delete(table: &str, filter: &FilterCondition) -> PreparedStatement {
    let (filter_sql, params) = bind_filter(filter).into_parts();
    PreparedStatement::new(format!("DELETE FROM {table} WHERE {filter_sql}"), params)
}
