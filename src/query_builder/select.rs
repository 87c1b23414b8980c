use std::fmt::Write as _;

use crate::error::DbcError;
use crate::types::SortDirection;

use super::filter::{FilterCondition, bind_filter};
use super::{PreparedStatement, quoted_field_list};

/// Fluent description of a `SELECT` statement.
///
/// Validation of order directions, limit and offset happens in [`SelectQuery::build`],
/// before any SQL reaches the server.
///
/// ```rust
/// use pg_dbc::prelude::*;
///
/// let stmt = SelectQuery::new("users")
///     .fields(["id", "name"])
///     .filter(FilterCondition::new().eq("active", true))
///     .order_by("name", "asc")
///     .limit(10)
///     .build()?;
/// assert_eq!(
///     stmt.sql,
///     r#"SELECT "id", "name" FROM users WHERE "active" = $1 ORDER BY name ASC LIMIT 10"#
/// );
/// # Ok::<(), DbcError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    table: String,
    fields: Vec<String>,
    filter: FilterCondition,
    order_by: Vec<(String, String)>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl SelectQuery {
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Columns to return, in order. No columns means `*`.
    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: FilterCondition) -> Self {
        self.filter = filter;
        self
    }

    /// Append an `ORDER BY` entry. `direction` is checked case-insensitively at build time.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: impl Into<String>) -> Self {
        self.order_by.push((field.into(), direction.into()));
        self
    }

    /// Row limit; must be at least 1 when building.
    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Rows to skip; must be non-negative when building.
    #[must_use]
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Render SQL and parameters.
    ///
    /// # Errors
    /// Returns `DbcError::InvalidArgument` for an unknown order direction, a limit
    /// below 1, or a negative offset.
    pub fn build(&self) -> Result<PreparedStatement, DbcError> {
        let fields: Vec<&str> = self.fields.iter().map(String::as_str).collect();
        let order_by: Vec<(&str, &str)> = self
            .order_by
            .iter()
            .map(|(f, d)| (f.as_str(), d.as_str()))
            .collect();
        build_select(
            &self.table,
            &fields,
            Some(&self.filter),
            &order_by,
            self.limit,
            self.offset,
        )
    }
}

/// Build `SELECT <fields> FROM <table> WHERE <filter> [ORDER BY ..] [LIMIT n] [OFFSET n]`.
///
/// The parameter list is exactly the filter's; ordering, limit and offset never
/// add parameters. Limit and offset are emitted as validated integer literals.
/// Order-by fields are emitted unquoted so expressions such as `lower(name)`
/// work; like table and field names they must be trusted identifiers.
///
/// # Errors
/// Returns `DbcError::InvalidArgument` for an unknown order direction,
/// `limit < 1`, or `offset < 0`.
pub fn build_select(
    table: &str,
    fields: &[&str],
    filter: Option<&FilterCondition>,
    order_by: &[(&str, &str)],
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<PreparedStatement, DbcError> {
    let columns = if fields.is_empty() {
        "*".to_string()
    } else {
        quoted_field_list(fields.iter().copied())
    };

    let (where_sql, params) = match filter {
        Some(filter) => bind_filter(filter).into_parts(),
        None => bind_filter(&FilterCondition::new()).into_parts(),
    };

    let mut sql = format!("SELECT {columns} FROM {table} WHERE {where_sql}");

    if !order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        for (i, (field, direction)) in order_by.iter().enumerate() {
            let direction = SortDirection::parse(direction)?;
            if i > 0 {
                sql.push_str(", ");
            }
            let _ = write!(sql, "{field} {direction}");
        }
    }

    if let Some(limit) = limit {
        if limit < 1 {
            return Err(DbcError::invalid(format!(
                "limit must be greater than zero, got {limit}"
            )));
        }
        let _ = write!(sql, " LIMIT {limit}");
    }

    if let Some(offset) = offset {
        if offset < 0 {
            return Err(DbcError::invalid(format!(
                "offset must be greater than or equal to zero, got {offset}"
            )));
        }
        let _ = write!(sql, " OFFSET {offset}");
    }

    Ok(PreparedStatement::new(sql, params))
}
