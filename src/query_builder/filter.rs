use crate::types::RowValues;

use super::{PreparedStatement, push_placeholder, push_quoted_ident};

/// Condition attached to one field of a [`FilterCondition`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// `"field" = $n`
    Eq(RowValues),
    /// `"field" IN ($n, $n+1, ...)`; an empty list renders as `false`.
    In(Vec<RowValues>),
}

impl From<RowValues> for FilterValue {
    fn from(value: RowValues) -> Self {
        FilterValue::Eq(value)
    }
}

impl From<Vec<RowValues>> for FilterValue {
    fn from(values: Vec<RowValues>) -> Self {
        FilterValue::In(values)
    }
}

/// Ordered field → condition mapping describing a WHERE clause.
///
/// Conditions are combined with `AND` in insertion order. An empty filter
/// matches every row.
///
/// ```rust
/// use pg_dbc::prelude::*;
///
/// let filter = FilterCondition::new()
///     .eq("status", "active")
///     .any_of("id", [1, 2, 3]);
/// let bound = bind_filter(&filter);
/// assert_eq!(bound.sql, r#""status" = $1 AND "id" IN ($2, $3, $4)"#);
/// assert_eq!(bound.params.len(), 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCondition {
    conditions: Vec<(String, FilterValue)>,
}

impl FilterCondition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.conditions
            .push((field.into(), FilterValue::Eq(value.into())));
        self
    }

    /// Add a membership condition.
    #[must_use]
    pub fn any_of<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.conditions.push((field.into(), FilterValue::In(values)));
        self
    }

    pub fn push(&mut self, field: impl Into<String>, condition: impl Into<FilterValue>) {
        self.conditions.push((field.into(), condition.into()));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.conditions.iter().map(|(f, c)| (f.as_str(), c))
    }
}

impl<F: Into<String>, C: Into<FilterValue>> FromIterator<(F, C)> for FilterCondition {
    fn from_iter<I: IntoIterator<Item = (F, C)>>(iter: I) -> Self {
        Self {
            conditions: iter
                .into_iter()
                .map(|(f, c)| (f.into(), c.into()))
                .collect(),
        }
    }
}

/// Bind a filter into a WHERE fragment with placeholders starting at `$1`.
///
/// An empty filter yields `true` with no parameters.
#[must_use]
pub fn bind_filter(filter: &FilterCondition) -> PreparedStatement {
    bind_filter_from(filter, 1)
}

/// Bind a filter with the first placeholder numbered `start`.
///
/// The returned parameter list only holds this fragment's values; the caller
/// is responsible for placing them after the `start - 1` values it already has.
#[must_use]
pub fn bind_filter_from(filter: &FilterCondition, start: usize) -> PreparedStatement {
    if filter.is_empty() {
        return PreparedStatement::new("true", Vec::new());
    }

    let mut sql = String::new();
    let mut params = Vec::new();
    let mut next = start;

    for (i, (field, condition)) in filter.conditions.iter().enumerate() {
        if i > 0 {
            sql.push_str(" AND ");
        }
        match condition {
            FilterValue::Eq(value) => {
                push_quoted_ident(&mut sql, field);
                sql.push_str(" = ");
                push_placeholder(&mut sql, next);
                next += 1;
                params.push(value.clone());
            }
            // `IN ()` is a syntax error in PostgreSQL; an empty set never matches.
            FilterValue::In(values) if values.is_empty() => sql.push_str("false"),
            FilterValue::In(values) => {
                push_quoted_ident(&mut sql, field);
                sql.push_str(" IN (");
                for (j, value) in values.iter().enumerate() {
                    if j > 0 {
                        sql.push_str(", ");
                    }
                    push_placeholder(&mut sql, next);
                    next += 1;
                    params.push(value.clone());
                }
                sql.push(')');
            }
        }
    }

    PreparedStatement { sql, params }
}

/// Placeholder numbers referenced in `sql`, in order of appearance.
#[cfg(test)]
pub(crate) fn placeholder_numbers(sql: &str) -> Vec<usize> {
    let re = regex::Regex::new(r"\$(\d+)").expect("valid regex");
    re.captures_iter(sql)
        .map(|c| c[1].parse().expect("digits"))
        .collect()
}
