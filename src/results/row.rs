use std::collections::HashMap;
use std::sync::Arc;

use crate::types::RowValues;

/// A row from a query result.
///
/// Column names and the name → index map are shared by every row of the
/// same result.
#[derive(Debug, Clone)]
pub struct DbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row, in column order
    pub values: Vec<RowValues>,
    column_index: Arc<HashMap<String, usize>>,
}

impl DbRow {
    /// Create a row, building its own column index.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        let column_index = Arc::new(build_column_index(&column_names));
        Self {
            column_names,
            values,
            column_index,
        }
    }

    pub(crate) fn with_index(
        column_names: Arc<Vec<String>>,
        column_index: Arc<HashMap<String, usize>>,
        values: Vec<RowValues>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index.get(column_name).copied()
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Field-name keyed view of the row, in column order.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(String, RowValues)> {
        self.column_names
            .iter()
            .cloned()
            .zip(self.values)
            .collect()
    }
}

/// Map column name to position. With duplicate names the first column wins.
pub(crate) fn build_column_index(column_names: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(column_names.len());
    for (i, name) in column_names.iter().enumerate() {
        index.entry(name.clone()).or_insert(i);
    }
    index
}
