use std::collections::VecDeque;
use std::sync::Arc;

use crate::types::RowValues;

use super::row::{DbRow, build_column_index};

/// The complete result of one executed statement, as received from the server.
///
/// Owned by exactly one [`QueryOutcome`](super::QueryOutcome). Rows leave the
/// handle through a forward-only cursor; `num_rows` keeps reporting the total
/// the server returned.
#[derive(Debug)]
pub struct ResultHandle {
    column_names: Arc<Vec<String>>,
    rows: VecDeque<DbRow>,
    total_rows: usize,
    command_rows: Option<u64>,
}

impl ResultHandle {
    /// Assemble a handle from column names, row values and the server's command count.
    #[must_use]
    pub fn new(
        column_names: Vec<String>,
        rows: Vec<Vec<RowValues>>,
        command_rows: Option<u64>,
    ) -> Self {
        let column_index = Arc::new(build_column_index(&column_names));
        let column_names = Arc::new(column_names);
        let total_rows = rows.len();
        let rows = rows
            .into_iter()
            .map(|values| DbRow::with_index(column_names.clone(), column_index.clone(), values))
            .collect();
        Self {
            column_names,
            rows,
            total_rows,
            command_rows,
        }
    }

    /// Handle for a statement that produced no rows and no count (e.g. `BEGIN`).
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), None)
    }

    #[must_use]
    pub fn column_names(&self) -> &Arc<Vec<String>> {
        &self.column_names
    }

    /// Rows the server returned, independent of the cursor.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.total_rows
    }

    /// Rows touched according to the server's command tag; 0 when it carries no count.
    #[must_use]
    pub fn affected_rows(&self) -> u64 {
        self.command_rows.unwrap_or(0)
    }

    pub(crate) fn next_row(&mut self) -> Option<DbRow> {
        self.rows.pop_front()
    }

    pub(crate) fn remaining_rows(&mut self) -> Vec<DbRow> {
        self.rows.drain(..).collect()
    }
}
