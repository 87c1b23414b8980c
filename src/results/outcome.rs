use std::cell::OnceCell;
use std::sync::Arc;
use std::time::Duration;

use super::handle::ResultHandle;
use super::row::DbRow;

/// Result of one executed statement.
///
/// `row_count` and `affected_row_count` are read from the handle on first use
/// and cached. The elapsed time is recorded by the connection at execution and
/// stored rounded to milliseconds. Dropping the outcome (or calling
/// [`QueryOutcome::free`]) releases the handle; the borrow checker rules out
/// any later access.
#[derive(Debug)]
pub struct QueryOutcome {
    handle: ResultHandle,
    elapsed_seconds: f64,
    row_count: OnceCell<usize>,
    affected_row_count: OnceCell<u64>,
}

impl QueryOutcome {
    #[must_use]
    pub fn new(handle: ResultHandle, elapsed: Duration) -> Self {
        Self {
            handle,
            elapsed_seconds: round_to_millis(elapsed),
            row_count: OnceCell::new(),
            affected_row_count: OnceCell::new(),
        }
    }

    /// Number of rows the statement returned.
    pub fn row_count(&self) -> usize {
        *self.row_count.get_or_init(|| self.handle.num_rows())
    }

    /// Number of rows the statement inserted, updated or deleted.
    pub fn affected_row_count(&self) -> u64 {
        *self
            .affected_row_count
            .get_or_init(|| self.handle.affected_rows())
    }

    /// Wall-clock duration of the execute call in seconds, millisecond precision.
    #[must_use]
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed_seconds)
    }

    #[must_use]
    pub fn column_names(&self) -> &Arc<Vec<String>> {
        self.handle.column_names()
    }

    /// Advance the cursor by one row; `None` once the result is exhausted.
    pub fn fetch_row(&mut self) -> Option<DbRow> {
        self.handle.next_row()
    }

    /// Every row not yet fetched.
    pub fn fetch_all(&mut self) -> Vec<DbRow> {
        self.handle.remaining_rows()
    }

    /// Release the result now instead of at end of scope.
    pub fn free(self) {
        drop(self);
    }
}

impl Iterator for QueryOutcome {
    type Item = DbRow;

    fn next(&mut self) -> Option<Self::Item> {
        self.fetch_row()
    }
}

#[allow(clippy::cast_precision_loss)]
fn round_to_millis(elapsed: Duration) -> f64 {
    let millis = (elapsed.as_micros() + 500) / 1000;
    millis as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowValues;

    fn outcome() -> QueryOutcome {
        let handle = ResultHandle::new(
            vec!["id".into(), "name".into()],
            vec![
                vec![RowValues::Int(1), RowValues::Text("a".into())],
                vec![RowValues::Int(2), RowValues::Text("b".into())],
                vec![RowValues::Int(3), RowValues::Text("c".into())],
            ],
            Some(3),
        );
        QueryOutcome::new(handle, Duration::from_micros(12_345))
    }

    #[test]
    fn counts_are_computed_once_and_cached() {
        let out = outcome();
        assert!(out.row_count.get().is_none());
        assert!(out.affected_row_count.get().is_none());
        assert_eq!(out.row_count(), 3);
        assert_eq!(out.row_count(), 3);
        assert_eq!(out.affected_row_count(), 3);
        assert_eq!(out.row_count.get(), Some(&3));
        assert_eq!(out.affected_row_count.get(), Some(&3));
    }

    #[test]
    fn row_count_is_total_even_after_fetching() {
        let mut out = outcome();
        let first = out.fetch_row().unwrap();
        assert_eq!(first.get("name"), Some(&RowValues::Text("a".into())));
        assert_eq!(out.fetch_all().len(), 2);
        assert!(out.fetch_row().is_none());
        assert!(out.fetch_all().is_empty());
        assert_eq!(out.row_count(), 3);
    }

    #[test]
    fn elapsed_is_rounded_to_millis() {
        let out = outcome();
        assert!((out.elapsed_seconds() - 0.012).abs() < 1e-9);

        let rounded_up = QueryOutcome::new(ResultHandle::empty(), Duration::from_micros(1_500));
        assert!((rounded_up.elapsed_seconds() - 0.002).abs() < 1e-9);
        assert_eq!(rounded_up.row_count(), 0);
        assert_eq!(rounded_up.affected_row_count(), 0);
    }

    #[test]
    fn iterates_remaining_rows() {
        let mut out = outcome();
        out.fetch_row();
        let ids: Vec<i64> = out
            .map(|row| *row.get("id").and_then(RowValues::as_int).unwrap())
            .collect();
        assert_eq!(ids, [2, 3]);
    }
}
