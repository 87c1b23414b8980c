use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use super::statements::{split_statements, strip_leading_comments};

static BEGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(BEGIN|START\s+TRANSACTION)\b").expect("valid regex"));

static ROLLBACK_TO_SAVEPOINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^ROLLBACK(\s+(WORK|TRANSACTION))?\s+TO\b").expect("valid regex")
});

static END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(COMMIT|END|ABORT|ROLLBACK|PREPARE\s+TRANSACTION)\b").expect("valid regex")
});

/// Transaction state of a connection, as far as this layer has observed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionStatus {
    /// No transaction block is open.
    #[default]
    Idle,
    /// Inside a transaction block.
    InTransaction,
    /// Inside a transaction block in which a statement failed; only
    /// `ROLLBACK` (or `ROLLBACK TO SAVEPOINT`) will be accepted.
    InError,
    /// The connection is closed or its state cannot be determined.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatementKind {
    Begin,
    End,
    RollbackToSavepoint,
    Other,
}

fn classify(statement: &str) -> StatementKind {
    let head = strip_leading_comments(statement);
    if BEGIN.is_match(head) {
        StatementKind::Begin
    } else if ROLLBACK_TO_SAVEPOINT.is_match(head) {
        StatementKind::RollbackToSavepoint
    } else if END.is_match(head) {
        StatementKind::End
    } else {
        StatementKind::Other
    }
}

/// How far a statement got, as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Execution {
    /// The server executed the SQL text successfully.
    Completed,
    /// The server rejected the SQL text.
    Rejected,
    /// The failure happened on the client, before sending or after a
    /// successful reply (parameter encoding, row decoding, lost connection).
    ClientError,
}

impl Execution {
    pub(crate) fn of<T>(result: &Result<T, tokio_postgres::Error>) -> Self {
        match result {
            Ok(_) => Execution::Completed,
            Err(err) if err.as_db_error().is_some() => Execution::Rejected,
            Err(_) => Execution::ClientError,
        }
    }
}

/// Follows transaction boundaries through the statements a connection executes.
///
/// The driver does not surface the server's ready-for-query status, so the
/// state is derived from each executed SQL text and whether the server
/// accepted it.
#[derive(Debug, Default)]
pub(crate) struct TransactionTracker {
    status: TransactionStatus,
}

impl TransactionTracker {
    pub(crate) fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Record how the server handled `sql`.
    ///
    /// A rejection of multi-statement text is attributed to its last
    /// statement. Client-side failures leave the status unchanged.
    pub(crate) fn observe(&mut self, sql: &str, execution: Execution) {
        let succeeded = match execution {
            Execution::Completed => true,
            Execution::Rejected => false,
            Execution::ClientError => return,
        };
        let before = self.status;
        let statements = split_statements(sql);
        let last = statements.len().saturating_sub(1);
        for (i, statement) in statements.iter().enumerate() {
            let ok = succeeded || i < last;
            self.apply(classify(statement), ok);
        }
        if statements.is_empty() && !succeeded {
            self.apply(StatementKind::Other, false);
        }
        if before != self.status {
            trace!(from = ?before, to = ?self.status, "transaction status changed");
        }
    }

    fn apply(&mut self, kind: StatementKind, ok: bool) {
        use TransactionStatus::{Idle, InError, InTransaction};

        self.status = match (kind, ok, self.status) {
            (StatementKind::Begin, true, Idle) => InTransaction,
            (StatementKind::End, _, _) => Idle,
            (StatementKind::RollbackToSavepoint, true, InError) => InTransaction,
            (_, false, InTransaction) => InError,
            (_, _, status) => status,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_boundaries() {
        assert_eq!(classify("begin"), StatementKind::Begin);
        assert_eq!(
            classify("START  TRANSACTION ISOLATION LEVEL SERIALIZABLE"),
            StatementKind::Begin
        );
        assert_eq!(classify("-- c\nCOMMIT"), StatementKind::End);
        assert_eq!(classify("rollback"), StatementKind::End);
        assert_eq!(
            classify("ROLLBACK TO SAVEPOINT s1"),
            StatementKind::RollbackToSavepoint
        );
        assert_eq!(classify("rollback work to s1"), StatementKind::RollbackToSavepoint);
        assert_eq!(classify("PREPARE TRANSACTION 'x'"), StatementKind::End);
        assert_eq!(classify("SELECT 1"), StatementKind::Other);
        assert_eq!(classify("beginning"), StatementKind::Other);
    }

    #[test]
    fn begin_commit_cycle() {
        let mut tracker = TransactionTracker::default();
        tracker.observe("BEGIN;", Execution::Completed);
        assert_eq!(tracker.status(), TransactionStatus::InTransaction);
        tracker.observe("INSERT INTO t VALUES ($1)", Execution::Completed);
        assert_eq!(tracker.status(), TransactionStatus::InTransaction);
        tracker.observe("COMMIT;", Execution::Completed);
        assert_eq!(tracker.status(), TransactionStatus::Idle);
    }

    #[test]
    fn failure_inside_block_aborts_it() {
        let mut tracker = TransactionTracker::default();
        tracker.observe("BEGIN;", Execution::Completed);
        tracker.observe("INSERT INTO missing VALUES (1)", Execution::Rejected);
        assert_eq!(tracker.status(), TransactionStatus::InError);
        tracker.observe("SELECT 1", Execution::Rejected);
        assert_eq!(tracker.status(), TransactionStatus::InError);
        tracker.observe("ROLLBACK;", Execution::Completed);
        assert_eq!(tracker.status(), TransactionStatus::Idle);
    }

    #[test]
    fn savepoint_rollback_recovers() {
        let mut tracker = TransactionTracker::default();
        tracker.observe("BEGIN; SAVEPOINT s1", Execution::Completed);
        tracker.observe("SELECT broken", Execution::Rejected);
        tracker.observe("ROLLBACK TO SAVEPOINT s1", Execution::Completed);
        assert_eq!(tracker.status(), TransactionStatus::InTransaction);
    }

    #[test]
    fn failure_outside_block_stays_idle() {
        let mut tracker = TransactionTracker::default();
        tracker.observe("SELECT broken", Execution::Rejected);
        assert_eq!(tracker.status(), TransactionStatus::Idle);
    }

    #[test]
    fn multi_statement_text_ending_in_commit() {
        let mut tracker = TransactionTracker::default();
        tracker.observe("BEGIN; UPDATE t SET a = 1; COMMIT;", Execution::Completed);
        assert_eq!(tracker.status(), TransactionStatus::Idle);
        tracker.observe("BEGIN; UPDATE t SET a = 1;", Execution::Completed);
        assert_eq!(tracker.status(), TransactionStatus::InTransaction);
    }

    #[test]
    fn client_side_failures_leave_status_alone() {
        let mut tracker = TransactionTracker::default();
        tracker.observe("BEGIN;", Execution::Completed);
        tracker.observe("SELECT $1::int", Execution::ClientError);
        assert_eq!(tracker.status(), TransactionStatus::InTransaction);
        tracker.observe("COMMIT;", Execution::ClientError);
        assert_eq!(tracker.status(), TransactionStatus::InTransaction);
        tracker.observe("SELECT 1", Execution::Completed);
        assert_eq!(tracker.status(), TransactionStatus::InTransaction);
    }
}
