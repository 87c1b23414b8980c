use std::time::Instant;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_postgres::error::{DbError, Severity};
use tokio_postgres::{Client, NoTls};
use tracing::{debug, warn};

use crate::error::{DbcError, driver_message};
use crate::query_builder::{
    ColumnValues, FilterCondition, PreparedStatement, SelectQuery, build_delete, build_insert,
    build_update,
};
use crate::results::QueryOutcome;
use crate::types::RowValues;

use super::config::ConnectOptions;
use super::query;
use super::transaction::{Execution, TransactionStatus, TransactionTracker};

#[derive(Debug, Clone, Copy)]
enum Protocol {
    Simple,
    Extended,
}

/// A single blocking PostgreSQL connection.
///
/// The connection owns a private current-thread tokio runtime and drives the
/// `tokio_postgres` client on it, one statement at a time. It is opened by
/// [`Connection::open`] and closed exactly once, by [`Connection::close`] or
/// on drop. Transactions are manual: nothing is rolled back on error, and a
/// transaction still open when the connection closes is rolled back by the
/// server.
///
/// A `Connection` must not be opened, used or dropped from inside an async
/// runtime; use `tokio_postgres` directly there.
pub struct Connection {
    runtime: Runtime,
    client: Option<Client>,
    driver: JoinHandle<()>,
    dsn: String,
    tracker: TransactionTracker,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("dsn", &self.dsn)
            .field("status", &self.transaction_status())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Open a new connection from a DSN such as
    /// `pgsql:host=localhost;port=5432;dbname=app;user=bob;password=secret`.
    ///
    /// # Errors
    /// Returns `DbcError::ConnectionFailure`, carrying the DSN with its password
    /// masked, if the DSN is rejected or the server cannot be reached.
    pub fn open(dsn: &str) -> Result<Self, DbcError> {
        Self::open_with(ConnectOptions::parse(dsn))
    }

    /// Open a new connection from already parsed options.
    ///
    /// # Errors
    /// See [`Connection::open`].
    pub fn open_with(options: ConnectOptions) -> Result<Self, DbcError> {
        let dsn = options.sanitized();
        let failure = |message: String| DbcError::ConnectionFailure {
            dsn: dsn.clone(),
            message,
        };

        if Handle::try_current().is_ok() {
            return Err(failure(
                "a blocking connection cannot be opened inside an async runtime".into(),
            ));
        }

        let config = options.to_tokio_config()?;
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| failure(format!("failed to start runtime: {e}")))?;
        let (client, connection) = runtime
            .block_on(config.connect(NoTls))
            .map_err(|e| failure(driver_message(&e)))?;
        let driver = runtime.spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "postgres connection closed with error");
            }
        });

        debug!(dsn = %dsn, "connected");
        Ok(Self {
            runtime,
            client: Some(client),
            driver,
            dsn,
            tracker: TransactionTracker::default(),
        })
    }

    /// The DSN this connection was opened with, password masked.
    #[must_use]
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// Execute `sql` with `params` bound to its `$1..$n` placeholders.
    ///
    /// With no parameters the text goes through the simple query protocol, so
    /// it may contain several `;`-separated statements; the outcome then
    /// describes the last one and its values are all text. With parameters the
    /// text must be a single statement and values are decoded by column type.
    ///
    /// # Errors
    /// Returns `DbcError::ExecutionFailure` with the server's message if the
    /// statement fails, and `DbcError::ConnectionBroken` if the connection has
    /// gone away. A failed statement leaves the connection usable.
    pub fn execute(
        &mut self,
        sql: &str,
        params: Vec<RowValues>,
    ) -> Result<QueryOutcome, DbcError> {
        let protocol = if params.is_empty() {
            Protocol::Simple
        } else {
            Protocol::Extended
        };
        self.run(sql, &params, protocol)
    }

    /// Execute a statement produced by the statement builder.
    ///
    /// Built statements always use the extended protocol, so values are
    /// decoded by column type whether or not the statement has parameters.
    ///
    /// # Errors
    /// See [`Connection::execute`].
    pub fn execute_statement(
        &mut self,
        statement: PreparedStatement,
    ) -> Result<QueryOutcome, DbcError> {
        let (sql, params) = statement.into_parts();
        self.run(&sql, &params, Protocol::Extended)
    }

    fn run(
        &mut self,
        sql: &str,
        params: &[RowValues],
        protocol: Protocol,
    ) -> Result<QueryOutcome, DbcError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| DbcError::ConnectionBroken("connection is closed".into()))?;
        if client.is_closed() {
            return Err(DbcError::ConnectionBroken(format!(
                "connection to {} was lost",
                self.dsn
            )));
        }

        let started = Instant::now();
        let result = match protocol {
            Protocol::Simple => self.runtime.block_on(query::simple_query(client, sql)),
            Protocol::Extended => self
                .runtime
                .block_on(query::query_params(client, sql, params)),
        };
        let elapsed = started.elapsed();
        self.tracker.observe(sql, Execution::of(&result));

        match result {
            Ok(handle) => {
                debug!(
                    sql,
                    params = params.len(),
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    rows = handle.num_rows(),
                    affected = handle.affected_rows(),
                    "statement executed"
                );
                Ok(QueryOutcome::new(handle, elapsed))
            }
            Err(err) => {
                if ends_session(&err) {
                    warn!(dsn = %self.dsn, "server ended the session");
                    drop(self.client.take());
                }
                let err = DbcError::from_execution(&err);
                warn!(sql, params = params.len(), error = %err, "statement failed");
                Err(err)
            }
        }
    }

    /// Execute SQL text without parameters.
    ///
    /// # Errors
    /// See [`Connection::execute`].
    pub fn query(&mut self, sql: &str) -> Result<QueryOutcome, DbcError> {
        self.execute(sql, Vec::new())
    }

    /// Insert one row into `table`.
    ///
    /// `table` and the field names are embedded in the SQL unescaped; never
    /// pass untrusted input in those positions.
    ///
    /// # Errors
    /// Returns `DbcError::InvalidArgument` for an empty row, otherwise see
    /// [`Connection::execute`].
    pub fn insert(&mut self, table: &str, row: ColumnValues) -> Result<QueryOutcome, DbcError> {
        let statement = build_insert(table, row)?;
        self.execute_statement(statement)
    }

    /// Run a `SELECT` built from `query`.
    ///
    /// # Errors
    /// Returns `DbcError::InvalidArgument` for an invalid limit, offset or sort
    /// direction, otherwise see [`Connection::execute`].
    pub fn select(&mut self, query: &SelectQuery) -> Result<QueryOutcome, DbcError> {
        let statement = query.build()?;
        self.execute_statement(statement)
    }

    /// Update the rows of `table` matching `filter`.
    ///
    /// An empty filter matches every row.
    ///
    /// # Errors
    /// Returns `DbcError::InvalidArgument` if `updates` is empty, otherwise see
    /// [`Connection::execute`].
    pub fn update(
        &mut self,
        table: &str,
        filter: &FilterCondition,
        updates: ColumnValues,
    ) -> Result<QueryOutcome, DbcError> {
        let statement = build_update(table, filter, updates)?;
        self.execute_statement(statement)
    }

    /// Delete the rows of `table` matching `filter`.
    ///
    /// An empty filter deletes every row.
    ///
    /// # Errors
    /// See [`Connection::execute`].
    pub fn delete(
        &mut self,
        table: &str,
        filter: &FilterCondition,
    ) -> Result<QueryOutcome, DbcError> {
        self.execute_statement(build_delete(table, filter))
    }

    /// # Errors
    /// See [`Connection::execute`].
    pub fn begin_transaction(&mut self) -> Result<QueryOutcome, DbcError> {
        self.query("BEGIN;")
    }

    /// # Errors
    /// See [`Connection::execute`].
    pub fn commit(&mut self) -> Result<QueryOutcome, DbcError> {
        self.query("COMMIT;")
    }

    /// # Errors
    /// See [`Connection::execute`].
    pub fn rollback(&mut self) -> Result<QueryOutcome, DbcError> {
        self.query("ROLLBACK;")
    }

    /// Current transaction state; `Unknown` once the connection is lost.
    #[must_use]
    pub fn transaction_status(&self) -> TransactionStatus {
        match &self.client {
            Some(client) if !client.is_closed() => self.tracker.status(),
            _ => TransactionStatus::Unknown,
        }
    }

    /// Whether a transaction block is open, including one aborted by an error.
    ///
    /// # Errors
    /// Returns `DbcError::ConnectionBroken` if the state is unknown; the
    /// connection should then be discarded.
    pub fn is_in_transaction(&self) -> Result<bool, DbcError> {
        match self.transaction_status() {
            TransactionStatus::Idle => Ok(false),
            TransactionStatus::InTransaction | TransactionStatus::InError => Ok(true),
            TransactionStatus::Unknown => Err(DbcError::ConnectionBroken(format!(
                "transaction status unknown for {}",
                self.dsn
            ))),
        }
    }

    /// Close the connection. Equivalent to dropping it.
    pub fn close(self) {}
}

/// The driver lost the socket, or the server reported an error that
/// terminates the session.
fn ends_session(err: &tokio_postgres::Error) -> bool {
    let severity = err.as_db_error().and_then(DbError::parsed_severity);
    err.is_closed() || matches!(severity, Some(Severity::Fatal | Severity::Panic))
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Dropping the client sends Terminate; let the driver task flush it.
        drop(self.client.take());
        if Handle::try_current().is_err() {
            let _ = self.runtime.block_on(&mut self.driver);
        }
        debug!(dsn = %self.dsn, "connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_dsn_reports_masked_password() {
        let err =
            Connection::open("pgsql:host=localhost;password=hunter2;no_such_key=1").unwrap_err();
        match err {
            DbcError::ConnectionFailure { dsn, .. } => {
                assert!(dsn.contains("password=***"));
                assert!(!dsn.contains("hunter2"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unreachable_server_is_connection_failure() {
        let err = Connection::open("pgsql:host=127.0.0.1;port=1;user=x;connect_timeout=2")
            .unwrap_err();
        assert!(matches!(err, DbcError::ConnectionFailure { .. }));
    }

    #[test]
    fn refuses_to_open_inside_async_runtime() {
        let rt = Builder::new_current_thread().build().unwrap();
        let result = rt.block_on(async { Connection::open("host=localhost user=x") });
        match result {
            Err(DbcError::ConnectionFailure { message, .. }) => {
                assert!(message.contains("async runtime"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
