//! Small synchronous data-access layer for PostgreSQL.
//!
//! - [`query_builder`] turns table names, filter conditions and column values
//!   into parameterized `INSERT`/`SELECT`/`UPDATE`/`DELETE` statements with
//!   `$n` placeholders.
//! - [`postgres::Connection`] is a single blocking connection that executes
//!   raw or built statements and tracks manual transactions.
//! - [`results::QueryOutcome`] wraps what one statement returned: rows,
//!   counts and the time it took.
//!
//! ```rust,no_run
//! use pg_dbc::prelude::*;
//!
//! # fn main() -> Result<(), DbcError> {
//! let mut conn = Connection::open("pgsql:host=localhost;dbname=app;user=app;password=secret")?;
//! conn.begin_transaction()?;
//! conn.insert("users", ColumnValues::new().set("name", "alice").set("age", 30))?;
//! conn.commit()?;
//!
//! let query = SelectQuery::new("users")
//!     .filter(FilterCondition::new().eq("name", "alice"))
//!     .order_by("id", "DESC")
//!     .limit(10);
//! let mut outcome = conn.select(&query)?;
//! while let Some(row) = outcome.fetch_row() {
//!     println!("{:?}", row.get("age"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod conversion;
pub mod error;
pub mod postgres;
pub mod prelude;
pub mod query_builder;
pub mod results;
pub mod types;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use error::DbcError;
pub use postgres::Connection;
pub use types::{RowValues, SortDirection};
