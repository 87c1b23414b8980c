//! Helpers for tests and benchmarks that need a live server.
//!
//! Enabled by the `test-utils` feature. The server is a throwaway
//! `postgresql_embedded` instance using bundled binaries.

pub mod embedded;

pub use embedded::{EmbeddedPostgres, setup_postgres_embedded, stop_postgres_embedded};
