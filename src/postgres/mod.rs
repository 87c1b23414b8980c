// PostgreSQL connection layer.
//
// - config: DSN parsing and driver configuration
// - connection: the blocking `Connection` and its CRUD/transaction operations
// - decode: result column decoding, including types without a native variant
// - params: binding `RowValues` to statement parameters
// - query: statement execution and row decoding
// - statements: statement splitting for multi-statement text
// - transaction: client-side transaction status tracking

pub mod config;
pub mod connection;
mod decode;
pub mod params;
mod query;
mod statements;
pub mod transaction;

pub use config::ConnectOptions;
pub use connection::Connection;
pub use decode::AnyValue;
pub use params::as_refs;
pub use transaction::TransactionStatus;
