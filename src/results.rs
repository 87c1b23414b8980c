//! Query results: the per-statement handle, the outcome wrapper and rows.

mod handle;
mod outcome;
mod row;

pub use handle::ResultHandle;
pub use outcome::QueryOutcome;
pub use row::DbRow;
