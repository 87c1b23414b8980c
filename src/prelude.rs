//! Convenient imports for common functionality.

pub use crate::conversion::{unescape_bytea, unescape_bytea_in_place};
pub use crate::error::DbcError;
pub use crate::postgres::{ConnectOptions, Connection, TransactionStatus};
pub use crate::query_builder::{
    ColumnValues, FilterCondition, FilterValue, PreparedStatement, SelectQuery, bind_filter,
    build_delete, build_insert, build_select, build_update,
};
pub use crate::results::{DbRow, QueryOutcome, ResultHandle};
pub use crate::types::{RowValues, SortDirection};
