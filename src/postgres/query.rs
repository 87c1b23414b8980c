use futures_util::{TryStreamExt, pin_mut};
use tokio_postgres::{Client, Row, SimpleQueryMessage};

use crate::results::ResultHandle;
use crate::types::RowValues;

use super::decode::extract_value;
use super::params::as_refs;

/// Run one statement over the extended protocol.
///
/// The statement is prepared first so column names are known even when no
/// rows come back. Values are decoded by column type.
///
/// # Errors
/// Returns the driver error if preparing, binding, executing or decoding fails.
pub async fn query_params(
    client: &Client,
    sql: &str,
    params: &[RowValues],
) -> Result<ResultHandle, tokio_postgres::Error> {
    let stmt = client.prepare(sql).await?;
    let column_names = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();

    let stream = client.query_raw(&stmt, as_refs(params)).await?;
    pin_mut!(stream);

    let mut rows = Vec::new();
    while let Some(row) = stream.try_next().await? {
        rows.push(extract_row(&row)?);
    }

    Ok(ResultHandle::new(column_names, rows, stream.rows_affected()))
}

/// Run SQL text over the simple query protocol.
///
/// The text may hold several statements; like libpq's `PQexec`, only the last
/// statement's result is kept. Every value arrives as text.
///
/// # Errors
/// Returns the driver error on failure.
pub async fn simple_query(
    client: &Client,
    sql: &str,
) -> Result<ResultHandle, tokio_postgres::Error> {
    let messages = client.simple_query(sql).await?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<RowValues>> = Vec::new();
    let mut last = None;

    for message in messages {
        match message {
            SimpleQueryMessage::Row(row) => {
                if columns.is_empty() {
                    columns = row
                        .columns()
                        .iter()
                        .map(|col| col.name().to_string())
                        .collect();
                }
                let values = (0..row.len())
                    .map(|idx| {
                        row.get(idx)
                            .map_or(RowValues::Null, |text| RowValues::Text(text.to_string()))
                    })
                    .collect();
                rows.push(values);
            }
            SimpleQueryMessage::CommandComplete(count) => {
                last = Some(ResultHandle::new(
                    std::mem::take(&mut columns),
                    std::mem::take(&mut rows),
                    Some(count),
                ));
            }
            _ => {}
        }
    }

    Ok(last.unwrap_or_else(ResultHandle::empty))
}

fn extract_row(row: &Row) -> Result<Vec<RowValues>, tokio_postgres::Error> {
    (0..row.columns().len())
        .map(|idx| extract_value(row, idx))
        .collect()
}
