//! Row decoding.

use crate::error::{QbError, QbResult};
use crate::record::Record;
use crate::value::Value;
use tokio_postgres::Row;

/// Decode every column of `row` into a [`Record`] keyed by column name.
///
/// A column whose type or encoding can't be represented as a [`Value`] fails
/// the whole row with [`QbError::BadType`]. Duplicate column names keep the
/// last value.
pub fn decode_row(row: &Row) -> QbResult<Record> {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value: Value = row
            .try_get(idx)
            .map_err(|e| QbError::bad_type(column.name(), e.to_string()))?;
        record.insert(column.name(), value);
    }
    Ok(record)
}

/// Decode the first column of `row`.
pub fn first_value(row: &Row) -> QbResult<Value> {
    let column = row
        .columns()
        .first()
        .ok_or_else(|| QbError::bad_type("<none>", "row has no columns"))?;
    row.try_get(0)
        .map_err(|e| QbError::bad_type(column.name(), e.to_string()))
}
