use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, Float64Array, TimestampMicrosecondArray, TimestampNanosecondArray};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use dexterio_schemas::Bar;

use crate::error::DataError;

fn io_err(path: &Path, e: impl std::fmt::Display) -> DataError {
    DataError::Io { path: path.display().to_string(), message: e.to_string() }
}

fn column_f64<'a>(batch: &'a RecordBatch, name: &'static str) -> Result<&'a Float64Array, DataError> {
    batch
        .column_by_name(name)
        .ok_or(DataError::MissingColumn(name))?
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or(DataError::MissingColumn(name))
}

fn extract_timestamps(col: &ArrayRef) -> Result<Vec<DateTime<Utc>>, DataError> {
    if let Some(arr) = col.as_any().downcast_ref::<TimestampMicrosecondArray>() {
        return arr
            .iter()
            .map(|v| v.and_then(DateTime::from_timestamp_micros).ok_or(DataError::UnsupportedTimestampType))
            .collect();
    }
    if let Some(arr) = col.as_any().downcast_ref::<TimestampNanosecondArray>() {
        return arr
            .iter()
            .map(|v| v.map(DateTime::from_timestamp_nanos).ok_or(DataError::UnsupportedTimestampType))
            .collect();
    }
    Err(DataError::UnsupportedTimestampType)
}

/// Reads one symbol's bars from a parquet file with columns
/// `{datetime, open, high, low, close, volume}` (§6). Row order is preserved
/// as stored; `validate_bars` is responsible for rejecting anything not
/// already sorted ascending.
pub fn read_bars(path: &Path) -> Result<Vec<Bar>, DataError> {
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| DataError::ParquetRead(e.to_string()))?;
    let reader = builder.build().map_err(|e| DataError::ParquetRead(e.to_string()))?;

    let mut bars = Vec::new();
    for batch_result in reader {
        let batch = batch_result.map_err(|e| DataError::ParquetRead(e.to_string()))?;

        let ts_col = batch.column_by_name("datetime").ok_or(DataError::MissingColumn("datetime"))?;
        let timestamps = extract_timestamps(ts_col)?;
        let open = column_f64(&batch, "open")?;
        let high = column_f64(&batch, "high")?;
        let low = column_f64(&batch, "low")?;
        let close = column_f64(&batch, "close")?;
        let volume = column_f64(&batch, "volume")?;

        for i in 0..batch.num_rows() {
            bars.push(Bar::new(timestamps[i], open.value(i), high.value(i), low.value(i), close.value(i), volume.value(i)));
        }
    }
    Ok(bars)
}
