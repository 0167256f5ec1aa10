/// Closed taxonomy for everything that can go wrong loading and validating
/// one symbol's bar stream (§6, `DataError` in §7).
#[derive(Debug, Clone, PartialEq)]
pub enum DataError {
    DataFileNotFound { symbol: String },
    Io { path: String, message: String },
    ParquetRead(String),
    MissingColumn(&'static str),
    UnsupportedTimestampType,
    UnsortedBars { symbol: String, index: usize },
    DuplicateTimestamp { symbol: String, index: usize },
    NonFiniteValue { symbol: String, index: usize },
    MalformedOhlc { symbol: String, index: usize },
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::DataFileNotFound { symbol } => {
                write!(f, "data_file_not_found: no bar file for symbol {symbol}")
            }
            DataError::Io { path, message } => write!(f, "io error reading {path}: {message}"),
            DataError::ParquetRead(msg) => write!(f, "parquet read error: {msg}"),
            DataError::MissingColumn(name) => write!(f, "missing required column: {name}"),
            DataError::UnsupportedTimestampType => {
                write!(f, "datetime column is not a recognized timestamp or epoch type")
            }
            DataError::UnsortedBars { symbol, index } => {
                write!(f, "{symbol}: bar at index {index} is out of order")
            }
            DataError::DuplicateTimestamp { symbol, index } => {
                write!(f, "{symbol}: duplicate timestamp at index {index}")
            }
            DataError::NonFiniteValue { symbol, index } => {
                write!(f, "{symbol}: non-finite OHLCV value at index {index}")
            }
            DataError::MalformedOhlc { symbol, index } => {
                write!(f, "{symbol}: OHLC ordering invariant violated at index {index}")
            }
        }
    }
}

impl std::error::Error for DataError {}
