use std::path::{Path, PathBuf};

use crate::error::DataError;

/// Finds one symbol's bar file under `data_root` (§6). Preference order:
/// `SYM.parquet`, then `sym.parquet`, then the legacy glob `sym_1m_*.parquet`
/// (lexicographically first match). Missing entirely is
/// `data_file_not_found`.
pub fn discover_file(data_root: &Path, symbol: &str) -> Result<PathBuf, DataError> {
    let upper = data_root.join(format!("{symbol}.parquet"));
    if upper.is_file() {
        return Ok(upper);
    }

    let lower_name = symbol.to_lowercase();
    let lower = data_root.join(format!("{lower_name}.parquet"));
    if lower.is_file() {
        return Ok(lower);
    }

    let prefix = format!("{lower_name}_1m_");
    if let Ok(entries) = std::fs::read_dir(data_root) {
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(&prefix) && n.ends_with(".parquet"))
                    .unwrap_or(false)
            })
            .collect();
        candidates.sort();
        if let Some(first) = candidates.into_iter().next() {
            return Ok(first);
        }
    }

    Err(DataError::DataFileNotFound { symbol: symbol.to_string() })
}
