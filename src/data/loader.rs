//! CSV Data Loader Module
//! Reads CSV exports with Polars and memoizes them per file path.

use crate::data::schema::{SchemaError, TransactionRecord, UserRecord};
use log::{debug, info};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Invalid table: {0}")]
    Schema(#[from] SchemaError),
}

/// Read-through cache of loaded tables keyed by file path.
///
/// Cached frames are never modified. Every `load` hands out the cached frame
/// together with a separate copy that callers are free to mutate; Polars frames
/// share column buffers copy-on-write, so the copy costs no data duplication.
/// Nothing here watches the files: `invalidate` or `clear` is the only way to
/// observe a changed file.
#[derive(Debug, Default)]
pub struct TableCache {
    entries: HashMap<PathBuf, DataFrame>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a CSV file, returning `(original, copy)`.
    pub fn load(&mut self, path: &Path) -> Result<(DataFrame, DataFrame), LoaderError> {
        if let Some(df) = self.entries.get(path) {
            debug!("cache hit for {}", path.display());
            return Ok((df.clone(), df.clone()));
        }

        let df = Self::read_csv(path)?;
        info!(
            "loaded {} ({} rows, {} columns)",
            path.display(),
            df.height(),
            df.width()
        );

        self.entries.insert(path.to_path_buf(), df.clone());
        Ok((df.clone(), df))
    }

    /// Load and validate the cleaned user table.
    pub fn load_users(&mut self, path: &Path) -> Result<Vec<UserRecord>, LoaderError> {
        let (_, users) = self.load(path)?;
        Ok(UserRecord::from_frame(&users)?)
    }

    /// Load and validate the cleaned transaction table.
    pub fn load_transactions(
        &mut self,
        path: &Path,
    ) -> Result<Vec<TransactionRecord>, LoaderError> {
        let (_, transactions) = self.load(path)?;
        Ok(TransactionRecord::from_frame(&transactions)?)
    }

    /// Drop the cached entry for `path`. Returns whether one existed.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        let removed = self.entries.remove(path).is_some();
        if removed {
            debug!("invalidated {}", path.display());
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_cached(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read every column as text so values reach the schema layer (and the
    /// preprocessing output) exactly as written.
    fn read_csv(path: &Path) -> Result<DataFrame, LoaderError> {
        if !path.is_file() {
            return Err(LoaderError::NotFound(path.to_path_buf()));
        }

        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()?
            .collect()?;

        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const CSV: &str = "Id,UserId,Amount\nt1,u1,10.50\nt2,,007\n";

    #[test]
    fn test_load_reads_text_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, CSV).unwrap();

        let mut cache = TableCache::new();
        let (original, _) = cache.load(&path).unwrap();

        assert_eq!(original.height(), 2);
        let amounts = original.column("Amount").unwrap().str().unwrap();
        assert_eq!(amounts.get(1), Some("007"));
        assert!(original.column("UserId").unwrap().str().unwrap().get(1).is_none());
    }

    #[test]
    fn test_cache_hit_and_invalidate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, CSV).unwrap();

        let mut cache = TableCache::new();
        cache.load(&path).unwrap();
        assert!(cache.is_cached(&path));

        // A cached path is not re-read until invalidated.
        fs::write(&path, "Id,UserId,Amount\nt9,u9,1\n").unwrap();
        let (stale, _) = cache.load(&path).unwrap();
        assert_eq!(stale.height(), 2);

        assert!(cache.invalidate(&path));
        assert!(!cache.invalidate(&path));
        let (fresh, _) = cache.load(&path).unwrap();
        assert_eq!(fresh.height(), 1);
    }

    #[test]
    fn test_copy_mutation_leaves_cache_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        fs::write(&path, CSV).unwrap();

        let mut cache = TableCache::new();
        let (_, mut copy) = cache.load(&path).unwrap();
        copy.with_column(Column::new("Amount".into(), ["x", "y"]))
            .unwrap();
        copy = copy.drop("UserId").unwrap();

        let (original, _) = cache.load(&path).unwrap();
        assert_eq!(original.width(), 3);
        let amounts = original.column("Amount").unwrap().str().unwrap();
        assert_eq!(amounts.get(0), Some("10.50"));
        assert_eq!(copy.width(), 2);
    }

    #[test]
    fn test_missing_file() {
        let mut cache = TableCache::new();
        let err = cache.load(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, LoaderError::NotFound(_)));
        assert!(cache.is_empty());
    }
}
