use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rocksdb::{DB, Direction, IteratorMode, Options, WriteBatch};

use crate::kvdb::schema::keys;
use crate::kvdb::{KeyRange, Row, RowStore};

/// RocksDB-backed wide-column table emulation.
///
/// Each cell is one physical entry keyed `"{row_key}#{qualifier}"`, so an
/// ordered iterator yields the cells of a row contiguously and rows in
/// ascending row-key order, the same shape a wide-column `ReadRows` scan
/// produces.
#[derive(Clone)]
pub struct RocksRowStore {
    db: Arc<DB>,
}

impl RocksRowStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path.as_ref()).with_context(|| {
            format!("Failed to open kvdb at path: {}", path.as_ref().display())
        })?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Read-only open mode for the diagnose service: the ingestion pipeline
    /// owns the writable handle.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let opts = Options::default();
        let db = DB::open_for_read_only(&opts, path.as_ref(), false).with_context(|| {
            format!("Failed to open kvdb read-only at: {}", path.as_ref().display())
        })?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Write one row: every qualifier becomes a cell entry, in one batch.
    pub fn put_row(&self, row_key: &str, columns: &[(&str, &str)]) -> Result<()> {
        let mut batch = WriteBatch::default();
        for (qualifier, value) in columns {
            batch.put(keys::cell_key(row_key, qualifier).as_bytes(), value.as_bytes());
        }
        self.db
            .write(batch)
            .with_context(|| format!("Failed to write row: {}", row_key))
    }
}

#[async_trait]
impl RowStore for RocksRowStore {
    async fn scan_rows(
        &self,
        range: &KeyRange,
        _keys_only: bool,
        visit: &mut (dyn FnMut(Row) -> bool + Send),
    ) -> Result<()> {
        let iter = self
            .db
            .iterator(IteratorMode::From(range.start.as_bytes(), Direction::Forward));

        let mut current: Option<Row> = None;

        for item in iter {
            let (cell_key, _value) = item.context("Failed to read from kvdb iterator")?;
            let cell_key = String::from_utf8(cell_key.to_vec())
                .context("Failed to parse kvdb key as UTF-8")?;

            let Some((row_key, qualifier)) = keys::split_cell_key(&cell_key) else {
                // Not a cell entry; nothing else shares the keyspace, skip.
                continue;
            };

            if !range.end.is_empty() && row_key >= range.end.as_str() {
                break;
            }

            let same_row = current.as_ref().is_some_and(|row| row.key == row_key);
            if same_row {
                if let Some(row) = current.as_mut() {
                    row.columns.push(qualifier.to_string());
                }
            } else {
                if let Some(done) = current.take()
                    && !visit(done)
                {
                    return Ok(());
                }
                current = Some(Row {
                    key: row_key.to_string(),
                    columns: vec![qualifier.to_string()],
                });
            }
        }

        if let Some(done) = current {
            visit(done);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn collect_rows(store: &RocksRowStore, range: &KeyRange) -> Vec<Row> {
        let mut rows = Vec::new();
        store
            .scan_rows(range, true, &mut |row| {
                rows.push(row);
                true
            })
            .await
            .unwrap();
        rows
    }

    #[tokio::test]
    async fn scan_groups_cells_into_rows_in_key_order() {
        let temp = TempDir::new().unwrap();
        let store = RocksRowStore::open(temp.path()).unwrap();
        store
            .put_row("00000002", &[("block", "{}"), ("meta:written", "1")])
            .unwrap();
        store.put_row("00000001", &[("block", "{}")]).unwrap();

        let rows = collect_rows(&store, &KeyRange::infinite("")).await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "00000001");
        assert_eq!(rows[0].columns, vec!["block"]);
        assert_eq!(rows[1].key, "00000002");
        assert_eq!(rows[1].columns, vec!["block", "meta:written"]);
    }

    #[tokio::test]
    async fn scan_respects_range_end() {
        let temp = TempDir::new().unwrap();
        let store = RocksRowStore::open(temp.path()).unwrap();
        for key in ["aaa", "bbb", "ccc"] {
            store.put_row(key, &[("written", "1")]).unwrap();
        }

        let rows = collect_rows(&store, &KeyRange::new("aaa", "ccc")).await;
        let row_keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(row_keys, vec!["aaa", "bbb"]);
    }

    #[tokio::test]
    async fn visitor_can_stop_scan_early() {
        let temp = TempDir::new().unwrap();
        let store = RocksRowStore::open(temp.path()).unwrap();
        for key in ["a", "b", "c"] {
            store.put_row(key, &[("written", "1")]).unwrap();
        }

        let mut seen = 0;
        store
            .scan_rows(&KeyRange::infinite(""), true, &mut |_| {
                seen += 1;
                false
            })
            .await
            .unwrap();
        assert_eq!(seen, 1);
    }

    #[tokio::test]
    async fn read_only_handle_sees_existing_rows() {
        let temp = TempDir::new().unwrap();
        {
            let store = RocksRowStore::open(temp.path()).unwrap();
            store.put_row("00000001", &[("block", "{}")]).unwrap();
        }

        let store = RocksRowStore::open_read_only(temp.path()).unwrap();
        let rows = collect_rows(&store, &KeyRange::infinite("")).await;
        assert_eq!(rows.len(), 1);
    }
}
