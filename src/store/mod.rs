//! Access to the variant datastore.
//!
//! The datastore is a RocksDB database with one column family per table.
//! Each row is stored as a JSON object mapping column names to values under
//! the byte key of its `VariantKey`.

use std::{path::Path, time::Duration};

use crate::{common::VariantKey, err::Error, genotypes::ds::SampleGenotypes};

/// One stored row, column name to value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Settings for opening the store.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Number of retries after the first failed attempt.
    pub retries: usize,
    /// Pause between two attempts.
    pub backoff: Duration,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Read-only handle to the datastore, scoped to one run or request.
pub struct Store {
    /// Path to the RocksDB directory.
    path: String,
    /// The RocksDB handle.
    db: rocksdb::DB,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("path", &self.path).finish()
    }
}

impl Store {
    /// Open the store at `path` for reading the given tables.
    ///
    /// Opening is retried `options.retries` times; afterwards the last error
    /// is reported as `Error::StoreUnavailable`.
    pub fn open<P: AsRef<Path>>(
        path: P,
        tables: &[&str],
        options: &OpenOptions,
    ) -> Result<Self, Error> {
        let path_str = path.as_ref().display().to_string();
        let db_options = rocksdb::Options::default();
        let mut attempt = 0;
        loop {
            match rocksdb::DB::open_cf_for_read_only(&db_options, path.as_ref(), tables, false) {
                Ok(db) => {
                    tracing::info!("Connected to the datastore at {}", &path_str);
                    return Ok(Store { path: path_str, db });
                }
                Err(e) if attempt < options.retries => {
                    attempt += 1;
                    tracing::warn!(
                        "problem opening datastore at {}: {} (retry #{})",
                        &path_str,
                        e,
                        attempt
                    );
                    std::thread::sleep(options.backoff);
                }
                Err(e) => {
                    return Err(Error::StoreUnavailable(format!(
                        "could not open {} after {} attempts: {}",
                        &path_str,
                        attempt + 1,
                        e
                    )))
                }
            }
        }
    }

    fn cf(&self, table: &str) -> Result<&rocksdb::ColumnFamily, Error> {
        self.db
            .cf_handle(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))
    }

    /// Decode a stored row; `key` is only used for reporting.
    fn decode_row(table: &str, key: &[u8], buf: &[u8]) -> Result<Row, Error> {
        serde_json::from_slice(buf).map_err(|e| Error::CorruptStoredRow {
            key: VariantKey::from_db_key(key)
                .map(|key| key.to_string())
                .unwrap_or_else(|| String::from_utf8_lossy(key).into_owned()),
            reason: format!("could not decode row in table {}: {}", table, e),
        })
    }

    /// Fetch one row by its variant key.
    pub fn get_row(&self, table: &str, key: &VariantKey) -> Result<Option<Row>, Error> {
        let cf = self.cf(table)?;
        let db_key: Vec<u8> = key.into();
        let buf = self.db.get_cf(cf, &db_key).map_err(|e| {
            Error::StoreUnavailable(format!(
                "problem accessing table {} for variant {}: {}",
                table, key, e
            ))
        })?;
        buf.map(|buf| Self::decode_row(table, &db_key, &buf))
            .transpose()
    }

    /// Iterate over all rows of a table in key order.
    pub fn scan<'a>(
        &'a self,
        table: &'a str,
    ) -> Result<impl Iterator<Item = Result<Row, Error>> + 'a, Error> {
        let cf = self.cf(table)?;
        Ok(self
            .db
            .iterator_cf(cf, rocksdb::IteratorMode::Start)
            .map(move |item| {
                let (key, value) = item.map_err(|e| {
                    Error::StoreUnavailable(format!("problem scanning table {}: {}", table, e))
                })?;
                Self::decode_row(table, &key, &value)
            }))
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        tracing::info!("Disconnected from the datastore at {}", &self.path);
    }
}

/// Fetch the stored sample genotypes of a variant.
pub trait VariantLookup: Sync {
    /// Return the stored genotypes of `key` or `None` if there are none.
    ///
    /// A missing row and a row without (or with empty) genotypes are both
    /// reported as `None`.
    fn lookup(&self, key: &VariantKey) -> Result<Option<SampleGenotypes>, Error>;
}

/// `VariantLookup` reading the samples column of a `Store` table.
#[derive(Debug)]
pub struct RocksDbLookup<'a> {
    pub store: &'a Store,
    pub table: String,
    pub samples_column: String,
}

impl VariantLookup for RocksDbLookup<'_> {
    fn lookup(&self, key: &VariantKey) -> Result<Option<SampleGenotypes>, Error> {
        let row = match self.store.get_row(&self.table, key)? {
            Some(row) => row,
            None => return Ok(None),
        };
        let text = match row.get(&self.samples_column) {
            None | Some(serde_json::Value::Null) => return Ok(None),
            Some(serde_json::Value::String(text)) if text.trim().is_empty() => return Ok(None),
            Some(serde_json::Value::String(text)) => text.clone(),
            // stored as nested object
            Some(value) => value.to_string(),
        };
        let genotypes = SampleGenotypes::decode(&text).map_err(|e| Error::CorruptStoredRow {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(genotypes).filter(|genotypes| !genotypes.is_empty()))
    }
}


#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn fixture(tmp_dir: &temp_testdir::TempDir) -> Result<std::path::PathBuf, anyhow::Error> {
        let path = tmp_dir.join("db");
        test_util::write_rows(
            &path,
            &["annotations"],
            &[
                (
                    "annotations",
                    VariantKey::new("chr1", 100, "A", "G"),
                    json!({"chr": "chr1", "pos": 100, "variant_samples": "{\"s1\": \"A/G\"}"}),
                ),
                (
                    "annotations",
                    VariantKey::new("chr1", 200, "C", "T"),
                    json!({"chr": "chr1", "pos": 200, "variant_samples": null}),
                ),
                (
                    "annotations",
                    VariantKey::new("chr1", 300, "C", "T"),
                    json!({"chr": "chr1", "pos": 300, "variant_samples": ""}),
                ),
                (
                    "annotations",
                    VariantKey::new("chr1", 400, "C", "T"),
                    json!({"chr": "chr1", "pos": 400, "variant_samples": "{}"}),
                ),
                (
                    "annotations",
                    VariantKey::new("chr1", 500, "C", "T"),
                    json!({"chr": "chr1", "pos": 500, "variant_samples": "not a map"}),
                ),
                (
                    "annotations",
                    VariantKey::new("chr1", 600, "C", "T"),
                    json!({"chr": "chr1", "pos": 600}),
                ),
            ],
        )?;
        Ok(path)
    }

    fn lookup<'a>(store: &'a Store) -> RocksDbLookup<'a> {
        RocksDbLookup {
            store,
            table: String::from("annotations"),
            samples_column: String::from("variant_samples"),
        }
    }

    #[test]
    fn lookup_existing() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = Store::open(fixture(&tmp_dir)?, &["annotations"], &Default::default())?;

        let genotypes = lookup(&store)
            .lookup(&VariantKey::new("chr1", 100, "A", "G"))?
            .expect("stored genotypes");
        assert_eq!(genotypes.encode(), r#"{"s1": "A/G"}"#);

        Ok(())
    }

    #[rstest::rstest]
    #[case::missing_row(150)]
    #[case::null(200)]
    #[case::empty_string(300)]
    #[case::empty_map(400)]
    #[case::missing_column(600)]
    fn lookup_absent(#[case] pos: u32) -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = Store::open(fixture(&tmp_dir)?, &["annotations"], &Default::default())?;

        let reference = if pos == 150 { "A" } else { "C" };
        assert_eq!(
            lookup(&store).lookup(&VariantKey::new("chr1", pos, reference, "T"))?,
            None
        );

        Ok(())
    }

    #[test]
    fn lookup_alleles_must_match() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = Store::open(fixture(&tmp_dir)?, &["annotations"], &Default::default())?;

        assert_eq!(
            lookup(&store).lookup(&VariantKey::new("chr1", 100, "A", "T"))?,
            None
        );

        Ok(())
    }

    #[test]
    fn lookup_corrupt() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = Store::open(fixture(&tmp_dir)?, &["annotations"], &Default::default())?;

        assert!(matches!(
            lookup(&store).lookup(&VariantKey::new("chr1", 500, "C", "T")),
            Err(Error::CorruptStoredRow { .. })
        ));

        Ok(())
    }

    #[test]
    fn undecodable_row_is_corrupt() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("db");
        test_util::write_raw_rows(
            &path,
            &["annotations"],
            &[(
                "annotations",
                VariantKey::new("chr1", 700, "C", "T"),
                b"not json".to_vec(),
            )],
        )?;
        let store = Store::open(&path, &["annotations"], &Default::default())?;

        match lookup(&store).lookup(&VariantKey::new("chr1", 700, "C", "T")) {
            Err(Error::CorruptStoredRow { key, .. }) => assert_eq!(key, "chr1-700-C-T"),
            other => panic!("unexpected result: {:?}", other),
        }
        match store.scan("annotations")?.next() {
            Some(Err(Error::CorruptStoredRow { key, .. })) => assert_eq!(key, "chr1-700-C-T"),
            other => panic!("unexpected result: {:?}", other),
        }

        Ok(())
    }

    #[test]
    fn scan_in_key_order() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = Store::open(fixture(&tmp_dir)?, &["annotations"], &Default::default())?;

        let positions = store
            .scan("annotations")?
            .map(|row| row.map(|row| row["pos"].as_u64().unwrap_or_default()))
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(positions, vec![100, 200, 300, 400, 500, 600]);

        Ok(())
    }

    #[test]
    fn unknown_table() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let store = Store::open(fixture(&tmp_dir)?, &["annotations"], &Default::default())?;

        assert!(matches!(
            store.scan("nope").map(|_| ()),
            Err(Error::UnknownTable(_))
        ));

        Ok(())
    }

    #[test]
    fn open_missing_store_fails() {
        let tmp_dir = temp_testdir::TempDir::default();
        let options = OpenOptions {
            retries: 1,
            backoff: Duration::from_millis(1),
        };

        assert!(matches!(
            Store::open(tmp_dir.join("missing"), &["annotations"], &options),
            Err(Error::StoreUnavailable(_))
        ));
    }
}
