//! LMDB environment setup and shared key/value helpers.

use std::fmt::Display;
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use attest_store::Sequence;

use crate::LmdbError;

const MAX_DBS: u32 = 16;

/// Current on-disk layout version.
pub const SCHEMA_VERSION: u32 = 1;

/// The LMDB environment and all database handles.
pub struct LmdbStore {
    pub(crate) env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
    pub(crate) projects_db: Database<Bytes, Bytes>,
    pub(crate) record_types_db: Database<Bytes, Bytes>,
    /// `project(8) ++ record_type(8)` → empty.
    pub(crate) record_types_by_project_db: Database<Bytes, Bytes>,
    pub(crate) records_db: Database<Bytes, Bytes>,
    pub(crate) evidence_db: Database<Bytes, Bytes>,
    /// `project(8) ++ status ++ 0x00 ++ record(8)` → empty.
    pub(crate) records_by_status_db: Database<Bytes, Bytes>,
    pub(crate) requests_db: Database<Bytes, Bytes>,
    /// `record(8) ++ request(8)` → empty.
    pub(crate) requests_by_record_db: Database<Bytes, Bytes>,
    pub(crate) suggestions_db: Database<Bytes, Bytes>,
    /// `record(8) ++ suggestion(8)` → empty.
    pub(crate) suggestions_by_record_db: Database<Bytes, Bytes>,
    /// Usage events, keyed for window range scans (see `quota.rs`).
    pub(crate) usage_db: Database<Bytes, Bytes>,
    pub(crate) accounts_db: Database<Bytes, Bytes>,
    /// `project(8) ++ transaction(8)` → ledger entry.
    pub(crate) ledger_db: Database<Bytes, Bytes>,
}

impl LmdbStore {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per directory by this
        // process and never concurrently mapped with other flags.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let store = Self {
            meta_db: env.create_database(&mut wtxn, Some("meta"))?,
            projects_db: env.create_database(&mut wtxn, Some("projects"))?,
            record_types_db: env.create_database(&mut wtxn, Some("record_types"))?,
            record_types_by_project_db: env
                .create_database(&mut wtxn, Some("record_types_by_project"))?,
            records_db: env.create_database(&mut wtxn, Some("records"))?,
            evidence_db: env.create_database(&mut wtxn, Some("evidence"))?,
            records_by_status_db: env.create_database(&mut wtxn, Some("records_by_status"))?,
            requests_db: env.create_database(&mut wtxn, Some("requests"))?,
            requests_by_record_db: env.create_database(&mut wtxn, Some("requests_by_record"))?,
            suggestions_db: env.create_database(&mut wtxn, Some("suggestions"))?,
            suggestions_by_record_db: env
                .create_database(&mut wtxn, Some("suggestions_by_record"))?,
            usage_db: env.create_database(&mut wtxn, Some("usage"))?,
            accounts_db: env.create_database(&mut wtxn, Some("accounts"))?,
            ledger_db: env.create_database(&mut wtxn, Some("ledger"))?,
            env: Arc::new(env.clone()),
        };
        wtxn.commit()?;

        let version = store.schema_version()?;
        if version == 0 {
            store.write_schema_version(SCHEMA_VERSION)?;
        } else if version > SCHEMA_VERSION {
            return Err(LmdbError::Corruption(format!(
                "database layout v{version} is newer than supported v{SCHEMA_VERSION}"
            )));
        }
        info!(path = %path.display(), map_size, "opened LMDB store");
        Ok(store)
    }

    /// Allocate the next id of `sequence` inside an open write transaction.
    pub(crate) fn next_id_in(
        &self,
        txn: &mut RwTxn<'_>,
        sequence: Sequence,
    ) -> Result<u64, LmdbError> {
        let key = sequence.key().as_bytes();
        let current = match self.meta_db.get(txn, key)? {
            Some(bytes) => u64::from_be_bytes(bytes.try_into().map_err(|_| {
                LmdbError::Corruption(format!("{} has unexpected byte length", sequence.key()))
            })?),
            None => 0,
        };
        let next = current + 1;
        self.meta_db.put(txn, key, &next.to_be_bytes())?;
        Ok(next)
    }
}

/// Increment a byte prefix to the smallest key greater than every key that
/// starts with it. Leaves the vector empty when no such key exists.
pub(crate) fn increment_prefix(prefix: &mut Vec<u8>) {
    while let Some(last) = prefix.last_mut() {
        if *last < u8::MAX {
            *last += 1;
            return;
        }
        prefix.pop();
    }
}

/// Keys of `db` starting with `prefix`, in key order.
pub(crate) fn prefix_keys(
    db: &Database<Bytes, Bytes>,
    txn: &RoTxn<'_>,
    prefix: &[u8],
) -> Result<Vec<Vec<u8>>, LmdbError> {
    let mut upper = prefix.to_vec();
    increment_prefix(&mut upper);
    let bounds = if upper.is_empty() {
        (Bound::Included(prefix), Bound::Unbounded)
    } else {
        (Bound::Included(prefix), Bound::Excluded(upper.as_slice()))
    };
    let mut keys = Vec::new();
    for result in db.range(txn, &bounds)? {
        let (key, _) = result?;
        keys.push(key.to_vec());
    }
    Ok(keys)
}

/// The trailing 8 bytes of a composite key as a big-endian id.
pub(crate) fn trailing_id(key: &[u8]) -> Result<u64, LmdbError> {
    key.len()
        .checked_sub(8)
        .and_then(|start| key[start..].try_into().ok())
        .map(u64::from_be_bytes)
        .ok_or_else(|| LmdbError::Corruption("index key shorter than an id".to_string()))
}

pub(crate) fn composite_key(prefix: &[u8], id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 8);
    key.extend_from_slice(prefix);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

pub(crate) fn get_json<T: DeserializeOwned>(
    db: &Database<Bytes, Bytes>,
    txn: &RoTxn<'_>,
    key: &[u8],
) -> Result<Option<T>, LmdbError> {
    match db.get(txn, key)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn put_json<T: Serialize>(
    db: &Database<Bytes, Bytes>,
    txn: &mut RwTxn<'_>,
    key: &[u8],
    value: &T,
) -> Result<(), LmdbError> {
    let bytes = serde_json::to_vec(value)?;
    db.put(txn, key, &bytes)?;
    Ok(())
}

/// Like [`get_json`] but absence is an error.
pub(crate) fn require_json<T: DeserializeOwned>(
    db: &Database<Bytes, Bytes>,
    txn: &RoTxn<'_>,
    key: &[u8],
    what: impl Display,
) -> Result<T, LmdbError> {
    get_json(db, txn, key)?.ok_or_else(|| LmdbError::NotFound(what.to_string()))
}

#[cfg(test)]
pub(crate) fn open_temp() -> (tempfile::TempDir, LmdbStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = LmdbStore::open(dir.path(), 16 * 1024 * 1024).unwrap();
    (dir, store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_increment_carries() {
        let mut p = vec![0x01, 0xFF];
        increment_prefix(&mut p);
        assert_eq!(p, vec![0x02]);
        let mut p = vec![0xFF, 0xFF];
        increment_prefix(&mut p);
        assert!(p.is_empty());
    }

    #[test]
    fn reopening_keeps_layout_version() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LmdbStore::open(dir.path(), 16 * 1024 * 1024).unwrap();
            assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
        }
        let store = LmdbStore::open(dir.path(), 16 * 1024 * 1024).unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn trailing_id_reads_last_eight_bytes() {
        let key = composite_key(b"abc", 42);
        assert_eq!(trailing_id(&key).unwrap(), 42);
        assert!(trailing_id(b"short").is_err());
    }
}
