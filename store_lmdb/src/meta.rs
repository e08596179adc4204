//! LMDB implementation of MetaStore.

use attest_store::{MetaStore, Sequence, StoreError};

use crate::{LmdbError, LmdbStore};

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

impl LmdbStore {
    pub(crate) fn schema_version(&self) -> Result<u32, LmdbError> {
        let rtxn = self.env.read_txn()?;
        match self.meta_db.get(&rtxn, SCHEMA_VERSION_KEY)? {
            Some(bytes) => {
                let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                    LmdbError::Corruption("schema_version has unexpected byte length".to_string())
                })?;
                Ok(u32::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    pub(crate) fn write_schema_version(&self, version: u32) -> Result<(), LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        self.meta_db
            .put(&mut wtxn, SCHEMA_VERSION_KEY, &version.to_le_bytes())?;
        wtxn.commit()?;
        Ok(())
    }
}

impl MetaStore for LmdbStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, key.as_bytes(), value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, key.as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("meta key '{}'", key)))?;
        Ok(val.to_vec())
    }

    fn next_id(&self, sequence: Sequence) -> Result<u64, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let id = self.next_id_in(&mut wtxn, sequence)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(id)
    }

    fn get_schema_version(&self) -> Result<u32, StoreError> {
        Ok(self.schema_version()?)
    }

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        Ok(self.write_schema_version(version)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::open_temp;

    #[test]
    fn sequences_survive_reads_and_are_independent() {
        let (_dir, store) = open_temp();
        assert_eq!(store.next_id(Sequence::Record).unwrap(), 1);
        assert_eq!(store.next_id(Sequence::Record).unwrap(), 2);
        assert_eq!(store.next_id(Sequence::Usage).unwrap(), 1);
        store.put_meta("note", b"hi").unwrap();
        assert_eq!(store.get_meta("note").unwrap(), b"hi".to_vec());
        assert!(matches!(store.get_meta("nope"), Err(StoreError::NotFound(_))));
    }
}
