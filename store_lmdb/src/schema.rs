//! LMDB implementation of SchemaStore.

use attest_schema::{Project, RecordType};
use attest_store::{SchemaStore, StoreError};
use attest_types::{ProjectId, RecordTypeId};
use tracing::debug;

use crate::environment::{composite_key, get_json, prefix_keys, put_json, require_json, trailing_id};
use crate::error::backend;
use crate::{LmdbError, LmdbStore};

impl SchemaStore for LmdbStore {
    fn insert_project(&self, project: &Project) -> Result<(), StoreError> {
        let key = project.id.to_be_bytes();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self.projects_db.get(&wtxn, &key).map_err(LmdbError::from)?.is_some() {
            return Err(StoreError::Duplicate(project.id.to_string()));
        }
        put_json(&self.projects_db, &mut wtxn, &key, project)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_project(&self, id: ProjectId) -> Result<Project, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(require_json(&self.projects_db, &rtxn, &id.to_be_bytes(), id)?)
    }

    fn insert_record_type(&self, record_type: &RecordType) -> Result<(), StoreError> {
        let key = record_type.id.to_be_bytes();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .record_types_db
            .get(&wtxn, &key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(record_type.id.to_string()));
        }
        put_json(&self.record_types_db, &mut wtxn, &key, record_type)?;
        let index = composite_key(&record_type.project_id.to_be_bytes(), record_type.id.get());
        self.record_types_by_project_db
            .put(&mut wtxn, &index, &[])
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_record_type(&self, id: RecordTypeId) -> Result<RecordType, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(require_json(&self.record_types_db, &rtxn, &id.to_be_bytes(), id)?)
    }

    fn record_types(&self, project: ProjectId) -> Result<Vec<RecordType>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let keys = prefix_keys(&self.record_types_by_project_db, &rtxn, &project.to_be_bytes())?;
        let mut types = Vec::with_capacity(keys.len());
        for key in keys {
            let id = trailing_id(&key)?;
            if let Some(rt) = get_json(&self.record_types_db, &rtxn, &id.to_be_bytes())? {
                types.push(rt);
            }
        }
        debug!(%project, count = types.len(), "listed record types");
        Ok(types)
    }

    fn update_record_type<T, E, F>(&self, id: RecordTypeId, f: F) -> Result<(RecordType, T), E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut RecordType) -> Result<T, E>,
    {
        let key = id.to_be_bytes();
        let mut wtxn = self.env.write_txn().map_err(backend)?;
        let mut record_type: RecordType =
            require_json(&self.record_types_db, &wtxn, &key, id).map_err(backend)?;
        let out = f(&mut record_type)?;
        put_json(&self.record_types_db, &mut wtxn, &key, &record_type).map_err(backend)?;
        wtxn.commit().map_err(backend)?;
        Ok((record_type, out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::open_temp;
    use attest_types::{Timestamp, UserId};

    #[test]
    fn record_types_are_listed_per_project() {
        let (_dir, store) = open_temp();
        let project = Project {
            id: ProjectId::new(1),
            name: "Deaths in custody".into(),
            slug: "custody".into(),
            created_by: UserId::from("owner"),
            created_at: Timestamp::new(1),
        };
        store.insert_project(&project).unwrap();
        assert!(matches!(
            store.insert_project(&project),
            Err(StoreError::Duplicate(_))
        ));
        assert_eq!(store.get_project(project.id).unwrap(), project);

        store
            .insert_record_type(&RecordType::new(RecordTypeId::new(1), project.id, "A", "a"))
            .unwrap();
        store
            .insert_record_type(&RecordType::new(RecordTypeId::new(2), ProjectId::new(2), "B", "b"))
            .unwrap();
        let listed = store.record_types(project.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].slug, "a");
    }

    #[test]
    fn failed_schema_update_is_discarded() {
        let (_dir, store) = open_temp();
        let id = RecordTypeId::new(1);
        store
            .insert_record_type(&RecordType::new(id, ProjectId::new(1), "A", "a"))
            .unwrap();
        let result: Result<(RecordType, ()), StoreError> = store.update_record_type(id, |rt| {
            rt.name = "changed".into();
            Err(StoreError::Backend("refused".into()))
        });
        assert!(result.is_err());
        assert_eq!(store.get_record_type(id).unwrap().name, "A");

        let (rt, ()) = store
            .update_record_type::<_, StoreError, _>(id, |rt| {
                rt.name = "renamed".into();
                Ok(())
            })
            .unwrap();
        assert_eq!(rt.name, "renamed");
        assert_eq!(store.get_record_type(id).unwrap().name, "renamed");
    }
}
