//! Project and record type administration.

use attest_schema::{DisplayMode, FieldDefinition, FieldGroup, Project, RecordData, RecordType};
use attest_store::{Sequence, Store};
use attest_types::{Actor, Clock, FieldGroupId, ProjectId, RecordTypeId, UserId};
use tracing::info;

use crate::service::{refused, require, same_project};
use crate::{AttestService, ServiceError};

fn check_name(what: &str, name: &str) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::Invalid(format!("{what} name must be non-empty")));
    }
    Ok(())
}

fn check_url_slug(slug: &str) -> Result<(), ServiceError> {
    let valid = !slug.is_empty()
        && slug.len() <= 64
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ServiceError::Invalid(format!(
            "slug {slug:?} may only use lowercase letters, digits, '-' and '_'"
        )))
    }
}

impl<S: Store, C: Clock> AttestService<S, C> {
    /// Create a project. The identity collaborator decides who may do so and
    /// makes `creator` its owner.
    pub fn create_project(
        &self,
        creator: &UserId,
        name: &str,
        slug: &str,
    ) -> Result<Project, ServiceError> {
        check_name("project", name)?;
        check_url_slug(slug)?;
        let project = Project {
            id: ProjectId::new(self.next_id(Sequence::Project)?),
            name: name.trim().to_string(),
            slug: slug.to_string(),
            created_by: creator.clone(),
            created_at: self.now(),
        };
        self.store.insert_project(&project)?;
        info!(project = %project.id, slug, creator = %creator, "created project");
        Ok(project)
    }

    /// Create a record type with an initial field set, checked as a whole.
    pub fn create_record_type(
        &self,
        actor: &Actor,
        name: &str,
        slug: &str,
        fields: Vec<FieldDefinition>,
    ) -> Result<RecordType, ServiceError> {
        let result = (|| -> Result<RecordType, ServiceError> {
            require(actor.role.is_admin(), actor, "edit schemas")?;
            check_name("record type", name)?;
            check_url_slug(slug)?;
            let project = self.store.get_project(actor.project_id)?;
            if self
                .store
                .record_types(project.id)?
                .iter()
                .any(|rt| rt.slug == slug)
            {
                return Err(ServiceError::Invalid(format!(
                    "record type slug {slug} is taken in this project"
                )));
            }
            let id = RecordTypeId::new(self.next_id(Sequence::RecordType)?);
            let mut record_type = RecordType::new(id, project.id, name.trim(), slug);
            for field in fields {
                self.registry.add_field(&mut record_type, field)?;
            }
            self.registry.validate(&record_type)?;
            self.store.insert_record_type(&record_type)?;
            Ok(record_type)
        })()
        .map_err(|e| refused("create_record_type", &actor.id, e))?;
        info!(
            record_type = %result.id,
            project = %result.project_id,
            fields = result.fields.len(),
            "created record type"
        );
        Ok(result)
    }

    pub fn add_field(
        &self,
        actor: &Actor,
        record_type: RecordTypeId,
        field: FieldDefinition,
    ) -> Result<RecordType, ServiceError> {
        let slug = field.slug.clone();
        let (updated, ()) = self
            .edit_schema(actor, record_type, "add_field", |rt| {
                Ok(self.registry.add_field(rt, field)?)
            })?;
        info!(record_type = %record_type, slug, "added field");
        Ok(updated)
    }

    /// Replace a field definition. The slug is immutable.
    pub fn update_field(
        &self,
        actor: &Actor,
        record_type: RecordTypeId,
        slug: &str,
        field: FieldDefinition,
    ) -> Result<RecordType, ServiceError> {
        let (updated, ()) = self.edit_schema(actor, record_type, "update_field", |rt| {
            Ok(self.registry.update_field(rt, slug, field)?)
        })?;
        info!(record_type = %record_type, slug, "updated field");
        Ok(updated)
    }

    /// Remove a field. Values already stored under its slug stay on the
    /// records as orphaned data.
    pub fn delete_field(
        &self,
        actor: &Actor,
        record_type: RecordTypeId,
        slug: &str,
    ) -> Result<FieldDefinition, ServiceError> {
        let (_, removed) = self.edit_schema(actor, record_type, "delete_field", |rt| {
            Ok(self.registry.delete_field(rt, slug)?)
        })?;
        info!(record_type = %record_type, slug, "deleted field");
        Ok(removed)
    }

    pub fn add_group(
        &self,
        actor: &Actor,
        record_type: RecordTypeId,
        name: &str,
        description: Option<String>,
        sort_order: i32,
    ) -> Result<FieldGroup, ServiceError> {
        let id = FieldGroupId::new(self.next_id(Sequence::FieldGroup)?);
        let group = FieldGroup {
            id,
            name: name.trim().to_string(),
            description,
            sort_order,
            collapsed_by_default: false,
        };
        let (_, ()) = self.edit_schema(actor, record_type, "add_group", |rt| {
            Ok(self.registry.add_group(rt, group.clone())?)
        })?;
        info!(record_type = %record_type, group = %id, "added field group");
        Ok(group)
    }

    /// Remove a group; its fields become ungrouped.
    pub fn delete_group(
        &self,
        actor: &Actor,
        record_type: RecordTypeId,
        group: FieldGroupId,
    ) -> Result<FieldGroup, ServiceError> {
        let (_, removed) = self.edit_schema(actor, record_type, "delete_group", |rt| {
            Ok(self.registry.delete_group(rt, group)?)
        })?;
        info!(record_type = %record_type, group = %group, "deleted field group");
        Ok(removed)
    }

    pub fn record_type(&self, id: RecordTypeId) -> Result<RecordType, ServiceError> {
        Ok(self.store.get_record_type(id)?)
    }

    /// Fields shown in `mode` for `data`, in display order.
    pub fn effective_fields(
        &self,
        record_type: RecordTypeId,
        mode: DisplayMode,
        data: &RecordData,
    ) -> Result<Vec<FieldDefinition>, ServiceError> {
        let record_type = self.store.get_record_type(record_type)?;
        Ok(record_type
            .effective_fields(mode, data)
            .into_iter()
            .cloned()
            .collect())
    }

    fn edit_schema<T>(
        &self,
        actor: &Actor,
        record_type: RecordTypeId,
        operation: &'static str,
        edit: impl FnOnce(&mut RecordType) -> Result<T, ServiceError>,
    ) -> Result<(RecordType, T), ServiceError> {
        self.store
            .update_record_type::<T, ServiceError, _>(record_type, |rt| {
                require(actor.role.is_admin(), actor, "edit schemas")?;
                same_project(actor, rt.project_id)?;
                edit(rt)
            })
            .map_err(|e| refused(operation, &actor.id, e))
    }
}
