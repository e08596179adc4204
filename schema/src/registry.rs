//! Schema mutations with write-time validation.

use crate::error::SchemaError;
use crate::field::FieldDefinition;
use crate::record_type::{FieldGroup, RecordType};
use attest_types::FieldGroupId;

/// Applies admin schema edits to a record type, enforcing its invariants.
///
/// Every method validates before mutating; on error the record type is
/// left untouched.
pub struct SchemaRegistry;

impl SchemaRegistry {
    /// Add a new field definition.
    pub fn add_field(
        &self,
        record_type: &mut RecordType,
        field: FieldDefinition,
    ) -> Result<(), SchemaError> {
        check_slug(&field.slug)?;
        if record_type.field(&field.slug).is_some() {
            return Err(SchemaError::DuplicateSlug(field.slug));
        }
        self.check_field(record_type, &field)?;
        record_type.fields.push(field);
        Ok(())
    }

    /// Replace an existing definition. The slug cannot change.
    pub fn update_field(
        &self,
        record_type: &mut RecordType,
        slug: &str,
        field: FieldDefinition,
    ) -> Result<(), SchemaError> {
        let index = record_type
            .fields
            .iter()
            .position(|f| f.slug == slug)
            .ok_or_else(|| SchemaError::FieldNotFound(slug.to_string()))?;
        if field.slug != slug {
            return Err(SchemaError::SlugImmutable {
                from: slug.to_string(),
                to: field.slug,
            });
        }
        self.check_field(record_type, &field)?;
        record_type.fields[index] = field;
        Ok(())
    }

    /// Remove a field definition. Stored record data is left in place.
    pub fn delete_field(
        &self,
        record_type: &mut RecordType,
        slug: &str,
    ) -> Result<FieldDefinition, SchemaError> {
        let index = record_type
            .fields
            .iter()
            .position(|f| f.slug == slug)
            .ok_or_else(|| SchemaError::FieldNotFound(slug.to_string()))?;
        if let Some(dependent) = record_type
            .fields
            .iter()
            .find(|f| f.show_when.as_ref().is_some_and(|r| r.field == slug))
        {
            return Err(SchemaError::FieldReferenced {
                slug: slug.to_string(),
                dependent: dependent.slug.clone(),
            });
        }
        Ok(record_type.fields.remove(index))
    }

    pub fn add_group(
        &self,
        record_type: &mut RecordType,
        group: FieldGroup,
    ) -> Result<(), SchemaError> {
        if group.name.trim().is_empty() {
            return Err(SchemaError::InvalidConfig {
                slug: group.id.to_string(),
                reason: "group name must be non-empty".into(),
            });
        }
        if record_type.group(group.id).is_some() {
            return Err(SchemaError::InvalidConfig {
                slug: group.id.to_string(),
                reason: "group id already in use".into(),
            });
        }
        record_type.groups.push(group);
        Ok(())
    }

    /// Remove a group; its fields become ungrouped.
    pub fn delete_group(
        &self,
        record_type: &mut RecordType,
        id: FieldGroupId,
    ) -> Result<FieldGroup, SchemaError> {
        let index = record_type
            .groups
            .iter()
            .position(|g| g.id == id)
            .ok_or(SchemaError::GroupNotFound(id.get()))?;
        for field in &mut record_type.fields {
            if field.field_group_id == Some(id) {
                field.field_group_id = None;
            }
        }
        Ok(record_type.groups.remove(index))
    }

    /// Validate a whole record type, e.g. one imported from a document.
    pub fn validate(&self, record_type: &RecordType) -> Result<(), SchemaError> {
        let mut seen = std::collections::HashSet::new();
        for field in &record_type.fields {
            check_slug(&field.slug)?;
            if !seen.insert(field.slug.as_str()) {
                return Err(SchemaError::DuplicateSlug(field.slug.clone()));
            }
            self.check_field(record_type, field)?;
        }
        Ok(())
    }

    fn check_field(
        &self,
        record_type: &RecordType,
        field: &FieldDefinition,
    ) -> Result<(), SchemaError> {
        if field.name.trim().is_empty() {
            return Err(SchemaError::InvalidConfig {
                slug: field.slug.clone(),
                reason: "name must be non-empty".into(),
            });
        }
        field
            .kind
            .check()
            .map_err(|reason| SchemaError::InvalidConfig {
                slug: field.slug.clone(),
                reason,
            })?;
        if field.requires_source_for_quote && !field.requires_quote {
            return Err(SchemaError::InvalidConfig {
                slug: field.slug.clone(),
                reason: "requires_source_for_quote needs requires_quote".into(),
            });
        }
        if let Some(group) = field.field_group_id {
            if record_type.group(group).is_none() {
                return Err(SchemaError::ForeignGroup(group.get()));
            }
        }
        if let Some(rule) = &field.show_when {
            let target_exists = rule.field != field.slug && record_type.field(&rule.field).is_some();
            if !target_exists {
                return Err(SchemaError::UnknownDependency {
                    slug: field.slug.clone(),
                    target: rule.field.clone(),
                });
            }
        }
        Ok(())
    }
}

fn check_slug(slug: &str) -> Result<(), SchemaError> {
    let mut chars = slug.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && slug.len() <= 64;
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidSlug(slug.to_string()))
    }
}
