//! Projects, record types and field groups.

use crate::field::{DisplayMode, FieldDefinition};
use crate::value::RecordData;
use attest_types::{FieldGroupId, ProjectId, RecordTypeId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A documentation project. Owns record types, members and a credit account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub slug: String,
    pub created_by: UserId,
    pub created_at: Timestamp,
}

/// A visual grouping of fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldGroup {
    pub id: FieldGroupId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub collapsed_by_default: bool,
}

/// The schema of one kind of record within a project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordType {
    pub id: RecordTypeId,
    pub project_id: ProjectId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub groups: Vec<FieldGroup>,
}

impl RecordType {
    pub fn new(
        id: RecordTypeId,
        project_id: ProjectId,
        name: impl Into<String>,
        slug: impl Into<String>,
    ) -> Self {
        Self {
            id,
            project_id,
            name: name.into(),
            slug: slug.into(),
            fields: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn field(&self, slug: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.slug == slug)
    }

    pub fn group(&self, id: FieldGroupId) -> Option<&FieldGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Fields shown for `mode` given the current data, in display order.
    ///
    /// A field is shown when its mode flag is set and its `show_when` rule
    /// (if any) holds. Ungrouped fields come first, then groups in their
    /// sort order; within a group, fields follow their own sort order.
    pub fn effective_fields(&self, mode: DisplayMode, data: &RecordData) -> Vec<&FieldDefinition> {
        let mut visible: Vec<&FieldDefinition> = self
            .fields
            .iter()
            .filter(|f| f.visibility.shows_in(mode))
            .filter(|f| f.show_when.as_ref().map_or(true, |rule| rule.is_satisfied(data)))
            .collect();
        visible.sort_by_key(|f| {
            let group_order = f
                .field_group_id
                .and_then(|g| self.group(g))
                .map(|g| (g.sort_order, g.id.get()));
            (group_order, f.sort_order)
        });
        visible
    }

    /// Data keys that no longer map to a field definition.
    pub fn orphaned_slugs<'a>(&self, data: &'a RecordData) -> Vec<&'a str> {
        data.keys()
            .filter(|k| self.field(k).is_none())
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{ChoiceConfig, ChoiceOption, FieldKind, NoConfig, TextConfig, Visibility};
    use crate::visibility::{ConditionOperator, ShowWhen};
    use serde_json::json;

    fn schema() -> RecordType {
        let mut rt = RecordType::new(RecordTypeId::new(1), ProjectId::new(1), "Death", "death");
        rt.groups.push(FieldGroup {
            id: FieldGroupId::new(10),
            name: "Circumstances".into(),
            description: None,
            sort_order: 1,
            collapsed_by_default: false,
        });
        rt.fields.push(FieldDefinition::new(
            "name",
            "Name",
            FieldKind::Text(TextConfig::default()),
        ));
        rt.fields.push(FieldDefinition::new(
            "armed",
            "Armed",
            FieldKind::Radio(ChoiceConfig {
                options: vec![
                    ChoiceOption {
                        value: "yes".into(),
                        label: "Yes".into(),
                    },
                    ChoiceOption {
                        value: "no".into(),
                        label: "No".into(),
                    },
                ],
                allow_other: false,
            }),
        )
        .in_group(FieldGroupId::new(10)));
        rt.fields.push(
            FieldDefinition::new("weapon", "Weapon", FieldKind::Text(TextConfig::default()))
                .in_group(FieldGroupId::new(10))
                .with_show_when(ShowWhen::new("armed", ConditionOperator::Equals, json!("yes"))),
        );
        let mut internal =
            FieldDefinition::new("internal_note", "Note", FieldKind::Url(NoConfig {}));
        internal.visibility = Visibility {
            guest: false,
            public: false,
            ..Visibility::default()
        };
        rt.fields.push(internal);
        rt
    }

    fn slugs(fields: Vec<&FieldDefinition>) -> Vec<&str> {
        fields.into_iter().map(|f| f.slug.as_str()).collect()
    }

    #[test]
    fn hidden_dependents_drop_out() {
        let rt = schema();
        let data: RecordData = [("armed".to_string(), json!("no"))].into_iter().collect();
        assert_eq!(
            slugs(rt.effective_fields(DisplayMode::Review, &data)),
            vec!["name", "internal_note", "armed"]
        );

        let data: RecordData = [("armed".to_string(), json!("yes"))].into_iter().collect();
        assert!(slugs(rt.effective_fields(DisplayMode::Review, &data)).contains(&"weapon"));
    }

    #[test]
    fn mode_flags_filter_fields() {
        let rt = schema();
        let fields = slugs(rt.effective_fields(DisplayMode::Guest, &RecordData::new()));
        assert!(!fields.contains(&"internal_note"));
    }

    #[test]
    fn orphaned_data_is_reported() {
        let rt = schema();
        let data: RecordData = [
            ("name".to_string(), json!("A")),
            ("old_field".to_string(), json!("B")),
        ]
        .into_iter()
        .collect();
        assert_eq!(rt.orphaned_slugs(&data), vec!["old_field"]);
    }
}
