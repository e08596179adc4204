//! Field definitions and their typed configuration.

use crate::visibility::ShowWhen;
use attest_types::FieldGroupId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The rendering/usage context a field set is resolved for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Public submission form.
    Guest,
    /// Analyst review.
    Review,
    /// Validator item-level check.
    Validation,
    /// Published view.
    Public,
}

/// Per-mode visibility flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Visibility {
    pub guest: bool,
    pub review: bool,
    pub validation: bool,
    pub public: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            guest: true,
            review: true,
            validation: true,
            public: true,
        }
    }
}

impl Visibility {
    pub fn shows_in(&self, mode: DisplayMode) -> bool {
        match mode {
            DisplayMode::Guest => self.guest,
            DisplayMode::Review => self.review,
            DisplayMode::Validation => self.validation,
            DisplayMode::Public => self.public,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldWidth {
    #[default]
    Full,
    Half,
    Third,
}

/// Plain field type tag, without configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    RichText,
    Number,
    Date,
    Datetime,
    Boolean,
    Select,
    MultiSelect,
    Radio,
    CheckboxGroup,
    Url,
    Email,
    Location,
    Person,
    IncidentDateRange,
    TriState,
    LegalReference,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::RichText => "rich_text",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Boolean => "boolean",
            FieldType::Select => "select",
            FieldType::MultiSelect => "multi_select",
            FieldType::Radio => "radio",
            FieldType::CheckboxGroup => "checkbox_group",
            FieldType::Url => "url",
            FieldType::Email => "email",
            FieldType::Location => "location",
            FieldType::Person => "person",
            FieldType::IncidentDateRange => "incident_date_range",
            FieldType::TriState => "tri_state",
            FieldType::LegalReference => "legal_reference",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Types that carry no configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoConfig {}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    pub max_length: Option<u32>,
    pub placeholder: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NumberConfig {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Reject fractional values.
    pub integer: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DateConfig {
    /// Accept `YYYY` and `YYYY-MM` when the exact day is unknown.
    pub allow_partial: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChoiceConfig {
    pub options: Vec<ChoiceOption>,
    /// Accept free-text values outside the option list.
    pub allow_other: bool,
}

impl ChoiceConfig {
    pub fn has_option(&self, value: &str) -> bool {
        self.allow_other || self.options.iter().any(|o| o.value == value)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocationConfig {
    pub require_coordinates: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PersonConfig {
    pub require_age: bool,
}

/// Field type together with its type-specific configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum FieldKind {
    Text(TextConfig),
    Textarea(TextConfig),
    RichText(TextConfig),
    Number(NumberConfig),
    Date(DateConfig),
    Datetime(DateConfig),
    Boolean(NoConfig),
    Select(ChoiceConfig),
    MultiSelect(ChoiceConfig),
    Radio(ChoiceConfig),
    CheckboxGroup(ChoiceConfig),
    Url(NoConfig),
    Email(NoConfig),
    Location(LocationConfig),
    Person(PersonConfig),
    IncidentDateRange(DateConfig),
    /// Yes/no/unknown answers stored as `{selected: [...]}`.
    TriState(ChoiceConfig),
    LegalReference(NoConfig),
}

impl FieldKind {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldKind::Text(_) => FieldType::Text,
            FieldKind::Textarea(_) => FieldType::Textarea,
            FieldKind::RichText(_) => FieldType::RichText,
            FieldKind::Number(_) => FieldType::Number,
            FieldKind::Date(_) => FieldType::Date,
            FieldKind::Datetime(_) => FieldType::Datetime,
            FieldKind::Boolean(_) => FieldType::Boolean,
            FieldKind::Select(_) => FieldType::Select,
            FieldKind::MultiSelect(_) => FieldType::MultiSelect,
            FieldKind::Radio(_) => FieldType::Radio,
            FieldKind::CheckboxGroup(_) => FieldType::CheckboxGroup,
            FieldKind::Url(_) => FieldType::Url,
            FieldKind::Email(_) => FieldType::Email,
            FieldKind::Location(_) => FieldType::Location,
            FieldKind::Person(_) => FieldType::Person,
            FieldKind::IncidentDateRange(_) => FieldType::IncidentDateRange,
            FieldKind::TriState(_) => FieldType::TriState,
            FieldKind::LegalReference(_) => FieldType::LegalReference,
        }
    }

    /// The option list for choice-based types.
    pub fn choices(&self) -> Option<&ChoiceConfig> {
        match self {
            FieldKind::Select(c)
            | FieldKind::MultiSelect(c)
            | FieldKind::Radio(c)
            | FieldKind::CheckboxGroup(c)
            | FieldKind::TriState(c) => Some(c),
            _ => None,
        }
    }

    /// Check the configuration is internally consistent.
    pub(crate) fn check(&self) -> Result<(), String> {
        if let Some(choices) = self.choices() {
            if choices.options.is_empty() && !choices.allow_other {
                return Err("choice fields need at least one option".into());
            }
            let mut seen = std::collections::HashSet::new();
            for option in &choices.options {
                if option.value.trim().is_empty() {
                    return Err("option values must be non-empty".into());
                }
                if !seen.insert(option.value.as_str()) {
                    return Err(format!("duplicate option value {:?}", option.value));
                }
            }
        }
        match self {
            FieldKind::Number(NumberConfig {
                min: Some(min),
                max: Some(max),
                ..
            }) if min > max => Err(format!("min {min} exceeds max {max}")),
            FieldKind::Text(TextConfig {
                max_length: Some(0),
                ..
            })
            | FieldKind::Textarea(TextConfig {
                max_length: Some(0),
                ..
            })
            | FieldKind::RichText(TextConfig {
                max_length: Some(0),
                ..
            }) => Err("max_length must be positive".into()),
            _ => Ok(()),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A named, typed slot in a record's data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Unique within the record type; immutable once created.
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub help_text: Option<String>,
    pub kind: FieldKind,
    #[serde(default)]
    pub is_required: bool,
    /// Verifying this field needs at least one linked quote.
    #[serde(default)]
    pub requires_quote: bool,
    /// The supporting quote must cite a source with a URL.
    #[serde(default)]
    pub requires_source_for_quote: bool,
    /// Publication is blocked while this field has a value but is unverified.
    #[serde(default = "default_true")]
    pub require_verified_for_publish: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub width: FieldWidth,
    #[serde(default)]
    pub field_group_id: Option<FieldGroupId>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub show_when: Option<ShowWhen>,
}

impl FieldDefinition {
    /// A field with default flags; mainly for programmatic schema building.
    pub fn new(slug: impl Into<String>, name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            help_text: None,
            kind,
            is_required: false,
            requires_quote: false,
            requires_source_for_quote: false,
            require_verified_for_publish: true,
            visibility: Visibility::default(),
            width: FieldWidth::default(),
            field_group_id: None,
            sort_order: 0,
            show_when: None,
        }
    }

    pub fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn with_quote_requirement(mut self, requires_source: bool) -> Self {
        self.requires_quote = true;
        self.requires_source_for_quote = requires_source;
        self
    }

    pub fn with_show_when(mut self, rule: ShowWhen) -> Self {
        self.show_when = Some(rule);
        self
    }

    pub fn in_group(mut self, group: FieldGroupId) -> Self {
        self.field_group_id = Some(group);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_deserializes_from_adjacent_tag() {
        let kind: FieldKind = serde_json::from_value(json!({
            "type": "select",
            "config": {"options": [{"value": "a", "label": "A"}]}
        }))
        .unwrap();
        assert_eq!(kind.field_type(), FieldType::Select);
        assert!(kind.choices().unwrap().has_option("a"));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let parsed = serde_json::from_value::<FieldKind>(json!({
            "type": "hologram",
            "config": {}
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn config_for_wrong_type_is_rejected() {
        let parsed = serde_json::from_value::<FieldKind>(json!({
            "type": "number",
            "config": {"options": []}
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn inverted_number_bounds_fail_check() {
        let kind = FieldKind::Number(NumberConfig {
            min: Some(10.0),
            max: Some(1.0),
            integer: false,
        });
        assert!(kind.check().is_err());
    }

    #[test]
    fn choice_fields_need_options() {
        assert!(FieldKind::Radio(ChoiceConfig::default()).check().is_err());
        let open = ChoiceConfig {
            options: vec![],
            allow_other: true,
        };
        assert!(FieldKind::MultiSelect(open).check().is_ok());
    }

    #[test]
    fn visibility_defaults_to_every_mode() {
        let v = Visibility::default();
        assert!(v.shows_in(DisplayMode::Guest));
        assert!(v.shows_in(DisplayMode::Public));
        let hidden = Visibility {
            guest: false,
            ..Visibility::default()
        };
        assert!(!hidden.shows_in(DisplayMode::Guest));
        assert!(hidden.shows_in(DisplayMode::Review));
    }
}
