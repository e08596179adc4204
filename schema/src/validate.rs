//! Submission validation against a record type.

use crate::error::{FieldProblem, SchemaError};
use crate::field::{
    ChoiceConfig, DateConfig, DisplayMode, FieldDefinition, FieldKind, LocationConfig,
    NumberConfig, PersonConfig, TextConfig,
};
use crate::record_type::RecordType;
use crate::value::{is_empty_value, unwrap_composite, RecordData};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use url::Url;

/// Check `data` against the fields visible in `mode`.
///
/// All problems are collected and returned together. Hidden fields are
/// neither required nor type-checked; keys with no field definition are
/// ignored.
pub fn validate_submission(
    record_type: &RecordType,
    mode: DisplayMode,
    data: &RecordData,
) -> Result<(), SchemaError> {
    let mut problems = Vec::new();
    for field in record_type.effective_fields(mode, data) {
        match data.get(&field.slug) {
            Some(value) if !is_empty_value(value) => {
                if let Err(message) = check_value(field, value) {
                    problems.push(FieldProblem::new(&field.slug, message));
                }
            }
            _ if field.is_required => {
                problems.push(FieldProblem::new(&field.slug, "is required"));
            }
            _ => {}
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::InvalidSubmission(problems))
    }
}

/// Type-check one non-empty value.
pub fn check_value(field: &FieldDefinition, value: &Value) -> Result<(), String> {
    match &field.kind {
        FieldKind::Text(cfg) | FieldKind::Textarea(cfg) | FieldKind::RichText(cfg) => {
            check_text(cfg, value)
        }
        FieldKind::Number(cfg) => check_number(cfg, value),
        FieldKind::Date(cfg) => check_date(cfg, as_str(value)?),
        FieldKind::Datetime(_) => check_datetime(as_str(value)?),
        FieldKind::Boolean(_) => value
            .is_boolean()
            .then_some(())
            .ok_or_else(|| "expected true or false".to_string()),
        FieldKind::Select(cfg) | FieldKind::Radio(cfg) => check_choice(cfg, as_str(value)?),
        FieldKind::MultiSelect(cfg) | FieldKind::CheckboxGroup(cfg) | FieldKind::TriState(cfg) => {
            check_multi(cfg, value)
        }
        FieldKind::Url(_) => check_url(as_str(value)?),
        FieldKind::Email(_) => check_email(as_str(value)?),
        FieldKind::Location(cfg) => check_location(cfg, value),
        FieldKind::Person(cfg) => check_person(cfg, value),
        FieldKind::IncidentDateRange(cfg) => check_range(cfg, value),
        FieldKind::LegalReference(_) => match value {
            Value::String(_) | Value::Object(_) => Ok(()),
            _ => Err("expected a citation string or object".into()),
        },
    }
}

fn as_str(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected a string, got {}", type_name(value)))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn check_text(cfg: &TextConfig, value: &Value) -> Result<(), String> {
    let text = as_str(value)?;
    match cfg.max_length {
        Some(max) if text.chars().count() > max as usize => {
            Err(format!("longer than {max} characters"))
        }
        _ => Ok(()),
    }
}

fn check_number(cfg: &NumberConfig, value: &Value) -> Result<(), String> {
    let n = value
        .as_f64()
        .ok_or_else(|| format!("expected a number, got {}", type_name(value)))?;
    if cfg.integer && n.fract() != 0.0 {
        return Err("expected a whole number".into());
    }
    if let Some(min) = cfg.min {
        if n < min {
            return Err(format!("must be at least {min}"));
        }
    }
    if let Some(max) = cfg.max {
        if n > max {
            return Err(format!("must be at most {max}"));
        }
    }
    Ok(())
}

fn digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

fn calendar_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn check_date(cfg: &DateConfig, s: &str) -> Result<(), String> {
    let parts: Vec<&str> = s.split('-').collect();
    let ok = match parts.as_slice() {
        [y, m, d] => digits(y, 4) && digits(m, 2) && digits(d, 2) && calendar_date(s),
        [y, m] if cfg.allow_partial => {
            digits(y, 4) && digits(m, 2) && calendar_date(&format!("{s}-01"))
        }
        [y] if cfg.allow_partial => digits(y, 4),
        _ => false,
    };
    if ok {
        Ok(())
    } else if cfg.allow_partial {
        Err(format!("{s:?} is not a valid YYYY, YYYY-MM or YYYY-MM-DD date"))
    } else {
        Err(format!("{s:?} is not a valid YYYY-MM-DD date"))
    }
}

/// RFC 3339 with an offset, or a local `YYYY-MM-DDTHH:MM[:SS[.f]]`.
fn check_datetime(s: &str) -> Result<(), String> {
    let local = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
    if DateTime::parse_from_rfc3339(s).is_ok()
        || local
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(s, fmt).is_ok())
    {
        Ok(())
    } else {
        Err(format!("{s:?} is not an ISO-8601 datetime"))
    }
}

fn check_choice(cfg: &ChoiceConfig, s: &str) -> Result<(), String> {
    if cfg.has_option(s) {
        Ok(())
    } else {
        Err(format!("{s:?} is not one of the options"))
    }
}

fn check_multi(cfg: &ChoiceConfig, value: &Value) -> Result<(), String> {
    match unwrap_composite(value) {
        Value::Array(items) => {
            for item in items {
                check_choice(cfg, as_str(item)?)?;
            }
            Ok(())
        }
        Value::String(s) => check_choice(cfg, s),
        other => Err(format!("expected a list of options, got {}", type_name(other))),
    }
}

fn check_url(s: &str) -> Result<(), String> {
    let url = Url::parse(s).map_err(|e| format!("{s:?} is not a URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("{s:?} is not an http(s) URL"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(format!("{s:?} has no host"));
    }
    Ok(())
}

fn check_email(s: &str) -> Result<(), String> {
    match s.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !s.contains(char::is_whitespace) =>
        {
            Ok(())
        }
        _ => Err(format!("{s:?} is not an email address")),
    }
}

fn check_location(cfg: &LocationConfig, value: &Value) -> Result<(), String> {
    match value {
        Value::String(_) if !cfg.require_coordinates => Ok(()),
        Value::Object(map) => {
            let lat = map.get("lat").and_then(Value::as_f64);
            let lng = map.get("lng").and_then(Value::as_f64);
            match (lat, lng) {
                (Some(lat), Some(lng)) => {
                    if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) {
                        Ok(())
                    } else {
                        Err("coordinates out of range".into())
                    }
                }
                (None, None) if !cfg.require_coordinates => Ok(()),
                _ => Err("expected numeric lat and lng".into()),
            }
        }
        _ => Err("expected a location".into()),
    }
}

fn check_person(cfg: &PersonConfig, value: &Value) -> Result<(), String> {
    let map = value
        .as_object()
        .ok_or_else(|| format!("expected a person object, got {}", type_name(value)))?;
    let has_name = map
        .get("name")
        .and_then(Value::as_str)
        .is_some_and(|n| !n.trim().is_empty());
    if !has_name {
        return Err("person needs a name".into());
    }
    match map.get("age") {
        Some(age) if !age.is_null() => {
            let n = age.as_f64().ok_or("age must be a number")?;
            if !(0.0..=150.0).contains(&n) {
                return Err("age out of range".into());
            }
        }
        _ if cfg.require_age => return Err("person needs an age".into()),
        _ => {}
    }
    Ok(())
}

fn check_range(cfg: &DateConfig, value: &Value) -> Result<(), String> {
    let map = value
        .as_object()
        .ok_or_else(|| format!("expected {{start, end}}, got {}", type_name(value)))?;
    fn bound<'a>(
        map: &'a serde_json::Map<String, Value>,
        cfg: &DateConfig,
        key: &str,
    ) -> Result<Option<&'a str>, String> {
        match map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => check_date(cfg, s).map(|_| Some(s.as_str())),
            Some(other) => Err(format!("{key} must be a date, got {}", type_name(other))),
        }
    }
    let start = bound(map, cfg, "start")?;
    let end = bound(map, cfg, "end")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err("start is after end".into());
        }
    }
    Ok(())
}
