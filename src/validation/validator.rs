//! Schema-driven validation of untyped request bodies.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::validation::rules::RuleName;
use crate::validation::schema::Schema;

/// Field → message for every field that failed at least one rule.
///
/// Entries keep schema order, and every key names a field of the schema
/// that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    entries: Vec<FieldError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub rule: RuleName,
    pub message: String,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// Rule that produced the surviving message for `field`.
    pub fn rule(&self, field: &str) -> Option<RuleName> {
        self.entries.iter().find(|e| e.field == field).map(|e| e.rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.entries.iter()
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(entry.field, &entry.message)?;
        }
        map.end()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Check `record` against `schema`.
///
/// A record that is not a JSON object is treated as having no fields.
pub fn validate(schema: &Schema, record: &Value) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    for (field, rule) in schema.fields() {
        let value = record.get(field);

        if rule.is_required() && value.map_or(true, is_blank) {
            errors.entries.push(FieldError {
                field,
                rule: RuleName::Required,
                message: format!("{field} is required"),
            });
            continue;
        }

        let Some(value) = value.filter(|v| !v.is_null()) else {
            continue;
        };

        // Last violation wins.
        if let Some(last) = rule.violations(field, value).pop() {
            errors.entries.push(FieldError {
                field,
                rule: last.rule,
                message: last.message,
            });
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::rules::FieldRule;
    use serde_json::json;

    fn progress_schema() -> Schema {
        Schema::builder("updateProgress")
            .field("courseId", FieldRule::string().required())
            .field("percentage", FieldRule::number().required().min(0.0).max(100.0))
            .field("note", FieldRule::string().max_length(5).custom(|_| false, Some("never")))
            .build()
    }

    #[test]
    fn test_valid_record_has_no_errors() {
        let errors = validate(
            &progress_schema(),
            &json!({"courseId": "c1", "percentage": 40}),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_missing_required_and_out_of_range() {
        let errors = validate(&progress_schema(), &json!({"percentage": 150}));
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({
                "courseId": "courseId is required",
                "percentage": "percentage must not exceed 100"
            })
        );
    }

    #[test]
    fn test_null_and_empty_string_count_as_missing() {
        let errors = validate(
            &progress_schema(),
            &json!({"courseId": "", "percentage": null}),
        );
        assert_eq!(errors.get("courseId"), Some("courseId is required"));
        assert_eq!(errors.get("percentage"), Some("percentage is required"));
        assert_eq!(errors.rule("percentage"), Some(RuleName::Required));
    }

    #[test]
    fn test_omitted_optional_field_runs_no_rules() {
        // `note` has a custom rule that always fails; it must not run when absent.
        let errors = validate(
            &progress_schema(),
            &json!({"courseId": "c1", "percentage": 1, "note": null}),
        );
        assert!(errors.get("note").is_none());
    }

    #[test]
    fn test_custom_rule_overwrites_earlier_message() {
        let errors = validate(
            &progress_schema(),
            &json!({"courseId": "c1", "percentage": 1, "note": "far too long"}),
        );
        assert_eq!(errors.get("note"), Some("never"));
        assert_eq!(errors.rule("note"), Some(RuleName::Custom));
    }

    #[test]
    fn test_non_object_record_is_empty() {
        let errors = validate(&progress_schema(), &json!([1, 2, 3]));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_errors_only_name_schema_fields() {
        let schema = progress_schema();
        let errors = validate(&schema, &json!({"unknown": 1, "percentage": "x"}));
        assert!(errors.iter().all(|e| schema.contains(e.field)));
        assert_eq!(errors.get("percentage"), Some("percentage must be of type number"));
    }

    #[test]
    fn test_serializes_in_schema_order() {
        let errors = validate(&progress_schema(), &json!({}));
        let body = serde_json::to_string(&errors).unwrap();
        assert_eq!(
            body,
            r#"{"courseId":"courseId is required","percentage":"percentage is required"}"#
        );
    }
}
