//! Per-field validation contracts.
//!
//! A [`FieldRule`] is built once at startup with a consuming builder and never
//! mutated afterwards. Its checks run as an ordered list of evaluators; each
//! one may produce a [`Violation`], and the validator keeps the last.

use std::fmt;

use regex::Regex;
use serde_json::Value;

/// The closed set of primitive kinds a field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldKind {
    /// Runtime kind of a JSON value. `null` has none.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(_) => Some(Self::String),
            Value::Number(_) => Some(Self::Number),
            Value::Bool(_) => Some(Self::Boolean),
            Value::Array(_) => Some(Self::Array),
            Value::Object(_) => Some(Self::Object),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which check produced a violation, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RuleName {
    Required,
    Type,
    MinLength,
    MaxLength,
    Pattern,
    Min,
    Max,
    OneOf,
    Custom,
}

/// One failed check on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub rule: RuleName,
    pub message: String,
}

impl Violation {
    fn new(rule: RuleName, message: String) -> Self {
        Self { rule, message }
    }
}

/// Predicate used by custom rules.
pub type Predicate = fn(&Value) -> bool;

type Evaluator = fn(&FieldRule, &str, &Value) -> Option<Violation>;

#[derive(Debug, Clone)]
struct CustomRule {
    predicate: Predicate,
    message: Option<String>,
}

/// Validation contract for a single field.
#[derive(Debug, Clone)]
pub struct FieldRule {
    required: bool,
    kind: FieldKind,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Regex>,
    min: Option<f64>,
    max: Option<f64>,
    one_of: Option<Vec<Value>>,
    custom: Option<CustomRule>,
}

impl FieldRule {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            required: false,
            kind,
            min_length: None,
            max_length: None,
            pattern: None,
            min: None,
            max: None,
            one_of: None,
            custom: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    pub fn number() -> Self {
        Self::new(FieldKind::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn array() -> Self {
        Self::new(FieldKind::Array)
    }

    pub fn object() -> Self {
        Self::new(FieldKind::Object)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn pattern(mut self, regex: Regex) -> Self {
        self.pattern = Some(regex);
        self
    }

    pub fn min(mut self, n: f64) -> Self {
        self.min = Some(n);
        self
    }

    pub fn max(mut self, n: f64) -> Self {
        self.max = Some(n);
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.one_of = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Custom predicate, evaluated last. `message` replaces the generic
    /// "<field> is invalid" text.
    pub fn custom(mut self, predicate: Predicate, message: Option<&str>) -> Self {
        self.custom = Some(CustomRule {
            predicate,
            message: message.map(str::to_owned),
        });
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Run every check after the presence check, in order.
    ///
    /// The caller has already established that `value` is present and
    /// non-null. A type mismatch does not stop later checks.
    pub fn violations(&self, field: &str, value: &Value) -> Vec<Violation> {
        let evaluators: [Evaluator; 8] = [
            Self::check_type,
            Self::check_min_length,
            Self::check_max_length,
            Self::check_pattern,
            Self::check_min,
            Self::check_max,
            Self::check_one_of,
            Self::check_custom,
        ];

        evaluators
            .iter()
            .filter_map(|eval| eval(self, field, value))
            .collect()
    }

    fn check_type(&self, field: &str, value: &Value) -> Option<Violation> {
        (FieldKind::of(value) != Some(self.kind)).then(|| {
            Violation::new(
                RuleName::Type,
                format!("{field} must be of type {}", self.kind),
            )
        })
    }

    fn declared_str<'a>(&self, value: &'a Value) -> Option<&'a str> {
        match (self.kind, value) {
            (FieldKind::String, Value::String(s)) => Some(s),
            _ => None,
        }
    }

    fn declared_number(&self, value: &Value) -> Option<f64> {
        match (self.kind, value) {
            (FieldKind::Number, Value::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    fn check_min_length(&self, field: &str, value: &Value) -> Option<Violation> {
        let min = self.min_length?;
        let s = self.declared_str(value)?;
        (s.chars().count() < min).then(|| {
            Violation::new(
                RuleName::MinLength,
                format!("{field} must be at least {min} characters"),
            )
        })
    }

    fn check_max_length(&self, field: &str, value: &Value) -> Option<Violation> {
        let max = self.max_length?;
        let s = self.declared_str(value)?;
        (s.chars().count() > max).then(|| {
            Violation::new(
                RuleName::MaxLength,
                format!("{field} must not exceed {max} characters"),
            )
        })
    }

    fn check_pattern(&self, field: &str, value: &Value) -> Option<Violation> {
        let pattern = self.pattern.as_ref()?;
        let s = self.declared_str(value).filter(|s| !s.is_empty())?;
        (!pattern.is_match(s))
            .then(|| Violation::new(RuleName::Pattern, format!("{field} format is invalid")))
    }

    fn check_min(&self, field: &str, value: &Value) -> Option<Violation> {
        let min = self.min?;
        let n = self.declared_number(value)?;
        (n < min).then(|| Violation::new(RuleName::Min, format!("{field} must be at least {min}")))
    }

    fn check_max(&self, field: &str, value: &Value) -> Option<Violation> {
        let max = self.max?;
        let n = self.declared_number(value)?;
        (n > max)
            .then(|| Violation::new(RuleName::Max, format!("{field} must not exceed {max}")))
    }

    fn check_one_of(&self, field: &str, value: &Value) -> Option<Violation> {
        let allowed = self.one_of.as_ref()?;
        if allowed.iter().any(|candidate| json_eq(candidate, value)) {
            return None;
        }
        let listed = allowed.iter().map(display_value).collect::<Vec<_>>().join(", ");
        Some(Violation::new(
            RuleName::OneOf,
            format!("{field} must be one of: {listed}"),
        ))
    }

    fn check_custom(&self, field: &str, value: &Value) -> Option<Violation> {
        let custom = self.custom.as_ref()?;
        if (custom.predicate)(value) {
            return None;
        }
        let message = custom
            .message
            .clone()
            .unwrap_or_else(|| format!("{field} is invalid"));
        Some(Violation::new(RuleName::Custom, message))
    }
}

/// Numbers compare by value so that `1` and `1.0` are the same member.
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_distinguishes_array_from_object() {
        assert_eq!(FieldKind::of(&json!([])), Some(FieldKind::Array));
        assert_eq!(FieldKind::of(&json!({})), Some(FieldKind::Object));
        assert_eq!(FieldKind::of(&Value::Null), None);
    }

    #[test]
    fn test_bounds_render_without_fraction() {
        let rule = FieldRule::number().min(0.0).max(100.0);
        let v = rule.violations("percentage", &json!(150));
        assert_eq!(v.last().unwrap().message, "percentage must not exceed 100");

        let v = rule.violations("percentage", &json!(-0.5));
        assert_eq!(v.last().unwrap().message, "percentage must be at least 0");
    }

    #[test]
    fn test_type_mismatch_does_not_stop_enum_or_custom() {
        let rule = FieldRule::string()
            .one_of(["quiz", "exam"])
            .custom(|_| false, Some("nope"));
        let v = rule.violations("type", &json!(7));

        let rules: Vec<_> = v.iter().map(|v| v.rule).collect();
        assert_eq!(rules, vec![RuleName::Type, RuleName::OneOf, RuleName::Custom]);
        assert_eq!(v.last().unwrap().message, "nope");
    }

    #[test]
    fn test_string_rules_skip_mistyped_values() {
        let rule = FieldRule::string().min_length(3).max_length(5);
        let v = rule.violations("title", &json!(12));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].rule, RuleName::Type);
    }

    #[test]
    fn test_length_counts_characters() {
        let rule = FieldRule::string().max_length(3);
        assert!(rule.violations("name", &json!("ééé")).is_empty());
    }

    #[test]
    fn test_pattern_ignores_empty_string() {
        let rule = FieldRule::string().pattern(Regex::new("^CERT-").unwrap());
        assert!(rule.violations("id", &json!("")).is_empty());
        assert_eq!(
            rule.violations("id", &json!("X"))[0].message,
            "id format is invalid"
        );
    }

    #[test]
    fn test_enum_lists_members_and_matches_numbers_by_value() {
        let rule = FieldRule::number().one_of([1, 2]);
        assert!(rule.violations("level", &json!(1.0)).is_empty());
        assert_eq!(
            rule.violations("level", &json!(3))[0].message,
            "level must be one of: 1, 2"
        );
    }

    #[test]
    fn test_custom_without_message_uses_fallback() {
        let rule = FieldRule::array().custom(|v| v.as_array().is_some_and(|a| !a.is_empty()), None);
        assert_eq!(rule.violations("answers", &json!([]))[0].message, "answers is invalid");
    }
}
