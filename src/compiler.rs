//! Schema Compiler
//!
//! Turns a list of [`FieldConfig`]s into a [`CompiledSchema`]: one independent
//! validator per field name. Each validator is a coercion step (raw input to
//! the field's typed domain) followed by the field's applicable rules in
//! declared order.
//!
//! ## Precedence
//! 1. Emptiness: a `required` field fails on absent or empty input (and on an
//!    unchecked checkbox). A field without `required` treats an empty string as
//!    absent and passes.
//! 2. Coercion to the base type. A value that cannot be coerced fails with the
//!    configured type message.
//! 3. Remaining rules, first failure wins.
//!
//! Compilation never fails. Malformed rules, rules that do not apply to a
//! field's type, and patterns that are not valid regular expressions are
//! dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use tracing::{debug, warn};

use crate::config::{FormsConfig, MessageConfig};
use crate::error::{FormError, Result};
use crate::field::{FieldConfig, FieldType, FormConfig, RuleKind, ValidationRule};
use crate::lint::FormLinter;
use crate::value::{FieldValue, FormValues, ABSENT};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Value domain a field's input is coerced into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind {
    String,
    Number,
    Date,
    Boolean,
    /// Unconstrained passthrough
    Mixed,
}

impl BaseKind {
    /// Select the base validator for a field type
    pub fn for_type(field_type: &FieldType) -> Self {
        match field_type {
            FieldType::Text
            | FieldType::Email
            | FieldType::Password
            | FieldType::Select
            | FieldType::Radio
            | FieldType::Textarea => BaseKind::String,
            FieldType::Number => BaseKind::Number,
            FieldType::Date => BaseKind::Date,
            FieldType::Checkbox => BaseKind::Boolean,
            FieldType::Unknown(_) => BaseKind::Mixed,
        }
    }
}

impl fmt::Display for BaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BaseKind::String => "string",
            BaseKind::Number => "number",
            BaseKind::Date => "date",
            BaseKind::Boolean => "boolean",
            BaseKind::Mixed => "mixed",
        };
        write!(f, "{}", name)
    }
}

/// What a violation was raised by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// A configured rule
    Rule(RuleKind),
    /// The value could not be coerced to the field's base type
    TypeMismatch(BaseKind),
}

/// A field's value failed one check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    pub field: String,
    pub kind: ViolationKind,
    pub message: String,
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone)]
enum Check {
    Email { message: String },
    Min { limit: f64, message: String },
    Max { limit: f64, message: String },
    MinLength { len: usize, message: String },
    MaxLength { len: usize, message: String },
    Pattern { regex: Regex, message: String },
}

impl Check {
    fn kind(&self) -> RuleKind {
        match self {
            Check::Email { .. } => RuleKind::Email,
            Check::Min { .. } => RuleKind::Min,
            Check::Max { .. } => RuleKind::Max,
            Check::MinLength { .. } => RuleKind::MinLength,
            Check::MaxLength { .. } => RuleKind::MaxLength,
            Check::Pattern { .. } => RuleKind::Pattern,
        }
    }

    /// Returns the message if `value` violates this check
    fn violated_by(&self, value: &FieldValue) -> Option<&str> {
        let failed = match (self, value) {
            (Check::Email { .. }, FieldValue::Text(s)) => !EMAIL.is_match(s),
            (Check::Min { limit, .. }, FieldValue::Number(n)) => n < limit,
            (Check::Max { limit, .. }, FieldValue::Number(n)) => n > limit,
            (Check::MinLength { len, .. }, FieldValue::Text(s)) => s.chars().count() < *len,
            (Check::MaxLength { len, .. }, FieldValue::Text(s)) => s.chars().count() > *len,
            (Check::Pattern { regex, .. }, FieldValue::Text(s)) => !regex.is_match(s),
            _ => false,
        };

        if !failed {
            return None;
        }

        Some(match self {
            Check::Email { message }
            | Check::Min { message, .. }
            | Check::Max { message, .. }
            | Check::MinLength { message, .. }
            | Check::MaxLength { message, .. }
            | Check::Pattern { message, .. } => message.as_str(),
        })
    }
}

/// Predicate plus coercion for a single field
#[derive(Debug, Clone)]
pub struct FieldValidator {
    name: String,
    field_type: FieldType,
    base: BaseKind,
    /// Message of the `required` rule, if the field has one
    required: Option<String>,
    checks: Vec<Check>,
    mismatch_message: String,
}

impl FieldValidator {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn base(&self) -> BaseKind {
        self.base
    }

    /// Whether absence fails validation
    pub fn is_required(&self) -> bool {
        self.required.is_some()
    }

    /// Kinds of the rules that survived type gating, in evaluation order
    pub fn rule_kinds(&self) -> Vec<RuleKind> {
        self.required
            .iter()
            .map(|_| RuleKind::Required)
            .chain(self.checks.iter().map(Check::kind))
            .collect()
    }

    /// Validate a raw value, returning the coerced value on success
    pub fn validate(&self, raw: &FieldValue) -> std::result::Result<FieldValue, RuleViolation> {
        if raw.is_empty() {
            return match &self.required {
                Some(message) => {
                    Err(self.violation(ViolationKind::Rule(RuleKind::Required), message))
                }
                None => Ok(FieldValue::Absent),
            };
        }

        let value = self.coerce(raw)?;

        // An unchecked box does not satisfy `required`
        if let (Some(message), FieldValue::Bool(false)) = (&self.required, &value) {
            if self.base == BaseKind::Boolean {
                return Err(self.violation(ViolationKind::Rule(RuleKind::Required), message));
            }
        }

        for check in &self.checks {
            if let Some(message) = check.violated_by(&value) {
                return Err(self.violation(ViolationKind::Rule(check.kind()), message));
            }
        }

        Ok(value)
    }

    fn coerce(&self, raw: &FieldValue) -> std::result::Result<FieldValue, RuleViolation> {
        let coerced = match self.base {
            BaseKind::Mixed => Some(raw.clone()),
            BaseKind::String => match raw {
                FieldValue::Absent => None,
                other => Some(FieldValue::Text(other.to_string())),
            },
            BaseKind::Number => match raw {
                FieldValue::Number(n) if n.is_finite() => Some(FieldValue::Number(*n)),
                FieldValue::Text(s) => parse_number(s).map(FieldValue::Number),
                _ => None,
            },
            BaseKind::Date => match raw {
                FieldValue::Date(d) => Some(FieldValue::Date(*d)),
                FieldValue::Text(s) => parse_date(s).map(FieldValue::Date),
                _ => None,
            },
            BaseKind::Boolean => match raw {
                FieldValue::Bool(b) => Some(FieldValue::Bool(*b)),
                FieldValue::Text(s) => parse_bool(s).map(FieldValue::Bool),
                _ => None,
            },
        };

        coerced.ok_or_else(|| {
            self.violation(ViolationKind::TypeMismatch(self.base), &self.mismatch_message)
        })
    }

    fn violation(&self, kind: ViolationKind, message: &str) -> RuleViolation {
        RuleViolation {
            field: self.name.clone(),
            kind,
            message: message.to_string(),
        }
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "true" | "on" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Outcome of running a schema over a whole value map
#[derive(Debug, Clone, Default)]
pub struct SchemaOutcome {
    /// Coerced values of passing fields; absent values are omitted
    pub values: FormValues,
    /// First violation per failing field
    pub violations: HashMap<String, RuleViolation>,
}

impl SchemaOutcome {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// The per-field validator set for one form definition
#[derive(Debug, Clone, Default)]
pub struct CompiledSchema {
    validators: HashMap<String, FieldValidator>,
}

impl CompiledSchema {
    pub fn get(&self, name: &str) -> Option<&FieldValidator> {
        self.validators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validators.keys().map(String::as_str)
    }

    /// Validate one field; a name with no validator passes unchanged
    pub fn validate_field(
        &self,
        name: &str,
        raw: &FieldValue,
    ) -> std::result::Result<FieldValue, RuleViolation> {
        match self.validators.get(name) {
            Some(validator) => validator.validate(raw),
            None => Ok(raw.clone()),
        }
    }

    /// Run every validator; values missing from `values` count as absent
    pub fn validate(&self, values: &FormValues) -> SchemaOutcome {
        let mut outcome = SchemaOutcome::default();

        for (name, validator) in &self.validators {
            let raw = values.get(name).unwrap_or(&ABSENT);
            match validator.validate(raw) {
                Ok(FieldValue::Absent) => {}
                Ok(value) => {
                    outcome.values.insert(name.clone(), value);
                }
                Err(violation) => {
                    outcome.violations.insert(name.clone(), violation);
                }
            }
        }

        outcome
    }
}

/// Builds [`CompiledSchema`]s
#[derive(Debug, Clone, Default)]
pub struct SchemaCompiler {
    config: FormsConfig,
}

impl SchemaCompiler {
    pub fn new(config: FormsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FormsConfig {
        &self.config
    }

    /// Compile a field list. Never fails.
    pub fn compile(&self, fields: &[FieldConfig]) -> CompiledSchema {
        let mut validators = HashMap::new();

        for field in fields {
            let validator = self.compile_field(field);
            debug!(
                field = %field.name,
                field_type = %field.field_type,
                base = %validator.base,
                required = validator.is_required(),
                checks = validator.checks.len(),
                "compiled field validator"
            );

            if validators.insert(field.name.clone(), validator).is_some() {
                warn!(field = %field.name, "duplicate field name, later definition wins");
            }
        }

        CompiledSchema { validators }
    }

    /// Lint the form first; in strict mode, lint errors reject the definition
    pub fn compile_checked(&self, form: &FormConfig) -> Result<CompiledSchema> {
        let report = FormLinter::new().lint(form);

        for warning in &report.warnings {
            warn!(code = warning.code, path = %warning.path, "{}", warning.message);
        }

        if self.config.compiler.strict && !report.is_clean() {
            let summary = report
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.message, e.path))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(FormError::Lint {
                count: report.errors.len(),
                summary,
            });
        }

        Ok(self.compile(&form.fields))
    }

    fn compile_field(&self, field: &FieldConfig) -> FieldValidator {
        let base = BaseKind::for_type(&field.field_type);
        let mut required = None;
        let mut checks = Vec::new();

        for rule in &field.validation_rules {
            if let ValidationRule::Malformed { reason, .. } = rule {
                warn!(field = %field.name, reason = %reason, "malformed rule, ignoring");
                continue;
            }

            let kind = rule.kind();
            if !kind.applies_to(&field.field_type) {
                if kind != RuleKind::Optional && self.config.compiler.warn_on_dropped_rules {
                    warn!(
                        field = %field.name,
                        rule = %kind,
                        field_type = %field.field_type,
                        "rule does not apply to field type, ignoring"
                    );
                }
                continue;
            }

            match rule {
                ValidationRule::Required { message } => {
                    // First required rule supplies the message
                    if required.is_none() {
                        required = Some(message.clone());
                    }
                }
                ValidationRule::Optional { .. } | ValidationRule::Malformed { .. } => {}
                ValidationRule::Email { message } => checks.push(Check::Email {
                    message: message.clone(),
                }),
                ValidationRule::Min { value, message } => checks.push(Check::Min {
                    limit: *value,
                    message: message.clone(),
                }),
                ValidationRule::Max { value, message } => checks.push(Check::Max {
                    limit: *value,
                    message: message.clone(),
                }),
                ValidationRule::MinLength { value, message } => checks.push(Check::MinLength {
                    len: *value,
                    message: message.clone(),
                }),
                ValidationRule::MaxLength { value, message } => checks.push(Check::MaxLength {
                    len: *value,
                    message: message.clone(),
                }),
                ValidationRule::Pattern { value, message } => match Regex::new(value) {
                    Ok(regex) => checks.push(Check::Pattern {
                        regex,
                        message: message.clone(),
                    }),
                    Err(e) => {
                        warn!(
                            field = %field.name,
                            pattern = %value,
                            error = %e,
                            "invalid pattern, ignoring"
                        );
                    }
                },
            }
        }

        FieldValidator {
            name: field.name.clone(),
            field_type: field.field_type.clone(),
            base,
            required,
            checks,
            mismatch_message: mismatch_message(&self.config.messages, base),
        }
    }
}

fn mismatch_message(messages: &MessageConfig, base: BaseKind) -> String {
    match base {
        BaseKind::Number => messages.number.clone(),
        BaseKind::Date => messages.date.clone(),
        BaseKind::Boolean => messages.boolean.clone(),
        // Every value coerces to a string or passes through
        BaseKind::String | BaseKind::Mixed => String::new(),
    }
}

/// Compile with default configuration
pub fn compile(fields: &[FieldConfig]) -> CompiledSchema {
    SchemaCompiler::default().compile(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, field_type: FieldType) -> FieldConfig {
        FieldConfig::new(name, name, field_type)
    }

    #[test]
    fn test_base_validator_selection() {
        assert_eq!(BaseKind::for_type(&FieldType::Radio), BaseKind::String);
        assert_eq!(BaseKind::for_type(&FieldType::Number), BaseKind::Number);
        assert_eq!(BaseKind::for_type(&FieldType::Date), BaseKind::Date);
        assert_eq!(BaseKind::for_type(&FieldType::Checkbox), BaseKind::Boolean);
        assert_eq!(
            BaseKind::for_type(&FieldType::from("color")),
            BaseKind::Mixed
        );
    }

    #[test]
    fn test_optional_empty_string_is_absent() {
        let schema = compile(&[field("nickname", FieldType::Text)
            .with_rule(ValidationRule::min_length(3, "Too short"))]);

        let value = schema.validate_field("nickname", &FieldValue::from("")).unwrap();
        assert_eq!(value, FieldValue::Absent);
    }

    #[test]
    fn test_required_checked_before_min_length() {
        let schema = compile(&[field("password", FieldType::Password)
            .with_rule(ValidationRule::min_length(8, "Password must be at least 8 characters"))
            .with_rule(ValidationRule::required("Password is required"))]);

        let err = schema.validate_field("password", &FieldValue::from("")).unwrap_err();
        assert_eq!(err.message, "Password is required");
        assert_eq!(err.kind, ViolationKind::Rule(RuleKind::Required));

        let err = schema.validate_field("password", &FieldValue::from("abc")).unwrap_err();
        assert_eq!(err.message, "Password must be at least 8 characters");
    }

    #[test]
    fn test_declared_order_decides_between_checks() {
        let schema = compile(&[field("code", FieldType::Text)
            .with_rule(ValidationRule::pattern("^[0-9]+$", "Digits only"))
            .with_rule(ValidationRule::max_length(4, "At most 4"))]);

        let err = schema.validate_field("code", &FieldValue::from("abcdef")).unwrap_err();
        assert_eq!(err.message, "Digits only");

        let err = schema.validate_field("code", &FieldValue::from("123456")).unwrap_err();
        assert_eq!(err.message, "At most 4");
    }

    #[test]
    fn test_number_coercion() {
        let schema = compile(&[field("age", FieldType::Number)
            .with_rule(ValidationRule::max(120.0, "Too old"))]);

        assert_eq!(
            schema.validate_field("age", &FieldValue::from(" 42 ")).unwrap(),
            FieldValue::Number(42.0)
        );

        let err = schema.validate_field("age", &FieldValue::from("forty")).unwrap_err();
        assert_eq!(err.kind, ViolationKind::TypeMismatch(BaseKind::Number));
        assert_eq!(err.message, "Must be a number");

        let err = schema.validate_field("age", &FieldValue::Number(130.0)).unwrap_err();
        assert_eq!(err.message, "Too old");
    }

    #[test]
    fn test_date_coercion() {
        let schema = compile(&[field("starts", FieldType::Date)]);
        let expected = FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        assert_eq!(
            schema.validate_field("starts", &FieldValue::from("2024-03-01")).unwrap(),
            expected
        );
        assert_eq!(
            schema.validate_field("starts", &FieldValue::from("2024-03-01T10:00:00Z")).unwrap(),
            expected
        );
        assert!(schema.validate_field("starts", &FieldValue::from("01/03/2024")).is_err());
    }

    #[test]
    fn test_required_checkbox_rejects_false() {
        let schema = compile(&[field("terms", FieldType::Checkbox)
            .with_rule(ValidationRule::required("Accept the terms"))]);

        let err = schema.validate_field("terms", &FieldValue::Bool(false)).unwrap_err();
        assert_eq!(err.message, "Accept the terms");
        assert_eq!(
            schema.validate_field("terms", &FieldValue::Bool(true)).unwrap(),
            FieldValue::Bool(true)
        );

        let optional = compile(&[field("news", FieldType::Checkbox)]);
        assert_eq!(
            optional.validate_field("news", &FieldValue::Bool(false)).unwrap(),
            FieldValue::Bool(false)
        );
    }

    #[test]
    fn test_incompatible_rules_are_dropped() {
        let schema = compile(&[field("age", FieldType::Number)
            .with_rule(ValidationRule::min_length(5, "ignored"))
            .with_rule(ValidationRule::email("ignored"))
            .with_rule(ValidationRule::optional())]);

        let validator = schema.get("age").unwrap();
        assert!(validator.rule_kinds().is_empty());
        assert!(!validator.is_required());
    }

    #[test]
    fn test_invalid_pattern_is_dropped() {
        let schema = compile(&[field("code", FieldType::Text)
            .with_rule(ValidationRule::pattern("([", "never shown"))]);

        assert!(schema.get("code").unwrap().rule_kinds().is_empty());
        assert!(schema.validate_field("code", &FieldValue::from("anything")).is_ok());
    }

    #[test]
    fn test_malformed_rules_are_dropped() {
        let definition = r#"{
            "name": "age",
            "label": "Age",
            "type": "number",
            "validationRules": [
                { "kind": "between", "value": [1, 9], "message": "never shown" },
                { "kind": "min", "message": "never shown" },
                { "kind": "max", "value": "120", "message": "Too old" }
            ]
        }"#;
        let age: FieldConfig = serde_json::from_str(definition).unwrap();
        let schema = compile(&[age]);

        assert_eq!(schema.get("age").unwrap().rule_kinds(), vec![RuleKind::Max]);
        assert!(schema.validate_field("age", &FieldValue::Number(-5.0)).is_ok());
        let err = schema.validate_field("age", &FieldValue::Number(130.0)).unwrap_err();
        assert_eq!(err.message, "Too old");
    }

    #[test]
    fn test_mixed_passthrough() {
        let schema = compile(&[field("colour", FieldType::from("color"))]);
        let value = FieldValue::Number(3.0);
        assert_eq!(schema.validate_field("colour", &value).unwrap(), value);
    }

    #[test]
    fn test_validate_omits_absent_values() {
        let schema = compile(&[
            field("name", FieldType::Text),
            field("age", FieldType::Number),
        ]);

        let mut values = FormValues::new();
        values.insert("name".to_string(), FieldValue::from("Ada"));
        values.insert("age".to_string(), FieldValue::from(""));

        let outcome = schema.validate(&values);
        assert!(outcome.is_valid());
        assert_eq!(outcome.values.get("name"), Some(&FieldValue::from("Ada")));
        assert!(!outcome.values.contains_key("age"));
    }

    #[test]
    fn test_strict_compile_rejects_lint_errors() {
        let mut config = FormsConfig::default();
        config.compiler.strict = true;
        let compiler = SchemaCompiler::new(config);

        let form = FormConfig::new(vec![field("code", FieldType::Text)
            .with_rule(ValidationRule::pattern("([", "bad"))]);

        match compiler.compile_checked(&form) {
            Err(FormError::Lint { count, .. }) => assert_eq!(count, 1),
            other => panic!("Expected lint error, got {:?}", other),
        }

        assert!(SchemaCompiler::default().compile_checked(&form).is_ok());
    }
}
