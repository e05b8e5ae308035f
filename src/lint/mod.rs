//! Form Definition Linting
//!
//! The compiler is permissive: malformed rules, rules that cannot apply to a
//! field's type and patterns that do not parse are dropped without error.
//! The linter reports those cases so authors can find them before users do.
//!
//! ## Lints
//! Errors (rejected by a strict compiler):
//! 1. **INCOMPATIBLE_RULE**: rule kind has no effect on the field's type
//! 2. **INVALID_PATTERN**: `pattern` value is not a valid regular expression
//! 3. **EMPTY_NAME**: field has an empty name
//! 4. **MISSING_OPTIONS**: select or radio field without options
//! 5. **MALFORMED_RULE**: rule has an unknown kind or a missing or mistyped
//!    value, and was loaded as a no-op
//!
//! Warnings:
//! 1. **DUPLICATE_NAME**: later field overwrites an earlier one
//! 2. **UNKNOWN_TYPE**: type is not recognized; field renders nothing
//! 3. **EMPTY_BOUNDS**: min > max or minLength > maxLength
//! 4. **DEFAULT_NOT_AN_OPTION**: default of a choice field is not one of its options
//! 5. **REDUNDANT_OPTIONAL**: `optional` alongside `required`

use regex::Regex;
use std::collections::HashSet;

use crate::field::{FieldConfig, FormConfig, RuleKind, ValidationRule};
use crate::value::FieldValue;

/// Result of linting a form definition
#[derive(Debug, Default)]
pub struct LintResult {
    pub errors: Vec<LintError>,
    pub warnings: Vec<LintWarning>,
}

impl LintResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    fn error(&mut self, code: &'static str, message: String, path: String) {
        self.errors.push(LintError {
            code,
            message,
            path,
        });
    }

    fn warning(&mut self, code: &'static str, message: String, path: String) {
        self.warnings.push(LintWarning {
            code,
            message,
            path,
        });
    }
}

#[derive(Debug)]
pub struct LintError {
    pub code: &'static str,
    pub message: String,
    pub path: String,
}

#[derive(Debug)]
pub struct LintWarning {
    pub code: &'static str,
    pub message: String,
    pub path: String,
}

/// The form definition linter
#[derive(Debug, Default)]
pub struct FormLinter;

impl FormLinter {
    pub fn new() -> Self {
        Self
    }

    /// Lint a whole form
    pub fn lint(&self, form: &FormConfig) -> LintResult {
        let mut result = LintResult::default();
        let mut seen = HashSet::new();

        for (i, field) in form.fields.iter().enumerate() {
            let path = format!("fields[{}]", i);

            if !seen.insert(field.name.as_str()) {
                result.warning(
                    "DUPLICATE_NAME",
                    format!(
                        "Field name '{}' is used more than once; the last definition wins",
                        field.name
                    ),
                    path.clone(),
                );
            }

            self.lint_field(field, &path, &mut result);
        }

        result
    }

    fn lint_field(&self, field: &FieldConfig, path: &str, result: &mut LintResult) {
        if field.name.is_empty() {
            result.error("EMPTY_NAME", "Field name is empty".to_string(), path.to_string());
        }

        if !field.field_type.is_known() {
            result.warning(
                "UNKNOWN_TYPE",
                format!(
                    "Field '{}' has unrecognized type '{}'; \
                     it accepts any value and renders nothing",
                    field.name, field.field_type
                ),
                format!("{}.type", path),
            );
        }

        if field.field_type.is_choice() {
            if field.options.is_empty() {
                result.error(
                    "MISSING_OPTIONS",
                    format!("Field '{}' is a {} without options", field.name, field.field_type),
                    format!("{}.options", path),
                );
            } else if let Some(FieldValue::Text(default)) = &field.default_value {
                if !default.is_empty() && !field.has_option(default) {
                    result.warning(
                        "DEFAULT_NOT_AN_OPTION",
                        format!(
                            "Default '{}' of field '{}' is not one of its options",
                            default, field.name
                        ),
                        format!("{}.defaultValue", path),
                    );
                }
            }
        }

        for (j, rule) in field.validation_rules.iter().enumerate() {
            let rule_path = format!("{}.validationRules[{}]", path, j);
            self.lint_rule(field, rule, &rule_path, result);
        }

        self.lint_bounds(field, path, result);

        let kinds: Vec<RuleKind> = field.validation_rules.iter().map(|r| r.kind()).collect();
        if kinds.contains(&RuleKind::Required) && kinds.contains(&RuleKind::Optional) {
            result.warning(
                "REDUNDANT_OPTIONAL",
                format!(
                    "Field '{}' is marked both required and optional; required wins",
                    field.name
                ),
                format!("{}.validationRules", path),
            );
        }
    }

    fn lint_rule(
        &self,
        field: &FieldConfig,
        rule: &ValidationRule,
        path: &str,
        result: &mut LintResult,
    ) {
        if let ValidationRule::Malformed { reason, .. } = rule {
            result.error(
                "MALFORMED_RULE",
                format!("Rule on field '{}' has no effect: {}", field.name, reason),
                path.to_string(),
            );
            return;
        }

        let kind = rule.kind();

        if kind != RuleKind::Optional && !kind.applies_to(&field.field_type) {
            result.error(
                "INCOMPATIBLE_RULE",
                format!(
                    "Rule '{}' has no effect on field '{}' of type '{}'",
                    kind, field.name, field.field_type
                ),
                path.to_string(),
            );
            return;
        }

        if let ValidationRule::Pattern { value, .. } = rule {
            if let Err(e) = Regex::new(value) {
                result.error(
                    "INVALID_PATTERN",
                    format!(
                        "Pattern '{}' on field '{}' does not compile: {}",
                        value, field.name, e
                    ),
                    format!("{}.value", path),
                );
            }
        }
    }

    fn lint_bounds(&self, field: &FieldConfig, path: &str, result: &mut LintResult) {
        let mut min = None;
        let mut max = None;
        let mut min_len = None;
        let mut max_len = None;

        for rule in field.applicable_rules() {
            match rule {
                ValidationRule::Min { value, .. } => min = Some(*value),
                ValidationRule::Max { value, .. } => max = Some(*value),
                ValidationRule::MinLength { value, .. } => min_len = Some(*value),
                ValidationRule::MaxLength { value, .. } => max_len = Some(*value),
                _ => {}
            }
        }

        let range_empty = matches!((min, max), (Some(lo), Some(hi)) if lo > hi);
        let length_empty = matches!((min_len, max_len), (Some(lo), Some(hi)) if lo > hi);

        if range_empty || length_empty {
            result.warning(
                "EMPTY_BOUNDS",
                format!("Field '{}' has bounds no value can satisfy", field.name),
                format!("{}.validationRules", path),
            );
        }
    }
}
