//! Schema compiler properties
//!
//! Optionality, type gating, first-violation precedence and duplicate names,
//! checked over a spread of field types and inputs with rstest.

use familiar_forms::{
    compile, FieldConfig, FieldType, FieldValue, FormValues, RuleKind, ValidationRule,
    ViolationKind,
};
use rstest::rstest;

// =============================================================================
// Optionality
// =============================================================================

#[rstest]
#[case(FieldType::Text)]
#[case(FieldType::Email)]
#[case(FieldType::Password)]
#[case(FieldType::Number)]
#[case(FieldType::Date)]
#[case(FieldType::Select)]
#[case(FieldType::Radio)]
#[case(FieldType::Textarea)]
#[case(FieldType::Checkbox)]
fn test_empty_string_passes_without_required(#[case] field_type: FieldType) {
    let field = FieldConfig::new("f", "F", field_type)
        .with_rule(ValidationRule::min_length(3, "min length"))
        .with_rule(ValidationRule::max_length(5, "max length"))
        .with_rule(ValidationRule::pattern("^x+$", "pattern"))
        .with_rule(ValidationRule::email("email"))
        .with_rule(ValidationRule::min(10.0, "min"))
        .with_rule(ValidationRule::max(20.0, "max"));
    let schema = compile(&[field]);

    let mut values = FormValues::new();
    values.insert("f".to_string(), FieldValue::from(""));
    let outcome = schema.validate(&values);

    assert!(outcome.is_valid());
    assert!(!outcome.values.contains_key("f"));
}

#[rstest]
#[case(FieldType::Text, FieldValue::from(""))]
#[case(FieldType::Number, FieldValue::Absent)]
#[case(FieldType::Date, FieldValue::from(""))]
#[case(FieldType::Select, FieldValue::from(""))]
#[case(FieldType::Checkbox, FieldValue::Bool(false))]
fn test_required_rejects_empty(#[case] field_type: FieldType, #[case] input: FieldValue) {
    let schema = compile(&[FieldConfig::new("f", "F", field_type)
        .with_rule(ValidationRule::required("needed"))]);

    let err = schema.validate_field("f", &input).unwrap_err();
    assert_eq!(err.message, "needed");
    assert_eq!(err.kind, ViolationKind::Rule(RuleKind::Required));
}

// =============================================================================
// Type gating
// =============================================================================

#[rstest]
#[case("")]
#[case("sales")]
#[case("zzz")]
#[case("12345")]
fn test_pattern_has_no_effect_on_select(#[case] input: &str) {
    let plain = compile(&[FieldConfig::new("topic", "Topic", FieldType::Select)]);
    let with_pattern = compile(&[FieldConfig::new("topic", "Topic", FieldType::Select)
        .with_rule(ValidationRule::pattern("^never$", "never shown"))]);

    let value = FieldValue::from(input);
    assert_eq!(
        plain.validate_field("topic", &value).is_ok(),
        with_pattern.validate_field("topic", &value).is_ok()
    );
}

#[rstest]
#[case(FieldType::Password, ValidationRule::email("email"))]
#[case(FieldType::Text, ValidationRule::min(100.0, "min"))]
#[case(FieldType::Number, ValidationRule::max_length(1, "max length"))]
#[case(FieldType::Checkbox, ValidationRule::pattern("^$", "pattern"))]
#[case(FieldType::Radio, ValidationRule::min_length(50, "min length"))]
fn test_incompatible_rule_is_inert(#[case] field_type: FieldType, #[case] rule: ValidationRule) {
    let schema = compile(&[FieldConfig::new("f", "F", field_type).with_rule(rule)]);
    assert!(schema.get("f").unwrap().rule_kinds().is_empty());
}

// =============================================================================
// Precedence
// =============================================================================

#[rstest]
#[case(FieldValue::from(""))]
#[case(FieldValue::Absent)]
fn test_required_message_wins_over_min_length(#[case] input: FieldValue) {
    let schema = compile(&[FieldConfig::new("password", "Password", FieldType::Password)
        .with_rule(ValidationRule::required("Password is required"))
        .with_rule(ValidationRule::min_length(8, "Password must be at least 8 characters"))]);

    let err = schema.validate_field("password", &input).unwrap_err();
    assert_eq!(err.message, "Password is required");
}

#[test]
fn test_first_declared_check_wins() {
    let schema = compile(&[FieldConfig::new("email", "Email", FieldType::Email)
        .with_rule(ValidationRule::max_length(5, "Too long"))
        .with_rule(ValidationRule::email("Invalid email"))]);

    let err = schema.validate_field("email", &FieldValue::from("not an email")).unwrap_err();
    assert_eq!(err.message, "Too long");
}

// =============================================================================
// Duplicate names
// =============================================================================

#[test]
fn test_duplicate_name_keeps_later_definition() {
    let schema = compile(&[
        FieldConfig::new("code", "Code", FieldType::Text)
            .with_rule(ValidationRule::required("first definition")),
        FieldConfig::new("code", "Code", FieldType::Number)
            .with_rule(ValidationRule::min(10.0, "second definition")),
    ]);

    assert_eq!(schema.len(), 1);
    let validator = schema.get("code").unwrap();
    assert_eq!(validator.field_type(), &FieldType::Number);
    assert!(!validator.is_required());

    let err = schema.validate_field("code", &FieldValue::Number(3.0)).unwrap_err();
    assert_eq!(err.message, "second definition");
    assert!(schema.validate_field("code", &FieldValue::from("")).is_ok());
}

#[test]
fn test_one_validator_per_distinct_name() {
    let schema = compile(&[
        FieldConfig::new("a", "A", FieldType::Text),
        FieldConfig::new("b", "B", FieldType::Checkbox),
        FieldConfig::new("a", "A", FieldType::Email),
        FieldConfig::new("c", "C", FieldType::from("slider")),
    ]);

    let mut names: Vec<&str> = schema.names().collect();
    names.sort();
    assert_eq!(names, vec!["a", "b", "c"]);
}
