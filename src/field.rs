//! Declarative form vocabulary
//!
//! A [`FormConfig`] is an ordered list of [`FieldConfig`]s. Each field has a
//! [`FieldType`] and a list of [`ValidationRule`]s. These are plain values:
//! once handed to the compiler they are treated as immutable.
//!
//! ## Example definition
//! ```json
//! {
//!   "title": "Sign in",
//!   "fields": [
//!     {
//!       "name": "email",
//!       "label": "Email",
//!       "type": "email",
//!       "validationRules": [
//!         { "kind": "required", "message": "Email is required" },
//!         { "kind": "email", "message": "Invalid email address" }
//!       ]
//!     }
//!   ],
//!   "submitButtonText": "Sign in"
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::value::FieldValue;

/// Type of a form field
///
/// Unrecognized type names are kept as [`FieldType::Unknown`] instead of
/// failing to parse. They compile to a passthrough validator and render nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    Email,
    Password,
    Number,
    Date,
    Select,
    Checkbox,
    Radio,
    Textarea,
    Unknown(String),
}

impl FieldType {
    /// Every recognized field type
    pub const KNOWN: [FieldType; 9] = [
        FieldType::Text,
        FieldType::Email,
        FieldType::Password,
        FieldType::Number,
        FieldType::Date,
        FieldType::Select,
        FieldType::Checkbox,
        FieldType::Radio,
        FieldType::Textarea,
    ];

    /// Get the wire name for this type
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Password => "password",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
            FieldType::Textarea => "textarea",
            FieldType::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, FieldType::Unknown(_))
    }

    /// Whether values of this type are chosen from `options`
    pub fn is_choice(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::Radio)
    }

    /// The value a field of this type starts with when no default is given
    pub fn empty_value(&self) -> FieldValue {
        match self {
            FieldType::Text
            | FieldType::Email
            | FieldType::Password
            | FieldType::Number
            | FieldType::Date
            | FieldType::Select
            | FieldType::Radio
            | FieldType::Textarea => FieldValue::Text(String::new()),
            FieldType::Checkbox => FieldValue::Bool(false),
            FieldType::Unknown(_) => FieldValue::Absent,
        }
    }
}

impl From<String> for FieldType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "text" => FieldType::Text,
            "email" => FieldType::Email,
            "password" => FieldType::Password,
            "number" => FieldType::Number,
            "date" => FieldType::Date,
            "select" => FieldType::Select,
            "checkbox" => FieldType::Checkbox,
            "radio" => FieldType::Radio,
            "textarea" => FieldType::Textarea,
            _ => FieldType::Unknown(name),
        }
    }
}

impl From<&str> for FieldType {
    fn from(name: &str) -> Self {
        FieldType::from(name.to_string())
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind of a validation rule, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Required,
    Optional,
    Email,
    Min,
    Max,
    Pattern,
    MinLength,
    MaxLength,
    /// A rule that could not be read
    Malformed,
}

impl RuleKind {
    /// Whether a rule of this kind takes effect on a field of `field_type`
    pub fn applies_to(&self, field_type: &FieldType) -> bool {
        use FieldType as T;
        match self {
            RuleKind::Required => true,
            // Carries no constraint of its own
            RuleKind::Optional | RuleKind::Malformed => false,
            RuleKind::Email => matches!(field_type, T::Email | T::Text),
            RuleKind::Min | RuleKind::Max => matches!(field_type, T::Number),
            RuleKind::MinLength | RuleKind::MaxLength | RuleKind::Pattern => matches!(
                field_type,
                T::Text | T::Password | T::Email | T::Textarea
            ),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Required => "required",
            RuleKind::Optional => "optional",
            RuleKind::Email => "email",
            RuleKind::Min => "min",
            RuleKind::Max => "max",
            RuleKind::Pattern => "pattern",
            RuleKind::MinLength => "minLength",
            RuleKind::MaxLength => "maxLength",
            RuleKind::Malformed => "malformed",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One named constraint with the message shown when it is violated
///
/// On the wire a rule is an object tagged by `kind`. Reading is lenient: a
/// rule that cannot be read becomes [`ValidationRule::Malformed`] instead of
/// failing the whole definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationRule {
    Required {
        message: String,
    },
    Optional {
        message: Option<String>,
    },
    Email {
        message: String,
    },
    Min {
        value: f64,
        message: String,
    },
    Max {
        value: f64,
        message: String,
    },
    Pattern {
        value: String,
        message: String,
    },
    MinLength {
        value: usize,
        message: String,
    },
    MaxLength {
        value: usize,
        message: String,
    },
    /// A rule that could not be read. Never constrains a value; serializes
    /// back as `raw`.
    Malformed {
        raw: Value,
        reason: String,
    },
}

impl ValidationRule {
    pub fn required(message: impl Into<String>) -> Self {
        ValidationRule::Required {
            message: message.into(),
        }
    }

    pub fn optional() -> Self {
        ValidationRule::Optional { message: None }
    }

    pub fn email(message: impl Into<String>) -> Self {
        ValidationRule::Email {
            message: message.into(),
        }
    }

    pub fn min(value: f64, message: impl Into<String>) -> Self {
        ValidationRule::Min {
            value,
            message: message.into(),
        }
    }

    pub fn max(value: f64, message: impl Into<String>) -> Self {
        ValidationRule::Max {
            value,
            message: message.into(),
        }
    }

    pub fn pattern(value: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationRule::Pattern {
            value: value.into(),
            message: message.into(),
        }
    }

    pub fn min_length(value: usize, message: impl Into<String>) -> Self {
        ValidationRule::MinLength {
            value,
            message: message.into(),
        }
    }

    pub fn max_length(value: usize, message: impl Into<String>) -> Self {
        ValidationRule::MaxLength {
            value,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            ValidationRule::Required { .. } => RuleKind::Required,
            ValidationRule::Optional { .. } => RuleKind::Optional,
            ValidationRule::Email { .. } => RuleKind::Email,
            ValidationRule::Min { .. } => RuleKind::Min,
            ValidationRule::Max { .. } => RuleKind::Max,
            ValidationRule::Pattern { .. } => RuleKind::Pattern,
            ValidationRule::MinLength { .. } => RuleKind::MinLength,
            ValidationRule::MaxLength { .. } => RuleKind::MaxLength,
            ValidationRule::Malformed { .. } => RuleKind::Malformed,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, ValidationRule::Malformed { .. })
    }

    /// The literal text surfaced on violation
    pub fn message(&self) -> &str {
        match self {
            ValidationRule::Optional { message } => message.as_deref().unwrap_or_default(),
            ValidationRule::Malformed { .. } => "",
            ValidationRule::Required { message }
            | ValidationRule::Email { message }
            | ValidationRule::Min { message, .. }
            | ValidationRule::Max { message, .. }
            | ValidationRule::Pattern { message, .. }
            | ValidationRule::MinLength { message, .. }
            | ValidationRule::MaxLength { message, .. } => message,
        }
    }

    /// Read a rule from its JSON form. Never fails: anything unreadable
    /// becomes [`ValidationRule::Malformed`].
    pub fn from_json(raw: Value) -> Self {
        match Self::read(&raw) {
            Ok(rule) => rule,
            Err(reason) => ValidationRule::Malformed { raw, reason },
        }
    }

    fn read(raw: &Value) -> std::result::Result<Self, String> {
        let object = raw.as_object().ok_or("rule is not an object")?;
        let kind = object
            .get("kind")
            .and_then(Value::as_str)
            .ok_or("rule has no 'kind'")?;

        let message = move || {
            object
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| format!("'{}' rule has no message", kind))
        };
        let value = move || {
            object
                .get("value")
                .filter(|v| !v.is_null())
                .ok_or_else(|| format!("'{}' rule has no value", kind))
        };
        let number = move || {
            let v = value()?;
            lenient_number(v).ok_or_else(|| format!("'{}' value {} is not a number", kind, v))
        };
        let length = move || {
            let v = value()?;
            lenient_number(v)
                .filter(|n| *n >= 0.0 && n.fract() == 0.0)
                .map(|n| n as usize)
                .ok_or_else(|| format!("'{}' value {} is not a length", kind, v))
        };

        let rule = match kind {
            "required" => ValidationRule::Required {
                message: message()?,
            },
            "optional" => ValidationRule::Optional {
                message: message().ok(),
            },
            "email" => ValidationRule::Email {
                message: message()?,
            },
            "min" => ValidationRule::Min {
                value: number()?,
                message: message()?,
            },
            "max" => ValidationRule::Max {
                value: number()?,
                message: message()?,
            },
            "pattern" => {
                let v = value()?;
                let source = v
                    .as_str()
                    .ok_or_else(|| format!("'pattern' value {} is not a string", v))?;
                ValidationRule::Pattern {
                    value: source.to_string(),
                    message: message()?,
                }
            }
            "minLength" => ValidationRule::MinLength {
                value: length()?,
                message: message()?,
            },
            "maxLength" => ValidationRule::MaxLength {
                value: length()?,
                message: message()?,
            },
            other => return Err(format!("unknown rule kind '{}'", other)),
        };

        Ok(rule)
    }

    /// The JSON form of this rule
    pub fn to_json(&self) -> Value {
        let kind = self.kind().as_str();
        match self {
            ValidationRule::Malformed { raw, .. } => raw.clone(),
            ValidationRule::Optional { message: None } => json!({ "kind": kind }),
            ValidationRule::Optional {
                message: Some(message),
            }
            | ValidationRule::Required { message }
            | ValidationRule::Email { message } => json!({ "kind": kind, "message": message }),
            ValidationRule::Min { value, message } | ValidationRule::Max { value, message } => {
                json!({ "kind": kind, "value": value, "message": message })
            }
            ValidationRule::Pattern { value, message } => {
                json!({ "kind": kind, "value": value, "message": message })
            }
            ValidationRule::MinLength { value, message }
            | ValidationRule::MaxLength { value, message } => {
                json!({ "kind": kind, "value": value, "message": message })
            }
        }
    }
}

/// Numbers, or strings holding one (`"10"`)
fn lenient_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

impl Serialize for ValidationRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ValidationRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(ValidationRule::from_json)
    }
}

/// One entry of a select or radio field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub label: String,
    pub value: String,
}

impl FieldOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Declarative description of one form field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    /// Identifier of the field; unique within a form
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Choices for select and radio fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_rules: Vec<ValidationRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<FieldValue>,
}

impl FieldConfig {
    /// Create a new field with no rules
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            field_type,
            placeholder: None,
            options: Vec::new(),
            validation_rules: Vec::new(),
            default_value: None,
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_options(mut self, options: impl IntoIterator<Item = FieldOption>) -> Self {
        self.options = options.into_iter().collect();
        self
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.validation_rules.push(rule);
        self
    }

    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Whether a `required` rule is present
    pub fn is_required(&self) -> bool {
        self.validation_rules
            .iter()
            .any(|r| r.kind() == RuleKind::Required)
    }

    /// Rules that take effect for this field's type, in declared order
    pub fn applicable_rules(&self) -> impl Iterator<Item = &ValidationRule> {
        self.validation_rules
            .iter()
            .filter(|r| r.kind().applies_to(&self.field_type))
    }

    /// The value the field starts with: its default, or the type's empty value
    pub fn initial_value(&self) -> FieldValue {
        self.default_value
            .clone()
            .unwrap_or_else(|| self.field_type.empty_value())
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }
}

/// A complete form definition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub fields: Vec<FieldConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_button_text: Option<String>,
}

impl FormConfig {
    pub fn new(fields: Vec<FieldConfig>) -> Self {
        Self {
            title: None,
            fields,
            submit_button_text: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_submit_text(mut self, text: impl Into<String>) -> Self {
        self.submit_button_text = Some(text.into());
        self
    }

    /// Parse a definition from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a definition from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Look up a field by name; with duplicate names the later definition wins
    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.iter().rev().find(|f| f.name == name)
    }

    /// Label for the submit control
    pub fn submit_label<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.submit_button_text.as_deref().unwrap_or(fallback)
    }
}
