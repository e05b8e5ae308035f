//! Familiar Forms
//!
//! A declarative form engine: a form is described as data, compiled once into
//! per-field validators, and driven through a small submit state machine.
//!
//! ## Pipeline
//!
//! ```text
//! FormConfig ──compile──▶ CompiledSchema ──attach──▶ FormEngine
//!                                                     │  set_value / submit
//!                                                     ▼
//!                             errors ◀── validate ──▶ coerced values ──▶ SubmitHandler
//!                               │
//!                               ▼
//!                        render ─▶ ControlContract (single-line, multi-line,
//!                                  select, toggle, radio group)
//! ```
//!
//! ## Example
//!
//! ```
//! use familiar_forms::{
//!     FieldConfig, FieldType, FormConfig, FormEngine, FormValues, ValidationRule,
//! };
//!
//! let form = FormConfig::new(vec![
//!     FieldConfig::new("email", "Email", FieldType::Email)
//!         .with_rule(ValidationRule::required("Email is required"))
//!         .with_rule(ValidationRule::email("Invalid email address")),
//! ]);
//!
//! let mut engine = FormEngine::new(form, |values: &FormValues| -> anyhow::Result<()> {
//!     println!("submitted {:?}", values);
//!     Ok(())
//! });
//!
//! assert!(!engine.submit().unwrap().is_submitted());
//! assert_eq!(engine.error("email"), Some("Email is required"));
//!
//! engine.set_value("email", "ada@example.com").unwrap();
//! assert!(engine.submit().unwrap().is_submitted());
//! ```

pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod field;
pub mod lint;
pub mod render;
pub mod value;

pub use compiler::{
    compile, BaseKind, CompiledSchema, FieldValidator, RuleViolation, SchemaCompiler,
    ViolationKind,
};
pub use config::FormsConfig;
pub use engine::{FormEngine, FormState, FormStatus, SubmitHandler, SubmitOutcome, Validation};
pub use error::{FormError, Result};
pub use field::{FieldConfig, FieldOption, FieldType, FormConfig, RuleKind, ValidationRule};
pub use lint::{FormLinter, LintResult};
pub use render::{
    render, render_form, ControlContract, ControlInput, ControlPrimitives, TextPreview,
};
pub use value::{FieldValue, FormValues};
