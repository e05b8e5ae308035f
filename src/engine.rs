//! Form Engine
//!
//! Holds the current value map and the derived error map for one mounted
//! form, and gates submission on a successful validation pass.
//!
//! ```text
//!          submit()
//!   Idle ───────────▶ Validating ──┬──▶ Invalid ──▶ Idle
//!                                  └──▶ Valid ──(handler)──▶ Idle
//! ```
//!
//! [`FormState`] carries the data and offers pure updates that return a new
//! state. [`FormEngine`] wraps it with the compiled schema, the status
//! machine and the submit handler.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::compiler::{CompiledSchema, SchemaCompiler};
use crate::error::{FormError, Result};
use crate::field::{FieldConfig, FormConfig};
use crate::value::{FieldValue, FormValues, ABSENT};

/// Lifecycle of a form with respect to submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormStatus {
    #[default]
    Idle,
    /// Reserved as the suspension point for asynchronous rules
    Validating,
    Invalid,
    Valid,
}

impl FormStatus {
    pub fn can_transition_to(self, next: FormStatus) -> bool {
        matches!(
            (self, next),
            (FormStatus::Idle, FormStatus::Validating)
                | (FormStatus::Validating, FormStatus::Invalid)
                | (FormStatus::Validating, FormStatus::Valid)
                | (FormStatus::Invalid, FormStatus::Idle)
                | (FormStatus::Valid, FormStatus::Idle)
        )
    }
}

/// Result of validating every field
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub valid: bool,
    /// Coerced values; empty optional fields are left out
    pub values: FormValues,
}

/// Current values and error messages of a form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    values: FormValues,
    errors: BTreeMap<String, String>,
}

impl FormState {
    /// Seed values from each field's default, or its type's empty value
    pub fn seeded(fields: &[FieldConfig]) -> Self {
        let values = fields
            .iter()
            .map(|f| (f.name.clone(), f.initial_value()))
            .collect();

        Self {
            values,
            errors: BTreeMap::new(),
        }
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// A copy of this state with one value replaced. Errors are left alone.
    pub fn with_value(&self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let mut next = self.clone();
        next.values.insert(name.into(), value.into());
        next
    }

    /// Run the schema over every value. The returned state carries exactly the
    /// errors of this pass.
    pub fn validated(&self, schema: &CompiledSchema) -> (Self, Validation) {
        let outcome = schema.validate(&self.values);

        let errors = outcome
            .violations
            .into_iter()
            .map(|(name, violation)| (name, violation.message))
            .collect::<BTreeMap<_, _>>();

        let next = Self {
            values: self.values.clone(),
            errors,
        };
        let validation = Validation {
            valid: next.is_valid(),
            values: outcome.values,
        };

        (next, validation)
    }

    /// Validate a single field, updating only its error entry
    pub fn field_validated(&self, schema: &CompiledSchema, name: &str) -> Self {
        let raw = self.values.get(name).unwrap_or(&ABSENT);
        let mut next = self.clone();

        match schema.validate_field(name, raw) {
            Ok(_) => {
                next.errors.remove(name);
            }
            Err(violation) => {
                next.errors.insert(name.to_string(), violation.message);
            }
        }

        next
    }
}

/// The external collaborator that receives validated values
pub trait SubmitHandler {
    fn submit(&mut self, values: &FormValues) -> anyhow::Result<()>;
}

impl<F> SubmitHandler for F
where
    F: FnMut(&FormValues) -> anyhow::Result<()>,
{
    fn submit(&mut self, values: &FormValues) -> anyhow::Result<()> {
        self(values)
    }
}

/// What a call to [`FormEngine::submit`] did
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Validation passed and the handler was called with these values
    Submitted(FormValues),
    /// Validation failed; the handler was not called
    Rejected(BTreeMap<String, String>),
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmitOutcome::Submitted(_))
    }
}

/// A mounted form
#[derive(Debug)]
pub struct FormEngine<H> {
    form: FormConfig,
    schema: CompiledSchema,
    state: FormState,
    status: FormStatus,
    last_cycle: Vec<FormStatus>,
    handler: H,
}

impl<H: SubmitHandler> FormEngine<H> {
    /// Mount a form with the default compiler
    pub fn new(form: FormConfig, handler: H) -> Self {
        let schema = SchemaCompiler::default().compile(&form.fields);
        Self::with_schema(form, schema, handler)
    }

    /// Mount a form with an already compiled schema
    pub fn with_schema(form: FormConfig, schema: CompiledSchema, handler: H) -> Self {
        let state = FormState::seeded(&form.fields);
        debug!(
            title = form.title.as_deref().unwrap_or_default(),
            fields = form.fields.len(),
            "mounted form"
        );

        Self {
            form,
            schema,
            state,
            status: FormStatus::Idle,
            last_cycle: Vec::new(),
            handler,
        }
    }

    pub fn form(&self) -> &FormConfig {
        &self.form
    }

    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn status(&self) -> FormStatus {
        self.status
    }

    /// Statuses passed through by the most recent submit, starting at `Idle`
    pub fn last_cycle(&self) -> &[FormStatus] {
        &self.last_cycle
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.state.value(name)
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.state.error(name)
    }

    pub fn is_valid(&self) -> bool {
        self.state.is_valid()
    }

    /// Update one value. Does not validate.
    pub fn set_value(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<()> {
        if !self.schema.contains(name) {
            return Err(FormError::UnknownField(name.to_string()));
        }
        self.state = self.state.with_value(name, value);
        Ok(())
    }

    /// Update several values; stops at the first unknown name
    pub fn set_values<I, K, V>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<FieldValue>,
    {
        for (name, value) in values {
            self.set_value(name.as_ref(), value)?;
        }
        Ok(())
    }

    /// Validate every field, replacing the error map
    pub fn validate_all(&mut self) -> Validation {
        let (state, validation) = self.state.validated(&self.schema);
        self.state = state;
        validation
    }

    /// Validate one field, e.g. on blur. Returns whether it passed.
    pub fn validate_field(&mut self, name: &str) -> Result<bool> {
        if !self.schema.contains(name) {
            return Err(FormError::UnknownField(name.to_string()));
        }
        self.state = self.state.field_validated(&self.schema, name);
        Ok(self.state.error(name).is_none())
    }

    /// Restore seeded values and clear all errors
    pub fn reset(&mut self) {
        self.state = FormState::seeded(&self.form.fields);
        self.status = FormStatus::Idle;
        self.last_cycle.clear();
    }

    /// Validate and, if everything passes, hand the coerced values to the
    /// handler. Handler errors are not retried; the form is back in `Idle`
    /// when they are returned.
    pub fn submit(&mut self) -> Result<SubmitOutcome> {
        // A handler that panicked left the previous cycle in `Valid`
        self.status = FormStatus::Idle;
        self.last_cycle.clear();
        self.last_cycle.push(self.status);
        self.transition(FormStatus::Validating);

        let validation = self.validate_all();

        if !validation.valid {
            self.transition(FormStatus::Invalid);
            info!(errors = self.state.errors().len(), "form submission rejected");
            let errors = self.state.errors().clone();
            self.transition(FormStatus::Idle);
            return Ok(SubmitOutcome::Rejected(errors));
        }

        self.transition(FormStatus::Valid);
        let result = self.handler.submit(&validation.values);
        self.transition(FormStatus::Idle);

        result.map_err(FormError::Submission)?;
        info!(fields = validation.values.len(), "form submitted");
        Ok(SubmitOutcome::Submitted(validation.values))
    }

    fn transition(&mut self, next: FormStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "invalid form transition {:?} -> {:?}",
            self.status,
            next
        );
        debug!(from = ?self.status, to = ?next, "form status");
        self.status = next;
        self.last_cycle.push(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldType, ValidationRule};

    #[derive(Default)]
    struct Recorder {
        calls: Vec<FormValues>,
    }

    impl SubmitHandler for Recorder {
        fn submit(&mut self, values: &FormValues) -> anyhow::Result<()> {
            self.calls.push(values.clone());
            Ok(())
        }
    }

    fn signup_form() -> FormConfig {
        FormConfig::new(vec![
            FieldConfig::new("name", "Name", FieldType::Text)
                .with_rule(ValidationRule::required("Name is required")),
            FieldConfig::new("bio", "Bio", FieldType::Textarea)
                .with_rule(ValidationRule::max_length(20, "Bio is too long")),
            FieldConfig::new("newsletter", "Newsletter", FieldType::Checkbox).with_default(true),
        ])
    }

    #[test]
    fn test_seeded_values() {
        let engine = FormEngine::new(signup_form(), Recorder::default());
        assert_eq!(engine.value("name"), Some(&FieldValue::from("")));
        assert_eq!(engine.value("newsletter"), Some(&FieldValue::Bool(true)));
        assert_eq!(engine.status(), FormStatus::Idle);
    }

    #[test]
    fn test_set_value_does_not_validate() {
        let mut engine = FormEngine::new(signup_form(), Recorder::default());
        engine.set_value("bio", "far longer than twenty characters").unwrap();
        assert!(engine.error("bio").is_none());
        assert!(engine.is_valid());
    }

    #[test]
    fn test_set_unknown_field() {
        let mut engine = FormEngine::new(signup_form(), Recorder::default());
        assert!(matches!(
            engine.set_value("missing", "x"),
            Err(FormError::UnknownField(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_rejected_submit_cycle() {
        let mut engine = FormEngine::new(signup_form(), Recorder::default());

        let outcome = engine.submit().unwrap();
        assert!(!outcome.is_submitted());
        assert_eq!(engine.error("name"), Some("Name is required"));
        assert!(engine.handler().calls.is_empty());
        assert_eq!(
            engine.last_cycle(),
            &[FormStatus::Idle, FormStatus::Validating, FormStatus::Invalid, FormStatus::Idle]
        );
        assert_eq!(engine.status(), FormStatus::Idle);
    }

    #[test]
    fn test_accepted_submit_clears_previous_errors() {
        let mut engine = FormEngine::new(signup_form(), Recorder::default());
        engine.submit().unwrap();
        assert!(!engine.is_valid());

        engine.set_value("name", "Ada").unwrap();
        let outcome = engine.submit().unwrap();

        assert!(outcome.is_submitted());
        assert!(engine.is_valid());
        assert_eq!(
            engine.last_cycle(),
            &[FormStatus::Idle, FormStatus::Validating, FormStatus::Valid, FormStatus::Idle]
        );

        let calls = &engine.handler().calls;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].get("name"), Some(&FieldValue::from("Ada")));
        assert!(!calls[0].contains_key("bio"));
        assert_eq!(calls[0].get("newsletter"), Some(&FieldValue::Bool(true)));
    }

    #[test]
    fn test_handler_error_propagates_and_returns_to_idle() {
        let form = FormConfig::new(vec![FieldConfig::new("q", "Query", FieldType::Text)]);
        let mut engine = FormEngine::new(form, |_: &FormValues| -> anyhow::Result<()> {
            anyhow::bail!("backend unavailable")
        });

        let err = engine.submit().unwrap_err();
        assert!(matches!(err, FormError::Submission(_)));
        assert_eq!(engine.status(), FormStatus::Idle);
    }

    #[test]
    fn test_submit_after_handler_panic() {
        let form = FormConfig::new(vec![FieldConfig::new("q", "Query", FieldType::Text)]);
        let mut calls = 0;
        let mut engine = FormEngine::new(form, move |_: &FormValues| -> anyhow::Result<()> {
            calls += 1;
            if calls == 1 {
                panic!("handler crashed");
            }
            Ok(())
        });

        let crashed = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| engine.submit()));
        assert!(crashed.is_err());
        assert_eq!(engine.status(), FormStatus::Valid);

        assert!(engine.submit().unwrap().is_submitted());
        assert_eq!(engine.status(), FormStatus::Idle);
        assert_eq!(
            engine.last_cycle(),
            &[FormStatus::Idle, FormStatus::Validating, FormStatus::Valid, FormStatus::Idle]
        );
    }

    #[test]
    fn test_validate_field_and_reset() {
        let mut engine = FormEngine::new(signup_form(), Recorder::default());
        engine.set_value("bio", "far longer than twenty characters").unwrap();

        assert!(!engine.validate_field("bio").unwrap());
        assert_eq!(engine.error("bio"), Some("Bio is too long"));
        assert!(engine.error("name").is_none());

        engine.reset();
        assert!(engine.is_valid());
        assert_eq!(engine.value("bio"), Some(&FieldValue::from("")));
    }

    #[test]
    fn test_pure_state_updates() {
        let form = signup_form();
        let schema = SchemaCompiler::default().compile(&form.fields);
        let initial = FormState::seeded(&form.fields);

        let edited = initial.with_value("name", "Grace");
        assert_eq!(initial.value("name"), Some(&FieldValue::from("")));

        let (checked, validation) = edited.validated(&schema);
        assert!(validation.valid);
        assert!(checked.is_valid());
        assert_eq!(checked.values(), edited.values());
    }

    #[test]
    fn test_transition_table() {
        assert!(FormStatus::Idle.can_transition_to(FormStatus::Validating));
        assert!(FormStatus::Valid.can_transition_to(FormStatus::Idle));
        assert!(!FormStatus::Idle.can_transition_to(FormStatus::Valid));
        assert!(!FormStatus::Invalid.can_transition_to(FormStatus::Valid));
    }
}
