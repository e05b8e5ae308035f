//! Field rendering dispatch
//!
//! Maps every [`FieldType`] to one of five control contracts. The contract is
//! plain data: the bound value, the error to show beneath the control, and
//! for choice controls the option list. Its [`ControlContract::change`] method
//! is the `onChange` side, turning UI input back into a [`FieldValue`].
//!
//! | field type                               | control        |
//! |------------------------------------------|----------------|
//! | text, email, password, number, date      | single-line    |
//! | textarea                                 | multi-line     |
//! | select                                   | dropdown       |
//! | checkbox                                 | toggle         |
//! | radio                                    | radio group    |
//!
//! Unknown field types render nothing.

use std::fmt::Write as _;

use crate::engine::{FormEngine, SubmitHandler};
use crate::error::Result;
use crate::field::{FieldConfig, FieldOption, FieldType};
use crate::value::{FieldValue, ABSENT};

/// Value of the implicit "no selection" entry of a dropdown
pub const NO_SELECTION: &str = "";

/// Flavour of a single-line control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Email,
    Password,
    Number,
    Date,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Text => "text",
            InputKind::Email => "email",
            InputKind::Password => "password",
            InputKind::Number => "number",
            InputKind::Date => "date",
        }
    }
}

/// Properties every control receives
#[derive(Debug, Clone, PartialEq)]
pub struct ControlProps {
    pub name: String,
    pub label: String,
    pub placeholder: Option<String>,
    pub required: bool,
    /// Shown beneath the control when present
    pub error: Option<String>,
}

/// The interaction shape a field is rendered as
#[derive(Debug, Clone, PartialEq)]
pub enum ControlContract {
    SingleLine {
        props: ControlProps,
        input: InputKind,
        value: String,
    },
    MultiLine {
        props: ControlProps,
        value: String,
    },
    /// `selected` is `None` while the "no selection" entry is chosen
    Select {
        props: ControlProps,
        options: Vec<FieldOption>,
        selected: Option<String>,
    },
    Toggle {
        props: ControlProps,
        checked: bool,
    },
    RadioGroup {
        props: ControlProps,
        options: Vec<FieldOption>,
        selected: Option<String>,
    },
}

/// Input emitted by a control
#[derive(Debug, Clone, PartialEq)]
pub enum ControlInput {
    Text(String),
    Toggle(bool),
    Choice(String),
}

/// A value change ready to be applied to a form
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub name: String,
    pub value: FieldValue,
}

impl ChangeEvent {
    pub fn apply<H: SubmitHandler>(self, engine: &mut FormEngine<H>) -> Result<()> {
        engine.set_value(&self.name, self.value)
    }
}

impl ControlContract {
    pub fn props(&self) -> &ControlProps {
        match self {
            ControlContract::SingleLine { props, .. }
            | ControlContract::MultiLine { props, .. }
            | ControlContract::Select { props, .. }
            | ControlContract::Toggle { props, .. }
            | ControlContract::RadioGroup { props, .. } => props,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.props().error.as_deref()
    }

    /// Map an input from the control to a change of the bound value.
    ///
    /// Returns `None` for input the control cannot emit: a toggle receiving
    /// text, or a choice outside the option set.
    pub fn change(&self, input: ControlInput) -> Option<ChangeEvent> {
        let value = match (self, input) {
            (
                ControlContract::SingleLine { .. } | ControlContract::MultiLine { .. },
                ControlInput::Text(text),
            ) => FieldValue::Text(text),
            (ControlContract::Toggle { .. }, ControlInput::Toggle(checked)) => {
                FieldValue::Bool(checked)
            }
            (
                ControlContract::Select { options, .. },
                ControlInput::Choice(choice) | ControlInput::Text(choice),
            ) => {
                if choice != NO_SELECTION && !options.iter().any(|o| o.value == choice) {
                    return None;
                }
                FieldValue::Text(choice)
            }
            (ControlContract::RadioGroup { options, .. }, ControlInput::Choice(choice)) => {
                if !options.iter().any(|o| o.value == choice) {
                    return None;
                }
                FieldValue::Text(choice)
            }
            _ => return None,
        };

        Some(ChangeEvent {
            name: self.props().name.clone(),
            value,
        })
    }
}

/// Build the control contract for a field.
///
/// Returns `None` for [`FieldType::Unknown`]: such fields render nothing.
pub fn render(
    field: &FieldConfig,
    value: &FieldValue,
    error: Option<&str>,
) -> Option<ControlContract> {
    let props = ControlProps {
        name: field.name.clone(),
        label: field.label.clone(),
        placeholder: field.placeholder.clone(),
        required: field.is_required(),
        error: error.map(str::to_string),
    };

    let single_line = |input| ControlContract::SingleLine {
        props: props.clone(),
        input,
        value: value.display_text(),
    };

    let control = match &field.field_type {
        FieldType::Text => single_line(InputKind::Text),
        FieldType::Email => single_line(InputKind::Email),
        FieldType::Password => single_line(InputKind::Password),
        FieldType::Number => single_line(InputKind::Number),
        FieldType::Date => single_line(InputKind::Date),
        FieldType::Textarea => ControlContract::MultiLine {
            props: props.clone(),
            value: value.display_text(),
        },
        FieldType::Select => ControlContract::Select {
            props: props.clone(),
            options: field.options.clone(),
            selected: selected_choice(value),
        },
        FieldType::Checkbox => ControlContract::Toggle {
            props: props.clone(),
            checked: is_checked(value),
        },
        FieldType::Radio => ControlContract::RadioGroup {
            props: props.clone(),
            options: field.options.clone(),
            selected: selected_choice(value),
        },
        FieldType::Unknown(_) => return None,
    };

    Some(control)
}

/// Render every field of a mounted form, in definition order
pub fn render_form<H: SubmitHandler>(engine: &FormEngine<H>) -> Vec<ControlContract> {
    engine
        .form()
        .fields
        .iter()
        .filter_map(|field| {
            let value = engine.value(&field.name).unwrap_or(&ABSENT);
            render(field, value, engine.error(&field.name))
        })
        .collect()
}

fn selected_choice(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Absent => None,
        FieldValue::Text(s) if s == NO_SELECTION => None,
        other => Some(other.display_text()),
    }
}

fn is_checked(value: &FieldValue) -> bool {
    match value {
        FieldValue::Bool(b) => *b,
        FieldValue::Text(s) => matches!(s.as_str(), "true" | "on"),
        _ => false,
    }
}

/// The five external rendering primitives
pub trait ControlPrimitives {
    type Output;

    fn single_line(&mut self, props: &ControlProps, input: InputKind, value: &str) -> Self::Output;
    fn multi_line(&mut self, props: &ControlProps, value: &str) -> Self::Output;
    fn select(
        &mut self,
        props: &ControlProps,
        options: &[FieldOption],
        selected: Option<&str>,
    ) -> Self::Output;
    fn toggle(&mut self, props: &ControlProps, checked: bool) -> Self::Output;
    fn radio_group(
        &mut self,
        props: &ControlProps,
        options: &[FieldOption],
        selected: Option<&str>,
    ) -> Self::Output;
}

/// Call the primitive matching a contract
pub fn dispatch<P: ControlPrimitives>(primitives: &mut P, control: &ControlContract) -> P::Output {
    match control {
        ControlContract::SingleLine {
            props,
            input,
            value,
        } => primitives.single_line(props, *input, value),
        ControlContract::MultiLine { props, value } => primitives.multi_line(props, value),
        ControlContract::Select {
            props,
            options,
            selected,
        } => {
            primitives.select(props, options, selected.as_deref())
        }
        ControlContract::Toggle { props, checked } => primitives.toggle(props, *checked),
        ControlContract::RadioGroup {
            props,
            options,
            selected,
        } => {
            primitives.radio_group(props, options, selected.as_deref())
        }
    }
}

/// Plain-text rendering, used for previews on the command line
#[derive(Debug, Default)]
pub struct TextPreview;

impl TextPreview {
    fn heading(props: &ControlProps) -> String {
        if props.required {
            format!("{} *", props.label)
        } else {
            props.label.clone()
        }
    }

    fn with_error(mut out: String, props: &ControlProps) -> String {
        if let Some(error) = &props.error {
            let _ = write!(out, "\n  ! {}", error);
        }
        out
    }

    fn choice_label<'a>(options: &'a [FieldOption], selected: Option<&str>) -> Option<&'a str> {
        let selected = selected?;
        options
            .iter()
            .find(|o| o.value == selected)
            .map(|o| o.label.as_str())
    }
}

impl ControlPrimitives for TextPreview {
    type Output = String;

    fn single_line(&mut self, props: &ControlProps, input: InputKind, value: &str) -> String {
        let shown = match (input, value, &props.placeholder) {
            (_, "", Some(placeholder)) => format!("<{}>", placeholder),
            (_, "", None) => "_".to_string(),
            (InputKind::Password, v, _) => "*".repeat(v.chars().count()),
            (_, v, _) => v.to_string(),
        };
        let out = format!("{} [{}]: {}", Self::heading(props), input.as_str(), shown);
        Self::with_error(out, props)
    }

    fn multi_line(&mut self, props: &ControlProps, value: &str) -> String {
        let mut out = format!("{}:", Self::heading(props));
        if value.is_empty() {
            let shown = props.placeholder.as_deref().map(|p| format!("<{}>", p));
            let _ = write!(out, "\n  | {}", shown.unwrap_or_default());
        } else {
            for line in value.lines() {
                let _ = write!(out, "\n  | {}", line);
            }
        }
        Self::with_error(out, props)
    }

    fn select(
        &mut self,
        props: &ControlProps,
        options: &[FieldOption],
        selected: Option<&str>,
    ) -> String {
        let shown = match Self::choice_label(options, selected) {
            Some(label) => label.to_string(),
            None => format!("<{}>", props.placeholder.as_deref().unwrap_or("Select...")),
        };
        let choices = options
            .iter()
            .map(|o| o.label.as_str())
            .collect::<Vec<_>>()
            .join(" | ");
        let out = format!("{}: v {}  ({})", Self::heading(props), shown, choices);
        Self::with_error(out, props)
    }

    fn toggle(&mut self, props: &ControlProps, checked: bool) -> String {
        let mark = if checked { "x" } else { " " };
        let out = format!("[{}] {}", mark, Self::heading(props));
        Self::with_error(out, props)
    }

    fn radio_group(
        &mut self,
        props: &ControlProps,
        options: &[FieldOption],
        selected: Option<&str>,
    ) -> String {
        let mut out = format!("{}:", Self::heading(props));
        for option in options {
            let mark = if selected == Some(option.value.as_str()) { "*" } else { " " };
            let _ = write!(out, "\n  ({}) {}", mark, option.label);
        }
        Self::with_error(out, props)
    }
}

/// Preview a whole form as text
pub fn preview_form<H: SubmitHandler>(engine: &FormEngine<H>, default_submit_text: &str) -> String {
    let mut preview = TextPreview;
    let mut sections = Vec::new();

    if let Some(title) = &engine.form().title {
        sections.push(format!("== {} ==", title));
    }

    for control in render_form(engine) {
        sections.push(dispatch(&mut preview, &control));
    }

    sections.push(format!("[ {} ]", engine.form().submit_label(default_submit_text)));
    sections.join("\n")
}
