use crate::form::{FieldError, FormKind};
use crate::i18n::SupportedLocaleChoices;
use serde::Serialize;
use serde_json::Value;

/// One rendered form field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldView {
    pub name: &'static str,
    pub value: Value,
    pub required: bool,
    /// Disabled fields are shown but never rebound from the request
    pub disabled: bool,
}

/// A selectable locale as presented to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocaleOption {
    pub code: String,
    pub label: String,
}

/// Everything a client needs to render the email form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormView {
    pub kind: FormKind,
    pub edit: bool,
    pub submitted: bool,
    pub valid: bool,
    pub email_id: Option<i64>,
    /// Locale of the translation being edited
    pub locale: String,
    pub fields: Vec<FieldView>,
    pub errors: Vec<FieldError>,
    pub supported_locales: Vec<LocaleOption>,
}

impl FormView {
    pub fn field(&self, name: &str) -> Option<&FieldView> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn errors_for(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }
}

/// Choices as `{code, label}` options, in configuration order.
pub fn locale_options(choices: &SupportedLocaleChoices) -> Vec<LocaleOption> {
    choices
        .labels()
        .into_iter()
        .map(|(label, code)| LocaleOption { code, label })
        .collect()
}

pub(crate) fn text(value: &str) -> Value {
    Value::String(value.to_string())
}

pub(crate) fn optional_text(value: Option<&str>) -> Value {
    value.map(text).unwrap_or(Value::Null)
}
