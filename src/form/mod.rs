//! Form framework: creating forms bound to a model, binding request data,
//! and reporting whether a submission is valid.
//!
//! The handler only sees the `FormFactory` and `Form` traits. `EmailFormFactory`
//! is the implementation used by the web layer; tests substitute their own.

mod email;
mod view;

pub use email::{EmailForm, EmailFormFactory};
pub use view::{locale_options, FieldView, FormView, LocaleOption};

use crate::entity::{EmailTranslation, EntityTranslationModel};
use crate::i18n::SupportedLocaleChoices;
use serde::Serialize;
use std::collections::HashMap;

/// Which form type to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    Email,
}

/// Options passed alongside the bound model when a form is created.
#[derive(Debug, Clone)]
pub struct FormOptions {
    /// Translation edited by the form
    pub data_translation: EmailTranslation,
    /// True when editing an existing email
    pub edit: bool,
    pub supported_locales: SupportedLocaleChoices,
}

/// HTTP method of an incoming request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMethod {
    Get,
    Post,
}

/// Request data handed to a form.
#[derive(Debug, Clone)]
pub struct FormRequest {
    pub method: FormMethod,
    pub fields: HashMap<String, String>,
}

impl FormRequest {
    /// A request that displays the form without submitting it.
    pub fn get() -> Self {
        Self {
            method: FormMethod::Get,
            fields: HashMap::new(),
        }
    }

    pub fn post<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            method: FormMethod::Post,
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// A validation failure attached to one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A form bound to an `EntityTranslationModel`.
pub trait Form {
    /// Bind request data. Binding and validation only happen for submissions.
    fn handle_request(&mut self, request: &FormRequest);

    fn is_submitted(&self) -> bool;

    /// False until a submission has been bound without errors
    fn is_valid(&self) -> bool;

    fn data(&self) -> &EntityTranslationModel;

    fn data_mut(&mut self) -> &mut EntityTranslationModel;

    fn errors(&self) -> &[FieldError];

    /// Serializable projection used to render the form
    fn view(&self) -> FormView;
}

/// Creates forms of a given kind.
pub trait FormFactory {
    type Form: Form;

    fn create(&self, kind: FormKind, model: EntityTranslationModel, options: FormOptions)
        -> Self::Form;
}

impl<T: FormFactory + ?Sized> FormFactory for &T {
    type Form = T::Form;

    fn create(
        &self,
        kind: FormKind,
        model: EntityTranslationModel,
        options: FormOptions,
    ) -> Self::Form {
        (**self).create(kind, model, options)
    }
}
