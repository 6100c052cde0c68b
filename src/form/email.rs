use crate::entity::EntityTranslationModel;
use crate::form::view::{locale_options, optional_text, text};
use crate::form::{
    FieldError, FieldView, Form, FormFactory, FormKind, FormMethod, FormOptions, FormRequest,
    FormView,
};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

const NOT_BLANK: &str = "This value should not be blank.";
const INVALID_NAME: &str = "Only letters, digits, '.', '_' and '-' are allowed.";
const INVALID_ADDRESS: &str = "This value is not a valid email address.";
const INVALID_CHOICE: &str = "The selected language is not supported.";

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("name pattern is valid"))
}

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("address pattern is valid")
    })
}

/// Trimmed value, `None` when absent or blank
fn optional_field(request: &FormRequest, name: &str) -> Option<String> {
    request
        .field(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required_field(request: &FormRequest, name: &str) -> String {
    optional_field(request, name).unwrap_or_default()
}

/// Checkbox semantics: absent means unchecked
fn checkbox(request: &FormRequest, name: &str) -> bool {
    matches!(
        request.field(name).map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "on" | "true" | "yes")
    )
}

/// The email edit form: template settings plus one translation.
#[derive(Debug, Clone)]
pub struct EmailForm {
    model: EntityTranslationModel,
    options: FormOptions,
    submitted: bool,
    errors: Vec<FieldError>,
}

impl EmailForm {
    pub fn new(mut model: EntityTranslationModel, options: FormOptions) -> Self {
        model.translation = options.data_translation.clone();
        Self {
            model,
            options,
            submitted: false,
            errors: Vec::new(),
        }
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    fn bind(&mut self, request: &FormRequest) {
        let email = &mut self.model.email;
        // The name identifies the template and is fixed once created
        if !self.options.edit {
            email.name = required_field(request, "name");
        }
        email.description = optional_field(request, "description");
        email.spool = checkbox(request, "spool");
        email.use_fallback_locale = checkbox(request, "use_fallback_locale");

        let translation = &mut self.model.translation;
        if self.options.edit {
            if let Some(lang) = optional_field(request, "lang") {
                // Moving to another locale targets that locale's record
                if lang != self.options.data_translation.lang {
                    translation.id = email.get_translation(&lang).and_then(|t| t.id);
                }
                translation.lang = lang;
            }
        }
        translation.subject = required_field(request, "subject");
        translation.body = required_field(request, "body");
        translation.body_text = optional_field(request, "body_text");
        translation.from_address = optional_field(request, "from_address");
        translation.from_name = optional_field(request, "from_name");
    }

    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let email = &self.model.email;
        let translation = &self.model.translation;

        if email.name.is_empty() {
            errors.push(FieldError::new("name", NOT_BLANK));
        } else if !name_pattern().is_match(&email.name) {
            errors.push(FieldError::new("name", INVALID_NAME));
        }

        if self.options.edit && !self.options.supported_locales.contains(&translation.lang) {
            errors.push(FieldError::new("lang", INVALID_CHOICE));
        }

        if translation.subject.is_empty() {
            errors.push(FieldError::new("subject", NOT_BLANK));
        }
        if translation.body.is_empty() {
            errors.push(FieldError::new("body", NOT_BLANK));
        }
        if let Some(address) = &translation.from_address {
            if !address_pattern().is_match(address) {
                errors.push(FieldError::new("from_address", INVALID_ADDRESS));
            }
        }

        errors
    }
}

impl Form for EmailForm {
    fn handle_request(&mut self, request: &FormRequest) {
        if request.method != FormMethod::Post {
            return;
        }

        self.submitted = true;
        self.bind(request);
        self.errors = self.validate();

        if !self.errors.is_empty() {
            debug!(
                "Email form for '{}' has {} error(s)",
                self.model.email.name,
                self.errors.len()
            );
        }
    }

    fn is_submitted(&self) -> bool {
        self.submitted
    }

    fn is_valid(&self) -> bool {
        self.submitted && self.errors.is_empty()
    }

    fn data(&self) -> &EntityTranslationModel {
        &self.model
    }

    fn data_mut(&mut self) -> &mut EntityTranslationModel {
        &mut self.model
    }

    fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    fn view(&self) -> FormView {
        let email = &self.model.email;
        let translation = &self.model.translation;
        let edit = self.options.edit;

        let field = |name, value, required| FieldView {
            name,
            value,
            required,
            disabled: false,
        };

        let mut fields = vec![
            FieldView {
                name: "name",
                value: text(&email.name),
                required: true,
                disabled: edit,
            },
            field("description", optional_text(email.description.as_deref()), false),
            field("spool", Value::Bool(email.spool), false),
            field("use_fallback_locale", Value::Bool(email.use_fallback_locale), false),
        ];
        if edit {
            fields.push(field("lang", text(&translation.lang), true));
        }
        fields.extend([
            field("subject", text(&translation.subject), true),
            field("body", text(&translation.body), true),
            field("body_text", optional_text(translation.body_text.as_deref()), false),
            field("from_address", optional_text(translation.from_address.as_deref()), false),
            field("from_name", optional_text(translation.from_name.as_deref()), false),
        ]);

        FormView {
            kind: FormKind::Email,
            edit,
            submitted: self.submitted,
            valid: self.is_valid(),
            email_id: email.id,
            locale: translation.lang.clone(),
            fields,
            errors: self.errors.clone(),
            supported_locales: locale_options(&self.options.supported_locales),
        }
    }
}

/// Factory for `EmailForm`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailFormFactory;

impl FormFactory for EmailFormFactory {
    type Form = EmailForm;

    fn create(
        &self,
        kind: FormKind,
        model: EntityTranslationModel,
        options: FormOptions,
    ) -> EmailForm {
        match kind {
            FormKind::Email => EmailForm::new(model, options),
        }
    }
}
