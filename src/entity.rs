use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An email template with one translation per locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    /// Database id, `None` until the entity is flushed
    pub id: Option<i64>,
    /// Unique template identifier
    pub name: String,
    pub description: Option<String>,
    /// Whether messages built from this template are queued rather than sent
    pub spool: bool,
    /// Whether a missing translation falls back to the default locale
    pub use_fallback_locale: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    translations: Vec<EmailTranslation>,
}

impl Email {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name: String::new(),
            description: None,
            spool: false,
            use_fallback_locale: true,
            created_at: now,
            updated_at: now,
            translations: Vec::new(),
        }
    }

    /// Translation for an exact locale, if one exists.
    pub fn get_translation(&self, lang: &str) -> Option<&EmailTranslation> {
        self.translations.iter().find(|t| t.lang == lang)
    }

    /// The existing translation for `lang`, or a new one pointing at this email.
    ///
    /// A new translation is not added to the email; that happens on `add_translation`.
    pub fn translation_or_new(&self, lang: &str) -> EmailTranslation {
        match self.get_translation(lang) {
            Some(translation) => translation.clone(),
            None => {
                let mut translation = EmailTranslation::new(lang);
                translation.set_email(self);
                translation
            }
        }
    }

    /// Add a translation, replacing any existing one with the same locale.
    ///
    /// A translation's id belongs to its locale: a replacement keeps the id of
    /// the entry it replaces, and a new locale never reuses another's id.
    pub fn add_translation(&mut self, mut translation: EmailTranslation) {
        translation.email_id = self.id;
        match self.translations.iter().position(|t| t.lang == translation.lang) {
            Some(index) => {
                translation.id = self.translations[index].id;
                self.translations[index] = translation;
            }
            None => {
                if translation.id.is_some()
                    && self.translations.iter().any(|t| t.id == translation.id)
                {
                    translation.id = None;
                }
                self.translations.push(translation);
            }
        }
    }

    pub fn translations(&self) -> &[EmailTranslation] {
        &self.translations
    }

    pub fn locales(&self) -> Vec<&str> {
        self.translations.iter().map(|t| t.lang.as_str()).collect()
    }

    /// Assign the database id, propagating it to every translation.
    pub fn set_id(&mut self, id: i64) {
        self.id = Some(id);
        for translation in &mut self.translations {
            translation.email_id = Some(id);
        }
    }

    pub(crate) fn translations_mut(&mut self) -> &mut Vec<EmailTranslation> {
        &mut self.translations
    }
}

impl Default for Email {
    fn default() -> Self {
        Self::new()
    }
}

/// Localized content of an email for one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTranslation {
    pub id: Option<i64>,
    /// Back-reference to the owning email (`None` while the email is unsaved)
    pub email_id: Option<i64>,
    pub lang: String,
    pub subject: String,
    pub body: String,
    pub body_text: Option<String>,
    pub from_address: Option<String>,
    pub from_name: Option<String>,
}

impl EmailTranslation {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            id: None,
            email_id: None,
            lang: lang.into(),
            subject: String::new(),
            body: String::new(),
            body_text: None,
            from_address: None,
            from_name: None,
        }
    }

    pub fn set_email(&mut self, email: &Email) {
        self.email_id = email.id;
    }
}

/// View-model pairing an email with the translation being edited.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityTranslationModel {
    pub email: Email,
    pub translation: EmailTranslation,
}

impl EntityTranslationModel {
    pub fn new(email: Email, translation: EmailTranslation) -> Self {
        Self { email, translation }
    }
}
