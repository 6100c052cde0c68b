//! Supported-locale choices offered by the email edit form.
//!
//! Choices are keyed by locale code. The `"<Language> [<code>]"` label is a
//! derived projection, so two codes can never shadow each other even when
//! their labels coincide.

use crate::i18n::{alpha2, split_locales, LanguageNames};
use serde::Serialize;
use tracing::debug;

/// Label used in place of a language name the registry does not know.
pub const UNSUPPORTED_LABEL: &str = "- unsupported -";

/// One selectable locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocaleChoice {
    /// Full locale token as configured (e.g., "fr_CA")
    pub code: String,

    /// Language name resolved from the alpha-2 prefix, or `UNSUPPORTED_LABEL`
    pub name: String,
}

impl LocaleChoice {
    /// Display label, e.g. `"French [fr_CA]"`.
    pub fn label(&self) -> String {
        format!("{} [{}]", self.name, self.code)
    }
}

/// Ordered set of supported locales.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportedLocaleChoices {
    choices: Vec<LocaleChoice>,
}

impl SupportedLocaleChoices {
    /// Build choices from a raw configuration string such as `"en,fr_FR de"`.
    ///
    /// Unknown languages never fail; they are labelled `UNSUPPORTED_LABEL`.
    pub fn parse(raw: &str, names: impl LanguageNames) -> Self {
        let choices = split_locales(raw)
            .into_iter()
            .map(|code| {
                let name = match names.language_name(alpha2(code)) {
                    Ok(name) => name,
                    Err(e) => {
                        debug!("{}, labelling '{}' as unsupported", e, code);
                        UNSUPPORTED_LABEL.to_string()
                    }
                };
                LocaleChoice {
                    code: code.to_string(),
                    name,
                }
            })
            .collect();

        Self { choices }
    }

    /// Whether `code` is one of the configured locale codes.
    ///
    /// Labels are never matched.
    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn get(&self, code: &str) -> Option<&LocaleChoice> {
        self.choices.iter().find(|choice| choice.code == code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.choices.iter().map(|choice| choice.code.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocaleChoice> {
        self.choices.iter()
    }

    /// `(label, code)` pairs in configuration order, for presentation.
    pub fn labels(&self) -> Vec<(String, String)> {
        self.choices
            .iter()
            .map(|choice| (choice.label(), choice.code.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }
}
