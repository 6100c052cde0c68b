//! Internationalization (i18n) support for the email editor.
//!
//! # Architecture
//!
//! - `registry`: ISO 639-1 language names, the lookup behind every locale label
//! - `locale`: Parsing of the configured locale list and alpha-2 extraction
//! - `choices`: The supported-locale choices offered by the edit form
//!
//! # Example
//!
//! ```rust
//! use email_template_editor::i18n::{LanguageRegistry, SupportedLocaleChoices};
//!
//! let choices = SupportedLocaleChoices::parse("en,fr fr_CA", LanguageRegistry::get());
//! assert_eq!(choices.len(), 3);
//! assert!(choices.contains("fr_CA"));
//! ```

mod choices;
mod locale;
mod registry;

pub use choices::{LocaleChoice, SupportedLocaleChoices, UNSUPPORTED_LABEL};
pub use locale::{alpha2, split_locales};
pub use registry::{LanguageConfig, LanguageNames, LanguageRegistry, MissingResourceError};
