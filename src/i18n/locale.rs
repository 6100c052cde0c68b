//! Locale string helpers.

use regex::Regex;
use std::sync::OnceLock;

fn separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new("[ ,]").expect("separator pattern is valid"))
}

/// Split a configured locale list on spaces or commas.
///
/// Empty tokens are dropped and repeated tokens keep their first position.
///
/// # Example
/// ```
/// use email_template_editor::i18n::split_locales;
///
/// assert_eq!(split_locales("en,fr  de_DE,"), vec!["en", "fr", "de_DE"]);
/// ```
pub fn split_locales(raw: &str) -> Vec<&str> {
    let mut locales: Vec<&str> = Vec::new();
    for token in separator().split(raw).filter(|t| !t.is_empty()) {
        if !locales.contains(&token) {
            locales.push(token);
        }
    }
    locales
}

/// The first two characters of a locale, used as the language lookup key.
///
/// Shorter locales are returned whole.
pub fn alpha2(locale: &str) -> &str {
    match locale.char_indices().nth(2) {
        Some((idx, _)) => &locale[..idx],
        None => locale,
    }
}
