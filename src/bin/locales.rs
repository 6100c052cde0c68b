//! Locales binary - prints the locale choices the email form will offer
//!
//! Usage:
//!   cargo run --bin locales                    # Use SUPPORTED_LOCALES from the environment
//!   cargo run --bin locales -- "en,fr fr_CA"   # Preview another configuration
//!
//! Optional:
//! - DEFAULT_LOCALE (defaults to en)
//! - SUPPORTED_LOCALES (defaults to DEFAULT_LOCALE)

use anyhow::{bail, Result};
use email_template_editor::config::Config;
use email_template_editor::i18n::{LanguageRegistry, SupportedLocaleChoices, UNSUPPORTED_LABEL};
use tracing::{info, warn};

fn main() -> Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("locales=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let raw = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.supported_locales.clone());

    let choices = SupportedLocaleChoices::parse(&raw, LanguageRegistry::get());
    if choices.is_empty() {
        bail!("No locales found in '{}'", raw);
    }

    info!("Default locale: {}", config.default_locale);
    if !choices.contains(&config.default_locale) {
        warn!(
            "Default locale '{}' is not in the supported list",
            config.default_locale
        );
    }

    for choice in choices.iter() {
        if choice.name == UNSUPPORTED_LABEL {
            warn!("No language name known for '{}'", choice.code);
        }
        println!("{:<10} {}", choice.code, choice.label());
    }

    Ok(())
}
