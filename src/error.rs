use thiserror::Error;

/// Errors raised by an `EntityManager`
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying database failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Email names are unique
    #[error("An email named '{0}' already exists")]
    DuplicateName(String),

    /// An update referenced an email that is not stored
    #[error("Email {0} does not exist")]
    NotFound(i64),
}

/// Errors raised by the email form handler
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The requested locale is not in the configured supported list
    #[error("Unsupported language: {locale}. Please check your mailer configuration.")]
    UnsupportedLocale { locale: String },

    /// Saving the email failed
    #[error("Failed to save email: {0}")]
    Persistence(#[from] StoreError),
}
