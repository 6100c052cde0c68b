use crate::entity::{Email, EmailTranslation};
use crate::error::StoreError;
use crate::store::EntityManager;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

type EmailRow = (
    i64,
    String,
    Option<String>,
    bool,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
);

type TranslationRow = (
    i64,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// PostgreSQL connection pool with the email schema in place.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect and create tables if they do not exist yet
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        let db = Self { pool };
        db.init_schema().await?;
        info!("✓ Database ready");
        Ok(db)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS emails (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                spool BOOLEAN NOT NULL DEFAULT FALSE,
                use_fallback_locale BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create emails table")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS email_translations (
                id BIGSERIAL PRIMARY KEY,
                email_id BIGINT NOT NULL REFERENCES emails(id) ON DELETE CASCADE,
                lang TEXT NOT NULL,
                subject TEXT NOT NULL,
                body TEXT NOT NULL,
                body_text TEXT,
                from_address TEXT,
                from_name TEXT,
                UNIQUE (email_id, lang)
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create email_translations table")?;

        Ok(())
    }

    /// A fresh unit of work over this pool
    pub fn entity_manager(&self) -> PgEntityManager {
        PgEntityManager {
            pool: self.pool.clone(),
            staged: Vec::new(),
        }
    }
}

/// Unit of work backed by PostgreSQL. Each flush runs in one transaction.
pub struct PgEntityManager {
    pool: PgPool,
    staged: Vec<Email>,
}

/// Unique violations on the email name surface as `DuplicateName`
fn map_write_error(err: sqlx::Error, name: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::DuplicateName(name.to_string())
        }
        _ => StoreError::Database(err),
    }
}

impl PgEntityManager {
    async fn write_email(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        email: &mut Email,
    ) -> Result<(), StoreError> {
        email.updated_at = Utc::now();

        let id = match email.id {
            None => sqlx::query_scalar::<_, i64>(
                "INSERT INTO emails (name, description, spool, use_fallback_locale, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING id",
            )
            .bind(&email.name)
            .bind(&email.description)
            .bind(email.spool)
            .bind(email.use_fallback_locale)
            .bind(email.created_at)
            .bind(email.updated_at)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| map_write_error(e, &email.name))?,
            Some(id) => {
                let result = sqlx::query(
                    "UPDATE emails
                     SET name = $2, description = $3, spool = $4, use_fallback_locale = $5, updated_at = $6
                     WHERE id = $1",
                )
                .bind(id)
                .bind(&email.name)
                .bind(&email.description)
                .bind(email.spool)
                .bind(email.use_fallback_locale)
                .bind(email.updated_at)
                .execute(&mut **tx)
                .await
                .map_err(|e| map_write_error(e, &email.name))?;

                if result.rows_affected() == 0 {
                    return Err(StoreError::NotFound(id));
                }
                id
            }
        };
        email.set_id(id);

        for translation in email.translations_mut() {
            let translation_id = sqlx::query_scalar::<_, i64>(
                "INSERT INTO email_translations (email_id, lang, subject, body, body_text, from_address, from_name)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (email_id, lang) DO UPDATE SET
                    subject = EXCLUDED.subject,
                    body = EXCLUDED.body,
                    body_text = EXCLUDED.body_text,
                    from_address = EXCLUDED.from_address,
                    from_name = EXCLUDED.from_name
                 RETURNING id",
            )
            .bind(id)
            .bind(&translation.lang)
            .bind(&translation.subject)
            .bind(&translation.body)
            .bind(&translation.body_text)
            .bind(&translation.from_address)
            .bind(&translation.from_name)
            .fetch_one(&mut **tx)
            .await?;

            translation.id = Some(translation_id);
        }

        debug!(
            "Wrote email {} '{}' ({} translations)",
            id,
            email.name,
            email.translations().len()
        );
        Ok(())
    }
}

#[async_trait]
impl EntityManager for PgEntityManager {
    fn persist(&mut self, email: Email) {
        if let Some(id) = email.id {
            self.staged.retain(|e| e.id != Some(id));
        }
        self.staged.push(email);
    }

    async fn flush(&mut self) -> Result<Vec<Email>, StoreError> {
        let mut staged = std::mem::take(&mut self.staged);
        if staged.is_empty() {
            return Ok(staged);
        }

        // Dropping the transaction on an early return rolls it back
        let mut tx = self.pool.begin().await?;
        for email in &mut staged {
            Self::write_email(&mut tx, email).await?;
        }
        tx.commit().await?;

        Ok(staged)
    }

    async fn find(&self, id: i64) -> Result<Option<Email>, StoreError> {
        let row: Option<EmailRow> = sqlx::query_as(
            "SELECT id, name, description, spool, use_fallback_locale, created_at, updated_at
             FROM emails WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, name, description, spool, use_fallback_locale, created_at, updated_at)) = row
        else {
            return Ok(None);
        };

        let mut email = Email::new();
        email.set_id(id);
        email.name = name;
        email.description = description;
        email.spool = spool;
        email.use_fallback_locale = use_fallback_locale;
        email.created_at = created_at;
        email.updated_at = updated_at;

        let translations: Vec<TranslationRow> = sqlx::query_as(
            "SELECT id, lang, subject, body, body_text, from_address, from_name
             FROM email_translations WHERE email_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        for (translation_id, lang, subject, body, body_text, from_address, from_name) in
            translations
        {
            email.add_translation(EmailTranslation {
                id: Some(translation_id),
                email_id: Some(id),
                lang,
                subject,
                body,
                body_text,
                from_address,
                from_name,
            });
        }

        Ok(Some(email))
    }
}
