//! Persistence of emails with unit-of-work semantics.
//!
//! `persist` stages an email graph; nothing is written until `flush`, which
//! commits every staged email at once and returns them with their ids.

mod memory;
mod postgres;

pub use memory::MemoryEntityManager;
pub use postgres::{Database, PgEntityManager};

use crate::entity::Email;
use crate::error::StoreError;
use async_trait::async_trait;

#[async_trait]
pub trait EntityManager: Send + Sync {
    /// Stage an email and its translations for insert or update.
    fn persist(&mut self, email: Email);

    /// Commit everything staged since the last flush.
    async fn flush(&mut self) -> Result<Vec<Email>, StoreError>;

    /// Load an email with all of its translations.
    async fn find(&self, id: i64) -> Result<Option<Email>, StoreError>;
}

#[async_trait]
impl<T: EntityManager + ?Sized> EntityManager for Box<T> {
    fn persist(&mut self, email: Email) {
        (**self).persist(email)
    }

    async fn flush(&mut self) -> Result<Vec<Email>, StoreError> {
        (**self).flush().await
    }

    async fn find(&self, id: i64) -> Result<Option<Email>, StoreError> {
        (**self).find(id).await
    }
}
