use crate::entity::Email;
use crate::error::StoreError;
use crate::store::EntityManager;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
struct MemoryState {
    emails: BTreeMap<i64, Email>,
    next_email_id: i64,
    next_translation_id: i64,
}

/// In-process email store.
///
/// Clones share the stored emails but each keeps its own staged changes,
/// so one clone per request behaves like one unit of work per request.
#[derive(Debug, Clone, Default)]
pub struct MemoryEntityManager {
    state: Arc<Mutex<MemoryState>>,
    staged: Vec<Email>,
}

impl MemoryEntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored emails
    pub async fn len(&self) -> usize {
        self.state.lock().await.emails.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EntityManager for MemoryEntityManager {
    fn persist(&mut self, email: Email) {
        // Staging the same email twice keeps the latest version
        match email.id {
            Some(id) => self.staged.retain(|e| e.id != Some(id)),
            None => self.staged.retain(|e| e.id.is_some() || e.name != email.name),
        }
        self.staged.push(email);
    }

    async fn flush(&mut self) -> Result<Vec<Email>, StoreError> {
        let staged = std::mem::take(&mut self.staged);
        let mut state = self.state.lock().await;

        // Check every constraint before writing anything
        for email in &staged {
            if let Some(id) = email.id {
                if !state.emails.contains_key(&id) {
                    return Err(StoreError::NotFound(id));
                }
            }
            let taken = state
                .emails
                .values()
                .any(|stored| stored.name == email.name && stored.id != email.id);
            let duplicated_in_batch = staged
                .iter()
                .filter(|other| other.name == email.name)
                .count()
                > 1;
            if taken || duplicated_in_batch {
                return Err(StoreError::DuplicateName(email.name.clone()));
            }
        }

        let mut flushed = Vec::with_capacity(staged.len());
        for mut email in staged {
            let id = match email.id {
                Some(id) => id,
                None => {
                    state.next_email_id += 1;
                    state.next_email_id
                }
            };
            email.set_id(id);
            email.updated_at = Utc::now();
            for translation in email.translations_mut() {
                if translation.id.is_none() {
                    state.next_translation_id += 1;
                    translation.id = Some(state.next_translation_id);
                }
            }

            debug!(
                "Stored email {} '{}' ({} translations)",
                id,
                email.name,
                email.translations().len()
            );
            state.emails.insert(id, email.clone());
            flushed.push(email);
        }

        Ok(flushed)
    }

    async fn find(&self, id: i64) -> Result<Option<Email>, StoreError> {
        Ok(self.state.lock().await.emails.get(&id).cloned())
    }
}
