//! Email form handler: builds the localized email form and saves valid
//! submissions.
//!
//! A handler holds only configuration and collaborators. The locale chosen
//! for a request is returned in `PreparedForm`, so one handler can serve any
//! number of requests.

use crate::entity::{Email, EmailTranslation, EntityTranslationModel};
use crate::error::HandlerError;
use crate::form::{Form, FormFactory, FormKind, FormOptions, FormRequest};
use crate::i18n::{LanguageNames, LanguageRegistry, SupportedLocaleChoices};
use crate::store::EntityManager;
use tracing::{debug, info};

/// A form ready to be rendered or processed, with the locale it was built for.
#[derive(Debug)]
pub struct PreparedForm<T> {
    pub form: T,
    locale: String,
}

impl<T> PreparedForm<T> {
    /// Locale resolved when the form was built
    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn into_form(self) -> T {
        self.form
    }
}

pub struct EmailFormHandler<F, M, N = &'static LanguageRegistry> {
    factory: F,
    em: M,
    names: N,
    default_locale: String,
    supported_locales: String,
}

impl<F, M> EmailFormHandler<F, M>
where
    F: FormFactory,
    M: EntityManager,
{
    /// Create a handler that labels locales with the built-in language registry.
    ///
    /// `supported_locales` is the raw configuration string, e.g. `"en,fr_FR de"`.
    pub fn new(
        factory: F,
        em: M,
        default_locale: impl Into<String>,
        supported_locales: impl Into<String>,
    ) -> Self {
        Self {
            factory,
            em,
            names: LanguageRegistry::get(),
            default_locale: default_locale.into(),
            supported_locales: supported_locales.into(),
        }
    }
}

impl<F, M, N> EmailFormHandler<F, M, N>
where
    F: FormFactory,
    M: EntityManager,
    N: LanguageNames,
{
    /// Replace the language-name lookup.
    pub fn with_language_names<L: LanguageNames>(self, names: L) -> EmailFormHandler<F, M, L> {
        EmailFormHandler {
            factory: self.factory,
            em: self.em,
            names,
            default_locale: self.default_locale,
            supported_locales: self.supported_locales,
        }
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn entity_manager(&self) -> &M {
        &self.em
    }

    /// The requested locale, or the default one when none was requested.
    pub fn resolve_locale(&self, requested: Option<&str>) -> String {
        match requested {
            Some(lang) if !lang.is_empty() => lang.to_string(),
            _ => self.default_locale.clone(),
        }
    }

    /// Supported locales from configuration, labelled with language names.
    pub fn supported_locale_choices(&self) -> SupportedLocaleChoices {
        SupportedLocaleChoices::parse(&self.supported_locales, &self.names)
    }

    /// Build the form for a new email (`email` is `None`) or for one
    /// translation of an existing email.
    ///
    /// New emails always start with a translation in the default locale.
    /// Editing a locale the email has no translation for yet starts an
    /// empty translation, added to the email when the form is saved.
    pub fn build_form(
        &self,
        email: Option<Email>,
        requested: Option<&str>,
    ) -> Result<PreparedForm<F::Form>, HandlerError> {
        let edit = email.is_some();
        let locale = self.resolve_locale(requested);

        let (email, translation) = match email {
            Some(email) => {
                let translation = email.translation_or_new(&locale);
                (email, translation)
            }
            None => {
                let email = Email::new();
                let mut translation = EmailTranslation::new(self.default_locale.as_str());
                translation.set_email(&email);
                (email, translation)
            }
        };

        let supported_locales = self.supported_locale_choices();
        if let Some(lang) = requested.filter(|lang| !lang.is_empty()) {
            if !supported_locales.contains(lang) {
                return Err(HandlerError::UnsupportedLocale {
                    locale: lang.to_string(),
                });
            }
        }

        debug!(
            "Building email form (edit: {}, locale: {}, email: {:?})",
            edit, locale, email.id
        );

        let options = FormOptions {
            data_translation: translation.clone(),
            edit,
            supported_locales,
        };
        let model = EntityTranslationModel::new(email, translation);
        let form = self.factory.create(FormKind::Email, model, options);

        Ok(PreparedForm { form, locale })
    }

    /// Bind the request and save the email when the submission is valid.
    ///
    /// Returns `Ok(false)` when the form was not submitted or is invalid; in
    /// that case nothing is staged. On success the form data holds the saved
    /// email, ids included.
    pub async fn process_form(
        &mut self,
        form: &mut F::Form,
        request: &FormRequest,
    ) -> Result<bool, HandlerError> {
        form.handle_request(request);

        if !(form.is_submitted() && form.is_valid()) {
            return Ok(false);
        }

        let model = form.data_mut();
        let translation = model.translation.clone();
        model.email.add_translation(translation);

        self.em.persist(model.email.clone());
        let flushed = self.em.flush().await?;

        if let Some(saved) = flushed.into_iter().next() {
            info!(
                "Saved email {:?} '{}' ({})",
                saved.id, saved.name, model.translation.lang
            );
            if let Some(translation) = saved.get_translation(&model.translation.lang) {
                model.translation = translation.clone();
            }
            model.email = saved;
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::form::{EmailFormFactory, FieldError, FormView};
    use crate::i18n::{MissingResourceError, UNSUPPORTED_LABEL};
    use crate::store::MemoryEntityManager;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // ==================== Test Doubles ====================

    /// Entity manager that counts calls and fails on demand
    #[derive(Default, Clone)]
    struct RecordingEntityManager {
        persisted: Arc<std::sync::Mutex<Vec<Email>>>,
        flushes: Arc<AtomicUsize>,
        fail_flush: bool,
    }

    impl RecordingEntityManager {
        fn persist_count(&self) -> usize {
            self.persisted.lock().unwrap().len()
        }

        fn flush_count(&self) -> usize {
            self.flushes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EntityManager for RecordingEntityManager {
        fn persist(&mut self, email: Email) {
            self.persisted.lock().unwrap().push(email);
        }

        async fn flush(&mut self) -> Result<Vec<Email>, StoreError> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            if self.fail_flush {
                return Err(StoreError::DuplicateName("welcome".to_string()));
            }
            let mut emails = self.persisted.lock().unwrap().clone();
            for email in &mut emails {
                if email.id.is_none() {
                    email.set_id(1);
                }
            }
            Ok(emails)
        }

        async fn find(&self, _id: i64) -> Result<Option<Email>, StoreError> {
            Ok(None)
        }
    }

    /// Form whose submitted/valid state is scripted by the test
    #[derive(Debug)]
    struct ScriptedForm {
        model: EntityTranslationModel,
        options: FormOptions,
        submitted: bool,
        valid: bool,
        handled: usize,
    }

    impl Form for ScriptedForm {
        fn handle_request(&mut self, _request: &FormRequest) {
            self.handled += 1;
        }
        fn is_submitted(&self) -> bool {
            self.submitted
        }
        fn is_valid(&self) -> bool {
            self.valid
        }
        fn data(&self) -> &EntityTranslationModel {
            &self.model
        }
        fn data_mut(&mut self) -> &mut EntityTranslationModel {
            &mut self.model
        }
        fn errors(&self) -> &[FieldError] {
            &[]
        }
        fn view(&self) -> FormView {
            unimplemented!("not rendered in handler tests")
        }
    }

    struct ScriptedFactory {
        submitted: bool,
        valid: bool,
    }

    impl FormFactory for ScriptedFactory {
        type Form = ScriptedForm;

        fn create(
            &self,
            _kind: FormKind,
            model: EntityTranslationModel,
            options: FormOptions,
        ) -> ScriptedForm {
            ScriptedForm {
                model,
                options,
                submitted: self.submitted,
                valid: self.valid,
                handled: 0,
            }
        }
    }

    struct FixedNames;

    impl LanguageNames for FixedNames {
        fn language_name(&self, alpha2: &str) -> Result<String, MissingResourceError> {
            match alpha2 {
                "en" => Ok("Anglais".to_string()),
                _ => Err(MissingResourceError(alpha2.to_string())),
            }
        }
    }

    // ==================== Helper Functions ====================

    fn handler(
        submitted: bool,
        valid: bool,
    ) -> (
        EmailFormHandler<ScriptedFactory, RecordingEntityManager>,
        RecordingEntityManager,
    ) {
        let em = RecordingEntityManager::default();
        let handler = EmailFormHandler::new(
            ScriptedFactory { submitted, valid },
            em.clone(),
            "en",
            "en,fr fr_CA",
        );
        (handler, em)
    }

    fn existing_email() -> Email {
        let mut email = Email::new();
        email.set_id(5);
        email.name = "welcome".to_string();
        for (lang, subject) in [("en", "Hello"), ("fr", "Bonjour")] {
            let mut t = EmailTranslation::new(lang);
            t.subject = subject.to_string();
            t.body = "Body".to_string();
            email.add_translation(t);
        }
        email
    }

    // ==================== resolve_locale Tests ====================

    #[test]
    fn test_resolve_locale_defaults() {
        for default in ["en", "fr", "de_DE"] {
            let handler = EmailFormHandler::new(
                EmailFormFactory,
                MemoryEntityManager::new(),
                default,
                "en",
            );
            assert_eq!(handler.resolve_locale(None), default);
            assert_eq!(handler.resolve_locale(Some("")), default);
        }
    }

    #[test]
    fn test_resolve_locale_returns_requested_unchanged() {
        let (handler, _) = handler(false, false);
        assert_eq!(handler.resolve_locale(Some("fr_CA")), "fr_CA");
        // Validation happens in build_form, not here
        assert_eq!(handler.resolve_locale(Some("zz")), "zz");
    }

    // ==================== supported_locale_choices Tests ====================

    #[test]
    fn test_supported_locale_choices() {
        let (handler, _) = handler(false, false);
        let choices = handler.supported_locale_choices();

        let codes: Vec<_> = choices.codes().collect();
        assert_eq!(codes, vec!["en", "fr", "fr_CA"]);
        for (label, code) in choices.labels() {
            assert!(label.ends_with(&format!("[{}]", code)));
        }
    }

    #[test]
    fn test_custom_language_names_with_fallback() {
        let (handler, _) = handler(false, false);
        let handler = handler.with_language_names(FixedNames);
        let labels: Vec<_> = handler
            .supported_locale_choices()
            .labels()
            .into_iter()
            .map(|(label, _)| label)
            .collect();

        assert_eq!(labels[0], "Anglais [en]");
        assert_eq!(labels[1], format!("{} [fr]", UNSUPPORTED_LABEL));
        assert_eq!(labels[2], "- unsupported - [fr_CA]");
    }

    // ==================== build_form Tests ====================

    #[test]
    fn test_build_new_form_uses_default_locale() {
        let (handler, _) = handler(false, false);
        let prepared = handler.build_form(None, None).expect("Should build");

        assert_eq!(prepared.locale(), "en");
        let form = prepared.into_form();
        assert!(!form.options.edit);
        assert!(form.model.email.id.is_none());
        assert!(form.model.email.translations().is_empty());
        assert_eq!(form.model.translation.lang, "en");
        assert_eq!(form.options.data_translation, form.model.translation);
        assert_eq!(form.options.supported_locales.len(), 3);
    }

    #[test]
    fn test_build_new_form_with_locale_still_starts_in_default() {
        let (handler, _) = handler(false, false);
        let prepared = handler.build_form(None, Some("fr")).expect("Should build");

        assert_eq!(prepared.locale(), "fr");
        assert_eq!(prepared.form.model.translation.lang, "en");
    }

    #[test]
    fn test_build_edit_form_binds_existing_translation() {
        let (handler, _) = handler(false, false);
        let prepared = handler
            .build_form(Some(existing_email()), Some("fr"))
            .expect("Should build");

        assert_eq!(prepared.locale(), "fr");
        let form = prepared.into_form();
        assert!(form.options.edit);
        assert_eq!(form.model.translation.subject, "Bonjour");
        assert_eq!(form.model.translation.email_id, Some(5));
        assert_eq!(form.model.email.translations().len(), 2);
    }

    #[test]
    fn test_build_edit_form_for_missing_translation() {
        let (handler, _) = handler(false, false);
        let prepared = handler
            .build_form(Some(existing_email()), Some("fr_CA"))
            .expect("Should build");

        let form = prepared.into_form();
        assert_eq!(form.model.translation.lang, "fr_CA");
        assert!(form.model.translation.subject.is_empty());
        assert_eq!(form.model.translation.email_id, Some(5));
        assert_eq!(form.model.email.translations().len(), 2);
    }

    #[test]
    fn test_build_form_rejects_unsupported_locale() {
        let (handler, _) = handler(false, false);

        let err = handler.build_form(None, Some("de")).unwrap_err();
        assert!(matches!(err, HandlerError::UnsupportedLocale { ref locale } if locale == "de"));

        let err = handler
            .build_form(Some(existing_email()), Some("French [fr]"))
            .unwrap_err();
        assert!(matches!(err, HandlerError::UnsupportedLocale { .. }));
    }

    #[test]
    fn test_build_form_accepts_every_supported_locale() {
        let (handler, _) = handler(false, false);
        for lang in ["en", "fr", "fr_CA"] {
            assert!(handler.build_form(None, Some(lang)).is_ok(), "{}", lang);
        }
    }

    #[test]
    fn test_default_locale_is_not_validated() {
        let handler = EmailFormHandler::new(
            EmailFormFactory,
            MemoryEntityManager::new(),
            "de",
            "en,fr",
        );
        let prepared = handler.build_form(None, None).expect("Should build");
        assert_eq!(prepared.locale(), "de");
    }

    // ==================== process_form Tests ====================

    #[tokio::test]
    async fn test_process_valid_submission_persists_once() {
        let (mut handler, em) = handler(true, true);
        let mut form = handler.build_form(None, None).expect("build").into_form();

        let saved = handler
            .process_form(&mut form, &FormRequest::get())
            .await
            .expect("Should process");

        assert!(saved);
        assert_eq!(form.handled, 1);
        assert_eq!(em.persist_count(), 1);
        assert_eq!(em.flush_count(), 1);

        let persisted = em.persisted.lock().unwrap()[0].clone();
        assert_eq!(persisted.locales(), vec!["en"]);
        assert_eq!(form.model.email.id, Some(1));
        assert_eq!(form.model.email.translations().len(), 1);
    }

    #[tokio::test]
    async fn test_process_invalid_submission_does_not_persist() {
        let (mut handler, em) = handler(true, false);
        let mut form = handler.build_form(None, None).expect("build").into_form();

        let saved = handler
            .process_form(&mut form, &FormRequest::get())
            .await
            .expect("Should process");

        assert!(!saved);
        assert_eq!(em.persist_count(), 0);
        assert_eq!(em.flush_count(), 0);
    }

    #[tokio::test]
    async fn test_process_unsubmitted_form_does_nothing() {
        let (mut handler, em) = handler(false, true);
        let mut form = handler.build_form(None, None).expect("build").into_form();

        let saved = handler
            .process_form(&mut form, &FormRequest::get())
            .await
            .expect("Should process");

        assert!(!saved);
        assert!(form.model.email.translations().is_empty());
        assert_eq!(em.persist_count(), 0);
        assert_eq!(em.flush_count(), 0);
    }

    #[tokio::test]
    async fn test_process_adds_new_translation_to_existing_email() {
        let (mut handler, em) = handler(true, true);
        let mut form = handler
            .build_form(Some(existing_email()), Some("fr_CA"))
            .expect("build")
            .into_form();
        form.model.translation.subject = "Bonjour du Canada".to_string();

        assert!(handler
            .process_form(&mut form, &FormRequest::get())
            .await
            .expect("process"));

        let persisted = em.persisted.lock().unwrap()[0].clone();
        assert_eq!(persisted.locales(), vec!["en", "fr", "fr_CA"]);
        assert_eq!(
            persisted.get_translation("fr_CA").unwrap().subject,
            "Bonjour du Canada"
        );
    }

    #[tokio::test]
    async fn test_process_persistence_failure_propagates() {
        let em = RecordingEntityManager {
            fail_flush: true,
            ..Default::default()
        };
        let mut handler = EmailFormHandler::new(
            ScriptedFactory {
                submitted: true,
                valid: true,
            },
            em.clone(),
            "en",
            "en",
        );
        let mut form = handler.build_form(None, None).expect("build").into_form();

        let err = handler
            .process_form(&mut form, &FormRequest::get())
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Persistence(StoreError::DuplicateName(_))));
        assert_eq!(em.flush_count(), 1);
    }

    // ==================== End-to-end with the real form ====================

    #[tokio::test]
    async fn test_email_form_roundtrip_through_memory_store() {
        let mut handler =
            EmailFormHandler::new(EmailFormFactory, MemoryEntityManager::new(), "en", "en fr");

        let mut form = handler.build_form(None, None).expect("build").into_form();
        let request = FormRequest::post([
            ("name", "welcome"),
            ("subject", "Welcome"),
            ("body", "<p>Hi</p>"),
        ]);
        assert!(handler.process_form(&mut form, &request).await.expect("process"));
        let id = form.data().email.id.expect("Should be saved");

        let stored = handler
            .entity_manager()
            .find(id)
            .await
            .expect("find")
            .expect("Should exist");
        let mut form = handler
            .build_form(Some(stored), Some("fr"))
            .expect("build")
            .into_form();
        let request = FormRequest::post([("subject", "Bienvenue"), ("body", "<p>Salut</p>")]);
        assert!(handler.process_form(&mut form, &request).await.expect("process"));

        let stored = handler
            .entity_manager()
            .find(id)
            .await
            .expect("find")
            .expect("Should exist");
        assert_eq!(stored.locales(), vec!["en", "fr"]);
        assert_eq!(stored.get_translation("fr").unwrap().subject, "Bienvenue");
    }

    #[tokio::test]
    async fn test_changing_lang_on_edit_keeps_translation_ids_unique() {
        let mut handler =
            EmailFormHandler::new(EmailFormFactory, MemoryEntityManager::new(), "en", "en fr");

        let mut form = handler.build_form(None, None).expect("build").into_form();
        let request = FormRequest::post([("name", "w"), ("subject", "Hello"), ("body", "Body")]);
        assert!(handler.process_form(&mut form, &request).await.expect("process"));
        let id = form.data().email.id.expect("Should be saved");

        let stored = handler.entity_manager().find(id).await.expect("find").expect("exists");
        let mut form = handler
            .build_form(Some(stored), Some("fr"))
            .expect("build")
            .into_form();
        let request = FormRequest::post([("subject", "Bonjour"), ("body", "Corps")]);
        assert!(handler.process_form(&mut form, &request).await.expect("process"));

        let stored = handler.entity_manager().find(id).await.expect("find").expect("exists");
        let en_id = stored.get_translation("en").unwrap().id;
        let fr_id = stored.get_translation("fr").unwrap().id;

        // Edit fr but post it under en
        let mut form = handler
            .build_form(Some(stored), Some("fr"))
            .expect("build")
            .into_form();
        let request =
            FormRequest::post([("lang", "en"), ("subject", "Moved"), ("body", "Body")]);
        assert!(handler.process_form(&mut form, &request).await.expect("process"));

        let stored = handler.entity_manager().find(id).await.expect("find").expect("exists");
        let en = stored.get_translation("en").unwrap();
        let fr = stored.get_translation("fr").unwrap();
        assert_eq!(en.id, en_id);
        assert_eq!(en.subject, "Moved");
        assert_eq!(fr.id, fr_id);
        assert_eq!(fr.subject, "Bonjour");

        let mut ids: Vec<_> = stored.translations().iter().map(|t| t.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), stored.translations().len());
    }
}
