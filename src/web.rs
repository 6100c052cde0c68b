//! HTTP surface of the email editor.
//!
//! Every request builds its own `EmailFormHandler` and unit of work from the
//! shared `AppState`.

use crate::config::Config;
use crate::entity::Email;
use crate::error::{HandlerError, StoreError};
use crate::form::{
    locale_options, EmailForm, EmailFormFactory, Form, FormMethod, FormRequest, FormView,
    LocaleOption,
};
use crate::handler::EmailFormHandler;
use crate::security::{is_authorized, API_KEY_HEADER};
use crate::store::{Database, EntityManager, MemoryEntityManager};
use axum::extract::{Form as FormBody, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Form handler as used by the web layer
pub type WebFormHandler = EmailFormHandler<EmailFormFactory, Box<dyn EntityManager>>;

/// Where emails are stored
#[derive(Clone)]
pub enum Store {
    Postgres(Database),
    Memory(MemoryEntityManager),
}

impl Store {
    /// A new unit of work for one request
    pub fn entity_manager(&self) -> Box<dyn EntityManager> {
        match self {
            Store::Postgres(db) => Box::new(db.entity_manager()),
            // Clones share storage; the shared instance itself never stages anything
            Store::Memory(em) => Box::new(em.clone()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Store,
}

impl AppState {
    pub fn new(config: Config, store: Store) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    pub fn form_handler(&self) -> WebFormHandler {
        EmailFormHandler::new(
            EmailFormFactory,
            self.store.entity_manager(),
            self.config.default_locale.as_str(),
            self.config.supported_locales.as_str(),
        )
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let provided = headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());
        if is_authorized(self.config.api_key.as_deref(), provided) {
            Ok(())
        } else {
            warn!("Rejected editor request with missing or invalid API key");
            Err(AppError::Unauthorized)
        }
    }
}

/// Errors returned by the HTTP handlers
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Email {0} not found")]
    NotFound(i64),

    #[error("Missing or invalid API key")]
    Unauthorized,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Handler(HandlerError::UnsupportedLocale { .. }) => StatusCode::BAD_REQUEST,
            AppError::Handler(HandlerError::Persistence(err)) | AppError::Store(err) => {
                store_status(err)
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::DuplicateName(_) => StatusCode::CONFLICT,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// `?lang=` query parameter
#[derive(Debug, Default, Deserialize)]
pub struct LocaleQuery {
    pub lang: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/locales", get(locales))
        .route("/emails/new", get(new_email_form).post(create_email))
        .route("/emails/:id/edit", get(edit_email_form).post(update_email))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health() -> &'static str {
    "OK"
}

pub async fn locales(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<LocaleOption>>, AppError> {
    state.authorize(&headers)?;
    let handler = state.form_handler();
    Ok(Json(locale_options(&handler.supported_locale_choices())))
}

pub async fn new_email_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LocaleQuery>,
) -> Result<Json<FormView>, AppError> {
    state.authorize(&headers)?;
    let handler = state.form_handler();
    let prepared = handler.build_form(None, query.lang.as_deref())?;
    Ok(Json(prepared.form.view()))
}

pub async fn create_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LocaleQuery>,
    FormBody(fields): FormBody<HashMap<String, String>>,
) -> Result<Response, AppError> {
    state.authorize(&headers)?;
    let handler = state.form_handler();
    let form = handler.build_form(None, query.lang.as_deref())?.into_form();
    submit(handler, form, fields, StatusCode::CREATED).await
}

pub async fn edit_email_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<LocaleQuery>,
) -> Result<Json<FormView>, AppError> {
    state.authorize(&headers)?;
    let handler = state.form_handler();
    let email = load_email(&handler, id).await?;
    let prepared = handler.build_form(Some(email), query.lang.as_deref())?;
    Ok(Json(prepared.form.view()))
}

pub async fn update_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<LocaleQuery>,
    FormBody(fields): FormBody<HashMap<String, String>>,
) -> Result<Response, AppError> {
    state.authorize(&headers)?;
    let handler = state.form_handler();
    let email = load_email(&handler, id).await?;
    let form = handler
        .build_form(Some(email), query.lang.as_deref())?
        .into_form();
    submit(handler, form, fields, StatusCode::OK).await
}

async fn load_email(handler: &WebFormHandler, id: i64) -> Result<Email, AppError> {
    handler
        .entity_manager()
        .find(id)
        .await?
        .ok_or(AppError::NotFound(id))
}

/// Process a posted form: the saved email on success, the form with its
/// errors otherwise.
async fn submit(
    mut handler: WebFormHandler,
    mut form: EmailForm,
    fields: HashMap<String, String>,
    success: StatusCode,
) -> Result<Response, AppError> {
    let request = FormRequest {
        method: FormMethod::Post,
        fields,
    };

    if handler.process_form(&mut form, &request).await? {
        Ok((success, Json(form.data().email.clone())).into_response())
    } else {
        Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(form.view())).into_response())
    }
}
