//! Localized editor for email templates.
//!
//! An `Email` owns one `EmailTranslation` per locale. `EmailFormHandler`
//! builds the edit form for one translation, validates submissions, and
//! saves the email through an `EntityManager` unit of work.

pub mod config;
pub mod entity;
pub mod error;
pub mod form;
pub mod handler;
pub mod i18n;
pub mod security;
pub mod store;
pub mod web;
