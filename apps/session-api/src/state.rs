//! Shared application state passed to every handler.

use axum_helpers::CookieSettings;
use core_config::Environment;
use domain_sessions::{SessionEngine, SessionStore};
use std::sync::Arc;

/// Cloned per request; everything inside is behind an `Arc`.
pub struct AppState<S: SessionStore> {
    pub engine: SessionEngine<S>,
    pub cookies: Arc<CookieSettings>,
}

impl<S: SessionStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            cookies: Arc::clone(&self.cookies),
        }
    }
}

impl<S: SessionStore> AppState<S> {
    pub fn new(engine: SessionEngine<S>, environment: &Environment) -> Self {
        Self {
            engine,
            cookies: Arc::new(CookieSettings::for_environment(environment)),
        }
    }
}
