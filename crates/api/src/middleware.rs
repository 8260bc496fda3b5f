//! Shared application state.

#![allow(missing_docs)]

use std::sync::Arc;

use formkit_common::Config;
use formkit_core::{AuthService, FormService, QuestionService, TokenCodec};
use formkit_db::repositories::{FormRepository, QuestionRepository, UserRepository};
use sea_orm::DatabaseConnection;

/// Attributes of the session cookie.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    /// Cookie name.
    pub name: String,
    /// Whether to mark the cookie `Secure`.
    pub secure: bool,
    /// Lifetime in seconds; matches the token lifetime.
    pub max_age_secs: i64,
}

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub form_service: FormService,
    pub question_service: QuestionService,
    pub tokens: TokenCodec,
    pub cookies: CookieSettings,
}

impl AppState {
    /// Wire repositories and services over one connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, config: &Config) -> Self {
        let tokens = TokenCodec::from_config(&config.auth);

        let user_repo = UserRepository::new(Arc::clone(&db));
        let form_repo = FormRepository::new(Arc::clone(&db));
        let question_repo = QuestionRepository::new(db);

        let form_service = FormService::new(form_repo);
        let question_service = QuestionService::new(form_service.clone(), question_repo);
        let auth_service = AuthService::new(user_repo, tokens.clone());

        Self {
            auth_service,
            form_service,
            question_service,
            cookies: CookieSettings {
                name: config.auth.cookie_name.clone(),
                secure: config.secure_cookies(),
                max_age_secs: tokens.ttl_secs(),
            },
            tokens,
        }
    }
}
