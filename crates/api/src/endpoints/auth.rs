//! Authentication endpoints.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use formkit_common::{AppError, AppResult};
use formkit_core::{AuthSession, LoginInput, RegisterInput};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    extractors::{AuthUser, FieldOrder, ValidatedJson},
    middleware::{AppState, CookieSettings},
    response::UserResponse,
};

/// Registration request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
}

impl FieldOrder for RegisterRequest {
    const FIELD_ORDER: &'static [&'static str] = &["email", "password", "name"];
}

/// Login request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl FieldOrder for LoginRequest {
    const FIELD_ORDER: &'static [&'static str] = &["email", "password"];
}

/// Body of register and login responses. The token travels in the cookie only.
#[derive(Serialize)]
pub struct SessionResponse {
    pub user: UserResponse,
}

fn session_cookie(settings: &CookieSettings, token: String) -> Cookie<'static> {
    Cookie::build((settings.name.clone(), token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(settings.secure)
        .max_age(time::Duration::seconds(settings.max_age_secs))
        .build()
}

fn start_session(
    state: &AppState,
    jar: CookieJar,
    session: AuthSession,
) -> (CookieJar, Json<SessionResponse>) {
    let jar = jar.add(session_cookie(&state.cookies, session.token));
    (
        jar,
        Json(SessionResponse {
            user: session.user.into(),
        }),
    )
}

/// Create an account and start a session.
async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let session = state
        .auth_service
        .register(RegisterInput {
            email: req.email,
            password: req.password,
            name: req.name,
        })
        .await?;

    let (jar, body) = start_session(&state, jar, session);
    Ok((StatusCode::CREATED, jar, body))
}

/// Sign in with email and password.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let session = state
        .auth_service
        .login(LoginInput {
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(start_session(&state, jar, session))
}

/// The signed-in user.
async fn me(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .auth_service
        .find_by_id(&identity.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    Ok(Json(user.into()))
}

/// End the session by expiring the cookie.
async fn logout(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> (StatusCode, CookieJar) {
    tracing::debug!(user_id = %identity.id, "Logged out");
    let jar = jar.remove(Cookie::build(state.cookies.name.clone()).path("/"));
    (StatusCode::NO_CONTENT, jar)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
}
