//! Request extractors.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use axum_extra::{
    extract::CookieJar,
    headers::{Authorization, HeaderMapExt, authorization::Bearer},
};
use formkit_common::{AppError, first_validation_message};
use formkit_core::Identity;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::middleware::AppState;

/// Authenticated caller.
///
/// Accepts an `Authorization: Bearer` header or the session cookie, whichever
/// verifies; the header is tried first. Put it first in a handler's argument
/// list so a missing or bad credential is rejected before the body is read.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let from_header = parts
            .headers
            .typed_get::<Authorization<Bearer>>()
            .map(|header| header.token().to_string());
        let from_cookie = CookieJar::from_headers(&parts.headers)
            .get(&state.cookies.name)
            .map(|cookie| cookie.value().to_string());

        let mut first_err = None;
        for token in [from_header, from_cookie].into_iter().flatten() {
            if token.is_empty() {
                continue;
            }
            match state.tokens.verify(&token) {
                Ok(identity) => return Ok(Self(identity)),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }

        Err(first_err
            .unwrap_or_else(|| AppError::Unauthorized("No authentication token provided".to_string())))
    }
}

/// Field order used to pick which validation message is reported.
pub trait FieldOrder {
    /// Field names in declaration order.
    const FIELD_ORDER: &'static [&'static str];
}

/// JSON body that has passed `validator` checks.
///
/// Malformed JSON and failed validation are both `400 Bad Request`; the message
/// is that of the first failing field in [`FieldOrder::FIELD_ORDER`].
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + FieldOrder,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

        value.validate().map_err(|errors| {
            AppError::Validation(first_validation_message(&errors, T::FIELD_ORDER))
        })?;

        Ok(Self(value))
    }
}
