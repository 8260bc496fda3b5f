//! Form endpoints. Every route is restricted to the form's owner.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use formkit_common::AppResult;
use formkit_core::{CreateFormInput, UpdateFormInput};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::{
    extractors::{AuthUser, FieldOrder, ValidatedJson},
    middleware::AppState,
    response::FormResponse,
};

/// Create form request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "Title is required"),
        custom(function = "title_within_limit")
    )]
    pub title: String,

    pub description: Option<String>,
}

impl FieldOrder for CreateFormRequest {
    const FIELD_ORDER: &'static [&'static str] = &["title", "description"];
}

/// Partial form update.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFormRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,

    pub is_active: Option<bool>,
}

impl FieldOrder for UpdateFormRequest {
    const FIELD_ORDER: &'static [&'static str] = &["title", "description", "is_active"];
}

fn title_within_limit(title: &str) -> Result<(), ValidationError> {
    if title.chars().count() <= 200 {
        Ok(())
    } else {
        Err(ValidationError::new("length").with_message("Title must be at most 200 characters".into()))
    }
}

/// List the caller's forms, newest first.
async fn list_forms(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<FormResponse>>> {
    let forms = state.form_service.get_user_forms(&identity.id).await?;
    Ok(Json(forms.into_iter().map(Into::into).collect()))
}

/// Create a form owned by the caller.
async fn create_form(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateFormRequest>,
) -> AppResult<(StatusCode, Json<FormResponse>)> {
    let form = state
        .form_service
        .create_form(
            &identity.id,
            CreateFormInput {
                title: req.title,
                description: req.description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(form.into())))
}

/// Get a form with its questions.
async fn get_form(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
) -> AppResult<Json<FormResponse>> {
    let form = state
        .form_service
        .get_owned_form(&form_id, &identity.id)
        .await?;
    Ok(Json(form.into()))
}

async fn update_form(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateFormRequest>,
) -> AppResult<Json<FormResponse>> {
    let form = state
        .form_service
        .update_form(
            &form_id,
            &identity.id,
            UpdateFormInput {
                title: req.title,
                description: req.description,
                is_active: req.is_active,
            },
        )
        .await?;

    Ok(Json(form.into()))
}

/// Delete a form and, by cascade, its questions.
async fn delete_form(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
) -> AppResult<StatusCode> {
    state.form_service.delete_form(&form_id, &identity.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_forms).post(create_form))
        .route(
            "/{form_id}",
            get(get_form).put(update_form).delete(delete_form),
        )
}
