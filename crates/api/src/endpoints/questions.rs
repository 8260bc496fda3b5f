//! Question endpoints, nested under `/forms/{form_id}/questions`.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
};
use formkit_common::{AppResult, is_uuid};
use formkit_core::{CreateQuestionInput, QuestionOptions, UpdateQuestionInput};
use formkit_db::{entities::question::QuestionType, repositories::OrderUpdate};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{
    extractors::{AuthUser, FieldOrder, ValidatedJson},
    middleware::AppState,
    response::QuestionResponse,
};

/// Create question request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "Question text is required"),
        custom(function = "text_within_limit")
    )]
    pub text: String,

    #[serde(rename = "type")]
    pub question_type: QuestionType,

    #[serde(default)]
    pub required: bool,

    #[validate(nested)]
    pub options: Option<QuestionOptions>,
}

impl FieldOrder for CreateQuestionRequest {
    const FIELD_ORDER: &'static [&'static str] = &["text", "question_type", "required", "options"];
}

/// Partial question update.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 500, message = "Question text must be 1 to 500 characters"))]
    pub text: Option<String>,

    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,

    pub required: Option<bool>,

    #[validate(nested)]
    pub options: Option<QuestionOptions>,
}

impl FieldOrder for UpdateQuestionRequest {
    const FIELD_ORDER: &'static [&'static str] = &["text", "question_type", "required", "options"];
}

/// One entry of a reorder request.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct OrderItem {
    #[validate(custom(function = "uuid_id"))]
    pub id: String,

    #[validate(range(min = 0, message = "Order must be a non-negative integer"))]
    pub order: i32,
}

/// Bulk reorder request.
#[derive(Debug, Deserialize, Validate)]
pub struct ReorderRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "At least one question is required"),
        nested
    )]
    pub questions: Vec<OrderItem>,
}

impl FieldOrder for ReorderRequest {
    const FIELD_ORDER: &'static [&'static str] = &["questions"];
}

const MAX_TEXT_CHARS: usize = 500;

fn text_within_limit(text: &str) -> Result<(), ValidationError> {
    if text.chars().count() <= MAX_TEXT_CHARS {
        Ok(())
    } else {
        Err(ValidationError::new("length")
            .with_message("Question text must be at most 500 characters".into()))
    }
}

fn uuid_id(id: &str) -> Result<(), ValidationError> {
    if is_uuid(id) {
        Ok(())
    } else {
        Err(ValidationError::new("uuid").with_message("Question ID must be a valid UUID".into()))
    }
}

async fn list_questions(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
) -> AppResult<Json<Vec<QuestionResponse>>> {
    let questions = state
        .question_service
        .get_form_questions(&form_id, &identity.id)
        .await?;
    Ok(Json(questions.into_iter().map(Into::into).collect()))
}

/// Append a question to the form.
async fn create_question(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    ValidatedJson(req): ValidatedJson<CreateQuestionRequest>,
) -> AppResult<(StatusCode, Json<QuestionResponse>)> {
    let question = state
        .question_service
        .create_question(
            &form_id,
            &identity.id,
            CreateQuestionInput {
                text: req.text,
                question_type: req.question_type,
                required: req.required,
                options: req.options,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(question.into())))
}

async fn get_question(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path((form_id, question_id)): Path<(String, String)>,
) -> AppResult<Json<QuestionResponse>> {
    let question = state
        .question_service
        .get_question_by_id(&form_id, &question_id, &identity.id)
        .await?;
    Ok(Json(question.into()))
}

async fn update_question(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path((form_id, question_id)): Path<(String, String)>,
    ValidatedJson(req): ValidatedJson<UpdateQuestionRequest>,
) -> AppResult<Json<QuestionResponse>> {
    let question = state
        .question_service
        .update_question(
            &form_id,
            &question_id,
            &identity.id,
            UpdateQuestionInput {
                text: req.text,
                question_type: req.question_type,
                required: req.required,
                options: req.options,
            },
        )
        .await?;

    Ok(Json(question.into()))
}

/// Delete a question. Other questions keep their order values.
async fn delete_question(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path((form_id, question_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    state
        .question_service
        .delete_question(&form_id, &question_id, &identity.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Apply new order values in one transaction and return the reordered list.
async fn reorder_questions(
    AuthUser(identity): AuthUser,
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    ValidatedJson(req): ValidatedJson<ReorderRequest>,
) -> AppResult<Json<Vec<QuestionResponse>>> {
    let updates = req
        .questions
        .into_iter()
        .map(|item| OrderUpdate {
            id: item.id,
            order: item.order,
        })
        .collect();

    let questions = state
        .question_service
        .reorder_questions(&form_id, &identity.id, updates)
        .await?;
    Ok(Json(questions.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_questions).post(create_question))
        .route("/reorder", patch(reorder_questions))
        .route(
            "/{question_id}",
            get(get_question)
                .put(update_question)
                .delete(delete_question),
        )
}
