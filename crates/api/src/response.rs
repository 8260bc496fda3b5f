//! API response types.

#![allow(missing_docs)]

use chrono::{DateTime, FixedOffset};
use formkit_core::PublicUser;
use formkit_db::{
    entities::{
        form,
        question::{self, QuestionType},
        user::Role,
    },
    repositories::FormWithQuestions,
};
use serde::Serialize;
use serde_json::Value;

/// User as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<PublicUser> for UserResponse {
    fn from(user: PublicUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Question as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub id: String,
    pub form_id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub order: i32,
    pub required: bool,
    pub options: Option<Value>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<question::Model> for QuestionResponse {
    fn from(q: question::Model) -> Self {
        Self {
            id: q.id,
            form_id: q.form_id,
            text: q.text,
            question_type: q.question_type,
            order: q.order,
            required: q.required,
            options: q.options,
            created_at: q.created_at,
            updated_at: q.updated_at,
        }
    }
}

/// Form as returned to clients. `questions` is present on reads that load them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub user_id: String,
    pub is_active: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<QuestionResponse>>,
}

impl From<form::Model> for FormResponse {
    fn from(f: form::Model) -> Self {
        Self {
            id: f.id,
            title: f.title,
            description: f.description,
            user_id: f.user_id,
            is_active: f.is_active,
            created_at: f.created_at,
            updated_at: f.updated_at,
            questions: None,
        }
    }
}

impl From<FormWithQuestions> for FormResponse {
    fn from(loaded: FormWithQuestions) -> Self {
        Self {
            questions: Some(loaded.questions.into_iter().map(Into::into).collect()),
            ..loaded.form.into()
        }
    }
}
