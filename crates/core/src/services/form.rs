//! Form service.

use std::sync::Arc;

use chrono::Utc;
use formkit_common::{AppError, AppResult, IdGenerator};
use formkit_db::{
    entities::form,
    repositories::{FormRepository, FormWithQuestions},
};
use sea_orm::{DatabaseConnection, Set};

/// Input for creating a form.
#[derive(Debug, Clone)]
pub struct CreateFormInput {
    pub title: String,
    pub description: Option<String>,
}

/// Partial form update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateFormInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Service for managing forms.
#[derive(Clone)]
pub struct FormService {
    form_repo: FormRepository,
    id_gen: IdGenerator,
}

impl FormService {
    /// Create a new form service.
    #[must_use]
    pub const fn new(form_repo: FormRepository) -> Self {
        Self {
            form_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a service over a shared connection.
    #[must_use]
    pub fn from_connection(db: Arc<DatabaseConnection>) -> Self {
        Self::new(FormRepository::new(db))
    }

    /// All forms of a user, newest first, each with ordered questions.
    pub async fn get_user_forms(&self, user_id: &str) -> AppResult<Vec<FormWithQuestions>> {
        self.form_repo.find_by_user(user_id).await
    }

    /// Create a new form owned by `user_id`.
    pub async fn create_form(
        &self,
        user_id: &str,
        input: CreateFormInput,
    ) -> AppResult<form::Model> {
        let now = Utc::now().into();
        let model = form::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(input.title),
            description: Set(input.description),
            user_id: Set(user_id.to_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let form = self.form_repo.create(model).await?;
        tracing::debug!(form_id = %form.id, user_id = %user_id, "Form created");
        Ok(form)
    }

    /// Get a form with its questions. Does not check ownership.
    pub async fn get_form_by_id(&self, id: &str) -> AppResult<FormWithQuestions> {
        self.form_repo
            .find_by_id_with_questions(id)
            .await?
            .ok_or_else(|| form_not_found(id))
    }

    /// Resolve a form and require that `requester_id` owns it.
    ///
    /// Fails with `NotFound` before `Forbidden`.
    pub async fn authorize(&self, id: &str, requester_id: &str) -> AppResult<form::Model> {
        let form = self
            .form_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| form_not_found(id))?;

        ensure_owner(&form, requester_id)?;
        Ok(form)
    }

    /// Get a form with its questions, owner only.
    pub async fn get_owned_form(
        &self,
        id: &str,
        requester_id: &str,
    ) -> AppResult<FormWithQuestions> {
        let found = self.get_form_by_id(id).await?;
        ensure_owner(&found.form, requester_id)?;
        Ok(found)
    }

    /// Update a form, owner only.
    pub async fn update_form(
        &self,
        id: &str,
        requester_id: &str,
        input: UpdateFormInput,
    ) -> AppResult<form::Model> {
        let form = self.authorize(id, requester_id).await?;

        let mut active: form::ActiveModel = form.into();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now().into());

        self.form_repo.update(active).await
    }

    /// Delete a form and its questions, owner only.
    pub async fn delete_form(&self, id: &str, requester_id: &str) -> AppResult<()> {
        self.authorize(id, requester_id).await?;
        self.form_repo.delete(id).await?;
        tracing::debug!(form_id = %id, "Form deleted");
        Ok(())
    }
}

fn form_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Form with ID {id} not found"))
}

fn ensure_owner(form: &form::Model, requester_id: &str) -> AppResult<()> {
    if form.user_id != requester_id {
        return Err(AppError::Forbidden(
            "You do not have access to this form".to_string(),
        ));
    }
    Ok(())
}
