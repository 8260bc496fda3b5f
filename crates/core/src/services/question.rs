//! Question service.
//!
//! Every public operation resolves the parent form through
//! [`FormService::authorize`] before reading or writing question rows, so a
//! missing form is `NotFound` and a foreign form is `Forbidden` regardless of
//! what the question ids refer to.

use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use formkit_common::{AppError, AppResult, IdGenerator};
use formkit_db::{
    entities::question::{self, QuestionType},
    repositories::{FormRepository, OrderUpdate, QuestionRepository},
};
use sea_orm::{DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

use super::form::FormService;

const CHOICES_REQUIRED: &str = "RADIO, CHECKBOX, and SELECT questions require at least 2 choices";

/// Question options. Unknown keys (placeholder, min, max, ...) are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct QuestionOptions {
    #[validate(
        length(min = 2, message = "At least 2 choices required"),
        custom(function = "non_empty_choices")
    )]
    pub choices: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn non_empty_choices(choices: &[String]) -> Result<(), ValidationError> {
    if choices.iter().any(String::is_empty) {
        return Err(ValidationError::new("choice_empty").with_message("Choices cannot be empty".into()));
    }
    Ok(())
}

impl QuestionOptions {
    fn to_json(&self) -> AppResult<Value> {
        serde_json::to_value(self)
            .map_err(|e| AppError::Internal(format!("Failed to encode options: {e}")))
    }

    fn from_json(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Input for creating a question.
#[derive(Debug, Clone)]
pub struct CreateQuestionInput {
    pub text: String,
    pub question_type: QuestionType,
    pub required: bool,
    pub options: Option<QuestionOptions>,
}

/// Partial question update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateQuestionInput {
    pub text: Option<String>,
    pub question_type: Option<QuestionType>,
    pub required: Option<bool>,
    pub options: Option<QuestionOptions>,
}

/// Service for managing the ordered questions of a form.
#[derive(Clone)]
pub struct QuestionService {
    forms: FormService,
    question_repo: QuestionRepository,
    id_gen: IdGenerator,
}

impl QuestionService {
    /// Create a new question service.
    #[must_use]
    pub const fn new(forms: FormService, question_repo: QuestionRepository) -> Self {
        Self {
            forms,
            question_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a service over a shared connection.
    #[must_use]
    pub fn from_connection(db: Arc<DatabaseConnection>) -> Self {
        Self::new(
            FormService::new(FormRepository::new(Arc::clone(&db))),
            QuestionRepository::new(db),
        )
    }

    /// All questions of a form, ascending by order.
    pub async fn get_form_questions(
        &self,
        form_id: &str,
        user_id: &str,
    ) -> AppResult<Vec<question::Model>> {
        self.forms.authorize(form_id, user_id).await?;
        self.question_repo.find_by_form_id(form_id).await
    }

    /// A single question of a form.
    pub async fn get_question_by_id(
        &self,
        form_id: &str,
        question_id: &str,
        user_id: &str,
    ) -> AppResult<question::Model> {
        self.forms.authorize(form_id, user_id).await?;

        let question = self
            .question_repo
            .find_by_id(question_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Question with ID {question_id} not found"))
            })?;

        if question.form_id != form_id {
            return Err(AppError::BadRequest(
                "Question does not belong to this form".to_string(),
            ));
        }

        Ok(question)
    }

    /// Append a question to the end of a form.
    pub async fn create_question(
        &self,
        form_id: &str,
        user_id: &str,
        input: CreateQuestionInput,
    ) -> AppResult<question::Model> {
        self.forms.authorize(form_id, user_id).await?;
        check_choices(input.question_type, input.options.as_ref())?;

        let options = input.options.as_ref().map(QuestionOptions::to_json).transpose()?;
        let order = self.question_repo.next_order(form_id).await?;
        let now = Utc::now().into();

        let model = question::ActiveModel {
            id: Set(self.id_gen.generate()),
            form_id: Set(form_id.to_string()),
            text: Set(input.text),
            question_type: Set(input.question_type),
            order: Set(order),
            required: Set(input.required),
            options: Set(options),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let question = self.question_repo.create(model).await?;
        tracing::debug!(form_id = %form_id, question_id = %question.id, order, "Question created");
        Ok(question)
    }

    /// Update a question in place. Its form and order are unchanged.
    pub async fn update_question(
        &self,
        form_id: &str,
        question_id: &str,
        user_id: &str,
        input: UpdateQuestionInput,
    ) -> AppResult<question::Model> {
        let existing = self.get_question_by_id(form_id, question_id, user_id).await?;

        let resulting_type = input.question_type.unwrap_or(existing.question_type);
        let resulting_options = match (&input.options, &existing.options) {
            (Some(options), _) => Some(options.clone()),
            (None, Some(stored)) => QuestionOptions::from_json(stored),
            (None, None) => None,
        };
        check_choices(resulting_type, resulting_options.as_ref())?;

        let mut active: question::ActiveModel = existing.into();
        if let Some(text) = input.text {
            active.text = Set(text);
        }
        if let Some(question_type) = input.question_type {
            active.question_type = Set(question_type);
        }
        if let Some(required) = input.required {
            active.required = Set(required);
        }
        if let Some(options) = &input.options {
            active.options = Set(Some(options.to_json()?));
        }
        active.updated_at = Set(Utc::now().into());

        self.question_repo.update(active).await
    }

    /// Delete a question. Remaining questions keep their order values.
    pub async fn delete_question(
        &self,
        form_id: &str,
        question_id: &str,
        user_id: &str,
    ) -> AppResult<()> {
        self.get_question_by_id(form_id, question_id, user_id).await?;
        self.question_repo.delete(question_id).await
    }

    /// Assign new order values atomically and return the form's questions.
    ///
    /// Questions not named keep their order. Every named id must belong to
    /// the form and appear once.
    pub async fn reorder_questions(
        &self,
        form_id: &str,
        user_id: &str,
        updates: Vec<OrderUpdate>,
    ) -> AppResult<Vec<question::Model>> {
        self.forms.authorize(form_id, user_id).await?;

        let current = self.question_repo.find_by_form_id(form_id).await?;
        let members: HashSet<&str> = current.iter().map(|q| q.id.as_str()).collect();
        let mut seen = HashSet::with_capacity(updates.len());

        for update in &updates {
            if !members.contains(update.id.as_str()) {
                return Err(AppError::BadRequest(format!(
                    "Question with ID {} does not belong to this form",
                    update.id
                )));
            }
            if !seen.insert(update.id.as_str()) {
                return Err(AppError::BadRequest(format!(
                    "Question with ID {} appears more than once",
                    update.id
                )));
            }
            if update.order < 0 {
                return Err(AppError::BadRequest(
                    "Order must be a non-negative integer".to_string(),
                ));
            }
        }

        self.question_repo.update_orders(form_id, &updates).await?;
        self.question_repo.find_by_form_id(form_id).await
    }
}

/// Choice-typed questions need at least two choices; options on other types are free-form.
fn check_choices(question_type: QuestionType, options: Option<&QuestionOptions>) -> AppResult<()> {
    if let Some(options) = options {
        options.validate()?;
    }

    if question_type.requires_choices() && options.is_none_or(|o| o.choices.len() < 2) {
        return Err(AppError::Validation(CHOICES_REQUIRED.to_string()));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use formkit_db::entities::form;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::json;

    fn create_test_form(id: &str, user_id: &str) -> form::Model {
        let now = Utc::now().into();
        form::Model {
            id: id.to_string(),
            title: "Survey".to_string(),
            description: None,
            user_id: user_id.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn create_test_question(id: &str, form_id: &str, order: i32) -> question::Model {
        let now = Utc::now().into();
        question::Model {
            id: id.to_string(),
            form_id: form_id.to_string(),
            text: format!("Question {id}"),
            question_type: QuestionType::Text,
            order,
            required: false,
            options: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn choices(items: &[&str]) -> QuestionOptions {
        QuestionOptions {
            choices: items.iter().map(ToString::to_string).collect(),
            extra: Map::new(),
        }
    }

    fn affected(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    fn create_test_service(db: MockDatabase) -> QuestionService {
        QuestionService::from_connection(Arc::new(db.into_connection()))
    }

    #[tokio::test]
    async fn test_missing_form_is_not_found() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<form::Model>::new()]),
        );

        let err = service.get_form_questions("nope", "user1").await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(ref m) if m == "Form with ID nope not found"));
    }

    #[tokio::test]
    async fn test_foreign_form_is_forbidden() {
        // Only the form lookup is queued: the gate must fail before any question query.
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_form("form1", "owner")]]),
        );

        let err = service
            .create_question(
                "form1",
                "intruder",
                CreateQuestionInput {
                    text: "Name?".to_string(),
                    question_type: QuestionType::Text,
                    required: false,
                    options: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_create_question_on_empty_form_gets_order_zero() {
        let created = create_test_question("q0", "form1", 0);
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_form("form1", "user1")]])
                .append_query_results([Vec::<question::Model>::new()])
                .append_query_results([[created.clone()]]),
        );

        let question = service
            .create_question(
                "form1",
                "user1",
                CreateQuestionInput {
                    text: "Question q0".to_string(),
                    question_type: QuestionType::Text,
                    required: false,
                    options: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(question.order, 0);
    }

    #[tokio::test]
    async fn test_create_choice_question_requires_choices() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_form("form1", "user1")]]),
        );

        let err = service
            .create_question(
                "form1",
                "user1",
                CreateQuestionInput {
                    text: "Pick".to_string(),
                    question_type: QuestionType::Radio,
                    required: true,
                    options: Some(choices(&["only"])),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(ref m) if m == "At least 2 choices required"));
    }

    #[tokio::test]
    async fn test_create_choice_question_without_options() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_form("form1", "user1")]]),
        );

        let err = service
            .create_question(
                "form1",
                "user1",
                CreateQuestionInput {
                    text: "Pick".to_string(),
                    question_type: QuestionType::Select,
                    required: true,
                    options: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(ref m) if m == CHOICES_REQUIRED));
    }

    #[tokio::test]
    async fn test_get_question_from_other_form() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_form("form1", "user1")]])
                .append_query_results([[create_test_question("q9", "form2", 0)]]),
        );

        let err = service
            .get_question_by_id("form1", "q9", "user1")
            .await
            .unwrap_err();

        assert!(
            matches!(err, AppError::BadRequest(ref m) if m == "Question does not belong to this form")
        );
    }

    #[tokio::test]
    async fn test_get_question_missing() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_form("form1", "user1")]])
                .append_query_results([Vec::<question::Model>::new()]),
        );

        let err = service
            .get_question_by_id("form1", "q9", "user1")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(ref m) if m == "Question with ID q9 not found"));
    }

    #[tokio::test]
    async fn test_update_to_choice_type_uses_stored_options() {
        let mut stored = create_test_question("q1", "form1", 0);
        stored.options = Some(json!({"choices": ["a", "b"], "placeholder": "pick one"}));
        let mut updated = stored.clone();
        updated.question_type = QuestionType::Checkbox;

        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_form("form1", "user1")]])
                .append_query_results([[stored]])
                .append_query_results([[updated.clone()]]),
        );

        let result = service
            .update_question(
                "form1",
                "q1",
                "user1",
                UpdateQuestionInput {
                    question_type: Some(QuestionType::Checkbox),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(result.question_type, QuestionType::Checkbox);
    }

    #[tokio::test]
    async fn test_update_to_choice_type_without_choices() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_form("form1", "user1")]])
                .append_query_results([[create_test_question("q1", "form1", 0)]]),
        );

        let err = service
            .update_question(
                "form1",
                "q1",
                "user1",
                UpdateQuestionInput {
                    question_type: Some(QuestionType::Radio),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_question() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_form("form1", "user1")]])
                .append_query_results([[create_test_question("q1", "form1", 1)]])
                .append_exec_results([affected(1)]),
        );

        assert!(service.delete_question("form1", "q1", "user1").await.is_ok());
    }

    #[tokio::test]
    async fn test_reorder_questions() {
        let q0 = create_test_question("q0", "form1", 0);
        let q1 = create_test_question("q1", "form1", 1);
        let mut after0 = q1.clone();
        after0.order = 0;
        let mut after1 = q0.clone();
        after1.order = 1;

        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_form("form1", "user1")]])
                .append_query_results([[q0, q1]])
                .append_exec_results([affected(1), affected(1)])
                .append_query_results([[after0, after1]]),
        );

        let result = service
            .reorder_questions(
                "form1",
                "user1",
                vec![
                    OrderUpdate { id: "q1".to_string(), order: 0 },
                    OrderUpdate { id: "q0".to_string(), order: 1 },
                ],
            )
            .await
            .unwrap();

        let ids: Vec<&str> = result.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q0"]);
    }

    #[tokio::test]
    async fn test_reorder_rejects_foreign_question() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_form("form1", "user1")]])
                .append_query_results([[create_test_question("q0", "form1", 0)]]),
        );

        let err = service
            .reorder_questions(
                "form1",
                "user1",
                vec![
                    OrderUpdate { id: "q0".to_string(), order: 1 },
                    OrderUpdate { id: "stranger".to_string(), order: 0 },
                ],
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::BadRequest(ref m) if m == "Question with ID stranger does not belong to this form"
        ));
    }

    #[tokio::test]
    async fn test_reorder_rejects_duplicate_ids() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_form("form1", "user1")]])
                .append_query_results([[create_test_question("q0", "form1", 0)]]),
        );

        let err = service
            .reorder_questions(
                "form1",
                "user1",
                vec![
                    OrderUpdate { id: "q0".to_string(), order: 1 },
                    OrderUpdate { id: "q0".to_string(), order: 2 },
                ],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_options_keep_extra_fields() {
        let options: QuestionOptions =
            serde_json::from_value(json!({"choices": ["a", "b"], "placeholder": "Pick"})).unwrap();

        assert_eq!(options.extra.get("placeholder"), Some(&json!("Pick")));
        assert_eq!(
            options.to_json().unwrap(),
            json!({"choices": ["a", "b"], "placeholder": "Pick"})
        );
    }

    #[test]
    fn test_options_reject_empty_choice() {
        assert!(check_choices(QuestionType::Radio, Some(&choices(&["a", ""]))).is_err());
        assert!(check_choices(QuestionType::Text, None).is_ok());
        assert!(check_choices(QuestionType::Select, Some(&choices(&["a", "b"]))).is_ok());
    }
}
