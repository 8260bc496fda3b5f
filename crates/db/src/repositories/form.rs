//! Form repository.

use std::{collections::HashMap, sync::Arc};

use crate::{
    entities::{Form, Question, form, question},
    map_db_err,
};
use formkit_common::AppResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder,
};

/// A form together with its questions, ascending by `order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormWithQuestions {
    /// The form row.
    pub form: form::Model,
    /// Its questions.
    pub questions: Vec<question::Model>,
}

/// Repository for form operations.
#[derive(Clone)]
pub struct FormRepository {
    db: Arc<DatabaseConnection>,
}

impl FormRepository {
    /// Create a new form repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find form by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<form::Model>> {
        Form::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Find form by ID along with its ordered questions.
    pub async fn find_by_id_with_questions(&self, id: &str) -> AppResult<Option<FormWithQuestions>> {
        let Some(form) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let questions = Question::find()
            .filter(question::Column::FormId.eq(id))
            .order_by(question::Column::Order, Order::Asc)
            .order_by(question::Column::CreatedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(Some(FormWithQuestions { form, questions }))
    }

    /// Find all forms owned by a user, newest first, each with its ordered questions.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<FormWithQuestions>> {
        let forms = Form::find()
            .filter(form::Column::UserId.eq(user_id))
            .order_by(form::Column::CreatedAt, Order::Desc)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        if forms.is_empty() {
            return Ok(vec![]);
        }

        let form_ids: Vec<String> = forms.iter().map(|f| f.id.clone()).collect();
        let questions = Question::find()
            .filter(question::Column::FormId.is_in(form_ids))
            .order_by(question::Column::Order, Order::Asc)
            .order_by(question::Column::CreatedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        let mut by_form: HashMap<String, Vec<question::Model>> = HashMap::new();
        for question in questions {
            by_form
                .entry(question.form_id.clone())
                .or_default()
                .push(question);
        }

        Ok(forms
            .into_iter()
            .map(|form| {
                let questions = by_form.remove(&form.id).unwrap_or_default();
                FormWithQuestions { form, questions }
            })
            .collect())
    }

    /// Create a new form.
    pub async fn create(&self, model: form::ActiveModel) -> AppResult<form::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Update a form.
    pub async fn update(&self, model: form::ActiveModel) -> AppResult<form::Model> {
        model.update(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Delete a form (and all its questions due to CASCADE).
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Form::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::question::QuestionType;
    use chrono::{Duration, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Set};

    fn create_test_form(id: &str, user_id: &str, age_minutes: i64) -> form::Model {
        let created = (Utc::now() - Duration::minutes(age_minutes)).into();
        form::Model {
            id: id.to_string(),
            title: format!("Form {id}"),
            description: None,
            user_id: user_id.to_string(),
            is_active: true,
            created_at: created,
            updated_at: created,
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

    #[tokio::test]
    async fn test_find_by_id() {
        let form = create_test_form("form1", "user1", 0);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[form.clone()]])
                .into_connection(),
        );

        let repo = FormRepository::new(db);
        let result = repo.find_by_id("form1").await.unwrap();

        assert_eq!(result, Some(form));
    }

    #[tokio::test]
    async fn test_find_by_id_with_questions_missing_form() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<form::Model>::new()])
                .into_connection(),
        );

        let repo = FormRepository::new(db);
        let result = repo.find_by_id_with_questions("missing").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_find_by_id_with_questions() {
        let form = create_test_form("form1", "user1", 0);
        let q0 = create_test_question("q0", "form1", 0);
        let q1 = create_test_question("q1", "form1", 1);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[form.clone()]])
                .append_query_results([[q0.clone(), q1.clone()]])
                .into_connection(),
        );

        let repo = FormRepository::new(db);
        let result = repo.find_by_id_with_questions("form1").await.unwrap().unwrap();

        assert_eq!(result.form, form);
        assert_eq!(result.questions, vec![q0, q1]);
    }

    #[tokio::test]
    async fn test_find_by_user_groups_questions() {
        let newer = create_test_form("form2", "user1", 1);
        let older = create_test_form("form1", "user1", 10);
        let q_a = create_test_question("qa", "form1", 0);
        let q_b = create_test_question("qb", "form2", 0);
        let q_c = create_test_question("qc", "form1", 1);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[newer.clone(), older.clone()]])
                .append_query_results([[q_a.clone(), q_b.clone(), q_c.clone()]])
                .into_connection(),
        );

        let repo = FormRepository::new(db);
        let result = repo.find_by_user("user1").await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].form.id, "form2");
        assert_eq!(result[0].questions, vec![q_b]);
        assert_eq!(result[1].form.id, "form1");
        assert_eq!(result[1].questions, vec![q_a, q_c]);
    }

    #[tokio::test]
    async fn test_find_by_user_empty_skips_question_query() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<form::Model>::new()])
                .into_connection(),
        );

        let repo = FormRepository::new(db);
        let result = repo.find_by_user("user1").await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_create() {
        let form = create_test_form("form1", "user1", 0);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[form.clone()]])
                .into_connection(),
        );

        let repo = FormRepository::new(db);
        let model = form::ActiveModel {
            id: Set(form.id.clone()),
            title: Set(form.title.clone()),
            description: Set(None),
            user_id: Set(form.user_id.clone()),
            is_active: Set(true),
            created_at: Set(form.created_at),
            updated_at: Set(form.updated_at),
        };
        let created = repo.create(model).await.unwrap();

        assert_eq!(created, form);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = FormRepository::new(db);
        let result = repo.delete("form1").await;

        assert!(result.is_ok());
    }
}
