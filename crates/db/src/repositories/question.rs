//! Question repository.

use std::sync::Arc;

use crate::{
    entities::{Question, question},
    map_db_err,
};
use chrono::Utc;
use formkit_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter,
    QueryOrder, TransactionTrait, sea_query::Expr,
};

/// New position for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpdate {
    /// Question ID.
    pub id: String,
    /// Target position.
    pub order: i32,
}

/// Repository for question operations.
#[derive(Clone)]
pub struct QuestionRepository {
    db: Arc<DatabaseConnection>,
}

impl QuestionRepository {
    /// Create a new question repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find question by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<question::Model>> {
        Question::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Find all questions of a form, ascending by order.
    pub async fn find_by_form_id(&self, form_id: &str) -> AppResult<Vec<question::Model>> {
        Question::find()
            .filter(question::Column::FormId.eq(form_id))
            .order_by(question::Column::Order, Order::Asc)
            .order_by(question::Column::CreatedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Order value for a question appended to the form: highest existing order + 1, or 0.
    pub async fn next_order(&self, form_id: &str) -> AppResult<i32> {
        let last = Question::find()
            .filter(question::Column::FormId.eq(form_id))
            .order_by(question::Column::Order, Order::Desc)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(last.map_or(-1, |q| q.order) + 1)
    }

    /// Create a new question.
    pub async fn create(&self, model: question::ActiveModel) -> AppResult<question::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Update a question.
    pub async fn update(&self, model: question::ActiveModel) -> AppResult<question::Model> {
        model.update(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Delete a question. Siblings keep their order values.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Question::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(())
    }

    /// Apply every order update in one transaction.
    ///
    /// Each update is scoped to `form_id`; if any question is missing from the
    /// form, nothing is written.
    pub async fn update_orders(&self, form_id: &str, updates: &[OrderUpdate]) -> AppResult<()> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let now = Utc::now().fixed_offset();

        for update in updates {
            let result = Question::update_many()
                .col_expr(question::Column::Order, Expr::value(update.order))
                .col_expr(question::Column::UpdatedAt, Expr::value(now))
                .filter(question::Column::Id.eq(update.id.as_str()))
                .filter(question::Column::FormId.eq(form_id))
                .exec(&txn)
                .await
                .map_err(map_db_err)?;

            if result.rows_affected == 0 {
                // Dropping the transaction rolls it back.
                return Err(AppError::NotFound(format!(
                    "Question with ID {} not found",
                    update.id
                )));
            }
        }

        txn.commit().await.map_err(map_db_err)?;

        tracing::debug!(form_id = %form_id, count = updates.len(), "Reordered questions");
        Ok(())
    }
}
