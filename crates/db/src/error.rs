//! Translation of database failures into application errors.

use formkit_common::AppError;
use sea_orm::{DbErr, SqlErr};

/// Map a [`DbErr`] onto the application error taxonomy.
///
/// Constraint violations become client errors; everything else is a
/// database (server) error.
#[must_use]
pub fn map_db_err(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            AppError::Conflict(format!("{} already exists", constraint_field(&detail)))
        }
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            AppError::BadRequest("Invalid reference".to_string())
        }
        _ => match err {
            DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => {
                AppError::NotFound("Record not found".to_string())
            }
            other => AppError::Database(other.to_string()),
        },
    }
}

/// Column name from a message like `duplicate key value violates unique constraint "idx_user_email"`.
fn constraint_field(detail: &str) -> &str {
    detail
        .split('"')
        .nth(1)
        .and_then(|constraint| constraint.rsplit('_').next())
        .filter(|field| !field.is_empty())
        .unwrap_or("Record")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_not_found() {
        let err = map_db_err(DbErr::RecordNotFound("question".to_string()));
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Record not found"));
    }

    #[test]
    fn test_record_not_updated() {
        assert!(matches!(map_db_err(DbErr::RecordNotUpdated), AppError::NotFound(_)));
    }

    #[test]
    fn test_other_errors_are_database_errors() {
        let err = map_db_err(DbErr::Custom("boom".to_string()));
        assert!(matches!(err, AppError::Database(_)));
        assert!(err.is_server_error());
    }

    #[test]
    fn test_constraint_field() {
        assert_eq!(
            constraint_field(r#"duplicate key value violates unique constraint "idx_user_email""#),
            "email"
        );
        assert_eq!(constraint_field("no constraint name"), "Record");
    }
}
