//! Helpers for tests that run against a real `PostgreSQL` database.
//!
//! Connection settings come from `TEST_DB_*` environment variables; see
//! [`TestDbConfig`]. Every [`TestDatabase`] starts migrated and empty.

use std::{env, sync::Arc};

use chrono::Utc;
use formkit_common::{AppResult, IdGenerator};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Set};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::{
    entities::{form, user},
    migrations::Migrator,
    repositories::{FormRepository, UserRepository},
};

/// Connection settings for the test database.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Database host (`TEST_DB_HOST`, default `localhost`).
    pub host: String,
    /// Database port (`TEST_DB_PORT`, default 5433).
    pub port: u16,
    /// User name (`TEST_DB_USER`).
    pub username: String,
    /// Password (`TEST_DB_PASSWORD`).
    pub password: String,
    /// Database name (`TEST_DB_NAME`).
    pub database: String,
}

fn env_or(key: &str, fallback: &str) -> String {
    env::var(key).unwrap_or_else(|_| fallback.to_string())
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: env_or("TEST_DB_HOST", "localhost"),
            port: env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: env_or("TEST_DB_USER", "formkit_test"),
            password: env_or("TEST_DB_PASSWORD", "formkit_test"),
            database: env_or("TEST_DB_NAME", "formkit_test"),
        }
    }
}

impl TestDbConfig {
    /// Connection URL for these settings.
    #[must_use]
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

/// A migrated, emptied test database.
pub struct TestDatabase {
    conn: Arc<DatabaseConnection>,
    ids: IdGenerator,
}

impl TestDatabase {
    /// Connect with settings from the environment.
    pub async fn connect() -> Result<Self, DbErr> {
        Self::connect_with(&TestDbConfig::default()).await
    }

    /// Connect, bring the schema up to date and remove all rows.
    pub async fn connect_with(config: &TestDbConfig) -> Result<Self, DbErr> {
        let conn = Database::connect(config.database_url()).await?;
        Migrator::up(&conn, None).await?;
        info!(database = %config.database, "Connected to test database");

        let db = Self {
            conn: Arc::new(conn),
            ids: IdGenerator::new(),
        };
        db.reset().await?;
        Ok(db)
    }

    /// Shared handle for building repositories.
    #[must_use]
    pub fn connection(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.conn)
    }

    /// Remove all rows, keeping the schema.
    pub async fn reset(&self) -> Result<(), DbErr> {
        self.conn
            .execute_unprepared(r#"TRUNCATE TABLE "question", "form", "user" CASCADE"#)
            .await?;
        Ok(())
    }

    /// Insert a user with the given email.
    pub async fn seed_user(&self, email: &str) -> AppResult<user::Model> {
        let now = Utc::now().into();
        UserRepository::new(self.connection())
            .create(user::ActiveModel {
                id: Set(self.ids.generate()),
                email: Set(email.to_string()),
                password_hash: Set("not-a-real-hash".to_string()),
                name: Set("Tester".to_string()),
                role: Set(user::Role::User),
                created_at: Set(now),
                updated_at: Set(now),
            })
            .await
    }

    /// Insert an active form owned by `owner_id`.
    pub async fn seed_form(&self, owner_id: &str) -> AppResult<form::Model> {
        let now = Utc::now().into();
        FormRepository::new(self.connection())
            .create(form::ActiveModel {
                id: Set(self.ids.generate()),
                title: Set("Survey".to_string()),
                description: Set(None),
                user_id: Set(owner_id.to_string()),
                is_active: Set(true),
                created_at: Set(now),
                updated_at: Set(now),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url() {
        let config = TestDbConfig {
            host: "db".to_string(),
            port: 5433,
            username: "user".to_string(),
            password: "pass".to_string(),
            database: "forms".to_string(),
        };
        assert_eq!(config.database_url(), "postgres://user:pass@db:5433/forms");
    }
}
