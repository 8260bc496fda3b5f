//! Authentication service.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use formkit_common::{AppError, AppResult, IdGenerator};
use formkit_db::{
    entities::user::{self, Role},
    repositories::UserRepository,
};
use sea_orm::{DatabaseConnection, Set};
use std::sync::Arc;

use crate::token::TokenCodec;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// User data safe to return to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: sea_orm::prelude::DateTimeWithTimeZone,
    pub updated_at: sea_orm::prelude::DateTimeWithTimeZone,
}

impl From<user::Model> for PublicUser {
    fn from(user: user::Model) -> Self {
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

/// Result of a successful register or login.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: PublicUser,
    pub token: String,
}

/// Input for registering a new account.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Input for logging in.
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Service for registration, login and identity lookup.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    tokens: TokenCodec,
    id_gen: IdGenerator,
}

impl AuthService {
    /// Create a new auth service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, tokens: TokenCodec) -> Self {
        Self {
            user_repo,
            tokens,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a service over a shared connection.
    #[must_use]
    pub fn from_connection(db: Arc<DatabaseConnection>, tokens: TokenCodec) -> Self {
        Self::new(UserRepository::new(db), tokens)
    }

    /// Register a new account with the `USER` role and issue a token.
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthSession> {
        let email = normalize_email(&input.email);

        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let password = input.password;
        let password_hash = blocking(move || hash_password(&password)).await?;
        let now = Utc::now().into();

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            email: Set(email),
            password_hash: Set(password_hash),
            name: Set(input.name.trim().to_string()),
            role: Set(Role::User),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, "User registered");

        self.session_for(user)
    }

    /// Verify credentials and issue a token.
    ///
    /// Unknown email and wrong password fail with the same message.
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthSession> {
        let email = normalize_email(&input.email);

        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        let password = input.password;
        let hash = user.password_hash.clone();
        if !blocking(move || verify_password(&password, &hash)).await? {
            tracing::debug!(user_id = %user.id, "Login rejected");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        self.session_for(user)
    }

    /// Look up a user by id.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<PublicUser>> {
        Ok(self.user_repo.find_by_id(id).await?.map(PublicUser::from))
    }

    fn session_for(&self, user: user::Model) -> AppResult<AuthSession> {
        let token = self.tokens.issue(&user)?;
        Ok(AuthSession {
            user: user.into(),
            token,
        })
    }
}

/// Run CPU-heavy hashing off the async workers.
async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Password task failed: {e}")))?
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against an Argon2 hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
