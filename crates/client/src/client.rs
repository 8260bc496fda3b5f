//! REST client with cached reads.

use std::{sync::Arc, time::Duration};

use reqwest::{Method, RequestBuilder, Response, StatusCode, header};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use crate::{
    cache::{QueryCache, QueryKey},
    error::{ClientError, ClientResult},
    types::{
        CreateFormRequest, CreateQuestionRequest, ErrorBody, Form, Health, LoginRequest, Question,
        QuestionOrder, RegisterRequest, ReorderRequest, SessionBody, UpdateFormRequest,
        UpdateQuestionRequest, User,
    },
};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Name of the cookie the server sets on login.
const SESSION_COOKIE: &str = "token";

/// Client for the formkit API.
///
/// The session token captured from login or register is sent as a bearer
/// credential on later calls. Cloning shares the session and the cache.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Arc<RwLock<Option<String>>>,
    cache: QueryCache,
}

impl ApiClient {
    /// Create a client for the API mounted at `base_url`, e.g. `http://localhost:3000/api`.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_cache(base_url, QueryCache::default())
    }

    /// Create a client with a custom cache.
    pub fn with_cache(base_url: &str, cache: QueryCache) -> ClientResult<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("formkit-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            token: Arc::new(RwLock::new(None)),
            cache,
        })
    }

    /// The query cache backing this client.
    #[must_use]
    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Whether a session token is held.
    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Server liveness. Never cached.
    pub async fn health(&self) -> ClientResult<Health> {
        self.send_json(Method::GET, "health", None::<&()>).await
    }

    // === Auth ===

    /// Create an account and start a session.
    pub async fn register(&self, req: &RegisterRequest) -> ClientResult<User> {
        let response = self.send(Method::POST, "auth/register", Some(req)).await?;
        self.start_session(response).await
    }

    /// Sign in and start a session.
    pub async fn login(&self, req: &LoginRequest) -> ClientResult<User> {
        let response = self.send(Method::POST, "auth/login", Some(req)).await?;
        self.start_session(response).await
    }

    /// The signed-in user.
    pub async fn me(&self) -> ClientResult<User> {
        self.cached_get(QueryKey::auth_user(), "auth/me").await
    }

    /// End the session. Local state is cleared even if the call fails.
    pub async fn logout(&self) -> ClientResult<()> {
        let result = self.send(Method::POST, "auth/logout", None::<&()>).await;
        *self.token.write().await = None;
        self.cache.clear().await;
        result.map(drop)
    }

    // === Forms ===

    /// The caller's forms, newest first.
    pub async fn list_forms(&self) -> ClientResult<Vec<Form>> {
        self.cached_get(QueryKey::forms(), "forms").await
    }

    /// One form with its questions.
    pub async fn get_form(&self, id: &str) -> ClientResult<Form> {
        self.cached_get(QueryKey::form(id), &format!("forms/{id}")).await
    }

    /// Create a form owned by the signed-in user.
    pub async fn create_form(&self, req: &CreateFormRequest) -> ClientResult<Form> {
        let form = self.send_json(Method::POST, "forms", Some(req)).await?;
        self.cache.invalidate(&QueryKey::forms()).await;
        Ok(form)
    }

    /// Partially update a form.
    pub async fn update_form(&self, id: &str, req: &UpdateFormRequest) -> ClientResult<Form> {
        let form = self
            .send_json(Method::PUT, &format!("forms/{id}"), Some(req))
            .await?;
        self.cache.invalidate(&QueryKey::forms()).await;
        Ok(form)
    }

    /// Delete a form and its questions.
    pub async fn delete_form(&self, id: &str) -> ClientResult<()> {
        self.send(Method::DELETE, &format!("forms/{id}"), None::<&()>)
            .await?;
        self.cache.invalidate(&QueryKey::forms()).await;
        Ok(())
    }

    // === Questions ===

    /// A form's questions, ascending by order.
    pub async fn list_questions(&self, form_id: &str) -> ClientResult<Vec<Question>> {
        self.cached_get(
            QueryKey::form_questions(form_id),
            &format!("forms/{form_id}/questions"),
        )
        .await
    }

    /// One question of a form.
    pub async fn get_question(&self, form_id: &str, question_id: &str) -> ClientResult<Question> {
        self.cached_get(
            QueryKey::question(form_id, question_id),
            &format!("forms/{form_id}/questions/{question_id}"),
        )
        .await
    }

    /// Append a question to a form.
    pub async fn create_question(
        &self,
        form_id: &str,
        req: &CreateQuestionRequest,
    ) -> ClientResult<Question> {
        let question = self
            .send_json(Method::POST, &format!("forms/{form_id}/questions"), Some(req))
            .await?;
        self.cache.invalidate(&QueryKey::form(form_id)).await;
        Ok(question)
    }

    /// Partially update a question. Its order is unchanged.
    pub async fn update_question(
        &self,
        form_id: &str,
        question_id: &str,
        req: &UpdateQuestionRequest,
    ) -> ClientResult<Question> {
        let question = self
            .send_json(
                Method::PUT,
                &format!("forms/{form_id}/questions/{question_id}"),
                Some(req),
            )
            .await?;
        self.cache.invalidate(&QueryKey::form(form_id)).await;
        Ok(question)
    }

    /// Delete a question. Remaining questions keep their order values.
    pub async fn delete_question(&self, form_id: &str, question_id: &str) -> ClientResult<()> {
        self.send(
            Method::DELETE,
            &format!("forms/{form_id}/questions/{question_id}"),
            None::<&()>,
        )
        .await?;
        self.cache.invalidate(&QueryKey::form(form_id)).await;
        Ok(())
    }

    /// Apply new order values in one call; returns the reordered list.
    pub async fn reorder_questions(
        &self,
        form_id: &str,
        orders: &[QuestionOrder],
    ) -> ClientResult<Vec<Question>> {
        let questions = self
            .send_json(
                Method::PATCH,
                &format!("forms/{form_id}/questions/reorder"),
                Some(&ReorderRequest { questions: orders }),
            )
            .await?;
        self.cache.invalidate(&QueryKey::form(form_id)).await;
        Ok(questions)
    }

    // === Plumbing ===

    async fn start_session(&self, response: Response) -> ClientResult<User> {
        let token = session_token(&response);
        let body: SessionBody = decode(response).await?;

        if let Some(token) = token {
            *self.token.write().await = Some(token);
        }
        self.cache.set(QueryKey::auth_user(), &body.user).await;
        Ok(body.user)
    }

    async fn cached_get<T>(&self, key: QueryKey, path: &str) -> ClientResult<T>
    where
        T: DeserializeOwned + Serialize,
    {
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(hit);
        }

        let value: T = self.send_json(Method::GET, path, None::<&()>).await?;
        self.cache.set(key, &value).await;
        Ok(value)
    }

    async fn send_json<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(method, path, body).await?;
        decode(response).await
    }

    async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> ClientResult<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.base_url.join(path)?;
        debug!(method = %method, url = %url, "API request");

        let mut request: RequestBuilder = self.http.request(method, url);
        if let Some(token) = self.token.read().await.as_deref() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = error_message(response, status).await;
        if status == StatusCode::UNAUTHORIZED {
            *self.token.write().await = None;
            self.cache.clear().await;
            return Err(ClientError::Unauthorized(message));
        }

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn error_message(response: Response, status: StatusCode) -> String {
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    };

    match response.bytes().await {
        Ok(bytes) => serde_json::from_slice::<ErrorBody>(&bytes)
            .map(|body| body.message)
            .unwrap_or_else(|_| fallback()),
        Err(_) => fallback(),
    }
}

/// The session token from a `Set-Cookie` header, if the server set one.
fn session_token(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| {
            let pair = cookie.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            (name.trim() == SESSION_COOKIE && !value.is_empty()).then(|| value.trim().to_string())
        })
}
