//! In-memory query cache with prefix invalidation.

use std::{
    collections::HashMap,
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

/// Default time a cached entry is served without refetching.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(60);

/// Hierarchical cache key, e.g. `["forms", "<id>", "questions"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    /// Build a key from its segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The signed-in user.
    #[must_use]
    pub fn auth_user() -> Self {
        Self::new(["auth", "user"])
    }

    /// The form list; as a prefix, every form entry.
    #[must_use]
    pub fn forms() -> Self {
        Self::new(["forms"])
    }

    /// One form; as a prefix, the form and its questions.
    #[must_use]
    pub fn form(id: &str) -> Self {
        Self::new(["forms", id])
    }

    /// A form's question list.
    #[must_use]
    pub fn form_questions(id: &str) -> Self {
        Self::new(["forms", id, "questions"])
    }

    /// One question of a form.
    #[must_use]
    pub fn question(form_id: &str, question_id: &str) -> Self {
        Self::new(["forms", form_id, "questions", question_id])
    }

    /// Whether `prefix` matches this key segment by segment.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(","))
    }
}

struct Entry {
    value: Value,
    stored_at: Instant,
}

/// Query results keyed by [`QueryKey`]. Cloning shares the same store.
#[derive(Clone)]
pub struct QueryCache {
    entries: Arc<RwLock<HashMap<QueryKey, Entry>>>,
    stale_time: Duration,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_TIME)
    }
}

impl QueryCache {
    /// Create a cache whose entries stay fresh for `stale_time`.
    #[must_use]
    pub fn new(stale_time: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            stale_time,
        }
    }

    /// A fresh entry for `key`, if any.
    pub async fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;

        if entry.stored_at.elapsed() >= self.stale_time {
            debug!(key = %key, "Cache entry stale");
            return None;
        }

        match serde_json::from_value(entry.value.clone()) {
            Ok(value) => {
                debug!(key = %key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                debug!(key = %key, error = %e, "Cache entry has unexpected shape");
                None
            }
        }
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub async fn set<T: Serialize>(&self, key: QueryKey, value: &T) {
        let Ok(value) = serde_json::to_value(value) else {
            return;
        };
        self.entries.write().await.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every entry whose key starts with `prefix`.
    pub async fn invalidate(&self, prefix: &QueryKey) {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        debug!(prefix = %prefix, removed = before - entries.len(), "Cache invalidated");
    }

    /// Drop everything.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Whether an entry, fresh or stale, exists for `key`.
    pub async fn contains(&self, key: &QueryKey) -> bool {
        self.entries.read().await.contains_key(key)
    }
}
