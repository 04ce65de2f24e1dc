//! User-context collaborator: arbitrary per-user data (today's planned meals,
//! protein target, body weight) looked up over HTTP by user id.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum UserContextError {
    #[error("user context request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("user context service returned {0}")]
    Status(u16),

    #[error("invalid user context url: {0}")]
    Url(String),
}

#[async_trait]
pub trait UserContextSource: Send + Sync {
    async fn fetch(&self, user_id: &str) -> Result<Value, UserContextError>;
}

/// Fetch and degrade: any failure becomes an empty JSON object.
pub async fn fetch_or_empty(source: &dyn UserContextSource, user_id: &str) -> Value {
    match source.fetch(user_id).await {
        Ok(v @ Value::Object(_)) => v,
        Ok(other) => {
            tracing::warn!(target: "pagi::coach", user_id = %user_id, "user context was not an object: {}", other);
            Value::Object(Default::default())
        }
        Err(e) => {
            tracing::warn!(target: "pagi::coach", user_id = %user_id, error = %e, "user context unavailable");
            Value::Object(Default::default())
        }
    }
}

/// `GET {base}/users/{user_id}/context`.
pub struct HttpUserContext {
    base_url: String,
    client: reqwest::Client,
}

impl HttpUserContext {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn url_for(&self, user_id: &str) -> Result<reqwest::Url, UserContextError> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| UserContextError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| UserContextError::Url(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["users", user_id, "context"]);
        Ok(url)
    }
}

#[async_trait]
impl UserContextSource for HttpUserContext {
    async fn fetch(&self, user_id: &str) -> Result<Value, UserContextError> {
        let url = self.url_for(user_id)?;
        let res = self.client.get(url).send().await?;
        if !res.status().is_success() {
            return Err(UserContextError::Status(res.status().as_u16()));
        }
        Ok(res.json::<Value>().await?)
    }
}

/// Fixed context for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticUserContext {
    value: Value,
}

impl StaticUserContext {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn empty() -> Self {
        Self::new(Value::Object(Default::default()))
    }
}

#[async_trait]
impl UserContextSource for StaticUserContext {
    async fn fetch(&self, _user_id: &str) -> Result<Value, UserContextError> {
        Ok(self.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Down;

    #[async_trait]
    impl UserContextSource for Down {
        async fn fetch(&self, _user_id: &str) -> Result<Value, UserContextError> {
            Err(UserContextError::Status(503))
        }
    }

    #[tokio::test]
    async fn failures_become_empty_object() {
        let v = fetch_or_empty(&Down, "u1").await;
        assert_eq!(v, serde_json::json!({}));
        let v = fetch_or_empty(&StaticUserContext::new(serde_json::json!([1, 2])), "u1").await;
        assert_eq!(v, serde_json::json!({}));
    }

    #[test]
    fn url_escapes_user_id() {
        let ctx = HttpUserContext::new("http://localhost:9000/api/", Duration::from_secs(1));
        let url = ctx.url_for("a b/c").expect("url");
        assert_eq!(url.as_str(), "http://localhost:9000/api/users/a%20b%2Fc/context");
    }

    #[tokio::test]
    async fn unreachable_service_degrades() {
        let ctx = HttpUserContext::new("http://127.0.0.1:9", Duration::from_millis(200));
        assert_eq!(fetch_or_empty(&ctx, "u1").await, serde_json::json!({}));
    }
}
