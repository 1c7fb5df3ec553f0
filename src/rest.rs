//! Hosted backend client speaking PostgREST for table reads and the auth
//! service's `/auth/v1/user` endpoint for the session check.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::backend::{Backend, Session};
use crate::error::RemoteError;
use crate::query::Query;

pub struct RestBackend {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct AuthUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl RestBackend {
    pub fn new(base_url: Url, api_key: String, access_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            access_token,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.base_url
            .join(path)
            .map_err(|e| RemoteError::InvalidQuery(format!("bad endpoint {path}: {e}")))
    }

    /// `apikey` always carries the project key; the bearer token is the
    /// user's JWT when one is configured.
    fn headers(&self) -> Result<HeaderMap, RemoteError> {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| RemoteError::InvalidQuery(format!("api key: {e}")))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {bearer}"))
                .map_err(|e| RemoteError::InvalidQuery(format!("access token: {e}")))?,
        );
        Ok(headers)
    }

    async fn fetch_user(&self) -> Result<AuthUser, RemoteError> {
        let response = self
            .http
            .get(self.endpoint("auth/v1/user")?)
            .headers(self.headers()?)
            .send()
            .await?;
        json_body(response).await
    }
}

async fn json_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

#[async_trait]
impl Backend for RestBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, RemoteError> {
        let url = self.endpoint(&format!("rest/v1/{}", query.table))?;
        debug!(table = %query.table, "querying hosted backend");

        let response = self
            .http
            .get(url)
            .headers(self.headers()?)
            .query(&query.to_postgrest_params())
            .send()
            .await?;
        json_body(response).await
    }

    async fn current_session(&self) -> Option<Session> {
        if self.access_token.is_none() {
            return None;
        }
        match self.fetch_user().await {
            Ok(user) => Some(Session {
                user_id: user.id,
                email: user.email,
            }),
            Err(error) => {
                warn!(%error, "session check failed");
                None
            }
        }
    }
}
