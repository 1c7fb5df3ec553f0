use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::RemoteError;
use crate::query::Query;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
}

/// The remote data boundary. One instance is built at startup and shared by
/// every fetcher.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Runs a read and returns the raw rows, one JSON object each.
    async fn select(&self, query: &Query) -> Result<Vec<Value>, RemoteError>;

    /// The signed-in user, if any. Failures are reported as no session.
    async fn current_session(&self) -> Option<Session>;
}
