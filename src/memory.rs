//! In-memory backend for tests. Evaluates a [`Query`] over JSON rows the
//! same way PostgREST would, and can hold individual responses back so tests
//! control the order in which they arrive.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::backend::{Backend, Session};
use crate::error::RemoteError;
use crate::query::{Direction, FilterValue, Op, Query};

#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    failures: RwLock<HashMap<String, String>>,
    delays: RwLock<HashMap<String, Duration>>,
    hung: RwLock<Vec<String>>,
    session: RwLock<Option<Session>>,
    calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, table: &str, row: Value) {
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    pub async fn sign_in(&self, session: Session) {
        *self.session.write().await = Some(session);
    }

    /// Every read of `table` fails with `message`.
    pub async fn fail_table(&self, table: &str, message: &str) {
        self.failures
            .write()
            .await
            .insert(table.to_string(), message.to_string());
    }

    /// Reads whose first filter value renders as `key` sleep for `delay`.
    pub async fn delay_key(&self, key: &str, delay: Duration) {
        self.delays.write().await.insert(key.to_string(), delay);
    }

    /// Reads of `table` never complete.
    pub async fn hang_table(&self, table: &str) {
        self.hung.write().await.push(table.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    async fn evaluate(&self, query: &Query) -> Vec<Value> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Value> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        query
                            .filters
                            .iter()
                            .all(|f| matches(row, &f.column, f.op, &f.value))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare(&a[order.column.as_str()], &b[order.column.as_str()]);
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        rows.into_iter()
            .map(|row| project(row, query, &tables))
            .collect()
    }
}

fn matches(row: &Value, column: &str, op: Op, value: &FilterValue) -> bool {
    let field = &row[column];
    match (op, value) {
        (Op::Eq, _) => field.as_str() == Some(value.to_param().as_str()),
        (Op::Gte, FilterValue::Timestamp(at)) => {
            timestamp(field).is_some_and(|field_at| field_at >= *at)
        }
        (Op::Gte, other) => field
            .as_str()
            .is_some_and(|text| text >= other.to_param().as_str()),
    }
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|at| at.with_timezone(&Utc))
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (timestamp(a), timestamp(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn project(row: Value, query: &Query, tables: &HashMap<String, Vec<Value>>) -> Value {
    let Value::Object(source) = row else {
        return row;
    };

    let mut out = if query.columns.is_empty() {
        source.clone()
    } else {
        query
            .columns
            .iter()
            .filter_map(|column| source.get(column).map(|v| (column.clone(), v.clone())))
            .collect::<Map<String, Value>>()
    };

    for embed in &query.embeds {
        let embedded = source
            .get(&embed.foreign_key)
            .and_then(|key| {
                tables
                    .get(&embed.table)?
                    .iter()
                    .find(|candidate| candidate.get("id") == Some(key))
                    .cloned()
            })
            .unwrap_or(Value::Null);
        out.insert(embed.table.clone(), embedded);
    }

    Value::Object(out)
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, RemoteError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);

        if self.hung.read().await.contains(&query.table) {
            std::future::pending::<()>().await;
        }

        let delay = match query.filters.first() {
            Some(filter) => self.delays.read().await.get(&filter.value.to_param()).copied(),
            None => None,
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.failures.read().await.get(&query.table) {
            return Err(RemoteError::Status {
                status: 500,
                body: message.clone(),
            });
        }

        Ok(self.evaluate(query).await)
    }

    async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn filters_orders_and_limits() {
        let backend = MemoryBackend::new();
        let rows = [
            ("a", "2026-01-03T00:00:00Z"),
            ("b", "2026-01-01T00:00:00Z"),
            ("c", "2026-01-02T00:00:00Z"),
        ];
        let owner = Uuid::new_v4();
        for (id, at) in rows {
            backend
                .insert("reports", json!({ "id": id, "owner": owner, "created_at": at }))
                .await;
        }
        backend
            .insert(
                "reports",
                json!({ "id": "d", "owner": Uuid::new_v4(), "created_at": "2026-01-04T00:00:00Z" }),
            )
            .await;

        let query = Query::from("reports")
            .select(&["id"])
            .eq("owner", FilterValue::Uuid(owner))
            .order("created_at", Direction::Descending)
            .limit(2);
        let rows = backend.select(&query).await.unwrap();
        assert_eq!(rows, vec![json!({ "id": "a" }), json!({ "id": "c" })]);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn embeds_referenced_row() {
        let backend = MemoryBackend::new();
        backend.insert("projects", json!({ "id": "p1", "title": "Capstone" })).await;
        backend.insert("members", json!({ "project_id": "p1", "student_id": "s1" })).await;
        backend.insert("members", json!({ "project_id": "p2", "student_id": "s2" })).await;

        let rows = backend
            .select(&Query::from("members").select(&["project_id"]).embed("projects", "project_id"))
            .await
            .unwrap();
        assert_eq!(rows[0]["projects"]["title"], "Capstone");
        assert_eq!(rows[1]["projects"], Value::Null);
    }
}
