//! A fetcher owns one remote read and publishes `{data, loading, error}`
//! snapshots through a `watch` channel, which also serialises the
//! check-then-apply step for each response.
//!
//! Every activation bumps a generation counter that lives next to the state
//! inside the channel. A response is applied only if the generation it was
//! issued under is still current, so a late answer for a superseded key, or
//! one arriving after [`Fetcher::dispose`], is dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::error::FetchError;
use crate::query::Query;

/// One kind of remote read: how to ask for it and how to type the answer.
pub trait Resource: Send + Sync + 'static {
    type Key: Clone + PartialEq + Send + Sync + std::fmt::Display;
    type Output: Clone + Default + Send + Sync;

    const NAME: &'static str;

    fn query(key: &Self::Key, now: DateTime<Utc>) -> Query;

    fn parse(rows: Vec<Value>) -> Result<Self::Output, FetchError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchState<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<String>,
}

/// `key` is the key the current `state` belongs to.
#[derive(Debug, Clone)]
struct Slot<K, T> {
    generation: u64,
    disposed: bool,
    key: Option<K>,
    state: FetchState<T>,
}

pub struct Fetcher<R: Resource> {
    backend: Arc<dyn Backend>,
    slot: watch::Sender<Slot<R::Key, R::Output>>,
}

impl<R: Resource> Fetcher<R> {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (slot, _) = watch::channel(Slot {
            generation: 0,
            disposed: false,
            key: None,
            state: FetchState::default(),
        });
        Self { backend, slot }
    }

    pub fn snapshot(&self) -> FetchState<R::Output> {
        self.slot.borrow().state.clone()
    }

    pub fn key(&self) -> Option<R::Key> {
        self.slot.borrow().key.clone()
    }

    /// Activates the fetcher for `key`. An absent key cancels interest in any
    /// in-flight read and resets to the empty state without calling out.
    ///
    /// Refreshing the same key keeps its data visible while loading; a new
    /// key starts from the empty default.
    pub async fn fetch(&self, key: Option<R::Key>) {
        let Some(key) = key else {
            self.slot.send_modify(|slot| {
                slot.generation += 1;
                if !slot.disposed {
                    slot.key = None;
                    slot.state = FetchState::default();
                }
            });
            debug!(resource = R::NAME, "no key, skipping fetch");
            return;
        };

        let mut generation = 0;
        let started = self.slot.send_if_modified(|slot| {
            if slot.disposed {
                return false;
            }
            slot.generation += 1;
            generation = slot.generation;
            if slot.key.as_ref() != Some(&key) {
                slot.key = Some(key.clone());
                slot.state.data = R::Output::default();
            }
            slot.state.loading = true;
            slot.state.error = None;
            true
        });
        if !started {
            return;
        }

        debug!(resource = R::NAME, %key, generation, "fetching");
        let outcome = match self.backend.select(&R::query(&key, Utc::now())).await {
            Ok(rows) => R::parse(rows),
            Err(error) => Err(FetchError::from(error)),
        };

        self.slot.send_if_modified(|slot| {
            if slot.disposed || slot.generation != generation {
                debug!(resource = R::NAME, %key, generation, "dropping stale response");
                return false;
            }
            match outcome {
                Ok(data) => {
                    slot.state = FetchState {
                        data,
                        loading: false,
                        error: None,
                    };
                }
                Err(error) => {
                    warn!(resource = R::NAME, %key, %error, "fetch failed");
                    slot.state = FetchState {
                        data: R::Output::default(),
                        loading: false,
                        error: Some(error.to_string()),
                    };
                }
            }
            true
        });
    }

    /// Teardown. In-flight responses become no-ops; the last snapshot stays
    /// readable.
    pub fn dispose(&self) {
        self.slot.send_modify(|slot| {
            slot.generation += 1;
            slot.disposed = true;
        });
    }
}
