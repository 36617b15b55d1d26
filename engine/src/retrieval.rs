//! App-data lookups for `retrieve_from_app`.
//!
//! [`RetrievalExecutor`] wraps any [`ActionExecutor`]: lookups are answered
//! here through an [`AppDataSource`], always scoped to the requesting user;
//! every other resolution goes to the inner executor untouched.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use waypoint_core::normalize::fold;
use waypoint_types::{EntityType, Resolution, UserScope};

use crate::executor::{ActionExecutor, ExecFut, ExecutionReport};

const MAX_SIMILAR: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    pub entity_type: EntityType,
    pub name: String,
    pub scope: UserScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRecord {
    pub id: String,
    pub owner: String,
    pub entity_type: EntityType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("app data unavailable: {0}")]
    Unavailable(String),
}

pub type LookupFut<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<AppRecord>, LookupError>> + Send + 'a>>;

pub trait AppDataSource: Send + Sync {
    /// Records of `query.entity_type` owned by `query.scope` whose names
    /// contain or equal `query.name`. Never returns another user's records.
    fn lookup<'a>(&'a self, query: &'a LookupQuery) -> LookupFut<'a>;
}

#[derive(Debug, Default)]
pub struct InMemoryDataSource {
    records: RwLock<Vec<AppRecord>>,
}

impl InMemoryDataSource {
    #[must_use]
    pub fn new(records: impl IntoIterator<Item = AppRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
        }
    }

    pub fn insert(&self, record: AppRecord) {
        if let Ok(mut records) = self.records.write() {
            records.push(record);
        }
    }

    fn find(&self, query: &LookupQuery) -> Result<Vec<AppRecord>, LookupError> {
        let records = self
            .records
            .read()
            .map_err(|_| LookupError::Unavailable("record lock poisoned".to_string()))?;
        let wanted = fold(&query.name);
        Ok(records
            .iter()
            .filter(|r| r.owner == query.scope.user_id && r.entity_type == query.entity_type)
            .filter(|r| fold(&r.name).contains(&wanted))
            .cloned()
            .collect())
    }
}

impl AppDataSource for InMemoryDataSource {
    fn lookup<'a>(&'a self, query: &'a LookupQuery) -> LookupFut<'a> {
        let result = self.find(query);
        Box::pin(async move { result })
    }
}

/// Render the templated answer for a finished lookup.
#[must_use]
pub fn render_answer(query: &LookupQuery, records: &[AppRecord]) -> String {
    let wanted = fold(&query.name);
    let entity = query.entity_type;
    if let Some(exact) = records.iter().find(|r| fold(&r.name) == wanted) {
        return match &exact.location {
            Some(location) => format!(
                "Yes, you have a {entity} called {} in {location}.",
                exact.name
            ),
            None => format!("Yes, you have a {entity} called {}.", exact.name),
        };
    }
    if records.is_empty() {
        return format!("No, I couldn't find a {entity} called \"{}\".", query.name);
    }
    let names: Vec<&str> = records.iter().take(MAX_SIMILAR).map(|r| r.name.as_str()).collect();
    format!(
        "I couldn't find a {entity} called \"{}\" exactly, but you have {}.",
        query.name,
        waypoint_types::text::join_labels(&names, "and")
    )
}

pub struct RetrievalExecutor {
    inner: Arc<dyn ActionExecutor>,
    source: Arc<dyn AppDataSource>,
}

impl std::fmt::Debug for RetrievalExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalExecutor").finish_non_exhaustive()
    }
}

impl RetrievalExecutor {
    #[must_use]
    pub fn new(inner: Arc<dyn ActionExecutor>, source: Arc<dyn AppDataSource>) -> Self {
        Self { inner, source }
    }

    async fn retrieve(&self, query: LookupQuery) -> ExecutionReport {
        match self.source.lookup(&query).await {
            Ok(records) => {
                tracing::debug!(
                    entity = %query.entity_type,
                    user = %query.scope.user_id,
                    found = records.len(),
                    "App lookup"
                );
                ExecutionReport {
                    success: true,
                    message: Some(render_answer(&query, &records)),
                    side_effects_applied: false,
                }
            }
            Err(err) => {
                tracing::warn!(entity = %query.entity_type, error = %err, "App lookup failed");
                ExecutionReport::failed(format!(
                    "I couldn't check your {}s right now.",
                    query.entity_type
                ))
            }
        }
    }
}

impl ActionExecutor for RetrievalExecutor {
    fn execute<'a>(&'a self, resolution: &'a Resolution) -> ExecFut<'a> {
        match resolution {
            Resolution::RetrieveFromApp {
                entity_type,
                name,
                scope,
            } => {
                let query = LookupQuery {
                    entity_type: *entity_type,
                    name: name.clone(),
                    scope: scope.clone(),
                };
                Box::pin(self.retrieve(query))
            }
            other => self.inner.execute(other),
        }
    }
}
