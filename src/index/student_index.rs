use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::config::types::IndexConfig;
use crate::error::{ReportError, Result};
use crate::helpers::time::system_time_to_utc;
use crate::observability::metrics::get_metrics;
use crate::sinks::snapshot_file::{read_if_exists, write_atomic};
use crate::sources::fetch::{ApiMode, PaginatedFetcher};

/// A user entry of the roster directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRecord {
    pub sourced_id: String,
    pub email: String,
    /// every other field, untouched
    pub profile: Map<String, Value>,
}

/// Immutable, fully loaded directory. Replaced as a whole on rebuild.
#[derive(Debug, Clone, Default)]
pub struct StudentSnapshot {
    records: Vec<StudentRecord>,
    updated_at: Option<DateTime<Utc>>,
}

impl StudentSnapshot {
    /// Accepts one `{ "users": [...] }` container or an array of them.
    /// Users without a string `sourcedId` and `email` are not indexed.
    pub fn from_documents(documents: &Value, updated_at: Option<DateTime<Utc>>) -> Self {
        let containers: Vec<&Map<String, Value>> = match documents {
            Value::Object(map) => vec![map],
            Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
            _ => Vec::new(),
        };

        let records = containers
            .into_iter()
            .filter_map(|container| container.get("users").and_then(Value::as_array))
            .flatten()
            .filter_map(Value::as_object)
            .filter_map(|user| {
                let sourced_id = user.get("sourcedId")?.as_str()?.to_owned();
                let email = user.get("email")?.as_str()?.to_owned();
                let profile = user
                    .iter()
                    .filter(|(key, _)| key.as_str() != "sourcedId" && key.as_str() != "email")
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                Some(StudentRecord { sourced_id, email, profile })
            })
            .collect();

        Self { records, updated_at }
    }

    /// Case-sensitive exact match, first hit wins.
    pub fn find_sourced_id(&self, email: &str) -> Option<&str> {
        self.records
            .iter()
            .find(|record| record.email == email)
            .map(|record| record.sourced_id.as_str())
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RebuildSummary {
    pub students: usize,
    pub updated_at: DateTime<Utc>,
}

/// Email to sourced-id lookup over a local snapshot of the roster.
///
/// Lookups read the current snapshot without waiting on a rebuild; a rebuild
/// writes the new file atomically and then swaps the in-memory snapshot.
#[derive(Debug, Clone)]
pub struct StudentIndex {
    path: PathBuf,
    offsets: Vec<u32>,
    current: Arc<RwLock<Arc<StudentSnapshot>>>,
    rebuild_lock: Arc<Mutex<()>>,
}

impl StudentIndex {
    /// Load the snapshot file. A missing file gives an empty index.
    pub async fn open(config: &IndexConfig) -> Result<Self> {
        let snapshot = load_snapshot(&config.path).await?;
        get_metrics().await.index_students.set(snapshot.len() as i64);
        info!(
            path = %config.path.display(),
            students = snapshot.len(),
            "student index loaded"
        );

        Ok(Self {
            path: config.path.clone(),
            offsets: config.offsets.clone(),
            current: Arc::new(RwLock::new(Arc::new(snapshot))),
            rebuild_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn snapshot(&self) -> Arc<StudentSnapshot> {
        self.current.read().await.clone()
    }

    pub async fn lookup_sourced_id(&self, email: &str) -> Option<String> {
        self.snapshot().await.find_sourced_id(email).map(str::to_owned)
    }

    pub async fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.snapshot().await.updated_at()
    }

    pub async fn len(&self) -> usize {
        self.snapshot().await.len()
    }

    /// Pull the roster at every configured offset and replace the snapshot.
    /// Only one rebuild runs at a time; on failure the old snapshot stays.
    pub async fn rebuild(&self, fetcher: &PaginatedFetcher) -> Result<RebuildSummary> {
        let _guard = self
            .rebuild_lock
            .try_lock()
            .map_err(|_| ReportError::RebuildInProgress)?;

        let metrics = get_metrics().await;
        let result = self.pull_and_replace(fetcher).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics.index_rebuilds.with_label_values(&[outcome]).inc();
        if let Err(e) = &result {
            warn!("student index rebuild failed, keeping previous snapshot: {}", e);
        }
        result
    }

    async fn pull_and_replace(&self, fetcher: &PaginatedFetcher) -> Result<RebuildSummary> {
        let mut session = fetcher.session();
        let mut documents: Vec<Value> = Vec::new();
        for offset in &self.offsets {
            let endpoint = format!("students?offset={}", offset);
            let pages = session
                .fetch(&endpoint, ApiMode::Roster)
                .await
                .map_err(|e| ReportError::pipeline(endpoint.as_str(), e))?;
            info!(offset, documents = pages.len(), "roster pulled");
            documents.extend(pages);
        }

        let documents = Value::Array(documents);
        let bytes = serde_json::to_vec_pretty(&documents)
            .map_err(|e| ReportError::Serialization(e.to_string()))?;
        write_atomic(&self.path, &bytes).await?;

        let updated_at = Utc::now();
        let snapshot = StudentSnapshot::from_documents(&documents, Some(updated_at));
        let students = snapshot.len();
        *self.current.write().await = Arc::new(snapshot);

        get_metrics().await.index_students.set(students as i64);
        info!(students, path = %self.path.display(), "student index rebuilt");
        Ok(RebuildSummary { students, updated_at })
    }
}

async fn load_snapshot(path: &Path) -> Result<StudentSnapshot> {
    let Some(bytes) = read_if_exists(path).await? else {
        warn!(path = %path.display(), "student snapshot not found, starting with an empty index");
        return Ok(StudentSnapshot::default());
    };

    let documents: Value = serde_json::from_slice(&bytes).map_err(|e| ReportError::Decode {
        endpoint: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let updated_at = tokio::fs::metadata(path)
        .await
        .and_then(|meta| meta.modified())
        .ok()
        .map(system_time_to_utc);
    Ok(StudentSnapshot::from_documents(&documents, updated_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn directory() -> Value {
        json!([
            {"users": [
                {"sourcedId": "S1", "email": "a@b.com", "givenName": "Ada"},
                {"sourcedId": "S2", "email": "c@d.com"}
            ]},
            {"users": [
                {"sourcedId": "S3", "email": "a@b.com"},
                {"email": "no-id@b.com"},
                "not a user"
            ]},
            {"links": []}
        ])
    }

    #[test]
    fn first_match_wins() {
        let snapshot = StudentSnapshot::from_documents(&directory(), None);
        assert_eq!(snapshot.find_sourced_id("a@b.com"), Some("S1"));
        assert_eq!(snapshot.find_sourced_id("c@d.com"), Some("S2"));
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn match_is_case_sensitive_and_exact() {
        let snapshot = StudentSnapshot::from_documents(&directory(), None);
        assert_eq!(snapshot.find_sourced_id("A@B.com"), None);
        assert_eq!(snapshot.find_sourced_id("a@b.co"), None);
        assert_eq!(snapshot.find_sourced_id("no-id@b.com"), None);
    }

    #[test]
    fn single_container_document_is_accepted() {
        let doc = json!({"users": [{"sourcedId": "S9", "email": "x@y.org"}]});
        let snapshot = StudentSnapshot::from_documents(&doc, None);
        assert_eq!(snapshot.find_sourced_id("x@y.org"), Some("S9"));
        assert_eq!(snapshot.records()[0].profile.len(), 0);
    }
}
