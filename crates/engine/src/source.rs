//! In-memory project source: useful for testing and tooling.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use storyloom_core::error::RepositoryError;
use storyloom_core::project::OperationContext;
use storyloom_core::source::ProjectSource;
use tokio::sync::RwLock;

/// Keeps whole project snapshots in a map keyed by project id.
#[derive(Clone)]
pub struct InMemoryProjectSource {
    projects: Arc<RwLock<HashMap<String, OperationContext>>>,
}

impl InMemoryProjectSource {
    pub fn new() -> Self {
        Self {
            projects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Build a source from ready snapshots.
    pub fn with_projects(projects: impl IntoIterator<Item = OperationContext>) -> Self {
        let map = projects
            .into_iter()
            .map(|op| (op.project_id().to_string(), op))
            .collect();
        Self {
            projects: Arc::new(RwLock::new(map)),
        }
    }

    /// Store a snapshot, replacing any previous one for the project.
    pub async fn insert(&self, snapshot: OperationContext) {
        self.projects
            .write()
            .await
            .insert(snapshot.project_id().to_string(), snapshot);
    }

    pub async fn remove(&self, project_id: &str) -> bool {
        self.projects.write().await.remove(project_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.projects.read().await.len()
    }
}

impl Default for InMemoryProjectSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProjectSource for InMemoryProjectSource {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self, project_id: &str) -> Result<Option<OperationContext>, RepositoryError> {
        let mut snapshot = self.projects.read().await.get(project_id).cloned();
        if let Some(op) = snapshot.as_mut() {
            op.current_chapter_id = None;
        }
        Ok(snapshot)
    }
}
