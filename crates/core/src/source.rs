//! Project source trait: read-only access to stored projects.
//!
//! Persistence belongs to the host application. The engine only needs to
//! load a project together with its characters, locations and cultures.

use async_trait::async_trait;

use crate::error::RepositoryError;
use crate::project::OperationContext;

/// Read-only repository for project aggregates.
///
/// Implementations: the host's database layer, or the in-memory source in
/// `storyloom-engine` for tests and tooling.
#[async_trait]
pub trait ProjectSource: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Load a project and its related entities.
    ///
    /// Returns `Ok(None)` when no project has this id. The returned context
    /// has no current chapter set.
    async fn load(
        &self,
        project_id: &str,
    ) -> std::result::Result<Option<OperationContext>, RepositoryError>;
}
