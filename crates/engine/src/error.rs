//! Engine-level errors.

use storyloom_core::error::RepositoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}
