//! The RepositoryIndex collaborator — semantic search over the code
//! under analysis.
//!
//! The orchestration core never builds or queries vectors itself; it
//! holds an opaque handle in the context manager and passes it to
//! agents. Implementations live outside this workspace (an embedding
//! index, a test stub). The handle is shared read-mostly and must be
//! thread-safe.

use crate::duration::DurationMs;
use crate::error::CollabError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Options for a semantic search query.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum number of results. None means the implementation default.
    pub limit: Option<usize>,
    /// Drop results scoring below this threshold.
    pub score_threshold: Option<f64>,
}

impl SearchOptions {
    /// Search options with a result limit.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            score_threshold: None,
        }
    }
}

/// One search result. The metadata carries at least `path`, `name` and
/// `type`, optionally `startLine`/`endLine`, plus source-specific extras
/// (callees, signature, labels) the core does not interpret.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Stable identifier of the matched document.
    pub id: String,
    /// Relevance score (higher is more relevant).
    pub score: f64,
    /// Source-specific metadata, opaque to the core.
    pub metadata: serde_json::Value,
}

impl SearchHit {
    /// Create a search hit with empty metadata.
    pub fn new(id: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            score,
            metadata: serde_json::Value::Null,
        }
    }
}

/// Statistics from the most recent indexing run.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Files the indexer walked.
    pub files_scanned: u64,
    /// Documents extracted and indexed.
    pub documents_indexed: u64,
    /// Vectors written to the store.
    pub vectors_stored: u64,
    /// Wall-clock duration of the run.
    pub duration: DurationMs,
    /// Non-fatal errors encountered during the run.
    pub errors: Vec<String>,
    /// Run start, milliseconds since the Unix epoch.
    pub started_at: u64,
    /// Run end, milliseconds since the Unix epoch.
    pub finished_at: u64,
}

/// Collaborator — semantic search over the analyzed repository.
///
/// Implementations must be safe to share across agents (`Send + Sync`,
/// internally synchronized). The core treats a missing or uninitialized
/// index as [`CollabError::IndexNotReady`], which tool adapters map to
/// the `INDEX_NOT_READY` error code.
#[async_trait]
pub trait RepositoryIndex: Send + Sync {
    /// Semantic search over the indexed documents.
    async fn search(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<SearchHit>, CollabError>;

    /// Statistics from the most recent indexing run, or None if the
    /// index has never been built.
    async fn stats(&self) -> Option<IndexStats>;

    /// Open or build the index.
    async fn initialize(&self) -> Result<(), CollabError>;

    /// Release resources.
    async fn close(&self) -> Result<(), CollabError>;
}
