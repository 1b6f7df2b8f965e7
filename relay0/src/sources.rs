//! Git and GitHub collaborators — the history and forge data layer
//! consumed by tool adapters.
//!
//! Like the repository index, these are interfaces the core consumes,
//! not implements: the real ones shell out to `git log` and the GitHub
//! CLI, the test ones return canned records.

use crate::error::CollabError;
use crate::index::{IndexStats, SearchHit};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Filter for a commit-history query.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitFilter {
    /// Restrict to commits touching this path.
    pub path: Option<String>,
    /// Maximum number of commits to return.
    pub limit: usize,
    /// Only commits after this date (free-form, passed to the source).
    pub since: Option<String>,
    /// Only commits by this author.
    pub author: Option<String>,
    /// Follow renames when a path filter is set.
    pub follow: bool,
    /// Exclude merge commits.
    pub no_merges: bool,
}

/// A commit author.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitAuthor {
    /// Author name.
    pub name: String,
    /// Author email.
    pub email: String,
    /// Author date (ISO 8601 as produced by the source).
    pub date: String,
}

/// One file touched by a commit.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    /// Path of the file.
    pub path: String,
    /// Change status letter (A, M, D, R...).
    pub status: String,
    /// Lines added.
    pub additions: u64,
    /// Lines deleted.
    pub deletions: u64,
}

/// Aggregate line statistics of a commit.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitStats {
    /// Files changed.
    pub files_changed: u64,
    /// Total lines added.
    pub insertions: u64,
    /// Total lines deleted.
    pub deletions: u64,
}

/// Issue and PR references extracted from a commit message.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitRefs {
    /// Referenced issue numbers.
    pub issue_refs: Vec<u64>,
    /// Referenced pull-request numbers.
    pub pr_refs: Vec<u64>,
}

/// One commit as extracted from the log.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitCommit {
    /// Full commit hash.
    pub hash: String,
    /// Abbreviated hash.
    pub short_hash: String,
    /// First line of the message.
    pub subject: String,
    /// Remainder of the message.
    pub body: String,
    /// Author identity and date.
    pub author: CommitAuthor,
    /// Files touched.
    pub files: Vec<FileChange>,
    /// Aggregate line statistics.
    pub stats: CommitStats,
    /// Issue/PR references found in the message.
    pub refs: CommitRefs,
}

/// Collaborator — local git history extraction.
#[async_trait]
pub trait GitSource: Send + Sync {
    /// Extract commits matching the filter, newest first.
    async fn commits(&self, filter: CommitFilter) -> Result<Vec<GitCommit>, CollabError>;
}

/// What a GitHub document is.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhDocType {
    /// An issue.
    Issue,
    /// A pull request.
    PullRequest,
}

/// State of an issue or pull request.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhState {
    /// Open.
    Open,
    /// Closed (issues and unmerged PRs).
    Closed,
    /// Merged (PRs only).
    Merged,
}

/// A fetched issue or pull request with its extracted cross-links.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GhDocument {
    /// Whether this is an issue or a pull request.
    pub doc_type: GhDocType,
    /// Issue/PR number.
    pub number: u64,
    /// Title.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Current state.
    pub state: GhState,
    /// Label names.
    pub labels: Vec<String>,
    /// Author login.
    pub author: String,
    /// Creation time (ISO 8601).
    pub created_at: String,
    /// Last update time (ISO 8601).
    pub updated_at: String,
    /// Close time, if closed.
    pub closed_at: Option<String>,
    /// Web URL.
    pub url: String,
    /// `owner/repo` this document belongs to.
    pub repository: String,
    /// Issue numbers referenced by this document.
    pub related_issues: Vec<u64>,
    /// PR numbers referenced by this document.
    pub related_prs: Vec<u64>,
    /// Repository file paths linked from the body or diff.
    pub linked_files: Vec<String>,
    /// User logins mentioned.
    pub mentions: Vec<String>,
}

/// Options for a GitHub indexing run.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GhIndexOptions {
    /// Maximum number of documents to fetch.
    pub limit: Option<u64>,
    /// Only documents updated after this date.
    pub since: Option<String>,
    /// Include closed issues and PRs.
    pub include_closed: bool,
}

/// Collaborator — GitHub issue/PR context.
#[async_trait]
pub trait GitHubSource: Send + Sync {
    /// Semantic search over indexed issues and PRs.
    async fn search(
        &self,
        query: &str,
        options: crate::index::SearchOptions,
    ) -> Result<Vec<SearchHit>, CollabError>;

    /// Fetch one issue or PR with its cross-links. None if the number
    /// doesn't exist.
    async fn context(&self, number: u64) -> Result<Option<GhDocument>, CollabError>;

    /// Documents related to the given issue/PR number.
    async fn find_related(&self, number: u64, limit: usize)
        -> Result<Vec<SearchHit>, CollabError>;

    /// Fetch and index documents from the forge.
    async fn index(&self, options: GhIndexOptions) -> Result<IndexStats, CollabError>;
}
