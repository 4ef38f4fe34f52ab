//! Error types for the GitHub graph sync engine.

use thiserror::Error;

use crate::sync::SyncStage;

/// Result type alias using [`GithubSyncError`].
pub type SyncResult<T> = Result<T, GithubSyncError>;

/// Errors that can occur while syncing GitHub users into the graph.
#[derive(Debug, Error)]
pub enum GithubSyncError {
    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GitHub GraphQL API returned errors in the response body.
    #[error("GraphQL error: {message}")]
    GraphQl { message: String },

    /// Rate limit exceeded and retry budget exhausted.
    #[error("Rate limit exceeded after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// A required field was missing or malformed in an API response.
    #[error("Malformed response: missing {field} in {context}")]
    MissingField {
        field: &'static str,
        context: &'static str,
    },

    /// A field was present but carried a value outside the expected set.
    #[error("Malformed response: unexpected {field} value {value:?}")]
    InvalidValue { field: &'static str, value: String },

    /// The two fetch calls returned descriptors for different organizations.
    ///
    /// Raised before any write occurs; merging result sets that belong to
    /// different tenants would cross-contaminate two organizations' graphs.
    #[error(
        "Organization mismatch on {field}: members query returned {members:?}, \
         owners query returned {owners:?}"
    )]
    OrgMismatch {
        field: &'static str,
        members: String,
        owners: String,
    },

    /// Graph store write failure.
    #[error("Graph store error: {0}")]
    Store(String),

    /// A sync run aborted at the named stage.
    #[error("Sync aborted during {stage}: {source}")]
    Aborted {
        stage: SyncStage,
        #[source]
        source: Box<GithubSyncError>,
    },
}

impl GithubSyncError {
    /// Wrap an error with the sync stage it occurred in.
    pub(crate) fn at_stage(stage: SyncStage, source: GithubSyncError) -> Self {
        // Keep the innermost stage if one was already recorded.
        match source {
            GithubSyncError::Aborted { .. } => source,
            other => GithubSyncError::Aborted {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage a failed run aborted in, if recorded.
    #[must_use]
    pub fn stage(&self) -> Option<SyncStage> {
        match self {
            GithubSyncError::Aborted { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
