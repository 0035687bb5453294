use synclattes_core::{ExitCode, RevisionId, SyncError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DedupError {
    /// Input that cannot yield a comparison key (bad encoding, no letters in a name).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("reassignment of group {group:?} to main {main} failed: {source}")]
    ReassignmentFailed {
        group: Vec<RevisionId>,
        main: RevisionId,
        #[source]
        source: SyncError,
    },

    #[error("{count} duplicate pointer(s) target a revision that is itself a duplicate")]
    ConsistencyViolation { count: usize },

    #[error("storage error: {0}")]
    Storage(#[from] SyncError),
}

impl DedupError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) | Self::Precondition(_) => ExitCode::InvalidArgs,
            Self::ConsistencyViolation { .. } => ExitCode::Conflict,
            Self::ReassignmentFailed { source, .. } | Self::Storage(source) => source.exit_code(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DedupError>;
