use thiserror::Error;

pub type Result<T, E = ReorderError> = std::result::Result<T, E>;

/// Every failure a reorder or listing request can end in.
///
/// Lower layers never translate these; the caller at the request boundary
/// decides how to present them (see [`ReorderError::status_code`]).
#[derive(Debug, Error)]
pub enum ReorderError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("playlist {0} not found or is empty")]
    NotFoundOrEmpty(String),

    #[error("remote service error {status}: {message}")]
    RemoteService {
        status: u16,
        message: String,
        /// Seconds, from `Retry-After` on rate-limited responses.
        retry_after: Option<u64>,
    },

    #[error("write-back failed after {committed} of {total} items were committed: {source}")]
    PartialWriteFailure {
        committed: usize,
        total: usize,
        #[source]
        source: Box<ReorderError>,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not decode remote response: {0}")]
    Decode(String),
}

impl ReorderError {
    /// HTTP-style status for the request-facing layer.
    pub fn status_code(&self) -> u16 {
        match self {
            ReorderError::InvalidRequest(_) => 400,
            ReorderError::Unauthorized(_) => 401,
            ReorderError::NotFoundOrEmpty(_) => 404,
            ReorderError::RemoteService { status, .. } => *status,
            ReorderError::PartialWriteFailure { .. }
            | ReorderError::Transport(_)
            | ReorderError::Decode(_) => 502,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ReorderError::RemoteService { status: 429, .. })
    }

    /// Items already on the remote playlist in the new order, if the failure
    /// happened part-way through a write-back.
    pub fn committed_items(&self) -> Option<usize> {
        match self {
            ReorderError::PartialWriteFailure { committed, .. } => Some(*committed),
            _ => None,
        }
    }
}
