use formats::GeoJsonError;

/// Failure of a single feature-collection fetch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("fetch cancelled")]
    Cancelled,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} answered with HTTP {status}")]
    Status { status: u16, url: String },
    #[error("malformed payload: {0}")]
    Payload(#[from] GeoJsonError),
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Cancellation is a clean termination, not a user-visible error.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}
