use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("request to geodata service failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("geodata service returned HTTP {status}: {snippet}")]
    Status { status: u16, snippet: String },
    #[error("malformed geodata payload: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SearchError {
    /// Transport failures and non-success statuses both count as network errors.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Status { .. })
    }

    pub fn status(status: u16, body: &str) -> Self {
        const MAX_SNIPPET: usize = 256;
        let snippet = match body.char_indices().nth(MAX_SNIPPET) {
            Some((cut, _)) => format!("{}...", &body[..cut]),
            None => body.to_string(),
        };
        Self::Status { status, snippet }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeywordError {
    #[error("keyword is empty")]
    Empty,
    #[error("keyword is {len} characters long, the limit is {max}")]
    TooLong { len: usize, max: usize },
    #[error("keyword contains a control character")]
    ControlCharacter,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("coordinate out of range: ({latitude}, {longitude})")]
    OutOfRange { latitude: f64, longitude: f64 },
}
