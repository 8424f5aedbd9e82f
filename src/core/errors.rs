use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("API error: {code} - {message}")]
    ApiError { code: i64, message: String },

    #[error("Order book is stale: {0}")]
    StaleBook(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),
}

/// Coarse classification a caller can branch on when deciding whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was rejected before anything was sent.
    InvalidInput,
    /// The network or the exchange failed the call.
    ExchangeFailure,
    /// The exchange answered with something we could not interpret.
    UnexpectedResponse,
    /// Local state or configuration problem.
    Internal,
}

impl ExchangeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthError(_)
            | Self::InvalidArgument(_)
            | Self::InvalidQuantity(_)
            | Self::InvalidPrice(_)
            | Self::NotFound(_) => ErrorKind::InvalidInput,
            Self::TransportError(_) | Self::ApiError { .. } => ErrorKind::ExchangeFailure,
            Self::MalformedResponse(_) => ErrorKind::UnexpectedResponse,
            Self::StaleBook(_) | Self::ConfigError(_) => ErrorKind::Internal,
        }
    }

    /// A signed call that failed this way may or may not have reached the
    /// exchange; re-query by client order id before resubmitting.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ExchangeFailure
    }

    pub(crate) fn malformed(field: &str, detail: impl std::fmt::Display) -> Self {
        Self::MalformedResponse(format!("field '{}': {}", field, detail))
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        Self::TransportError(err.to_string())
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert_eq!(
            ExchangeError::InvalidArgument("symbol".into()).kind(),
            ErrorKind::InvalidInput
        );
        assert!(ExchangeError::TransportError("timeout".into()).is_retryable());
        assert!(ExchangeError::ApiError {
            code: -1021,
            message: "Timestamp outside recvWindow".into()
        }
        .is_retryable());
        assert!(!ExchangeError::MalformedResponse("price".into()).is_retryable());
    }
}
