//! Error types for LLM Council

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CouncilError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No endpoint configured for {0} backend")]
    MissingEndpoint(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request timed out after {0:.1}s")]
    Timeout(f64),

    #[error("Chairman {0} produced no synthesis")]
    ChairmanFailed(String),
}

pub type Result<T> = std::result::Result<T, CouncilError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = CouncilError::Timeout(120.0);
        assert_eq!(err.to_string(), "Request timed out after 120.0s");
    }

    #[test]
    fn test_provider_display() {
        let err = CouncilError::Provider {
            status: 429,
            body: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "Provider returned 429: rate limited");
    }

    #[test]
    fn test_chairman_failed_display() {
        let err = CouncilError::ChairmanFailed("gemini-2.5-pro".to_string());
        assert_eq!(err.to_string(), "Chairman gemini-2.5-pro produced no synthesis");
    }
}
