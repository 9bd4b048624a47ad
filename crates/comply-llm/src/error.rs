//! Error types for model invocation

use thiserror::Error;

/// Errors that can occur during model invocation
#[derive(Error, Debug)]
pub enum LlmError {
    /// The provider throttled the request
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Network or 5xx-class failure that may succeed on retry
    #[error("Transient failure: {0}")]
    Transient(String),

    /// The model answered but the payload is not usable JSON
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The document could not be uploaded
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Non-retryable provider failure
    #[error("Model error: {0}")]
    Terminal(String),

    /// A transient failure persisted through every attempt
    #[error("{} after {attempts} attempts: {last}", exhaustion_cause(.rate_limited))]
    RetriesExhausted {
        /// Attempts made
        attempts: u32,
        /// Whether the last failure was rate limiting
        rate_limited: bool,
        /// Message of the last failure
        last: String,
    },
}

fn exhaustion_cause(rate_limited: &bool) -> &'static str {
    if *rate_limited {
        "rate limit exceeded"
    } else {
        "model call failed"
    }
}

impl LlmError {
    /// Whether a retry may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::RateLimited(_) | LlmError::Transient(_))
    }

    /// Whether the failure was (or ended in) rate limiting
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited(_)
                | LlmError::RetriesExhausted {
                    rate_limited: true,
                    ..
                }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::RateLimited("429".into()).is_transient());
        assert!(LlmError::Transient("503".into()).is_transient());
        assert!(!LlmError::Terminal("400".into()).is_transient());
        assert!(!LlmError::InvalidResponse("not json".into()).is_transient());
        assert!(!LlmError::Upload("too large".into()).is_transient());
    }

    #[test]
    fn test_exhaustion_messages_distinguish_rate_limits() {
        let throttled = LlmError::RetriesExhausted {
            attempts: 3,
            rate_limited: true,
            last: "Rate limited: 429".to_string(),
        };
        let failed = LlmError::RetriesExhausted {
            attempts: 3,
            rate_limited: false,
            last: "Transient failure: 503".to_string(),
        };

        assert!(throttled.to_string().starts_with("rate limit exceeded after 3 attempts"));
        assert!(failed.to_string().starts_with("model call failed after 3 attempts"));
        assert!(throttled.is_rate_limited());
        assert!(!failed.is_rate_limited());
        assert!(!throttled.is_transient());
    }
}
