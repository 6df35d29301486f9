//! Error types for the BGG client library.

use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, BggError>;

/// Every way a BGG request can fail
#[derive(Error, Debug)]
pub enum BggError {
    /// Transport or connection failure; never retried
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Any status other than 200 or 202
    #[error("unexpected status code: {status}")]
    UnexpectedStatusCode { status: u16 },

    /// A 200 response whose body was empty or unreadable
    #[error("empty response body")]
    EmptyResponse,

    /// BGG kept answering 202 until the retry budget ran out
    #[error("exceeded maximum retries while waiting for BGG to process request ({attempts} attempts)")]
    MaxRetriesExceeded { attempts: u32 },

    /// The fallback tree parser could not read the document
    #[error("failed to parse XML response: {message}")]
    XmlParse { message: String },

    /// The parsed tree could not be written back out as XML
    #[error("failed to regenerate XML response: {message}")]
    Regenerate { message: String },

    /// Neither the raw nor the regenerated document fit the target record
    #[error("failed to unmarshal XML response into {type_name}: {source}")]
    Unmarshal {
        type_name: &'static str,
        #[source]
        source: quick_xml::DeError,
    },

    /// Caller-supplied query arguments were rejected before any request was made
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    UrlParsing(#[from] url::ParseError),

    /// The caller's cancellation token fired
    #[error("request cancelled")]
    Cancelled,

    /// The retry loop ended without producing a response
    #[error("failed to get response from BGG API after retries")]
    RetriesExhausted,
}

impl BggError {
    /// Create a new invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a new XML parse error
    pub fn xml_parse(message: impl Into<String>) -> Self {
        Self::XmlParse {
            message: message.into(),
        }
    }

    /// Create a new regenerate error
    pub fn regenerate(message: impl Into<String>) -> Self {
        Self::Regenerate {
            message: message.into(),
        }
    }

    /// Create a new max retries error from the zero-based index of the last attempt
    pub fn max_retries_exceeded(last_attempt: u32) -> Self {
        Self::MaxRetriesExceeded {
            attempts: last_attempt.saturating_add(1),
        }
    }

    /// The HTTP status carried by an [`BggError::UnexpectedStatusCode`]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            BggError::UnexpectedStatusCode { status } => Some(*status),
            _ => None,
        }
    }

    /// Check if repeating the same call later might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            BggError::Http(_) | BggError::MaxRetriesExceeded { .. } => true,
            BggError::UnexpectedStatusCode { status } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Check if the response arrived but could not be decoded
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            BggError::XmlParse { .. } | BggError::Regenerate { .. } | BggError::Unmarshal { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = BggError::invalid_argument("too many IDs");
        assert!(error.to_string().contains("too many IDs"));

        let error = BggError::UnexpectedStatusCode { status: 404 };
        assert!(error.to_string().contains("404"));
        assert_eq!(error.status_code(), Some(404));

        let error = BggError::max_retries_exceeded(3);
        assert!(matches!(error, BggError::MaxRetriesExceeded { attempts: 4 }));
        assert!(error.to_string().contains("exceeded maximum retries"));
    }

    #[test]
    fn test_max_retries_attempt_count_saturates() {
        let error = BggError::max_retries_exceeded(u32::MAX);
        assert!(matches!(
            error,
            BggError::MaxRetriesExceeded { attempts } if attempts == u32::MAX
        ));
    }

    #[test]
    fn test_error_properties() {
        assert!(BggError::UnexpectedStatusCode { status: 503 }.is_retryable());
        assert!(BggError::UnexpectedStatusCode { status: 429 }.is_retryable());
        assert!(!BggError::UnexpectedStatusCode { status: 404 }.is_retryable());
        assert!(!BggError::EmptyResponse.is_retryable());
        assert!(BggError::xml_parse("no root").is_decode_error());
        assert!(BggError::regenerate("bad name").is_decode_error());
        assert!(!BggError::Cancelled.is_decode_error());
        assert_eq!(BggError::EmptyResponse.status_code(), None);
    }
}
