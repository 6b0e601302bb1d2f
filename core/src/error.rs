//! Error types for the dispatcher.
//!
//! # Design
//! Only configuration mistakes are raised: a bad base URL, method or content
//! type, or a call made before any base URL exists. Transport failures are
//! swallowed by `Dispatcher::call` and decode failures travel back as data
//! inside `ParsedBody::Error`, so neither appears here.

/// Errors raised by `Dispatcher` setters and `Dispatcher::call`.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The base URL is not a well-formed absolute URL with a host.
    #[error("invalid URL: {0:?}")]
    InvalidUrl(String),

    /// The method token is not one of GET, POST, PUT, DELETE.
    #[error("invalid communication standard: {0:?}")]
    InvalidMethod(String),

    /// The content type override is not `json` or `xml`.
    #[error("content type not supported: {0:?}")]
    InvalidContentType(String),

    /// `call` was invoked before a base URL was configured.
    #[error("you need to set a URL")]
    MissingUrl,

    /// A configuration document could not be read.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Network-level failure reported by a `Transport`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let err = DispatchError::InvalidContentType("yaml".to_string());
        assert_eq!(err.to_string(), r#"content type not supported: "yaml""#);
        assert_eq!(DispatchError::MissingUrl.to_string(), "you need to set a URL");
    }
}
