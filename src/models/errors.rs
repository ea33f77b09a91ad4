//! Centralized Error Handling Module
//!
//! Every failure that can reach a caller carries a unique error code, so logs
//! and API responses can be correlated without parsing messages.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - Aggregation outcomes: INVALID_INPUT, NO_ROUTE_FOUND, ALL_SOURCES_EXHAUSTED
//! - SOURCE_xxx: per-source conditions (recovered inside the orchestrator)
//! - RPC_xxx: JSON-RPC transport errors
//! - API_xxx / CFG_xxx: HTTP surface and configuration errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// HTTP status for this error
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // ============================================
    // Aggregation outcomes (surfaced to callers)
    // ============================================
    /// A required parameter is missing or malformed
    InvalidInput,
    /// Every source answered, none had a valid/compatible result
    NoRouteFound,
    /// Every source was attempted and failed (or none is configured)
    AllSourcesExhausted,

    // ============================================
    // Per-source conditions (recovered locally)
    // ============================================
    /// Source not configured (e.g. missing API key)
    SourceUnavailable,
    /// Network/HTTP/parse error from one source
    SourceFailure,
    /// Source did not answer before the aggregation deadline
    SourceTimeout,

    // ============================================
    // Signer
    // ============================================
    /// The underlying wallet cannot perform the requested capability
    UnsupportedOperation,

    // ============================================
    // RPC Errors
    // ============================================
    /// RPC returned error response
    RpcError,
    /// Invalid RPC response
    RpcInvalidResponse,

    // ============================================
    // API / Configuration Errors
    // ============================================
    /// Unauthorized (invalid API key)
    ApiUnauthorized,
    /// Rate limit exceeded
    ApiRateLimited,
    /// Invalid configuration value
    ConfigInvalidValue,

    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::NoRouteFound => "NO_ROUTE_FOUND",
            Self::AllSourcesExhausted => "ALL_SOURCES_EXHAUSTED",

            Self::SourceUnavailable => "SOURCE_UNAVAILABLE",
            Self::SourceFailure => "SOURCE_FAILURE",
            Self::SourceTimeout => "SOURCE_TIMEOUT",

            Self::UnsupportedOperation => "UNSUPPORTED_OPERATION",

            Self::RpcError => "RPC_ERROR",
            Self::RpcInvalidResponse => "RPC_INVALID_RESPONSE",

            Self::ApiUnauthorized => "API_UNAUTHORIZED",
            Self::ApiRateLimited => "API_RATE_LIMITED",
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput | Self::ConfigInvalidValue => 400,
            Self::ApiUnauthorized => 401,
            Self::NoRouteFound => 404,
            Self::ApiRateLimited => 429,
            Self::UnsupportedOperation => 501,
            Self::SourceUnavailable => 503,
            _ => 500,
        }
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Required parameter missing or malformed
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    /// No valid/compatible route from any source
    pub fn no_route(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoRouteFound, msg)
    }

    /// All sources failed
    pub fn exhausted(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::AllSourcesExhausted, msg)
    }

    /// Source not configured
    pub fn unavailable(source: &str, missing: &str) -> Self {
        Self::new(
            ErrorCode::SourceUnavailable,
            format!("{} unavailable: {} not configured", source, missing),
        )
    }

    /// Source failed
    pub fn source_failure(source: &str, msg: impl fmt::Display) -> Self {
        Self::new(ErrorCode::SourceFailure, format!("{}: {}", source, msg))
    }

    /// Signer capability not supported
    pub fn unsupported(operation: &str) -> Self {
        Self::new(
            ErrorCode::UnsupportedOperation,
            format!("Unsupported operation: {}", operation),
        )
    }

    /// Invalid configuration value
    pub fn invalid_config(key: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid value for {}: {:?}", key, value),
        )
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::SourceFailure, err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::SourceTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::SourceFailure, "Connection failed")
        } else {
            Self::new(ErrorCode::SourceFailure, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::RpcInvalidResponse, "JSON parse error", err)
    }
}
