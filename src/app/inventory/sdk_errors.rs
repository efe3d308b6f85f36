//! AWS SDK error categorization for failure reporting.
//!
//! Distinguishes transient errors (throttling, timeouts, network issues) from
//! non-retryable ones (permissions, validation) so that a collection pass can report
//! *why* a listing or enrichment was skipped.
//!
//! The AWS SDK handles retries internally with exponential backoff. Errors reaching
//! this module are final; no additional application-level retry happens.

use serde::Serialize;

/// Categorized error types for AWS SDK errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Request was throttled due to rate limiting
    Throttled { service: String, error_code: String },
    /// Request timed out
    Timeout { operation: String },
    /// Network connectivity issues
    NetworkError { message: String },
    /// AWS service temporarily unavailable
    ServiceUnavailable { service: String, message: String },
    /// Non-retryable error (permissions, validation, etc.)
    NonRetryable {
        code: String,
        message: String,
        is_permission_error: bool,
    },
    /// The branch was cancelled or ran past its deadline before the call completed
    Cancelled { reason: String },
}

impl ErrorCategory {
    /// Non-retryable category for conditions detected by the engine itself
    /// (page limits, missing identity, ...)
    pub fn engine(code: &str, message: impl Into<String>) -> Self {
        ErrorCategory::NonRetryable {
            code: code.to_string(),
            message: message.into(),
            is_permission_error: false,
        }
    }

    pub fn is_permission_error(&self) -> bool {
        matches!(
            self,
            ErrorCategory::NonRetryable {
                is_permission_error: true,
                ..
            }
        )
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, ErrorCategory::Throttled { .. })
    }

    /// Short label for compact display
    pub fn short_label(&self) -> &'static str {
        match self {
            ErrorCategory::Throttled { .. } => "throttled",
            ErrorCategory::Timeout { .. } => "timeout",
            ErrorCategory::NetworkError { .. } => "network",
            ErrorCategory::ServiceUnavailable { .. } => "unavailable",
            ErrorCategory::NonRetryable { .. } => "error",
            ErrorCategory::Cancelled { .. } => "cancelled",
        }
    }
}

/// Analyze an error and categorize it
///
/// `anyhow::Error` wraps the SDK error; its debug form carries the service error code
/// when the display form only says "service error".
pub fn categorize_error(error: &anyhow::Error, service: &str, operation: &str) -> ErrorCategory {
    let error_str = format!("{:#}", error);
    let error_debug = format!("{:?}", error);

    let detail = if error_str.contains("service error") {
        &error_debug
    } else {
        &error_str
    };

    categorize_error_string(detail, service, operation)
}

/// Rate limiting codes. S3 answers `SlowDown`, STS `Throttling` and the JSON protocol
/// services (Bedrock, DataZone, DSQL, S3 Tables, Timestream) `ThrottlingException`.
const THROTTLING_CODES: &[&str] = &["Throttling", "SlowDown", "TooManyRequestsException"];

const UNAVAILABLE_CODES: &[&str] = &[
    "InternalServerException",
    "ServiceUnavailableException",
    "ServiceUnavailable",
    "InternalError",
];

/// `UnauthorizedException` is DataZone's; the token codes come from STS and
/// credential resolution.
const PERMISSION_CODES: &[&str] = &[
    "AccessDenied",
    "UnauthorizedException",
    "InvalidClientTokenId",
    "ExpiredToken",
    "UnrecognizedClientException",
];

/// Markers the smithy runtime puts in transport failures
const TIMEOUT_MARKERS: &[&str] = &["TimeoutError", "timed out", "timeout"];
const NETWORK_MARKERS: &[&str] = &["DispatchFailure", "connection", "Connection", "dns error"];

fn mentions_any(error_str: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| error_str.contains(needle))
}

/// Categorize an error based on its string representation
pub fn categorize_error_string(error_str: &str, service: &str, operation: &str) -> ErrorCategory {
    if mentions_any(error_str, THROTTLING_CODES) {
        return ErrorCategory::Throttled {
            service: service.to_string(),
            error_code: extract_error_code(error_str).unwrap_or_else(|| "Throttling".to_string()),
        };
    }

    if mentions_any(error_str, TIMEOUT_MARKERS) {
        return ErrorCategory::Timeout {
            operation: operation.to_string(),
        };
    }

    if mentions_any(error_str, NETWORK_MARKERS) {
        return ErrorCategory::NetworkError {
            message: truncate_message(error_str, 100),
        };
    }

    if mentions_any(error_str, UNAVAILABLE_CODES) {
        return ErrorCategory::ServiceUnavailable {
            service: service.to_string(),
            message: truncate_message(error_str, 100),
        };
    }

    let is_permission_error = mentions_any(error_str, PERMISSION_CODES);
    let code = extract_error_code(error_str).unwrap_or_else(|| {
        if is_permission_error {
            "AccessDenied".to_string()
        } else {
            "Error".to_string()
        }
    });

    ErrorCategory::NonRetryable {
        code,
        message: truncate_message(error_str, 200),
        is_permission_error,
    }
}

/// Extract AWS error code from error message if present
fn extract_error_code(error_str: &str) -> Option<String> {
    // "ThrottlingException: Rate exceeded"
    if let Some(pos) = error_str.find(':') {
        let prefix = error_str[..pos].trim();
        if prefix.ends_with("Exception")
            || prefix.ends_with("Error")
            || prefix.chars().next().is_some_and(|c| c.is_uppercase())
        {
            let code = prefix.rsplit("::").next().unwrap_or(prefix);
            if !code.is_empty() && code.len() < 50 && !code.contains(' ') {
                return Some(code.to_string());
            }
        }
    }

    // Error { code: "ValidationException", ... }
    if let Some(start) = error_str.find("code:") {
        let after_code = &error_str[start + 5..];
        if let Some(quote_start) = after_code.find('"') {
            let after_quote = &after_code[quote_start + 1..];
            if let Some(quote_end) = after_quote.find('"') {
                let code = &after_quote[..quote_end];
                if !code.is_empty() && code.len() < 50 {
                    return Some(code.to_string());
                }
            }
        }
    }

    None
}

/// Truncate a message to max length, adding ellipsis if truncated
fn truncate_message(msg: &str, max_len: usize) -> String {
    if msg.len() <= max_len {
        return msg.to_string();
    }
    let mut end = max_len.saturating_sub(3);
    while !msg.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &msg[..end])
}
