//! Retryable-vs-fatal classification of provider failures.
//!
//! Providers report failures as an HTTP status plus free text, and the text
//! is often all an SDK surfaces. This is the single place that turns that
//! pair into a [`ProviderErrorKind`]; refine the heuristics here without
//! touching the generation loop.
//!
//! Precedence: credentials and quota problems are checked first so that a
//! message like "API key not valid … model not found" is never retried on
//! another model with the same bad key.

use crate::error::{ProviderError, ProviderErrorKind};

const AUTH_MARKERS: &[&str] = &[
    "api key not valid",
    "api_key_invalid",
    "invalid api key",
    "incorrect api key",
    "unauthenticated",
    "unauthorized",
    "permission denied",
    "permission_denied",
];

const QUOTA_MARKERS: &[&str] = &[
    "quota",
    "resource_exhausted",
    "resource has been exhausted",
    "rate limit",
    "too many requests",
];

const NOT_FOUND_MARKERS: &[&str] = &[
    "not found",
    "not_found",
    "is not supported for generatecontent",
    "unknown model",
    "does not exist",
];

const UNAVAILABLE_MARKERS: &[&str] = &[
    "overloaded",
    "unavailable",
    "try again later",
    "temporarily",
];

/// Classify a failure from its HTTP status (if any) and message.
pub fn classify(status: Option<u16>, message: &str) -> ProviderErrorKind {
    let lower = message.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    match status {
        Some(401) | Some(403) => return ProviderErrorKind::Authentication,
        Some(429) => return ProviderErrorKind::Quota,
        _ => {}
    }

    if has(AUTH_MARKERS) {
        return ProviderErrorKind::Authentication;
    }
    if has(QUOTA_MARKERS) {
        return ProviderErrorKind::Quota;
    }

    match status {
        Some(404) => return ProviderErrorKind::ModelNotFound,
        Some(503) => return ProviderErrorKind::Unavailable,
        // Other server errors only count as "temporarily unavailable" when
        // the message says so.
        Some(s) if (500..600).contains(&s) => {
            return if has(UNAVAILABLE_MARKERS) {
                ProviderErrorKind::Unavailable
            } else {
                ProviderErrorKind::Unexpected
            };
        }
        Some(400) | Some(413) | Some(422) => return ProviderErrorKind::InvalidRequest,
        _ => {}
    }

    // No usable status: SDK-style errors embed the code in the text.
    if lower.contains("404") || has(NOT_FOUND_MARKERS) {
        ProviderErrorKind::ModelNotFound
    } else if lower.contains("503") || has(UNAVAILABLE_MARKERS) {
        ProviderErrorKind::Unavailable
    } else if lower.contains("400") || lower.contains("invalid argument") {
        ProviderErrorKind::InvalidRequest
    } else if status.is_none() && (lower.contains("connect") || lower.contains("timed out")) {
        ProviderErrorKind::Transport
    } else {
        ProviderErrorKind::Unexpected
    }
}

/// Build a classified [`ProviderError`] in one step.
pub fn provider_error(status: Option<u16>, message: impl Into<String>) -> ProviderError {
    let message = message.into();
    let kind = classify(status, &message);
    let err = ProviderError::new(kind, message);
    match status {
        Some(s) => err.with_status(s),
        None => err,
    }
}
