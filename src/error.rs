// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error taxonomy for intake requests.

use crate::validator::FieldErrors;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Why a request ended in the rejected state.
///
/// `Upstream` and `Internal` carry detail for the server log only; the
/// client sees the public message.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Too many requests. Please try again later.")]
    RateLimited { retry_after: Duration },

    #[error("Invalid input data")]
    InvalidInput(FieldErrors),

    #[error("CAPTCHA verification failed. Please try again.")]
    CaptchaFailed,

    #[error("{0}")]
    Duplicate(&'static str),

    #[error("{public}")]
    Upstream { public: &'static str, detail: String },

    #[error("An unexpected error occurred. Please try again later.")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl IntakeError {
    pub fn upstream(public: &'static str, detail: impl Into<String>) -> Self {
        Self::Upstream {
            public,
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::CaptchaFailed => StatusCode::FORBIDDEN,
            Self::Duplicate(_) => StatusCode::CONFLICT,
            Self::Upstream { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::CaptchaFailed => "CAPTCHA_FAILED",
            Self::Duplicate(_) => "DUPLICATE",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the fault lies with the server side rather than the caller.
    pub fn is_server_fault(&self) -> bool {
        self.status().is_server_error()
    }
}

/// Whole seconds until `retry_after` has passed, never less than one.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let error = self.to_string();

        let (details, retry_after) = match self {
            Self::InvalidInput(errors) => (Some(errors), None),
            Self::RateLimited { retry_after } => (None, Some(retry_after_secs(retry_after))),
            _ => (None, None),
        };

        let body = Json(ErrorResponse {
            error,
            code,
            details,
            retry_after_secs: retry_after,
        });

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
