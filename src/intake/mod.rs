// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Shared intake pipeline.
//!
//! Every request moves through the same stages:
//!
//! ```text
//! Received -> RateChecked -> Validated -> CaptchaVerified -> Persisted -> Responded
//! ```
//!
//! and may leave any stage as a rejection ([`IntakeError`]). The rate check
//! runs before the body is parsed; CAPTCHA runs only on well-formed bodies.
//! Kinds plug in through [`IntakeHandler`]: a schema, an optional
//! pre-persistence hook, the single write, and an optional response hook.
//!
//! Nothing is retried. A failed external call ends the request.

mod contact;
mod submission;
mod vote;

pub use contact::ContactIntake;
pub use submission::{SubmissionIntake, SubmissionResponse, DUPLICATE_SUBMISSION};
pub use vote::{VoteIntake, VoteResponse, DUPLICATE_VOTE};

use crate::captcha::CaptchaVerifier;
use crate::error::IntakeError;
use crate::limiter::{RateLimitResult, RateLimiter};
use crate::metrics::Metrics;
use crate::validator::{validate, Schema};
use async_trait::async_trait;
use axum::{
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Pipeline stage, used to report where a request stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    RateChecked,
    Validated,
    CaptchaVerified,
    Persisted,
    Responded,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::RateChecked => "rate_checked",
            Self::Validated => "validated",
            Self::CaptchaVerified => "captcha_verified",
            Self::Persisted => "persisted",
            Self::Responded => "responded",
        };
        f.write_str(name)
    }
}

/// Per-request context handed to the hooks.
pub struct IntakeContext<'a> {
    pub client_ip: &'a str,
    pub headers: &'a HeaderMap,
    timeout: Duration,
}

impl IntakeContext<'_> {
    /// Run an external call under the configured bound. Elapsing is an
    /// upstream failure reported to the caller as `public`.
    pub async fn bounded<F, T>(&self, public: &'static str, call: F) -> Result<T, IntakeError>
    where
        F: Future<Output = T> + Send,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| IntakeError::upstream(public, format!("timed out after {:?}", self.timeout)))
    }
}

/// One request kind.
#[async_trait]
pub trait IntakeHandler: Send + Sync + 'static {
    /// Validated request body.
    type Request: Schema + Send + Sync;
    /// Output of the pre-persistence hook.
    type Prepared: Send + Sync;
    /// Success body.
    type Response: Serialize + Send;

    /// Label used in logs and metrics.
    const KIND: &'static str;

    /// Token to verify; kinds without CAPTCHA return `None`.
    fn captcha_token(_request: &Self::Request) -> Option<&str> {
        None
    }

    /// Runs after CAPTCHA and before the write (duplicate check, identity).
    async fn prepare(
        &self,
        request: &Self::Request,
        ctx: &IntakeContext<'_>,
    ) -> Result<Self::Prepared, IntakeError>;

    /// The single write against the external collaborator.
    async fn persist(
        &self,
        request: Self::Request,
        prepared: &Self::Prepared,
        ctx: &IntakeContext<'_>,
    ) -> Result<Self::Response, IntakeError>;

    /// Adjust success headers.
    fn finish(&self, _prepared: &Self::Prepared, _headers: &mut HeaderMap) {}
}

/// Rate limit, validate, verify, persist, respond.
pub struct Pipeline<H: IntakeHandler> {
    handler: H,
    limiter: RateLimiter,
    captcha: Arc<dyn CaptchaVerifier>,
    captcha_secret: Option<String>,
    timeout: Duration,
    metrics: Option<Metrics>,
}

impl<H: IntakeHandler> Pipeline<H> {
    pub fn new(
        handler: H,
        limiter: RateLimiter,
        captcha: Arc<dyn CaptchaVerifier>,
        captcha_secret: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            handler,
            limiter,
            captcha,
            captcha_secret,
            timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Handle one request end to end.
    pub async fn run(&self, client_ip: &str, headers: &HeaderMap, body: &[u8]) -> Response {
        let started = Instant::now();
        let mut response_headers = HeaderMap::new();
        let mut stage = Stage::Received;

        let result = self
            .execute(client_ip, headers, body, &mut stage, &mut response_headers)
            .await;

        let (outcome, mut response) = match result {
            Ok(body) => {
                debug!(kind = H::KIND, %client_ip, stage = %Stage::Responded, "Request completed");
                ("success", (StatusCode::OK, Json(body)).into_response())
            }
            Err(err) => {
                if err.is_server_fault() {
                    match &err {
                        IntakeError::Upstream { detail, .. } | IntakeError::Internal(detail) => {
                            error!(kind = H::KIND, %client_ip, %stage, code = err.code(), %detail, "Request failed");
                        }
                        _ => error!(kind = H::KIND, %client_ip, %stage, code = err.code(), "Request failed"),
                    }
                } else {
                    info!(kind = H::KIND, %client_ip, %stage, code = err.code(), "Request rejected");
                }
                (outcome_label(&err), err.into_response())
            }
        };

        response.headers_mut().extend(response_headers);
        if let Some(metrics) = &self.metrics {
            metrics.observe(H::KIND, outcome, started.elapsed());
        }
        response
    }

    async fn execute(
        &self,
        client_ip: &str,
        headers: &HeaderMap,
        body: &[u8],
        stage: &mut Stage,
        response_headers: &mut HeaderMap,
    ) -> Result<H::Response, IntakeError> {
        let decision = self.limiter.admit(client_ip).await;
        insert_rate_headers(response_headers, self.limiter.limit(), &decision);
        if let RateLimitResult::Limited { retry_after, .. } = decision {
            return Err(IntakeError::RateLimited { retry_after });
        }
        *stage = Stage::RateChecked;
        debug!(kind = H::KIND, %client_ip, remaining = decision.remaining(), "Rate check passed");

        let request = validate::<H::Request>(body).map_err(IntakeError::InvalidInput)?;
        *stage = Stage::Validated;

        if let Some(token) = H::captcha_token(&request) {
            self.verify_captcha(token).await?;
        }
        *stage = Stage::CaptchaVerified;

        let ctx = IntakeContext {
            client_ip,
            headers,
            timeout: self.timeout,
        };
        let prepared = self.handler.prepare(&request, &ctx).await?;
        let response = self.handler.persist(request, &prepared, &ctx).await?;
        *stage = Stage::Persisted;

        self.handler.finish(&prepared, response_headers);
        *stage = Stage::Responded;
        Ok(response)
    }

    async fn verify_captcha(&self, token: &str) -> Result<(), IntakeError> {
        let secret = self
            .captcha_secret
            .as_deref()
            .ok_or_else(|| IntakeError::Internal("CAPTCHA secret not configured".to_string()))?;

        match tokio::time::timeout(self.timeout, self.captcha.verify(token, secret)).await {
            Ok(verification) if verification.success => Ok(()),
            Ok(verification) => {
                info!(kind = H::KIND, error_codes = ?verification.error_codes, "CAPTCHA rejected");
                Err(IntakeError::CaptchaFailed)
            }
            Err(_) => {
                info!(kind = H::KIND, "CAPTCHA verification timed out");
                Err(IntakeError::CaptchaFailed)
            }
        }
    }
}

fn insert_rate_headers(headers: &mut HeaderMap, limit: u32, decision: &RateLimitResult) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining()));
    if let Ok(reset) = HeaderValue::from_str(&decision.reset_at().to_rfc3339()) {
        headers.insert(X_RATELIMIT_RESET, reset);
    }
}

fn outcome_label(err: &IntakeError) -> &'static str {
    match err {
        IntakeError::RateLimited { .. } => "rate_limited",
        IntakeError::InvalidInput(_) => "invalid_input",
        IntakeError::CaptchaFailed => "captcha_failed",
        IntakeError::Duplicate(_) => "duplicate",
        IntakeError::Upstream { .. } => "upstream_error",
        IntakeError::Internal(_) => "internal_error",
    }
}
