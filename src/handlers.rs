// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers and router for the intake service.

use crate::captcha::{CaptchaVerifier, HCaptchaVerifier};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::intake::{ContactIntake, Pipeline, SubmissionIntake, VoteIntake};
use crate::limiter::RateLimiter;
use crate::mailer::{Mailer, MemoryMailer, ResendMailer};
use crate::metrics::Metrics;
use crate::store::{MemoryStore, RestStore, SubmissionStore, VoteStore};
use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

/// External collaborators the pipelines depend on.
pub struct Services {
    pub captcha: Arc<dyn CaptchaVerifier>,
    pub submissions: Arc<dyn SubmissionStore>,
    pub votes: Arc<dyn VoteStore>,
    pub mailer: Arc<dyn Mailer>,
    pub clock: Arc<dyn Clock>,
}

impl Services {
    /// Production wiring. Falls back to in-memory collaborators where the
    /// configuration leaves a backend unset.
    pub fn from_config(config: &Config) -> Self {
        let timeout = config.upstream_timeout();
        let captcha: Arc<dyn CaptchaVerifier> =
            Arc::new(HCaptchaVerifier::new(config.captcha.verify_url.clone(), timeout));

        let (submissions, votes): (Arc<dyn SubmissionStore>, Arc<dyn VoteStore>) =
            match (&config.store.url, &config.store.service_key) {
                (Some(url), Some(key)) => {
                    info!(url = %url, "Using REST store");
                    let store = Arc::new(RestStore::new(url.clone(), key.clone(), timeout));
                    (store.clone(), store)
                }
                _ => {
                    warn!("No store configured, using in-memory store");
                    let store = Arc::new(MemoryStore::new());
                    (store.clone(), store)
                }
            };

        let mailer: Arc<dyn Mailer> = match &config.mailer.api_key {
            Some(key) => Arc::new(ResendMailer::new(config.mailer.api_url.clone(), key.clone(), timeout)),
            None => {
                warn!("No mail API key configured, contact messages stay in memory");
                Arc::new(MemoryMailer::new())
            }
        };

        Self {
            captcha,
            submissions,
            votes,
            mailer,
            clock: Arc::new(SystemClock),
        }
    }
}

/// Shared application state.
pub struct AppState {
    pub contact: Pipeline<ContactIntake>,
    pub submission: Pipeline<SubmissionIntake>,
    pub vote: Pipeline<VoteIntake>,
    pub metrics: Metrics,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, services: Services) -> Result<Self, prometheus::Error> {
        let metrics = Metrics::new()?;
        let timeout = config.upstream_timeout();
        let limiter = || RateLimiter::with_clock(config.rate_limit.clone(), services.clock.clone());
        let secret = config.captcha.secret.clone();

        let contact = Pipeline::new(
            ContactIntake::new(services.mailer.clone(), config.mailer.clone()),
            limiter(),
            services.captcha.clone(),
            secret.clone(),
            timeout,
        )
        .with_metrics(metrics.clone());
        let submission = Pipeline::new(
            SubmissionIntake::new(services.submissions.clone()),
            limiter(),
            services.captcha.clone(),
            secret.clone(),
            timeout,
        )
        .with_metrics(metrics.clone());
        let vote = Pipeline::new(
            VoteIntake::new(services.votes.clone()),
            limiter(),
            services.captcha.clone(),
            secret,
            timeout,
        )
        .with_metrics(metrics.clone());

        Ok(Self {
            contact,
            submission,
            vote,
            metrics,
            config,
        })
    }

    /// Drop expired rate limit windows from every limiter.
    pub async fn sweep(&self) -> usize {
        self.contact.limiter().sweep().await
            + self.submission.limiter().sweep().await
            + self.vote.limiter().sweep().await
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ]);

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/contact", post(contact))
        .route("/submissions", post(submit_product))
        .route("/votes", post(submit_vote));

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "directory-intake",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus exposition endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Contact form relay.
pub async fn contact(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ip = client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));
    state.contact.run(&ip, &headers, &body).await
}

/// Product submission intake.
pub async fn submit_product(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ip = client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));
    state.submission.run(&ip, &headers, &body).await
}

/// Vote intake.
pub async fn submit_vote(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ip = client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));
    state.vote.run(&ip, &headers, &body).await
}

/// Rate-limit key for a request: first `X-Forwarded-For` hop, then
/// `X-Real-IP`, then `CF-Connecting-IP`, then the peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header_value("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    header_value("x-real-ip")
        .or_else(|| header_value("cf-connecting-ip"))
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
