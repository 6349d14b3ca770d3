// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for the intake service.
//!
//! Builds the full router over in-memory collaborators and a manual clock,
//! and provides fakes for the failure modes of the external services.

#![allow(dead_code)]

pub mod attacks;
pub mod generators;
pub mod metrics;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    routing::post,
    Json, Router,
};
use chrono::{TimeZone, Utc};
use directory_intake::{
    captcha::{CaptchaVerification, CaptchaVerifier},
    clock::ManualClock,
    config::Config,
    handlers::{router, AppState, Services},
    mailer::{ContactEmail, Mailer, MailerError, MemoryMailer},
    models::{ExistingSubmission, NewSubmission, NewVote, StoredSubmission, VoteRecord},
    store::{MemoryStore, StoreError, SubmissionStore, VoteStore},
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const SECRET: &str = "test-secret";

/// CAPTCHA verifier with a fixed answer that counts its calls.
pub struct StaticCaptcha {
    pass: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticCaptcha {
    pub fn passing() -> Self {
        Self {
            pass: true,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            pass: false,
            ..Self::passing()
        }
    }

    /// Passes, but only after `delay`.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::passing()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptchaVerifier for StaticCaptcha {
    async fn verify(&self, _token: &str, _secret: &str) -> CaptchaVerification {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.pass {
            CaptchaVerification::passed()
        } else {
            CaptchaVerification::failed("invalid-input-response")
        }
    }
}

/// Store whose every call fails at the transport level.
pub struct UnavailableStore;

#[async_trait]
impl SubmissionStore for UnavailableStore {
    async fn find_exact(&self, _name: &str) -> Result<Option<ExistingSubmission>, StoreError> {
        Err(StoreError::Request("connection refused".to_string()))
    }

    async fn find_similar(&self, _name: &str) -> Result<Vec<ExistingSubmission>, StoreError> {
        Err(StoreError::Request("connection refused".to_string()))
    }

    async fn insert_submission(&self, _row: &NewSubmission) -> Result<StoredSubmission, StoreError> {
        Err(StoreError::Request("connection refused".to_string()))
    }
}

#[async_trait]
impl VoteStore for UnavailableStore {
    async fn insert_vote(&self, _vote: &NewVote) -> Result<VoteRecord, StoreError> {
        Err(StoreError::Request("connection refused".to_string()))
    }
}

/// Mail relay that always rejects.
pub struct RejectingMailer;

#[async_trait]
impl Mailer for RejectingMailer {
    async fn send(&self, _email: &ContactEmail) -> Result<(), MailerError> {
        Err(MailerError::Rejected {
            status: 422,
            body: "invalid sender".to_string(),
        })
    }
}

/// Full application over fakes.
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub store: MemoryStore,
    pub mailer: MemoryMailer,
    pub captcha: Arc<StaticCaptcha>,
    pub clock: Arc<ManualClock>,
}

/// Builder for [`TestApp`].
pub struct TestAppBuilder {
    config: Config,
    captcha: Arc<StaticCaptcha>,
    submissions: Option<Arc<dyn SubmissionStore>>,
    votes: Option<Arc<dyn VoteStore>>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl TestAppBuilder {
    pub fn config(mut self, f: impl FnOnce(&mut Config)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn captcha(mut self, captcha: StaticCaptcha) -> Self {
        self.captcha = Arc::new(captcha);
        self
    }

    pub fn unavailable_store(mut self) -> Self {
        self.submissions = Some(Arc::new(UnavailableStore));
        self.votes = Some(Arc::new(UnavailableStore));
        self
    }

    pub fn mailer(mut self, mailer: impl Mailer + 'static) -> Self {
        self.mailer = Some(Arc::new(mailer));
        self
    }

    pub fn build(self) -> TestApp {
        let store = MemoryStore::new();
        let mailer = MemoryMailer::new();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ));

        let services = Services {
            captcha: self.captcha.clone(),
            submissions: self
                .submissions
                .unwrap_or_else(|| Arc::new(store.clone()) as Arc<dyn SubmissionStore>),
            votes: self
                .votes
                .unwrap_or_else(|| Arc::new(store.clone()) as Arc<dyn VoteStore>),
            mailer: self
                .mailer
                .unwrap_or_else(|| Arc::new(mailer.clone()) as Arc<dyn Mailer>),
            clock: clock.clone(),
        };

        let state = Arc::new(AppState::new(self.config, services).expect("metrics registry"));
        TestApp {
            router: router(state.clone()),
            state,
            store,
            mailer,
            captcha: self.captcha,
            clock,
        }
    }
}

/// Response as seen by a client.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `name=value` part of the Set-Cookie header.
    pub fn cookie(&self) -> Option<String> {
        self.header("set-cookie")
            .and_then(|c| c.split(';').next())
            .map(str::to_string)
    }
}

impl TestApp {
    pub fn builder() -> TestAppBuilder {
        let mut config = Config::default();
        config.captcha.secret = Some(SECRET.to_string());
        config.rate_limit.sweep_probability = 0.0;

        TestAppBuilder {
            config,
            captcha: Arc::new(StaticCaptcha::passing()),
            submissions: None,
            votes: None,
            mailer: None,
        }
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    pub async fn post(&self, path: &str, ip: &str, body: &Value) -> TestResponse {
        self.post_raw(path, ip, &[], body.to_string()).await
    }

    pub async fn post_with(
        &self,
        path: &str,
        ip: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> TestResponse {
        self.post_raw(path, ip, headers, body.to_string()).await
    }

    pub async fn post_raw(
        &self,
        path: &str,
        ip: &str,
        headers: &[(&str, &str)],
        body: impl Into<Body>,
    ) -> TestResponse {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", ip);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        self.send(request.body(body.into()).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Local stand-in for the siteverify endpoint. Returns its URL.
pub async fn spawn_siteverify(status: StatusCode, body: &'static str) -> String {
    let app = Router::new().route(
        "/siteverify",
        post(move || async move {
            (
                status,
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/siteverify", addr)
}

/// Siteverify stand-in that echoes whether it saw the expected form fields.
pub async fn spawn_checking_siteverify(expected_secret: &'static str) -> String {
    let app = Router::new().route(
        "/siteverify",
        post(move |body: String| async move {
            let pairs: Vec<(String, String)> = url::form_urlencoded::parse(body.as_bytes())
                .into_owned()
                .collect();
            let has = |k: &str, v: &str| pairs.iter().any(|(pk, pv)| pk == k && pv == v);
            let ok = has("secret", expected_secret) && has("response", "good-token");
            Json(serde_json::json!({ "success": ok }))
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/siteverify", addr)
}
