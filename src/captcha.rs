// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! CAPTCHA verification against the hCaptcha siteverify API.
//!
//! Every failure mode (transport, non-2xx, undecodable body, explicit
//! `success: false`) reads as a failed verification. Neither the token nor
//! the secret is ever logged.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of one verification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaVerification {
    pub success: bool,
    pub error_codes: Vec<String>,
}

impl CaptchaVerification {
    pub fn passed() -> Self {
        Self {
            success: true,
            error_codes: Vec::new(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error_codes: vec![reason.into()],
        }
    }
}

/// Confirms a human-submitted token with an external service.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: &str, secret: &str) -> CaptchaVerification;
}

#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// hCaptcha siteverify client.
pub struct HCaptchaVerifier {
    verify_url: String,
    client: reqwest::Client,
}

impl HCaptchaVerifier {
    pub fn new(verify_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client for CAPTCHA");
                reqwest::Client::new()
            });

        Self {
            verify_url: verify_url.into(),
            client,
        }
    }
}

#[async_trait]
impl CaptchaVerifier for HCaptchaVerifier {
    async fn verify(&self, token: &str, secret: &str) -> CaptchaVerification {
        let response = match self
            .client
            .post(&self.verify_url)
            .form(&[("secret", secret), ("response", token)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "CAPTCHA service unreachable");
                return CaptchaVerification::failed("verification-service-error");
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "CAPTCHA service returned an error status");
            return CaptchaVerification::failed("verification-service-error");
        }

        match response.json::<SiteverifyResponse>().await {
            Ok(body) => {
                debug!(success = body.success, error_codes = ?body.error_codes, "CAPTCHA verification result");
                if body.success {
                    CaptchaVerification::passed()
                } else if body.error_codes.is_empty() {
                    CaptchaVerification::failed("verification-failed")
                } else {
                    CaptchaVerification {
                        success: false,
                        error_codes: body.error_codes,
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "CAPTCHA service returned a malformed body");
                CaptchaVerification::failed("malformed-response")
            }
        }
    }
}
