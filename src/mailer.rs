// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact mail relay.

use crate::config::MailerConfig;
use crate::models::ContactRequest;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;

/// Mailer error types.
#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Mail request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Mail provider rejected message: {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// A composed contact message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactEmail {
    pub from: String,
    pub to: Vec<String>,
    pub reply_to: String,
    pub subject: String,
    pub html: String,
}

impl ContactEmail {
    /// Compose the relay message for a validated contact request.
    pub fn compose(config: &MailerConfig, request: &ContactRequest) -> Self {
        let subject = match &request.product_name {
            Some(product) => format!("[{}] {} - {}", config.brand, request.request_type, product),
            None => format!("[{}] {}", config.brand, request.request_type),
        };

        let mut html = String::new();
        html.push_str(&format!(
            "<h2>New Contact Request from {}</h2>\n",
            escape_html(&config.brand)
        ));
        html.push_str(&format!(
            "<p><strong>Request Type:</strong> {}</p>\n",
            escape_html(request.request_type.as_str())
        ));
        if let Some(product) = &request.product_name {
            html.push_str(&format!(
                "<p><strong>Product Name:</strong> {}</p>\n",
                escape_html(product)
            ));
        }
        html.push_str(&format!(
            "<p><strong>From:</strong> {} ({})</p>\n<hr />\n<h3>Message:</h3>\n",
            escape_html(&request.name),
            escape_html(&request.email)
        ));
        html.push_str(&format!(
            "<p>{}</p>\n",
            escape_html(&request.message).replace('\n', "<br />")
        ));

        Self {
            from: config.from.clone(),
            to: config.to.clone(),
            reply_to: request.email.clone(),
            subject,
            html,
        }
    }
}

/// Delivers contact messages.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &ContactEmail) -> Result<(), MailerError>;
}

/// Resend HTTP API client.
pub struct ResendMailer {
    api_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl ResendMailer {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client for mailer");
                reqwest::Client::new()
            });

        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            client,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &ContactEmail) -> Result<(), MailerError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(200)
            .collect();
        Err(MailerError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Mailer that keeps messages in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<ContactEmail>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<ContactEmail> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: &ContactEmail) -> Result<(), MailerError> {
        self.outbox.lock().await.push(email.clone());
        Ok(())
    }
}

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}
