// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact form relay.

use super::{IntakeContext, IntakeHandler};
use crate::config::MailerConfig;
use crate::error::IntakeError;
use crate::mailer::{ContactEmail, Mailer};
use crate::models::ContactRequest;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

const SEND_FAILED: &str = "Failed to send message. Please try again.";

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
}

/// Relays contact requests to the directory maintainers by mail.
pub struct ContactIntake {
    mailer: Arc<dyn Mailer>,
    config: MailerConfig,
}

impl ContactIntake {
    pub fn new(mailer: Arc<dyn Mailer>, config: MailerConfig) -> Self {
        Self { mailer, config }
    }
}

#[async_trait]
impl IntakeHandler for ContactIntake {
    type Request = ContactRequest;
    type Prepared = ();
    type Response = ContactResponse;

    const KIND: &'static str = "contact";

    fn captcha_token(request: &ContactRequest) -> Option<&str> {
        Some(&request.captcha_token)
    }

    async fn prepare(&self, _request: &ContactRequest, _ctx: &IntakeContext<'_>) -> Result<(), IntakeError> {
        Ok(())
    }

    async fn persist(
        &self,
        request: ContactRequest,
        _prepared: &(),
        ctx: &IntakeContext<'_>,
    ) -> Result<ContactResponse, IntakeError> {
        let email = ContactEmail::compose(&self.config, &request);

        ctx.bounded(SEND_FAILED, self.mailer.send(&email))
            .await?
            .map_err(|e| IntakeError::upstream(SEND_FAILED, e.to_string()))?;

        info!(
            request_type = %request.request_type,
            has_product = request.product_name.is_some(),
            "Contact message relayed"
        );
        Ok(ContactResponse { success: true })
    }
}
