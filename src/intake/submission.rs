// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Product submission intake.
//!
//! A case-insensitive exact name match against earlier submissions is a
//! conflict, checked on its own so it is never crowded out of the capped
//! similar-name list. Partial matches are returned to the submitter as
//! `similar` without blocking.
//!
//! The lookup and the insert are separate calls. Two identical submissions
//! racing each other can both pass the lookup and both be stored unless the
//! table itself enforces uniqueness; a unique violation on insert is
//! reported as the same conflict.

use super::{IntakeContext, IntakeHandler};
use crate::error::IntakeError;
use crate::models::SubmissionRequest;
use crate::store::{StoreError, SubmissionStore};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

pub const DUPLICATE_SUBMISSION: &str = "A product with this name has already been submitted.";
const SUBMIT_FAILED: &str = "Failed to submit product. Please try again.";

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub success: bool,
    pub message: &'static str,
    pub id: i64,
    /// Existing submissions whose names contain the submitted one.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub similar: Vec<String>,
}

/// Accepts product submissions for admin review.
pub struct SubmissionIntake {
    store: Arc<dyn SubmissionStore>,
}

impl SubmissionIntake {
    pub fn new(store: Arc<dyn SubmissionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IntakeHandler for SubmissionIntake {
    type Request = SubmissionRequest;
    /// Names of similar, non-identical submissions.
    type Prepared = Vec<String>;
    type Response = SubmissionResponse;

    const KIND: &'static str = "submission";

    fn captcha_token(request: &SubmissionRequest) -> Option<&str> {
        Some(&request.captcha_token)
    }

    async fn prepare(
        &self,
        request: &SubmissionRequest,
        ctx: &IntakeContext<'_>,
    ) -> Result<Vec<String>, IntakeError> {
        let name = &request.submission.name;
        let exact = ctx
            .bounded(SUBMIT_FAILED, self.store.find_exact(name))
            .await?
            .map_err(|e| IntakeError::upstream(SUBMIT_FAILED, e.to_string()))?;
        if let Some(existing) = exact {
            info!(name = %name, existing_id = existing.id, "Duplicate submission");
            return Err(IntakeError::Duplicate(DUPLICATE_SUBMISSION));
        }

        let similar: Vec<String> = ctx
            .bounded(SUBMIT_FAILED, self.store.find_similar(name))
            .await?
            .map_err(|e| IntakeError::upstream(SUBMIT_FAILED, e.to_string()))?
            .into_iter()
            .map(|e| e.name)
            .collect();
        if !similar.is_empty() {
            debug!(name = %name, similar = ?similar, "Similar submissions exist");
        }
        Ok(similar)
    }

    async fn persist(
        &self,
        request: SubmissionRequest,
        similar: &Vec<String>,
        ctx: &IntakeContext<'_>,
    ) -> Result<SubmissionResponse, IntakeError> {
        let stored = ctx
            .bounded(SUBMIT_FAILED, self.store.insert_submission(&request.submission))
            .await?
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => IntakeError::Duplicate(DUPLICATE_SUBMISSION),
                other => IntakeError::upstream(SUBMIT_FAILED, other.to_string()),
            })?;

        info!(id = stored.id, name = %stored.name, "Product submission stored");
        Ok(SubmissionResponse {
            success: true,
            message: "Product submitted successfully!",
            id: stored.id,
            similar: similar.clone(),
        })
    }
}
