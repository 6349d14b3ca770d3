// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Anonymous product ratings.

use super::{IntakeContext, IntakeHandler};
use crate::error::IntakeError;
use crate::identity::VoterIdentity;
use crate::models::{NewVote, VoteRecord, VoteRequest};
use crate::store::{StoreError, VoteStore};
use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

pub const DUPLICATE_VOTE: &str = "You have already voted for this product";
const VOTE_FAILED: &str = "Failed to submit vote. Please try again.";

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub success: bool,
    pub vote: VoteRecord,
}

/// Records one rating per product per anonymous voter.
pub struct VoteIntake {
    store: Arc<dyn VoteStore>,
}

impl VoteIntake {
    pub fn new(store: Arc<dyn VoteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IntakeHandler for VoteIntake {
    type Request = VoteRequest;
    type Prepared = VoterIdentity;
    type Response = VoteResponse;

    const KIND: &'static str = "vote";

    async fn prepare(&self, _request: &VoteRequest, ctx: &IntakeContext<'_>) -> Result<VoterIdentity, IntakeError> {
        Ok(VoterIdentity::resolve(ctx.headers))
    }

    async fn persist(
        &self,
        request: VoteRequest,
        identity: &VoterIdentity,
        ctx: &IntakeContext<'_>,
    ) -> Result<VoteResponse, IntakeError> {
        let vote = NewVote {
            product_id: request.product_id,
            anon_id: identity.as_str().to_string(),
            rating: request.rating,
        };

        let record = ctx
            .bounded(VOTE_FAILED, self.store.insert_vote(&vote))
            .await?
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => IntakeError::Duplicate(DUPLICATE_VOTE),
                other => IntakeError::upstream(VOTE_FAILED, other.to_string()),
            })?;

        info!(
            product_id = record.product_id,
            rating = record.rating,
            new_voter = identity.is_new(),
            "Vote recorded"
        );
        Ok(VoteResponse {
            success: true,
            vote: record,
        })
    }

    fn finish(&self, identity: &VoterIdentity, headers: &mut HeaderMap) {
        headers.insert(header::SET_COOKIE, identity.set_cookie());
    }
}
