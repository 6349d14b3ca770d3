// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! External store for submissions and votes.

mod memory;
mod rest;

pub use memory::MemoryStore;
pub use rest::RestStore;

use crate::models::{ExistingSubmission, NewSubmission, NewVote, StoredSubmission, VoteRecord};
use async_trait::async_trait;
use thiserror::Error;

/// Most rows a similar-name lookup returns.
pub const SIMILAR_LIMIT: usize = 10;

/// Store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Store request failed: {0}")]
    Request(String),

    #[error("Unexpected store response: {0}")]
    Response(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Request(err.to_string())
    }
}

/// Product submissions table.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// A submission whose name equals `name`, ignoring case.
    async fn find_exact(&self, name: &str) -> Result<Option<ExistingSubmission>, StoreError>;

    /// Submissions whose name contains `name`, ignoring case. At most
    /// [`SIMILAR_LIMIT`] rows.
    async fn find_similar(&self, name: &str) -> Result<Vec<ExistingSubmission>, StoreError>;

    /// Insert a pending submission.
    async fn insert_submission(&self, submission: &NewSubmission) -> Result<StoredSubmission, StoreError>;
}

/// Votes table. `(product_id, anon_id)` is unique.
#[async_trait]
pub trait VoteStore: Send + Sync {
    async fn insert_vote(&self, vote: &NewVote) -> Result<VoteRecord, StoreError>;
}
