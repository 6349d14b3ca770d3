// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-process store used for development and tests.

use super::{StoreError, SubmissionStore, VoteStore, SIMILAR_LIMIT};
use crate::models::{ExistingSubmission, NewSubmission, NewVote, StoredSubmission, VoteRecord};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    submissions: Vec<(StoredSubmission, NewSubmission)>,
    votes: Vec<VoteRecord>,
}

/// Store that keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored submissions.
    pub async fn submission_count(&self) -> usize {
        self.tables.read().await.submissions.len()
    }

    /// Number of stored votes.
    pub async fn vote_count(&self) -> usize {
        self.tables.read().await.votes.len()
    }

    /// Stored submission with the given id.
    pub async fn submission(&self, id: i64) -> Option<NewSubmission> {
        self.tables
            .read()
            .await
            .submissions
            .iter()
            .find(|(stored, _)| stored.id == id)
            .map(|(_, row)| row.clone())
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn find_exact(&self, name: &str) -> Result<Option<ExistingSubmission>, StoreError> {
        let wanted = name.to_lowercase();
        let tables = self.tables.read().await;

        Ok(tables
            .submissions
            .iter()
            .find(|(stored, _)| stored.name.to_lowercase() == wanted)
            .map(|(stored, _)| ExistingSubmission {
                id: stored.id,
                name: stored.name.clone(),
            }))
    }

    async fn find_similar(&self, name: &str) -> Result<Vec<ExistingSubmission>, StoreError> {
        let needle = name.to_lowercase();
        let tables = self.tables.read().await;

        Ok(tables
            .submissions
            .iter()
            .filter(|(stored, _)| stored.name.to_lowercase().contains(&needle))
            .take(SIMILAR_LIMIT)
            .map(|(stored, _)| ExistingSubmission {
                id: stored.id,
                name: stored.name.clone(),
            })
            .collect())
    }

    async fn insert_submission(&self, submission: &NewSubmission) -> Result<StoredSubmission, StoreError> {
        let mut tables = self.tables.write().await;
        let stored = StoredSubmission {
            id: tables.submissions.len() as i64 + 1,
            name: submission.name.clone(),
            status: "pending".to_string(),
        };
        tables.submissions.push((stored.clone(), submission.clone()));
        Ok(stored)
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn insert_vote(&self, vote: &NewVote) -> Result<VoteRecord, StoreError> {
        let mut tables = self.tables.write().await;

        if tables
            .votes
            .iter()
            .any(|v| v.product_id == vote.product_id && v.anon_id == vote.anon_id)
        {
            return Err(StoreError::UniqueViolation(
                "votes_product_id_anon_id_key".to_string(),
            ));
        }

        let record = VoteRecord {
            id: tables.votes.len() as i64 + 1,
            product_id: vote.product_id,
            anon_id: vote.anon_id.clone(),
            rating: vote.rating,
            created_at: Some(Utc::now()),
        };
        tables.votes.push(record.clone());
        Ok(record)
    }
}
