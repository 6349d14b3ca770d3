// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! PostgREST (Supabase REST) client for the managed database.

use super::{StoreError, SubmissionStore, VoteStore, SIMILAR_LIMIT};
use crate::models::{ExistingSubmission, NewSubmission, NewVote, StoredSubmission, VoteRecord};
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
struct SubmissionRow<'a> {
    #[serde(flatten)]
    submission: &'a NewSubmission,
    status: &'static str,
}

/// Store backed by a PostgREST endpoint.
pub struct RestStore {
    base_url: String,
    service_key: String,
    client: reqwest::Client,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client for store");
                reqwest::Client::new()
            });

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            client,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn insert_returning<T, R>(&self, table: &str, row: &T) -> Result<R, StoreError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?;

        let rows: Vec<R> = read_json(table, response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Response(format!("insert into {} returned no row", table)))
    }
}

async fn read_json<R: DeserializeOwned>(table: &str, response: Response) -> Result<R, StoreError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| StoreError::Response(format!("{}: {}", table, e)));
    }

    let body = response.text().await.unwrap_or_default();
    let parsed: Option<PostgrestError> = serde_json::from_str(&body).ok();
    let code = parsed.as_ref().and_then(|p| p.code.clone());
    let message = parsed
        .and_then(|p| p.message)
        .unwrap_or_else(|| body.chars().take(200).collect());

    // 409 also covers foreign-key (23503) and other conflicts; only a bare
    // 409 without a code is taken as a unique violation.
    let unique = match code.as_deref() {
        Some(code) => code == UNIQUE_VIOLATION,
        None => status == StatusCode::CONFLICT,
    };
    if unique {
        return Err(StoreError::UniqueViolation(message));
    }
    Err(StoreError::Response(format!("{} returned {}: {}", table, status, message)))
}

/// `ilike` pattern matching `name` anywhere, with LIKE metacharacters escaped.
fn contains_pattern(name: &str) -> String {
    format!("ilike.*{}*", escape_like(name))
}

/// `ilike` pattern matching `name` as a whole.
fn exact_pattern(name: &str) -> String {
    format!("ilike.{}", escape_like(name))
}

fn escape_like(name: &str) -> String {
    let mut pattern = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        match c {
            '\\' | '%' | '_' => {
                pattern.push('\\');
                pattern.push(c);
            }
            // PostgREST reads `*` as `%`; match it as a single character instead.
            '*' => pattern.push('_'),
            _ => pattern.push(c),
        }
    }
    pattern
}

#[async_trait]
impl SubmissionStore for RestStore {
    async fn find_exact(&self, name: &str) -> Result<Option<ExistingSubmission>, StoreError> {
        let limit = SIMILAR_LIMIT.to_string();
        let pattern = exact_pattern(name);
        let response = self
            .authorized(self.client.get(self.table_url("product_submissions")))
            .query(&[
                ("select", "id,name"),
                ("name", pattern.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        // `*` in a name was widened to a single-character wildcard.
        let wanted = name.to_lowercase();
        let rows: Vec<ExistingSubmission> = read_json("product_submissions", response).await?;
        Ok(rows.into_iter().find(|row| row.name.to_lowercase() == wanted))
    }

    async fn find_similar(&self, name: &str) -> Result<Vec<ExistingSubmission>, StoreError> {
        let limit = SIMILAR_LIMIT.to_string();
        let pattern = contains_pattern(name);
        let response = self
            .authorized(self.client.get(self.table_url("product_submissions")))
            .query(&[
                ("select", "id,name"),
                ("name", pattern.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let rows: Vec<ExistingSubmission> = read_json("product_submissions", response).await?;
        debug!(matches = rows.len(), "Similar-name lookup complete");
        Ok(rows)
    }

    async fn insert_submission(&self, submission: &NewSubmission) -> Result<StoredSubmission, StoreError> {
        let row = SubmissionRow {
            submission,
            status: "pending",
        };
        self.insert_returning("product_submissions", &row).await
    }
}

#[async_trait]
impl VoteStore for RestStore {
    async fn insert_vote(&self, vote: &NewVote) -> Result<VoteRecord, StoreError> {
        self.insert_returning("votes", vote).await
    }
}
