// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request schemas and the records exchanged with the external store.

use crate::validator::{BoolField, FieldErrors, Format, IntField, Payload, Schema, TextField};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

/// Why someone is writing in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    EditRequest,
    NewProduct,
    #[default]
    General,
    Report,
}

impl RequestType {
    pub const VALUES: &'static [&'static str] = &["edit_request", "new_product", "general", "report"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EditRequest => "edit_request",
            Self::NewProduct => "new_product",
            Self::General => "general",
            Self::Report => "report",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "edit_request" => Some(Self::EditRequest),
            "new_product" => Some(Self::NewProduct),
            "general" => Some(Self::General),
            "report" => Some(Self::Report),
            _ => None,
        }
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

mod contact_fields {
    use super::*;

    pub const NAME: TextField = TextField::new("name").max_len(100);
    pub const EMAIL: TextField = TextField::new("email").max_len(255).format(Format::Email);
    pub const PRODUCT_NAME: TextField = TextField::new("productName").max_len(200);
    pub const REQUEST_TYPE: TextField =
        TextField::new("requestType").format(Format::OneOf(RequestType::VALUES));
    pub const MESSAGE: TextField = TextField::new("message").max_len(2000);
    pub const CAPTCHA_TOKEN: TextField = TextField::new("captchaToken");
}

/// Validated contact form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub product_name: Option<String>,
    pub request_type: RequestType,
    pub message: String,
    pub captcha_token: String,
}

impl Schema for ContactRequest {
    fn from_payload(mut p: Payload<'_>) -> Result<Self, FieldErrors> {
        use contact_fields::*;

        let request = ContactRequest {
            name: p.text(&NAME),
            email: p.text(&EMAIL),
            product_name: p.optional_text(&PRODUCT_NAME),
            request_type: RequestType::from_value(&p.text(&REQUEST_TYPE)).unwrap_or_default(),
            message: p.text(&MESSAGE),
            captcha_token: p.text(&CAPTCHA_TOKEN),
        };
        p.finish(request)
    }
}

// ---------------------------------------------------------------------------
// Product submission
// ---------------------------------------------------------------------------

mod submission_fields {
    use super::*;

    pub const NAME: TextField = TextField::new("name").max_len(200);
    pub const URL: TextField = TextField::new("url").max_len(500).format(Format::Url);
    pub const CATEGORY_TYPE: TextField = TextField::new("category_type").max_len(100);
    pub const DB_FIT: TextField = TextField::new("db_fit").max_len(100);
    pub const DEPLOY_PATH: TextField = TextField::new("deploy_path").max_len(200);
    pub const PRICING_MODEL: TextField = TextField::new("pricing_model").max_len(100);
    pub const TAGS: TextField = TextField::new("tags").max_len(500);
    pub const USE_CASE_CATEGORY: TextField = TextField::new("use_case_category").max_len(200);
    pub const OVERVIEW_SHORT: TextField = TextField::new("overview_short").max_len(1000);
    pub const PROS_SHORT: TextField = TextField::new("pros_short").max_len(1000);
    pub const CONS_SHORT: TextField = TextField::new("cons_short").max_len(1000);
    pub const SUBMITTER_EMAIL: TextField =
        TextField::new("submitter_email").max_len(255).format(Format::Email);
    pub const SUBMITTER_NOTES: TextField = TextField::new("submitter_notes").max_len(2000);

    pub const OSS: BoolField = BoolField::new("oss");
    pub const FIRST_CLASS_NEON: BoolField = BoolField::new("first_class_neon");
    pub const FIRST_CLASS_SUPABASE: BoolField = BoolField::new("first_class_supabase");
    pub const DESIGNER_FIRST: BoolField = BoolField::new("designer_first");
    pub const ENTERPRISE_READY: BoolField = BoolField::new("enterprise_ready");
    pub const BYO_POSTGRES: BoolField = BoolField::new("byo_postgres");
    pub const AI_BUILDER: BoolField = BoolField::new("ai_builder");

    pub const DIFFICULTY_HINT: IntField = IntField::new("difficulty_hint", 0, 10);
    pub const COMPLEXITY_HINT: IntField = IntField::new("complexity_hint", 0, 10);

    pub const CAPTCHA_TOKEN: TextField = TextField::new("captcha_token");
}

/// Submission fields as stored. Also the insert payload for the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubmission {
    pub name: String,
    pub url: Option<String>,
    pub category_type: String,
    pub db_fit: String,
    pub deploy_path: Option<String>,
    pub pricing_model: Option<String>,
    pub tags: Option<String>,
    pub use_case_category: Option<String>,
    pub overview_short: Option<String>,
    pub pros_short: Option<String>,
    pub cons_short: Option<String>,
    pub submitter_email: Option<String>,
    pub submitter_notes: Option<String>,
    pub oss: bool,
    pub first_class_neon: bool,
    pub first_class_supabase: bool,
    pub designer_first: bool,
    pub enterprise_ready: bool,
    pub byo_postgres: bool,
    pub ai_builder: bool,
    pub difficulty_hint: Option<i64>,
    pub complexity_hint: Option<i64>,
}

/// Validated submission form. The CAPTCHA token never reaches the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub submission: NewSubmission,
    pub captcha_token: String,
}

impl Schema for SubmissionRequest {
    fn from_payload(mut p: Payload<'_>) -> Result<Self, FieldErrors> {
        use submission_fields::*;

        let submission = NewSubmission {
            name: p.text(&NAME),
            url: p.optional_text(&URL),
            category_type: p.text(&CATEGORY_TYPE),
            db_fit: p.text(&DB_FIT),
            deploy_path: p.optional_text(&DEPLOY_PATH),
            pricing_model: p.optional_text(&PRICING_MODEL),
            tags: p.optional_text(&TAGS),
            use_case_category: p.optional_text(&USE_CASE_CATEGORY),
            overview_short: p.optional_text(&OVERVIEW_SHORT),
            pros_short: p.optional_text(&PROS_SHORT),
            cons_short: p.optional_text(&CONS_SHORT),
            submitter_email: p.optional_text(&SUBMITTER_EMAIL),
            submitter_notes: p.optional_text(&SUBMITTER_NOTES),
            oss: p.boolean(&OSS),
            first_class_neon: p.boolean(&FIRST_CLASS_NEON),
            first_class_supabase: p.boolean(&FIRST_CLASS_SUPABASE),
            designer_first: p.boolean(&DESIGNER_FIRST),
            enterprise_ready: p.boolean(&ENTERPRISE_READY),
            byo_postgres: p.boolean(&BYO_POSTGRES),
            ai_builder: p.boolean(&AI_BUILDER),
            difficulty_hint: p.optional_int(&DIFFICULTY_HINT),
            complexity_hint: p.optional_int(&COMPLEXITY_HINT),
        };
        let captcha_token = p.text(&CAPTCHA_TOKEN);

        p.finish(SubmissionRequest {
            submission,
            captcha_token,
        })
    }
}

/// Existing submission returned by a name lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingSubmission {
    pub id: i64,
    pub name: String,
}

/// Stored submission row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSubmission {
    pub id: i64,
    pub name: String,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "pending".to_string()
}

// ---------------------------------------------------------------------------
// Vote
// ---------------------------------------------------------------------------

mod vote_fields {
    use super::*;

    pub const PRODUCT_ID: IntField = IntField::new("product_id", 1, i64::MAX);
    pub const RATING: IntField = IntField::new("rating", 1, 5);
}

/// Validated vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteRequest {
    pub product_id: i64,
    pub rating: i64,
}

impl Schema for VoteRequest {
    fn from_payload(mut p: Payload<'_>) -> Result<Self, FieldErrors> {
        use vote_fields::*;

        let request = VoteRequest {
            product_id: p.int(&PRODUCT_ID),
            rating: p.int(&RATING),
        };
        p.finish(request)
    }
}

/// Vote insert payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVote {
    pub product_id: i64,
    pub anon_id: String,
    pub rating: i64,
}

/// Stored vote row, echoed back to the voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub id: i64,
    pub product_id: i64,
    pub anon_id: String,
    pub rating: i64,
    pub created_at: Option<DateTime<Utc>>,
}
