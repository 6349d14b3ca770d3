// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Directory Intake
//!
//! Inbound request pipeline for a product directory's public forms:
//!
//! - Contact relay (mailed to the maintainers)
//! - Product submissions (stored for admin review, duplicate names rejected)
//! - Anonymous votes (one rating per product per voter cookie)
//!
//! Every request is rate limited per client IP with a fixed window, then
//! validated against its schema, then CAPTCHA-verified where the kind
//! requires it, and finally written once to the external collaborator.

pub mod captcha;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod intake;
pub mod limiter;
pub mod mailer;
pub mod metrics;
pub mod models;
pub mod store;
pub mod validator;

pub use config::Config;
pub use error::IntakeError;
pub use handlers::{router, AppState, Services};
pub use limiter::{RateLimitResult, RateLimiter};
pub use validator::{validate, FieldErrors, Schema};
