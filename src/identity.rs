// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Anonymous voter identity carried in the `anon_id` cookie.

use axum::http::{header, HeaderMap, HeaderValue};
use uuid::Uuid;

/// Cookie that carries the identity.
pub const COOKIE_NAME: &str = "anon_id";

/// One year, in seconds.
pub const COOKIE_MAX_AGE_SECS: u64 = 31_536_000;

const MAX_ID_LEN: usize = 64;

/// Opaque identifier tying one browser to at most one vote per product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterIdentity {
    id: String,
    minted: bool,
}

impl VoterIdentity {
    /// Reuse the identity in the request's cookies, or mint a new one.
    pub fn resolve(headers: &HeaderMap) -> Self {
        match from_cookies(headers) {
            Some(id) => Self { id, minted: false },
            None => Self::mint(),
        }
    }

    pub fn mint() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            minted: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// Whether this identity was created for the current request.
    pub fn is_new(&self) -> bool {
        self.minted
    }

    /// `Set-Cookie` value: HTTP-only, root path, `SameSite=Lax`, one year.
    pub fn set_cookie(&self) -> HeaderValue {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            COOKIE_NAME, self.id, COOKIE_MAX_AGE_SECS
        );
        // `id` is restricted to [A-Za-z0-9-], which is always a valid header value.
        HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
    }
}

fn from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name.trim() == COOKIE_NAME).then(|| value.trim().to_string())
        })
        .find(|value| is_acceptable_id(value))
}

fn is_acceptable_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_ID_LEN
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
