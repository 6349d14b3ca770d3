// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window rate limiter for the intake endpoints.
//!
//! One entry per client key. Within a window a key is admitted up to
//! `max_requests` times; rejections never extend or reset the window.
//! Expired entries are replaced wholesale on the next admission and swept
//! opportunistically (a small fraction of admissions also drop every
//! expired entry) so memory stays bounded without a scheduler.
//!
//! State is local to this process. Behind N replicas the effective limit
//! is `max_requests * N`.

use crate::clock::{Clock, SystemClock};
use crate::config::RateLimitConfig;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Remaining admissions in the current window
        remaining: u32,
        /// When the current window ends
        reset_at: DateTime<Utc>,
    },
    /// Request is rate limited
    Limited {
        /// When the current window ends
        reset_at: DateTime<Utc>,
        /// Time until the window ends
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }

    pub fn remaining(&self) -> u32 {
        match self {
            RateLimitResult::Allowed { remaining, .. } => *remaining,
            RateLimitResult::Limited { .. } => 0,
        }
    }

    pub fn reset_at(&self) -> DateTime<Utc> {
        match self {
            RateLimitResult::Allowed { reset_at, .. } | RateLimitResult::Limited { reset_at, .. } => {
                *reset_at
            }
        }
    }
}

/// Per-key window state.
#[derive(Debug, Clone)]
struct RateLimitEntry {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Thread-safe rate limiter.
pub struct RateLimiter {
    /// Configuration
    config: RateLimitConfig,
    /// Time source
    clock: Arc<dyn Clock>,
    /// Per-key windows
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl RateLimiter {
    /// Create a new rate limiter on the wall clock.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a new rate limiter with an injected clock.
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Configured admissions per window.
    pub fn limit(&self) -> u32 {
        self.config.max_requests
    }

    /// Check and, if admitted, count one request for `key`.
    ///
    /// Check and increment happen under one lock, so concurrent requests
    /// sharing a key never lose an increment.
    pub async fn admit(&self, key: &str) -> RateLimitResult {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        if self.should_sweep() {
            let before = entries.len();
            entries.retain(|_, entry| now < entry.reset_at);
            debug!(dropped = before - entries.len(), "Swept expired rate limit entries");
        }

        if let Some(entry) = entries.get_mut(key).filter(|e| now < e.reset_at) {
            if entry.count < self.config.max_requests {
                entry.count += 1;
                return RateLimitResult::Allowed {
                    remaining: self.config.max_requests - entry.count,
                    reset_at: entry.reset_at,
                };
            }

            let retry_after = (entry.reset_at - now).to_std().unwrap_or(Duration::ZERO);
            debug!(key, ?retry_after, "Rate limit exceeded");
            return RateLimitResult::Limited {
                reset_at: entry.reset_at,
                retry_after,
            };
        }

        // First request from this key, or its window has ended.
        let reset_at = now + self.window();
        entries.insert(key.to_string(), RateLimitEntry { count: 1, reset_at });
        RateLimitResult::Allowed {
            remaining: self.config.max_requests.saturating_sub(1),
            reset_at,
        }
    }

    /// Drop every entry whose window has ended.
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| now < entry.reset_at);
        before - entries.len()
    }

    /// Number of tracked keys.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    fn window(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.config.window_duration()).unwrap_or_else(|_| {
            warn!(window_secs = self.config.window_secs, "Window out of range, using one hour");
            chrono::Duration::hours(1)
        })
    }

    fn should_sweep(&self) -> bool {
        let p = self.config.sweep_probability;
        p > 0.0 && rand::random::<f64>() < p
    }
}
