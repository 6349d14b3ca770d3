// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outcome tallies for attack simulation.

use axum::http::StatusCode;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Possible outcomes for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allowed,
    RateLimited,
    InvalidInput,
    CaptchaFailed,
    Duplicate,
    ServerError,
}

impl Outcome {
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            200..=299 => Self::Allowed,
            429 => Self::RateLimited,
            400 => Self::InvalidInput,
            403 => Self::CaptchaFailed,
            409 => Self::Duplicate,
            _ => Self::ServerError,
        }
    }
}

/// Collects outcomes during an attack simulation.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    start_time: Option<Instant>,
    end_time: Option<Instant>,
    outcomes: HashMap<Outcome, usize>,
    requests_per_ip: HashMap<String, usize>,
    allowed_per_ip: HashMap<String, usize>,
}

impl AttackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Instant::now());
    }

    pub fn record(&mut self, outcome: Outcome, ip: &str) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        *self.requests_per_ip.entry(ip.to_string()).or_insert(0) += 1;
        if outcome == Outcome::Allowed {
            *self.allowed_per_ip.entry(ip.to_string()).or_insert(0) += 1;
        }
    }

    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    pub fn duration(&self) -> Duration {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Ratio of non-successful requests to all requests.
    pub fn block_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        (total - self.count(Outcome::Allowed)) as f64 / total as f64
    }

    pub fn unique_ips(&self) -> usize {
        self.requests_per_ip.len()
    }

    /// Highest number of successes seen for any single address.
    pub fn max_allowed_per_ip(&self) -> usize {
        self.allowed_per_ip.values().copied().max().unwrap_or(0)
    }

    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            total_requests: self.total_requests(),
            allowed: self.count(Outcome::Allowed),
            rate_limited: self.count(Outcome::RateLimited),
            invalid_input: self.count(Outcome::InvalidInput),
            server_errors: self.count(Outcome::ServerError),
            duration_ms: self.duration().as_millis() as u64,
            block_rate: self.block_rate(),
            unique_ips: self.unique_ips(),
            max_allowed_per_ip: self.max_allowed_per_ip(),
        }
    }
}

/// Summary report of attack metrics.
#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub total_requests: usize,
    pub allowed: usize,
    pub rate_limited: usize,
    pub invalid_input: usize,
    pub server_errors: usize,
    pub duration_ms: u64,
    pub block_rate: f64,
    pub unique_ips: usize,
    pub max_allowed_per_ip: usize,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Attack Metrics Report ===")?;
        writeln!(f, "Duration:          {} ms", self.duration_ms)?;
        writeln!(f, "Total Requests:    {}", self.total_requests)?;
        writeln!(f, "Allowed:           {}", self.allowed)?;
        writeln!(f, "Rate Limited:      {}", self.rate_limited)?;
        writeln!(f, "Invalid Input:     {}", self.invalid_input)?;
        writeln!(f, "Server Errors:     {}", self.server_errors)?;
        writeln!(f, "Block Rate:        {:.1}%", self.block_rate * 100.0)?;
        writeln!(f, "Unique IPs:        {}", self.unique_ips)?;
        writeln!(f, "Max Allowed / IP:  {}", self.max_allowed_per_ip)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_status() {
        assert_eq!(Outcome::from_status(StatusCode::OK), Outcome::Allowed);
        assert_eq!(Outcome::from_status(StatusCode::TOO_MANY_REQUESTS), Outcome::RateLimited);
        assert_eq!(Outcome::from_status(StatusCode::CONFLICT), Outcome::Duplicate);
        assert_eq!(Outcome::from_status(StatusCode::BAD_GATEWAY), Outcome::ServerError);
    }

    #[test]
    fn test_block_rate() {
        let mut metrics = AttackMetrics::new();
        for _ in 0..3 {
            metrics.record(Outcome::Allowed, "10.0.0.1");
        }
        for _ in 0..7 {
            metrics.record(Outcome::RateLimited, "10.0.0.1");
        }

        assert!((metrics.block_rate() - 0.7).abs() < 0.01);
        assert_eq!(metrics.max_allowed_per_ip(), 3);
    }
}
