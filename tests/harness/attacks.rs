// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Abuse patterns for security testing.

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Number of unique client IPs
    pub unique_ips: usize,
    /// Number of distinct products voted on
    pub unique_products: usize,
    /// Whether bodies pass validation
    pub valid_payload: bool,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            unique_ips: 1,
            unique_products: 1,
            valid_payload: true,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// Vote flood from one address.
    pub fn single_ip_flood() -> Self {
        Self {
            total_requests: 200,
            unique_ips: 1,
            unique_products: 200,
            ..Default::default()
        }
    }

    /// Many addresses, a handful of requests each.
    pub fn distributed_attack() -> Self {
        Self {
            total_requests: 500,
            unique_ips: 100,
            unique_products: 500,
            ..Default::default()
        }
    }

    /// Garbage bodies from one address; must still burn the quota.
    pub fn malformed_flood() -> Self {
        Self {
            total_requests: 50,
            unique_ips: 1,
            valid_payload: false,
            ..Default::default()
        }
    }

    /// Per-address ceiling implied by the default configuration.
    pub fn expected_allowed(&self, limit: usize) -> usize {
        let per_ip = self.total_requests.div_ceil(self.unique_ips.max(1));
        per_ip.min(limit) * self.unique_ips.min(self.total_requests)
    }
}
