// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request payload generators.

use serde_json::{json, Value};
use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of client IP addresses.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// A vote body that passes validation.
pub fn vote(product_id: i64, rating: i64) -> Value {
    json!({ "product_id": product_id, "rating": rating })
}

/// A submission body that passes validation.
pub fn submission(name: &str) -> Value {
    json!({
        "name": name,
        "url": "https://example.com",
        "category_type": "backend",
        "db_fit": "postgres",
        "pricing_model": "freemium",
        "oss": true,
        "first_class_neon": false,
        "first_class_supabase": true,
        "designer_first": false,
        "enterprise_ready": false,
        "byo_postgres": true,
        "ai_builder": false,
        "difficulty_hint": 3,
        "captcha_token": "good-token"
    })
}

/// A contact body that passes validation.
pub fn contact() -> Value {
    json!({
        "name": "Ada",
        "email": "ada@example.com",
        "productName": "Widget",
        "requestType": "edit_request",
        "message": "The pricing listed for Widget is out of date.",
        "captchaToken": "good-token"
    })
}

/// Vote bodies that must be rejected before anything is stored.
pub fn malformed_votes() -> Vec<Value> {
    vec![
        json!({}),
        json!({ "product_id": 1 }),
        json!({ "rating": 3 }),
        json!({ "product_id": 1, "rating": 0 }),
        json!({ "product_id": 1, "rating": 6 }),
        json!({ "product_id": 0, "rating": 3 }),
        json!({ "product_id": -4, "rating": 3 }),
        json!({ "product_id": "1", "rating": 3 }),
        json!({ "product_id": 1, "rating": 2.5 }),
        json!([1, 5]),
        json!("vote"),
        Value::Null,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }
}
