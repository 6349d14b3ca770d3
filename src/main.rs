// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Directory Intake Service
//!
//! Serves the directory's contact, submission and vote endpoints:
//!
//! - `POST /contact`
//! - `POST /submissions`
//! - `POST /votes`
//! - `GET /health`, `GET /healthz`
//! - `GET /metrics` (unless disabled)
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (and a `.env` file if
//! present):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `RATE_LIMIT_MAX`: Admissions per client per window (default: 10)
//! - `RATE_LIMIT_WINDOW_SECS`: Window length (default: 3600)
//! - `HCAPTCHA_SECRET`: CAPTCHA secret (required for contact and submissions)
//! - `SUPABASE_URL`, `SUPABASE_SERVICE_ROLE_KEY`: External store
//! - `RESEND_API_KEY`, `CONTACT_FROM`, `CONTACT_TO`: Mail relay
//! - `UPSTREAM_TIMEOUT_MS`: Bound on external calls (default: 10000)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use directory_intake::{
    config::Config,
    handlers::{router, AppState, Services},
};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        upstream_timeout_ms = config.upstream_timeout_ms,
        "Starting directory intake"
    );
    if config.captcha.secret.is_none() {
        warn!("HCAPTCHA_SECRET is not set, contact and submission requests will fail");
    }

    let services = Services::from_config(&config);
    let state = Arc::new(AppState::new(config.clone(), services)?);

    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sweep_state.sweep().await;
            if removed > 0 {
                debug!(removed, "Swept expired rate limit windows");
            }
        }
    });

    let app = router(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
