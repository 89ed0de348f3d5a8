use std::{
    net::SocketAddr,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;

use crate::{AppState, config::AppConfig, error::AppError};

// Above this many tracked clients, expired windows are pruned on the next request.
const PRUNE_THRESHOLD: usize = 10_000;

/// Rate limit entry for a client
#[derive(Debug)]
struct RateLimitEntry {
    requests: u32,
    window_start: Instant,
}

/// RateLimiter
///
/// Fixed-window request counter keyed by client address. Windows reset lazily
/// on the first request after they expire.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    trust_proxy: bool,
    clients: DashMap<String, RateLimitEntry>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration, trust_proxy: bool) -> Self {
        Self {
            max_requests,
            window,
            trust_proxy,
            clients: DashMap::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.rate_limit_max,
            Duration::from_secs(config.rate_limit_window_secs),
            config.trust_proxy,
        )
    }

    /// Records one request for `client` and reports whether it is within the limit.
    pub fn check(&self, client: &str) -> bool {
        if self.clients.len() > PRUNE_THRESHOLD {
            self.prune();
        }

        let mut entry = self
            .clients
            .entry(client.to_string())
            .or_insert_with(|| RateLimitEntry {
                requests: 0,
                window_start: Instant::now(),
            });

        if entry.window_start.elapsed() >= self.window {
            entry.requests = 0;
            entry.window_start = Instant::now();
        }

        if entry.requests >= self.max_requests {
            return false;
        }

        entry.requests += 1;
        true
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    fn prune(&self) {
        let window = self.window;
        self.clients
            .retain(|_, entry| entry.window_start.elapsed() < window);
    }

    /// client_key
    ///
    /// The peer address of the connection, or the first `X-Forwarded-For` hop
    /// when the service runs behind a trusted proxy.
    pub fn client_key(&self, request: &Request) -> String {
        if self.trust_proxy {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|raw| raw.split(',').next())
                .map(str::trim)
                .filter(|ip| !ip.is_empty());
            if let Some(ip) = forwarded {
                return ip.to_string();
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Rate limiter middleware
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = state.limiter.client_key(&request);

    if !state.limiter.check(&client) {
        tracing::warn!(client = %client, "rate limit exceeded");
        return Err(AppError::RateLimited);
    }

    Ok(next.run(request).await)
}
