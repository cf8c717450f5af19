//! Rate limiting middleware
//!
//! IP-keyed rate limiting with the governor crate. Login gets a strict quota
//! (brute force protection); the rest of the API a generous one.

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_size: u32,
}

/// Strict quota for the login endpoint
pub fn auth_rate_limit_config() -> RateLimitConfig {
    RateLimitConfig {
        requests_per_second: 2,
        burst_size: 5,
    }
}

/// Standard API quota
pub fn api_rate_limit_config() -> RateLimitConfig {
    RateLimitConfig {
        requests_per_second: 50,
        burst_size: 100,
    }
}

type IpRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Thread-safe map of IP addresses to their rate limiters
#[derive(Clone)]
pub struct RateLimitState {
    limiters: Arc<RwLock<HashMap<IpAddr, Arc<IpRateLimiter>>>>,
    config: RateLimitConfig,
}

impl RateLimitState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limiters: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    async fn get_limiter(&self, ip: IpAddr) -> Arc<IpRateLimiter> {
        {
            let limiters = self.limiters.read().await;
            if let Some(limiter) = limiters.get(&ip) {
                return limiter.clone();
            }
        }

        let mut limiters = self.limiters.write().await;
        if let Some(limiter) = limiters.get(&ip) {
            return limiter.clone();
        }

        let quota = Quota::per_second(
            NonZeroU32::new(self.config.requests_per_second).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(self.config.burst_size).unwrap_or(NonZeroU32::MIN));

        let limiter = Arc::new(RateLimiter::direct(quota));
        limiters.insert(ip, limiter.clone());
        limiter
    }

    /// Bound the tracked-IP map so it cannot grow without limit
    pub async fn cleanup(&self) {
        const MAX_TRACKED_IPS: usize = 10000;

        let mut limiters = self.limiters.write().await;
        if limiters.len() > MAX_TRACKED_IPS {
            let initial = limiters.len();
            let to_remove: Vec<_> = limiters.keys().take(initial / 2).cloned().collect();
            for ip in to_remove {
                limiters.remove(&ip);
            }
            debug!("Rate limiter cleanup: {} -> {} entries", initial, limiters.len());
        }
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = addr.ip();
    let limiter = rate_limit.get_limiter(ip).await;

    match limiter.check() {
        Ok(_) => next.run(request).await,
        Err(_) => {
            warn!(ip = %ip, "Rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", "1")],
                "Too many requests. Please try again later.",
            )
                .into_response()
        }
    }
}

/// Spawn a background task to periodically clean up rate limiters
pub fn spawn_rate_limit_cleanup(state: RateLimitState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            state.cleanup().await;
        }
    });
}
