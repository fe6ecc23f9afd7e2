//! Sliding-window rate limiting for OTP issuance
//!
//! Two limits are tracked independently:
//! - challenges issued per phone (the hard security limit)
//! - OTP endpoint requests per client IP (coarse abuse protection)
//!
//! Time is passed in by the caller so windows follow the service clock.
//!
//! # Example
//! ```
//! use chrono::Utc;
//! use otp_rs::rate_limit::{LimitKey, RateLimitPolicy, RateLimiter};
//!
//! # async fn example() {
//! let limiter = RateLimiter::new(RateLimitPolicy::new(5, 3600), RateLimitPolicy::new(30, 60));
//! let key = LimitKey::Phone("+919876543210".to_string());
//!
//! match limiter.try_acquire(&key, Utc::now()).await {
//!     Ok(()) => println!("allowed"),
//!     Err(retry_after) => println!("retry in {:?}", retry_after),
//! }
//! # }
//! ```

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Maximum events allowed within a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: usize,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(max_requests: usize, window_secs: i64) -> Self {
        Self {
            max_requests,
            window: Duration::seconds(window_secs),
        }
    }
}

/// Sliding window for precise request counting
#[derive(Debug, Clone)]
struct SlidingWindow {
    /// Timestamps of requests in the current window, oldest first
    requests: VecDeque<DateTime<Utc>>,
    policy: RateLimitPolicy,
}

impl SlidingWindow {
    fn new(policy: RateLimitPolicy) -> Self {
        Self {
            requests: VecDeque::with_capacity(policy.max_requests),
            policy,
        }
    }

    /// Record a request, or return how long until the oldest one leaves the window
    fn try_add(&mut self, now: DateTime<Utc>) -> Result<(), std::time::Duration> {
        self.cleanup(now);

        if self.requests.len() < self.policy.max_requests {
            self.requests.push_back(now);
            return Ok(());
        }

        let retry_after = self
            .requests
            .front()
            .map(|oldest| *oldest + self.policy.window - now)
            .and_then(|d| d.to_std().ok())
            .unwrap_or_default();
        Err(retry_after)
    }

    /// Remove requests that fell out of the window
    fn cleanup(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.policy.window;
        while matches!(self.requests.front(), Some(t) if *t <= cutoff) {
            self.requests.pop_front();
        }
    }

    /// Drop the most recent request recorded at `at`
    fn remove(&mut self, at: DateTime<Utc>) -> bool {
        match self.requests.iter().rposition(|t| *t == at) {
            Some(index) => {
                self.requests.remove(index);
                true
            }
            None => false,
        }
    }

    fn count(&mut self, now: DateTime<Utc>) -> usize {
        self.cleanup(now);
        self.requests.len()
    }
}

/// Key for rate limit tracking
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum LimitKey {
    /// Normalized phone number
    Phone(String),
    /// Client address
    Ip(IpAddr),
}

/// Keyed sliding-window limiter
pub struct RateLimiter {
    windows: Arc<RwLock<HashMap<LimitKey, SlidingWindow>>>,
    per_phone: RateLimitPolicy,
    per_ip: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(per_phone: RateLimitPolicy, per_ip: RateLimitPolicy) -> Self {
        Self {
            windows: Arc::new(RwLock::new(HashMap::new())),
            per_phone,
            per_ip,
        }
    }

    fn policy_for(&self, key: &LimitKey) -> RateLimitPolicy {
        match key {
            LimitKey::Phone(_) => self.per_phone,
            LimitKey::Ip(_) => self.per_ip,
        }
    }

    /// Count one request against `key`.
    ///
    /// Returns the time until a slot frees up when the limit is exceeded.
    pub async fn try_acquire(
        &self,
        key: &LimitKey,
        now: DateTime<Utc>,
    ) -> Result<(), std::time::Duration> {
        let policy = self.policy_for(key);
        let mut windows = self.windows.write().await;

        let window = windows
            .entry(key.clone())
            .or_insert_with(|| SlidingWindow::new(policy));

        let result = window.try_add(now);

        if let Err(retry_after) = result {
            warn!(
                "Rate limit exceeded for {}: {} per {}s (retry in {}s)",
                describe(key),
                policy.max_requests,
                policy.window.num_seconds(),
                retry_after.as_secs()
            );
        }

        result
    }

    /// Current request count for a key
    pub async fn count(&self, key: &LimitKey, now: DateTime<Utc>) -> usize {
        let mut windows = self.windows.write().await;
        windows.get_mut(key).map(|w| w.count(now)).unwrap_or(0)
    }

    /// Give back a slot taken by [`try_acquire`](Self::try_acquire) at `at`
    pub async fn release(&self, key: &LimitKey, at: DateTime<Utc>) {
        let mut windows = self.windows.write().await;
        if let Some(window) = windows.get_mut(key) {
            if window.remove(at) {
                debug!("Released rate limit slot for {}", describe(key));
            }
        }
    }

    /// Drop windows with no requests left in them
    pub async fn prune(&self, now: DateTime<Utc>) -> usize {
        let mut windows = self.windows.write().await;
        let before = windows.len();
        windows.retain(|_, w| w.count(now) > 0);
        before - windows.len()
    }
}

fn describe(key: &LimitKey) -> String {
    match key {
        LimitKey::Phone(phone) => {
            let tail = &phone[phone.len().saturating_sub(4)..];
            format!("phone ***{}", tail)
        }
        LimitKey::Ip(ip) => format!("ip {}", ip),
    }
}
