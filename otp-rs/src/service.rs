//! OTP challenge service
//!
//! Issues, verifies and expires challenges. Every operation touching one
//! phone runs under that phone's lock, so an issue racing a verify can never
//! leave two pending challenges or double-count an attempt.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::challenge::{Challenge, ChallengeHandle, ChallengeStatus, ChallengeSummary, Verified};
use crate::clock::{Clock, SystemClock};
use crate::config::OtpConfig;
use crate::delivery::DeliverySink;
use crate::error::{OtpError, Result};
use crate::locks::KeyedLocks;
use crate::phone::PhoneNumber;
use crate::rate_limit::{LimitKey, RateLimiter};
use crate::store::ChallengeStore;

/// Outcome of one expiry sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pending challenges moved to expired
    pub expired: usize,
    /// Terminal challenges deleted after the retention period
    pub purged: u64,
}

pub struct OtpService {
    config: OtpConfig,
    store: Arc<dyn ChallengeStore>,
    sink: Arc<dyn DeliverySink>,
    clock: Arc<dyn Clock>,
    limiter: RateLimiter,
    locks: KeyedLocks,
}

impl OtpService {
    /// Create a new OTP service on the system clock
    pub fn new(
        config: OtpConfig,
        store: Arc<dyn ChallengeStore>,
        sink: Arc<dyn DeliverySink>,
    ) -> Self {
        let limiter = RateLimiter::new(config.phone_policy(), config.ip_policy());
        Self {
            config,
            store,
            sink,
            clock: Arc::new(SystemClock),
            limiter,
            locks: KeyedLocks::new(),
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub fn parse_phone(&self, raw: &str) -> Result<PhoneNumber> {
        PhoneNumber::parse(raw, self.config.default_country_code.as_deref())
    }

    /// Issue a new challenge for `raw_phone`, superseding any pending one.
    pub async fn issue_challenge(&self, raw_phone: &str) -> Result<ChallengeHandle> {
        let phone = self.parse_phone(raw_phone)?;
        let _guard = self.locks.lock(phone.as_str()).await;
        let now = self.clock.now();

        let limit_key = LimitKey::Phone(phone.as_str().to_string());
        self.limiter
            .try_acquire(&limit_key, now)
            .await
            .map_err(|retry_after| OtpError::RateLimited { retry_after })?;

        // Storage faults do not count against the phone's quota
        let challenge = match self.replace_pending(&phone, now).await {
            Ok(challenge) => challenge,
            Err(e) => {
                error!("Failed to store challenge for phone {}: {}", phone.fingerprint(), e);
                self.limiter.release(&limit_key, now).await;
                return Err(e);
            }
        };

        info!(
            "Issued challenge {} for phone {} (expires {})",
            challenge.id,
            phone.fingerprint(),
            challenge.expires_at
        );

        // Delivery is fire-and-forget; a failed send is logged, the challenge stands
        let sink = Arc::clone(&self.sink);
        let code = challenge.code.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.deliver(&phone, &code).await {
                warn!("Failed to deliver OTP to phone {}: {}", phone.fingerprint(), e);
            }
        });

        Ok(ChallengeHandle::for_challenge(&challenge))
    }

    /// Invalidate the pending challenge, if any, and store a fresh one.
    /// Caller holds the phone's lock.
    async fn replace_pending(
        &self,
        phone: &PhoneNumber,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Challenge> {
        if let Some(previous) = self.store.current(phone).await? {
            if previous.status == ChallengeStatus::Pending
                && self
                    .store
                    .transition(
                        previous.id,
                        ChallengeStatus::Pending,
                        ChallengeStatus::Invalidated,
                    )
                    .await?
            {
                debug!(
                    "Superseded challenge {} for phone {}",
                    previous.id,
                    phone.fingerprint()
                );
            }
        }

        let challenge = Challenge::issue(phone.clone(), now, self.config.code_ttl());
        self.store.insert(&challenge).await?;
        Ok(challenge)
    }

    /// Verify `submitted` against the current challenge for `raw_phone`.
    ///
    /// Not idempotent: a second successful-looking call fails with `AlreadyUsed`.
    pub async fn verify_challenge(&self, raw_phone: &str, submitted: &str) -> Result<Verified> {
        let phone = self.parse_phone(raw_phone)?;
        let _guard = self.locks.lock(phone.as_str()).await;
        let now = self.clock.now();

        let challenge = match self.store.current(&phone).await? {
            Some(challenge) => challenge,
            None => return Err(OtpError::NoActiveChallenge),
        };

        match challenge.status {
            ChallengeStatus::Pending => {}
            ChallengeStatus::Verified => {
                warn!(
                    "Replay of verified challenge {} for phone {}",
                    challenge.id,
                    phone.fingerprint()
                );
                return Err(OtpError::AlreadyUsed);
            }
            ChallengeStatus::Expired => return Err(OtpError::ChallengeExpired),
            ChallengeStatus::Invalidated => {
                return Err(if challenge.attempt_count >= self.config.max_attempts {
                    OtpError::TooManyAttempts
                } else {
                    OtpError::NoActiveChallenge
                });
            }
        }

        if challenge.is_expired_at(now) {
            self.store
                .transition(challenge.id, ChallengeStatus::Pending, ChallengeStatus::Expired)
                .await?;
            info!("Challenge {} expired before verification", challenge.id);
            return Err(OtpError::ChallengeExpired);
        }

        if !challenge.code.matches(submitted) {
            let attempts = match self.store.record_failed_attempt(challenge.id).await? {
                Some(attempts) => attempts,
                None => return Err(OtpError::NoActiveChallenge),
            };

            if attempts >= self.config.max_attempts {
                self.store
                    .transition(
                        challenge.id,
                        ChallengeStatus::Pending,
                        ChallengeStatus::Invalidated,
                    )
                    .await?;
                warn!(
                    "Challenge {} locked after {} failed attempts (phone {})",
                    challenge.id,
                    attempts,
                    phone.fingerprint()
                );
                return Err(OtpError::TooManyAttempts);
            }

            debug!("Code mismatch on challenge {} ({} attempts)", challenge.id, attempts);
            return Err(OtpError::CodeMismatch {
                attempts_remaining: self.config.max_attempts - attempts,
            });
        }

        if !self
            .store
            .transition(challenge.id, ChallengeStatus::Pending, ChallengeStatus::Verified)
            .await?
        {
            return Err(OtpError::NoActiveChallenge);
        }

        info!("Verified challenge {} for phone {}", challenge.id, phone.fingerprint());

        Ok(Verified {
            challenge_id: challenge.id,
            phone,
            verified_at: now,
        })
    }

    /// Current challenge for a phone, without its code
    pub async fn current_status(&self, raw_phone: &str) -> Result<Option<ChallengeSummary>> {
        let phone = self.parse_phone(raw_phone)?;
        let _guard = self.locks.lock(phone.as_str()).await;
        Ok(self.store.current(&phone).await?.map(|c| c.summary()))
    }

    /// Number of pending challenges for a phone (at most one)
    pub async fn pending_count(&self, raw_phone: &str) -> Result<usize> {
        let phone = self.parse_phone(raw_phone)?;
        self.store.count_pending(&phone).await
    }

    /// Expire stale pending challenges and purge old terminal ones.
    ///
    /// Each transition takes the phone's lock, so an in-flight verification
    /// sees the challenge either before or after the sweep, never halfway.
    pub async fn sweep_expired(&self) -> Result<SweepReport> {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        for (id, phone) in self.store.stale_pending(now).await? {
            let _guard = self.locks.lock(phone.as_str()).await;
            if self
                .store
                .transition(id, ChallengeStatus::Pending, ChallengeStatus::Expired)
                .await?
            {
                report.expired += 1;
            }
        }

        report.purged = self
            .store
            .purge_terminal(now - self.config.retention())
            .await?;

        let locks = self.locks.prune();
        let windows = self.limiter.prune(now).await;
        debug!(
            "Sweep: {} expired, {} purged, {} locks and {} rate windows pruned",
            report.expired, report.purged, locks, windows
        );

        Ok(report)
    }

    /// Run [`sweep_expired`](Self::sweep_expired) on the configured interval
    pub fn start_sweep_task(self: Arc<Self>) -> JoinHandle<()> {
        let interval = self.config.sweep_interval();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                match self.sweep_expired().await {
                    Ok(report) if report.expired > 0 || report.purged > 0 => {
                        info!(
                            "Expiry sweep: {} expired, {} purged",
                            report.expired, report.purged
                        );
                    }
                    Ok(_) => {}
                    Err(e) => error!("Expiry sweep failed: {}", e),
                }
            }
        })
    }
}
