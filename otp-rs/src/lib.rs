//! otp-rs: Phone OTP challenges
//!
//! Issues short-lived 6-digit codes bound to a phone number and verifies
//! them with constant-time comparison, bounded attempts and replay protection.
//!
//! # Features
//!
//! - **Single pending challenge**: issuing a new code supersedes the old one
//! - **Rate limiting**: sliding windows per phone and per client address
//! - **Expiry sweep**: background task closes stale challenges and purges old rows
//! - **Storage**: in-memory or SQLite via the [`ChallengeStore`] trait
//!
//! The `insecure-code-echo` feature attaches generated codes to issue
//! responses for local testing. It refuses to compile in release builds.
//!
//! # Example
//!
//! ```no_run
//! use otp_rs::{LogSink, MemoryChallengeStore, OtpConfig, OtpService};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = OtpService::new(
//!         OtpConfig::default(),
//!         Arc::new(MemoryChallengeStore::new()),
//!         Arc::new(LogSink),
//!     );
//!
//!     service.issue_challenge("+91 98765 43210").await?;
//!     let verified = service.verify_challenge("+919876543210", "123456").await;
//!     println!("{:?}", verified);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`service`]: Issue, verify and sweep
//! - [`store`]: Challenge persistence
//! - [`rate_limit`]: Sliding-window limiter
//! - [`api`]: axum endpoints

#[cfg(all(feature = "insecure-code-echo", not(debug_assertions)))]
compile_error!("the insecure-code-echo feature must not be enabled in release builds");

pub mod api;
pub mod challenge;
pub mod clock;
pub mod code;
pub mod config;
pub mod delivery;
pub mod error;
pub mod locks;
pub mod phone;
pub mod rate_limit;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use challenge::{ChallengeHandle, ChallengeStatus, ChallengeSummary, Verified};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::OtpConfig;
pub use delivery::{ChannelSink, Delivery, DeliverySink, LogSink};
pub use error::{OtpError, Result};
pub use phone::PhoneNumber;
pub use service::{OtpService, SweepReport};
pub use store::{ChallengeStore, MemoryChallengeStore, SqliteChallengeStore};
