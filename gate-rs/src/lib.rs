//! gate-rs: Role and onboarding authorization gate
//!
//! Decides, for a session, a profile and a route's requirements, whether to
//! show the route, wait, or redirect. The decision functions are pure; the
//! session and profile plumbing around them is async.
//!
//! # Example
//!
//! ```
//! use gate_rs::{decide, Decision, Profile, ProfileState, Role, RouteRequirement, SessionState};
//! use uuid::Uuid;
//!
//! let user = Uuid::new_v4();
//! let session = SessionState::Authenticated(user);
//! let profile = ProfileState::Found(Profile::new(user, Role::Trader, true));
//!
//! let decision = decide(&session, &profile, &RouteRequirement::for_role(Role::Manufacturer)).unwrap();
//! assert_eq!(decision, Decision::Redirect("/trader/dashboard"));
//! ```

pub mod api;
pub mod decision;
pub mod error;
pub mod profile;
pub mod requirement;
pub mod role;
pub mod session;

// Re-export commonly used types
pub use decision::{decide, resolve_landing_path, Decision};
pub use error::{GateError, Result};
pub use profile::{
    resolve_profile, MemoryProfileSource, Profile, ProfileSource, ProfileState,
    SqliteProfileSource,
};
pub use requirement::RouteRequirement;
pub use role::Role;
pub use session::{JwtConfig, SessionResolver, SessionState, UserId};
