//! Request authentication and authorization.
//!
//! Pipeline: [`extractor`] reads the bearer token and attaches the soft actor,
//! [`verifier`] is the hard gate for routes that need confirmed identity, and
//! [`guard`] checks role capabilities on the attached actor.
//!
//! Verification and unverified decoding are separate operations on purpose:
//! [`accountability::resolve_accountability`] never rejects and carries no trust.

pub mod accountability;
pub mod error;
pub mod extractor;
pub mod guard;
pub mod verifier;

pub use accountability::{Accountability, Claims, OptionalActor, resolve_accountability};
pub use error::AuthError;
pub use extractor::{ExtractedToken, RequestToken, attach_accountability, extract_bearer};
pub use guard::{Capability, RoleGuard, require_capability};
pub use verifier::{TokenVerifier, TokenVerifierState, VerifiedActor};
