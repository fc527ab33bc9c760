//! Authentication state for the signed-in user.
//!
//! This module provides:
//! - `Session`: the identity token issued by the sign-in provider, persisted
//!   next to the local cache and treated as expired after 60 minutes
//! - `CredentialStore`: OS keychain storage for the token, keyed by uid
//!
//! Obtaining the token is the identity provider's business; this crate only
//! keeps and presents it.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{Session, SessionData};
