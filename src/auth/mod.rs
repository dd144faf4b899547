//! Authentication module
//!
//! Supports: Bearer, API key header, custom headers, Faire app credentials
//! and refresh-token auth (ShipHero).
//!
//! The `Authenticator` handles all auth types and caches the access token
//! for auth types that require refresh.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{AuthConfig, CachedToken};
