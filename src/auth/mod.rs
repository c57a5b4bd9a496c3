//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! POST /login
//!     → token.rs (TokenIssuer signs claims for the demo identity)
//!     → {"token": "<jwt>"}
//!
//! ANY /api/*
//!     → middleware.rs (read Authorization header)
//!     → token.rs (TokenVerifier: extract, decode, check signature/expiry)
//!     → Claims attached to request extensions
//!     → forwarder
//! ```
//!
//! # Design Decisions
//! - Stateless: tokens are never stored, there is no revocation list
//! - One shared HMAC secret for signing and verification
//! - Missing header is 401, everything else that fails is 403

pub mod claims;
pub mod middleware;
pub mod token;

pub use claims::{Claims, Identity};
pub use middleware::require_token;
pub use token::{extract_bearer, AuthError, SigningError, TokenIssuer, TokenVerifier};
