//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (security headers on the way out)
//!     → cors.rs (cross-origin policy, preflight)
//!     → [body parsing, access log]
//!     → rate_limit.rs (per-IP fixed window)
//!     → Pass to login / auth gate
//! ```
//!
//! # Design Decisions
//! - Defense in depth: multiple layers of protection
//! - Fail closed: reject on any security check failure
//! - No trust in client input

pub mod cors;
pub mod headers;
pub mod rate_limit;

pub use cors::cors_layer;
pub use headers::security_headers_middleware;
pub use rate_limit::{rate_limit_middleware, MemoryStore, RateLimitStore, RateLimiter};
