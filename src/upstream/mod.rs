//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Authenticated request (Claims in extensions)
//!     → client.rs (build URL = base + relative path)
//!     → attach static API key, drop caller credentials
//!     → single reqwest call (connect + total timeout)
//!     → 2xx: relay body | non-2xx: upstream status | transport: 500
//! ```
//!
//! # Design Decisions
//! - Exactly one upstream, no routing table
//! - No retries, no circuit breaking
//! - Shared client so connections are pooled across requests

pub mod client;

pub use client::{relative_path, ForwardError, ForwardRequest, Forwarder, UpstreamResponse};
