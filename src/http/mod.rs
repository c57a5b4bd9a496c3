//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, edge pipeline)
//!     → request.rs (request ID)
//!     → body.rs (buffer, size limit, JSON check)
//!     → login handler | auth gate → forwarder
//!     → response.rs (error envelope)
//!     → Send to client
//! ```

pub mod body;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::ErrorBody;
pub use server::{AppState, HttpServer, TokenResponse};
