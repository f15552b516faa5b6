//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, limits)
//!     → proxy.rs (rank targets, fail over within the retry budget)
//!     → request.rs (headers forwarded upstream)
//!     → response.rs (mirror upstream response, or gateway error)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use proxy::{Proxy, ProxyError};
pub use request::X_REQUEST_ID;
pub use server::{HttpServer, ServerError};
