//! # CareBridge API
//!
//! The HTTP surface of the engine: sync triggers (operator and scheduler),
//! EMR connection management, and the audited medication endpoints. All
//! business logic lives in `carebridge-core`; handlers authenticate, decode,
//! delegate, and encode.

pub mod auth;
pub mod context;
pub mod errors;
pub mod routes;

pub use auth::{IdentityProvider, StaticTokenIdentity};
pub use context::AppContext;
pub use routes::router;
