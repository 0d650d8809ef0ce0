//! EMR synchronization engine.
//!
//! Layered leaves-first: the token lifecycle manager sits on the credential
//! store, the client wraps the transport with bearer tokens, the pagination
//! engine drives the client page by page, and the orchestrator fans the
//! pagination engine out across the entity catalog.

pub mod client;
pub mod pagination;
pub mod ports;
pub mod sync;
pub mod tokens;
