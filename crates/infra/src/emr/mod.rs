//! EMR provider adapters: the HTTP transport and the OAuth2 client.

pub mod oauth;
pub mod transport;
