//! Domain data types

pub mod clinical;
pub mod credentials;
pub mod sync;
