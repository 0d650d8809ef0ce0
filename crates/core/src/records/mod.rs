//! Audited mutation service for locally-owned clinical records.

pub mod ports;
pub mod service;
