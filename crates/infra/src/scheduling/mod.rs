//! Background scheduling.

pub mod sync_scheduler;
