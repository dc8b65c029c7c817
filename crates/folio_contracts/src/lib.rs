#![forbid(unsafe_code)]

pub mod analytics;
pub mod common;
pub mod content;
pub mod identity;
pub mod permissions;

pub use common::{ContractViolation, MonotonicTimeNs, RecordId, Validate};
