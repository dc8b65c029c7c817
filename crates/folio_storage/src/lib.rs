#![forbid(unsafe_code)]

pub mod auth;
pub mod journal;
pub mod repo;
pub mod store;
