#![forbid(unsafe_code)]

pub mod admin_shell;
pub mod analytics;
pub mod content;
pub mod context;
pub mod notify;
pub mod permissions;
pub mod public_site;
pub mod routes;
pub mod session;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support;
