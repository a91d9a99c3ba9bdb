//! # Taskdeck Shared Library
//!
//! This crate contains the models, authentication primitives, and business
//! services used by the Taskdeck API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Password hashing and JWT utilities
//! - `service`: Auth and task services composing the models
//! - `db`: Connection pool and migration runner

pub mod auth;
pub mod db;
pub mod models;
pub mod service;

/// Current version of the Taskdeck shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
