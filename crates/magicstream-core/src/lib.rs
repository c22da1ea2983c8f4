//! MagicStream Core: domain models, error types and the repository
//! traits shared by the auth, storage and HTTP crates.

pub mod error;
pub mod models;
pub mod repository;
