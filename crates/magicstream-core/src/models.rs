//! Domain models for MagicStream.
//!
//! These are the core types shared across all crates.

pub mod genre;
pub mod role;
pub mod session;
pub mod user;
