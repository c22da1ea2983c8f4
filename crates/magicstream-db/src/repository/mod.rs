//! Repository implementations: SurrealDB-backed and in-memory.

mod memory;
mod session;
mod user;

pub use memory::{MemorySessionStore, MemoryUserRepository};
pub use session::SurrealSessionStore;
pub use user::SurrealUserRepository;
