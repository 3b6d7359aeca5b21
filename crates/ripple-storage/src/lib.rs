// Storage layer with sqlx
//
// This crate provides implementations of the core EventStore trait:
// - Database: PostgreSQL repositories (production)
// - InMemoryDatabase: HashMap-backed store with the same semantics (dev mode, tests)
// - StorageBackend: enum over both, implements EventStore

pub mod backend;
pub mod memory;
pub mod models;
pub mod repositories;

pub use backend::StorageBackend;
pub use memory::InMemoryDatabase;
pub use models::*;
pub use repositories::*;
