//! # storage-adapters
//!
//! `AdRepository` implementations. The in-memory store is always compiled;
//! Postgres sits behind the `db-postgres` feature.

pub mod error;
pub mod memory;
#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use error::StorageError;
pub use memory::MemoryAdRepository;
#[cfg(feature = "db-postgres")]
pub use postgres::PgAdRepository;
