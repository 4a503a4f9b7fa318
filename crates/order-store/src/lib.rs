//! Order repository implementations.
//!
//! - [`InMemoryOrderRepository`] for tests and database-less runs
//! - [`PostgresOrderRepository`] backed by sqlx

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::PostgresError;
pub use memory::InMemoryOrderRepository;
pub use postgres::PostgresOrderRepository;
