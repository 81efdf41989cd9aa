//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! The layer has two halves:
//!
//! - **Connection supervision**: [`DatabaseConnector`] makes the first
//!   connection attempt, reports failure to the caller and, once connected,
//!   reconnects on every disconnect with capped exponential backoff.
//!   [`PostgresDriver`] plugs the `bb8` pool into that loop.
//! - **Thin adapters**: [`DieselUserRepository`] translates between Diesel
//!   rows and domain users. Row structs and the schema stay internal.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use todo_backend::outbound::persistence::{
//!     DatabaseConnector, DieselUserRepository, PoolConfig, PostgresDriver, ReconnectBackoff,
//! };
//!
//! let driver = PostgresDriver::new(PoolConfig::new(url), Duration::from_secs(5));
//! let database = DatabaseConnector::new(driver, ReconnectBackoff::default())
//!     .connect()
//!     .await?;
//! let repo = DieselUserRepository::new(database.handle());
//! ```

mod connector;
mod diesel_user_repository;
mod models;
mod pool;
mod postgres_driver;
mod schema;

pub use connector::{
    ConnectionEvent, Database, DatabaseConnector, DatabaseDriver, DatabaseError, DatabaseHandle,
    ReconnectBackoff,
};
pub use diesel_user_repository::DieselUserRepository;
pub use pool::{DbPool, PoolConfig, PoolError};
pub use postgres_driver::PostgresDriver;
