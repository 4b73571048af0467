//! Portal Database: SurrealDB connection management, schema migrations
//! and repository implementations.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Error types ([`DbError`])
//! - Implementations of the `portal-core` repository traits

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use repository::{
    SurrealAssetRepository, SurrealJobRepository, SurrealReferralRepository,
    SurrealUserRepository,
};
pub use schema::{run_migrations, schema_v1};
