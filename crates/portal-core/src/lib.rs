//! Core domain types for the employee portal: models, the error taxonomy,
//! the role policy, repository traits, and the asset lifecycle.

pub mod access;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod repository;

pub use error::{PortalError, PortalResult};
