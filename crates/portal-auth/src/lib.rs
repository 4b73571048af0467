//! Portal Auth: password verification, JWT issuance/validation, and the
//! register/login/authenticate flows.

pub mod config;
pub mod error;
pub mod password;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use service::{AuthService, LoginOutput, RegisterInput};
pub use token::AccessTokenClaims;
