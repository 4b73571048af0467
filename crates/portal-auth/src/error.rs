//! Authentication error types.

use portal_core::error::PortalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for PortalError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenInvalid(_) => PortalError::AuthenticationFailed {
                reason: err.to_string(),
            },
            // Credentials were valid; the account may not act.
            AuthError::AccountInactive => PortalError::AuthorizationDenied {
                reason: err.to_string(),
            },
            AuthError::PasswordTooShort(_) => PortalError::Validation {
                message: err.to_string(),
            },
            AuthError::Crypto(msg) => PortalError::Crypto(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_onto_portal_taxonomy() {
        assert!(matches!(
            PortalError::from(AuthError::InvalidCredentials),
            PortalError::AuthenticationFailed { .. }
        ));
        assert!(matches!(
            PortalError::from(AuthError::TokenExpired),
            PortalError::AuthenticationFailed { .. }
        ));
        assert!(matches!(
            PortalError::from(AuthError::AccountInactive),
            PortalError::AuthorizationDenied { .. }
        ));
        assert!(matches!(
            PortalError::from(AuthError::PasswordTooShort(8)),
            PortalError::Validation { .. }
        ));
    }
}
