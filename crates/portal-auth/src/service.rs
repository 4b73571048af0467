//! Authentication service: registration, login and bearer-token
//! authentication.

use portal_core::error::{PortalError, PortalResult};
use portal_core::models::user::{CreateUser, Role, User};
use portal_core::models::validate_email;
use portal_core::repository::UserRepository;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token;

/// Input for the registration flow.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub role: Role,
    pub department: Option<String>,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// Signed JWT access token.
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    pub user: User,
}

/// Authentication service.
///
/// Generic over the user repository so that the auth layer has no
/// dependency on the database crate.
pub struct AuthService<U: UserRepository> {
    user_repo: U,
    config: AuthConfig,
}

impl<U: UserRepository> AuthService<U> {
    pub fn new(user_repo: U, config: AuthConfig) -> Self {
        Self { user_repo, config }
    }

    pub fn users(&self) -> &U {
        &self.user_repo
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Create an account. Whether the caller may grant `input.role` is
    /// decided by the caller of this method.
    pub async fn register(&self, input: RegisterInput) -> PortalResult<User> {
        let email = input.email.trim().to_lowercase();
        validate_email(&email)?;
        if input.full_name.trim().is_empty() {
            return Err(PortalError::validation("full name must not be blank"));
        }
        password::check_policy(&input.password, self.config.min_password_length)?;

        let user = self
            .user_repo
            .create(CreateUser {
                email,
                full_name: input.full_name.trim().to_string(),
                password: input.password,
                role: input.role,
                department: input.department,
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    /// Verify email and password and issue an access token.
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> PortalResult<LoginOutput> {
        let user = match self.user_repo.get_by_email(email).await {
            Ok(u) => u,
            Err(PortalError::NotFound { .. }) => {
                warn!("Login attempt for unknown email");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        let valid = password::verify_password(
            password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        if !user.is_active {
            warn!(user_id = %user.id, "Login refused: account inactive");
            return Err(AuthError::AccountInactive.into());
        }

        let access_token = token::issue_access_token(&user, &self.config)?;
        info!(user_id = %user.id, "User logged in");

        Ok(LoginOutput {
            access_token,
            expires_in: self.config.access_token_lifetime_secs,
            user,
        })
    }

    /// Resolve a bearer token to its user.
    ///
    /// Rejects tokens for deleted or deactivated accounts and tokens
    /// issued before the user's role changed.
    pub async fn authenticate(&self, bearer: &str) -> PortalResult<User> {
        let claims = token::decode_access_token(bearer, &self.config)?;
        let user_id = claims.user_id()?;

        let user = match self.user_repo.get_by_id(user_id).await {
            Ok(u) => u,
            Err(PortalError::NotFound { .. }) => {
                return Err(AuthError::TokenInvalid("unknown subject".into()).into());
            }
            Err(e) => return Err(e),
        };

        if !user.is_active {
            return Err(AuthError::AccountInactive.into());
        }
        if user.role != claims.role {
            return Err(AuthError::TokenInvalid("role changed since issuance".into()).into());
        }
        Ok(user)
    }
}
