//! JWT access token issuance and verification (HS256).

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use portal_core::models::user::{Role, User};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// JWT claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject: user ID (UUID string).
    pub sub: String,
    pub email: String,
    /// Role at issuance. A token whose role no longer matches the stored
    /// user is rejected.
    pub role: Role,
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID (UUID string).
    pub jti: String,
}

impl AccessTokenClaims {
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub)
            .map_err(|e| AuthError::TokenInvalid(format!("bad subject: {e}")))
    }
}

fn signing_secret(config: &AuthConfig) -> Result<&[u8], AuthError> {
    if config.jwt_secret.is_empty() {
        return Err(AuthError::Crypto("JWT secret is not configured".into()));
    }
    Ok(config.jwt_secret.as_bytes())
}

/// Issue a signed HS256 JWT access token for `user`.
pub fn issue_access_token(user: &User, config: &AuthConfig) -> Result<String, AuthError> {
    issue_access_token_at(user, config, Utc::now().timestamp())
}

/// [`issue_access_token`] with an explicit issue time.
pub fn issue_access_token_at(
    user: &User,
    config: &AuthConfig,
    issued_at: i64,
) -> Result<String, AuthError> {
    let claims = AccessTokenClaims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role,
        iss: config.jwt_issuer.clone(),
        iat: issued_at,
        exp: issued_at + config.access_token_lifetime_secs as i64,
        jti: Uuid::new_v4().to_string(),
    };

    let key = EncodingKey::from_secret(signing_secret(config)?);
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// Decode and verify an HS256 JWT access token (signature, issuer,
/// expiry).
pub fn decode_access_token(
    token: &str,
    config: &AuthConfig,
) -> Result<AccessTokenClaims, AuthError> {
    let key = DecodingKey::from_secret(signing_secret(config)?);

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);
    validation.leeway = 0;

    jsonwebtoken::decode::<AccessTokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret-do-not-use".into(),
            jwt_issuer: "portal-test".into(),
            ..Default::default()
        }
    }

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "jane@company.com".into(),
            full_name: "Jane".into(),
            password_hash: String::new(),
            role: Role::HiringManager,
            department: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn jwt_roundtrip() {
        let config = test_config();
        let user = test_user();

        let token = issue_access_token(&user, &config).unwrap();
        let claims = decode_access_token(&token, &config).unwrap();

        assert_eq!(claims.user_id().unwrap(), user.id);
        assert_eq!(claims.email, "jane@company.com");
        assert_eq!(claims.role, Role::HiringManager);
        assert_eq!(claims.iss, "portal-test");
        assert_eq!(claims.exp - claims.iat, 86_400);
    }

    #[test]
    fn jti_is_unique() {
        let config = test_config();
        let user = test_user();
        let c1 = decode_access_token(&issue_access_token(&user, &config).unwrap(), &config);
        let c2 = decode_access_token(&issue_access_token(&user, &config).unwrap(), &config);
        assert_ne!(c1.unwrap().jti, c2.unwrap().jti);
    }

    #[test]
    fn expired_token_rejected() {
        let config = test_config();
        let two_days_ago = Utc::now().timestamp() - 2 * 86_400;
        let token = issue_access_token_at(&test_user(), &config, two_days_ago).unwrap();
        assert!(matches!(
            decode_access_token(&token, &config),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn tampered_token_rejected() {
        let config = test_config();
        let token = issue_access_token(&test_user(), &config).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_owned).collect();
        let sig = parts[2].clone();
        let flipped = if sig.starts_with('A') { 'B' } else { 'A' };
        parts[2] = format!("{flipped}{}", &sig[1..]);
        let tampered = parts.join(".");

        assert!(matches!(
            decode_access_token(&tampered, &config),
            Err(AuthError::TokenInvalid(_))
        ));
    }

    #[test]
    fn wrong_secret_or_issuer_rejected() {
        let config = test_config();
        let token = issue_access_token(&test_user(), &config).unwrap();

        let other_secret = AuthConfig {
            jwt_secret: "another-secret".into(),
            ..test_config()
        };
        assert!(decode_access_token(&token, &other_secret).is_err());

        let other_issuer = AuthConfig {
            jwt_issuer: "someone-else".into(),
            ..test_config()
        };
        assert!(decode_access_token(&token, &other_issuer).is_err());
    }

    #[test]
    fn missing_secret_is_crypto_error() {
        let config = AuthConfig::default();
        assert!(matches!(
            issue_access_token(&test_user(), &config),
            Err(AuthError::Crypto(_))
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(
            decode_access_token("not.a.jwt", &test_config()),
            Err(AuthError::TokenInvalid(_))
        ));
    }
}
