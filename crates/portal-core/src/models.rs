//! Domain models for the employee portal.
//!
//! These are the core types shared across all crates. Persistence rows and
//! wire responses live in their own crates and map to and from these.

pub mod asset;
pub mod job;
pub mod referral;
pub mod user;

use crate::error::{PortalError, PortalResult};

/// Minimal structural email check: one `@`, non-empty local part, and a
/// dotted domain without whitespace.
pub fn validate_email(email: &str) -> PortalResult<()> {
    let invalid = || PortalError::validation(format!("invalid email address: {email:?}"));
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    match domain.split_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() && !domain.ends_with('.') => {
            Ok(())
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_addresses() {
        assert!(validate_email("jane@company.com").is_ok());
        assert!(validate_email("j.doe+hr@mail.company.co").is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in [
            "",
            "jane",
            "@company.com",
            "jane@",
            "jane@company",
            "jane@company.",
            "jane@@company.com",
            "ja ne@company.com",
        ] {
            assert!(validate_email(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
