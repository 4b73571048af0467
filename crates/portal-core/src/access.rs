//! Role-based access policy.
//!
//! Every protected operation names an [`Action`]; [`require`] decides
//! whether the caller may perform it. Deactivated accounts are denied
//! everything.

use crate::error::{PortalError, PortalResult};
use crate::models::user::{Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewJobs,
    ManageJobs,
    SubmitReferral,
    ReviewReferrals,
    DeleteReferrals,
    ViewAssets,
    ManageAssets,
    ManageUsers,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ViewJobs => "view_jobs",
            Action::ManageJobs => "manage_jobs",
            Action::SubmitReferral => "submit_referral",
            Action::ReviewReferrals => "review_referrals",
            Action::DeleteReferrals => "delete_referrals",
            Action::ViewAssets => "view_assets",
            Action::ManageAssets => "manage_assets",
            Action::ManageUsers => "manage_users",
        }
    }
}

impl Role {
    pub fn permits(&self, action: Action) -> bool {
        use Action::*;
        match action {
            ViewJobs | SubmitReferral | ViewAssets => true,
            ManageJobs | ReviewReferrals => {
                matches!(self, Role::Admin | Role::Hr | Role::HiringManager)
            }
            DeleteReferrals | ManageUsers => *self == Role::Admin,
            ManageAssets => matches!(self, Role::Admin | Role::InventoryManager),
        }
    }

    /// Roles that may only be granted by an administrator.
    pub fn is_privileged(&self) -> bool {
        *self != Role::Employee
    }
}

/// Fail with `AuthorizationDenied` unless `user` may perform `action`.
pub fn require(user: &User, action: Action) -> PortalResult<()> {
    if !user.is_active {
        return Err(PortalError::denied("account is deactivated"));
    }
    if !user.role.permits(action) {
        return Err(PortalError::denied(format!(
            "role {} may not {}",
            user.role,
            action.as_str()
        )));
    }
    Ok(())
}
