//! Session provider port - the interface both auth modes implement

use crate::domain::result::Result;
use crate::domain::{AuthType, ProfileUpdate, Role, SignUpRequest, User};

/// A source of authenticated sessions (local demo registry or remote identity)
///
/// Callers issue one operation at a time; implementations hold no internal
/// queue or lock.
pub trait SessionProvider: Send {
    /// Which auth mode this provider serves
    fn auth_type(&self) -> AuthType;

    /// Restore a persisted session, if any
    fn initialize(&mut self) -> Result<Option<User>>;

    fn sign_in(&mut self, email: &str, password: &str) -> Result<User>;

    fn sign_up(&mut self, request: &SignUpRequest) -> Result<User>;

    /// Clear the session; always leaves the provider unauthenticated
    fn sign_out(&mut self) -> Result<()>;

    fn reset_password(&mut self, email: &str) -> Result<()>;

    fn update_password(&mut self, new_password: &str) -> Result<()>;

    fn update_profile(&mut self, update: &ProfileUpdate) -> Result<User>;

    fn current_user(&self) -> Option<&User>;

    /// Message of the most recent failure, cleared by the next success
    fn last_error(&self) -> Option<&str>;

    fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    fn has_role(&self, role: Role) -> bool {
        self.current_user().map(|u| u.role == role).unwrap_or(false)
    }

    fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    fn is_doctor(&self) -> bool {
        self.has_role(Role::Doctor)
    }

    fn is_nurse(&self) -> bool {
        self.has_role(Role::Nurse)
    }

    fn is_receptionist(&self) -> bool {
        self.has_role(Role::Receptionist)
    }

    fn is_lab_tech(&self) -> bool {
        self.has_role(Role::LabTech)
    }

    fn is_pharmacist(&self) -> bool {
        self.has_role(Role::Pharmacist)
    }

    fn is_radiologist(&self) -> bool {
        self.has_role(Role::Radiologist)
    }

    fn is_billing(&self) -> bool {
        self.has_role(Role::Billing)
    }

    fn is_hr_manager(&self) -> bool {
        self.has_role(Role::HrManager)
    }

    fn is_inventory_manager(&self) -> bool {
        self.has_role(Role::InventoryManager)
    }

    /// Permission check.
    ///
    /// Admins and every other authenticated user hold every permission: there
    /// is no role-to-permission table yet, so this is not an authorization
    /// boundary.
    // TODO: replace with a role -> permission table before any production use
    fn has_permission(&self, _permission: &str) -> bool {
        self.is_authenticated()
    }
}
