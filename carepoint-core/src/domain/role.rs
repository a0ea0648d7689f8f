//! Staff roles

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::Error;

/// Role of a staff member
///
/// Serialized as the snake_case tag stored in sessions and profile documents.
/// Unknown tags fail deserialization instead of flowing through as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Doctor,
    Nurse,
    Receptionist,
    LabTech,
    Pharmacist,
    Radiologist,
    Billing,
    HrManager,
    InventoryManager,
}

impl Role {
    pub const ALL: [Role; 10] = [
        Role::Admin,
        Role::Doctor,
        Role::Nurse,
        Role::Receptionist,
        Role::LabTech,
        Role::Pharmacist,
        Role::Radiologist,
        Role::Billing,
        Role::HrManager,
        Role::InventoryManager,
    ];

    /// Wire tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Receptionist => "receptionist",
            Role::LabTech => "lab_tech",
            Role::Pharmacist => "pharmacist",
            Role::Radiologist => "radiologist",
            Role::Billing => "billing",
            Role::HrManager => "hr_manager",
            Role::InventoryManager => "inventory_manager",
        }
    }

    /// Human-readable label for dashboards and tables
    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Administrator",
            Role::Doctor => "Doctor",
            Role::Nurse => "Nurse",
            Role::Receptionist => "Receptionist",
            Role::LabTech => "Lab Technician",
            Role::Pharmacist => "Pharmacist",
            Role::Radiologist => "Radiologist",
            Role::Billing => "Billing Specialist",
            Role::HrManager => "HR Manager",
            Role::InventoryManager => "Inventory Manager",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_lowercase().replace('-', "_");
        Role::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == tag)
            .ok_or_else(|| Error::validation(format!("Unknown role: {}", s)))
    }
}
