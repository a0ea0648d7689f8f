//! Demo account registry
//!
//! The fixed credential set for local mode: one account per staff role.
//! These are the only credentials local mode accepts.

use crate::domain::{Role, User};

/// One registry entry
#[derive(Debug, Clone, Copy)]
pub struct DemoAccount {
    pub email: &'static str,
    pub password: &'static str,
    pub id: &'static str,
    pub name: &'static str,
    pub role: Role,
    pub department: Option<&'static str>,
    pub specialization: Option<&'static str>,
}

impl DemoAccount {
    /// Profile for this account (not yet stamped with a login)
    pub fn to_user(&self) -> User {
        let mut user = User::new(self.id, self.email, self.name, self.role);
        user.department = self.department.map(str::to_string);
        user.specialization = self.specialization.map(str::to_string);
        user
    }
}

pub const DEMO_ACCOUNTS: &[DemoAccount] = &[
    DemoAccount {
        email: "admin@clinic.com",
        password: "admin123",
        id: "1",
        name: "Dr. Sarah Johnson",
        role: Role::Admin,
        department: Some("Administration"),
        specialization: None,
    },
    DemoAccount {
        email: "doctor@clinic.com",
        password: "doctor123",
        id: "2",
        name: "Dr. Michael Chen",
        role: Role::Doctor,
        department: Some("Cardiology"),
        specialization: Some("Cardiologist"),
    },
    DemoAccount {
        email: "nurse@clinic.com",
        password: "nurse123",
        id: "3",
        name: "Emily Rodriguez",
        role: Role::Nurse,
        department: Some("Emergency"),
        specialization: Some("Emergency Care"),
    },
    DemoAccount {
        email: "reception@clinic.com",
        password: "reception123",
        id: "4",
        name: "James Wilson",
        role: Role::Receptionist,
        department: Some("Front Desk"),
        specialization: None,
    },
    DemoAccount {
        email: "lab@clinic.com",
        password: "lab123",
        id: "5",
        name: "Dr. Lisa Park",
        role: Role::LabTech,
        department: Some("Laboratory"),
        specialization: Some("Clinical Pathology"),
    },
    DemoAccount {
        email: "pharmacy@clinic.com",
        password: "pharmacy123",
        id: "6",
        name: "Robert Taylor",
        role: Role::Pharmacist,
        department: Some("Pharmacy"),
        specialization: Some("Clinical Pharmacy"),
    },
    DemoAccount {
        email: "radiology@clinic.com",
        password: "radiology123",
        id: "7",
        name: "Dr. Amanda Foster",
        role: Role::Radiologist,
        department: Some("Radiology"),
        specialization: Some("Diagnostic Imaging"),
    },
    DemoAccount {
        email: "billing@clinic.com",
        password: "billing123",
        id: "8",
        name: "Maria Garcia",
        role: Role::Billing,
        department: Some("Finance"),
        specialization: None,
    },
    DemoAccount {
        email: "hr@clinic.com",
        password: "hr123",
        id: "9",
        name: "David Thompson",
        role: Role::HrManager,
        department: Some("Human Resources"),
        specialization: None,
    },
    DemoAccount {
        email: "inventory@clinic.com",
        password: "inventory123",
        id: "10",
        name: "Kevin Brown",
        role: Role::InventoryManager,
        department: Some("Supply Chain"),
        specialization: None,
    },
];

/// Find the entry whose email matches (case-insensitive) and password matches exactly
pub fn find_by_credentials(email: &str, password: &str) -> Option<&'static DemoAccount> {
    DEMO_ACCOUNTS
        .iter()
        .find(|a| a.email.eq_ignore_ascii_case(email.trim()) && a.password == password)
}

/// Whether an email belongs to the registry (case-insensitive)
pub fn email_registered(email: &str) -> bool {
    DEMO_ACCOUNTS
        .iter()
        .any(|a| a.email.eq_ignore_ascii_case(email.trim()))
}
