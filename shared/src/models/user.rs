//! User roles and route allow-lists

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role carried by every user account and JWT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    FloorManager,
    Accountant,
    Employee,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Manager,
        Role::FloorManager,
        Role::Accountant,
        Role::Employee,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::FloorManager => "FLOOR_MANAGER",
            Role::Accountant => "ACCOUNTANT",
            Role::Employee => "EMPLOYEE",
        }
    }

    /// Whether this role appears in `allowed`
    pub fn is_allowed(&self, allowed: &[Role]) -> bool {
        allowed.contains(self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("Unknown role: {}", s))
    }
}

/// Per-route allow-lists
pub mod access {
    use super::Role::{self, *};

    pub const ANY: &[Role] = &[Admin, Manager, FloorManager, Accountant, Employee];
    pub const ADMIN_ONLY: &[Role] = &[Admin];
    pub const MANAGEMENT: &[Role] = &[Admin, Manager];

    /// Employees, attendance, machines and materials
    pub const FLOOR: &[Role] = &[Admin, Manager, FloorManager];

    /// Customers and measurements
    pub const FRONT_DESK: &[Role] = &[Admin, Manager, FloorManager, Employee];

    /// Suppliers and purchase order drafting
    pub const PURCHASING: &[Role] = &[Admin, Manager, Accountant];

    /// Recording goods received against purchase orders
    pub const RECEIVING: &[Role] = &[Admin, Manager, FloorManager];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_lists() {
        assert!(Role::Admin.is_allowed(access::ADMIN_ONLY));
        assert!(!Role::Manager.is_allowed(access::ADMIN_ONLY));
        assert!(Role::Accountant.is_allowed(access::PURCHASING));
        assert!(!Role::FloorManager.is_allowed(access::PURCHASING));
        assert!(Role::FloorManager.is_allowed(access::RECEIVING));
        assert!(!Role::Employee.is_allowed(access::FLOOR));
        for role in Role::ALL {
            assert!(role.is_allowed(access::ANY));
        }
    }

    #[test]
    fn test_role_strings() {
        assert_eq!("FLOOR_MANAGER".parse::<Role>(), Ok(Role::FloorManager));
        assert!("ROOT".parse::<Role>().is_err());
        assert_eq!(
            serde_json::to_string(&Role::FloorManager).unwrap(),
            "\"FLOOR_MANAGER\""
        );
    }
}
