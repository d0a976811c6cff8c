//! Role-based permissions.
//!
//! Each [`Role`] owns a fixed set of [`Permission`] tokens. A role satisfies a
//! permission when its set contains that token or [`Permission::All`]. There is no
//! inheritance between roles.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    All,
    ViewPatients,
    EditPatients,
    ViewAppointments,
    EditAppointments,
    ViewRecords,
}

impl Permission {
    pub const fn as_str(self) -> &'static str {
        match self {
            Permission::All => "all",
            Permission::ViewPatients => "view_patients",
            Permission::EditPatients => "edit_patients",
            Permission::ViewAppointments => "view_appointments",
            Permission::EditAppointments => "edit_appointments",
            Permission::ViewRecords => "view_records",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission token: {0}")]
pub struct UnknownPermission(String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Permission::All),
            "view_patients" => Ok(Permission::ViewPatients),
            "edit_patients" => Ok(Permission::EditPatients),
            "view_appointments" => Ok(Permission::ViewAppointments),
            "edit_appointments" => Ok(Permission::EditAppointments),
            "view_records" => Ok(Permission::ViewRecords),
            other => Err(UnknownPermission(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Professional,
    Receptionist,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Professional => "professional",
            Role::Receptionist => "receptionist",
        }
    }

    /// The permission tokens granted to this role.
    pub const fn permissions(self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Admin => &[All],
            Role::Professional => &[
                ViewPatients,
                EditPatients,
                ViewAppointments,
                EditAppointments,
                ViewRecords,
            ],
            Role::Receptionist => &[
                ViewPatients,
                EditPatients,
                ViewAppointments,
                EditAppointments,
            ],
        }
    }

    pub fn has_permission(self, permission: Permission) -> bool {
        let granted = self.permissions();
        granted.contains(&Permission::All) || granted.contains(&permission)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "professional" => Ok(Role::Professional),
            "receptionist" => Ok(Role::Receptionist),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
