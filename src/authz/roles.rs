//! Role hierarchies.
//!
//! Two independent, totally ordered hierarchies exist:
//!
//! - system-wide: `guest < user < manager < admin < super_admin`
//! - per organization: `guest < member < manager < admin < owner`
//!
//! They are separate types on purpose and there is no conversion between them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AccessError;

/// An ordered role hierarchy. Rank is the position in [`RoleHierarchy::HIERARCHY`].
pub trait RoleHierarchy: Copy + Eq + fmt::Debug + 'static {
    /// Lowest role first.
    const HIERARCHY: &'static [Self];

    fn rank(self) -> i32 {
        Self::HIERARCHY
            .iter()
            .position(|role| *role == self)
            .map(|pos| pos as i32)
            .unwrap_or(-1)
    }
}

/// Rank of a possibly absent role. Absent (or unrecognized) ranks at -1.
pub fn rank<R: RoleHierarchy>(role: Option<R>) -> i32 {
    role.map(RoleHierarchy::rank).unwrap_or(-1)
}

/// System-wide role of a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    Guest,
    User,
    Manager,
    Admin,
    SuperAdmin,
}

impl RoleHierarchy for SystemRole {
    const HIERARCHY: &'static [Self] = &[
        SystemRole::Guest,
        SystemRole::User,
        SystemRole::Manager,
        SystemRole::Admin,
        SystemRole::SuperAdmin,
    ];
}

impl SystemRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "guest" => Some(Self::Guest),
            "user" => Some(Self::User),
            "manager" => Some(Self::Manager),
            "admin" => Some(Self::Admin),
            "super_admin" | "super-admin" | "superadmin" => Some(Self::SuperAdmin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::User => "user",
            Self::Manager => "manager",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for SystemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SystemRole {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| AccessError::unknown_role(s))
    }
}

/// Role of a principal inside one organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
    Guest,
    Member,
    Manager,
    Admin,
    Owner,
}

impl RoleHierarchy for OrgRole {
    const HIERARCHY: &'static [Self] = &[
        OrgRole::Guest,
        OrgRole::Member,
        OrgRole::Manager,
        OrgRole::Admin,
        OrgRole::Owner,
    ];
}

impl OrgRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "guest" => Some(Self::Guest),
            "member" => Some(Self::Member),
            "manager" => Some(Self::Manager),
            "admin" => Some(Self::Admin),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Member => "member",
            Self::Manager => "manager",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }
}

impl fmt::Display for OrgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrgRole {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| AccessError::unknown_role(s))
    }
}
