use serde::{Deserialize, Serialize};

use super::permissions::Permission;
use super::roles::{OrgRole, SystemRole};

/// Declarative gate attached to a route or an action.
///
/// Deserializing rejects unknown role or permission names, so a requirement that
/// exists at runtime only ever names things the registry knows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessRequirement {
    /// Any authenticated principal.
    Authenticated,
    /// Exact membership test for one permission.
    SinglePermission { permission: Permission },
    /// At least one of the listed permissions.
    PermissionList { permissions: Vec<Permission> },
    Composite(CompositeRequirement),
}

/// Permissions and roles combined with logical AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeRequirement {
    pub permissions: Vec<Permission>,
    /// Acceptable system roles, matched exactly.
    pub roles: Vec<SystemRole>,
    /// All listed permissions instead of any.
    pub require_all: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_role: Option<SystemRole>,
    /// Minimum role in the active organization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_org_role: Option<OrgRole>,
}

impl AccessRequirement {
    pub fn permission(permission: Permission) -> Self {
        Self::SinglePermission { permission }
    }

    pub fn any_of(permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self::PermissionList {
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn all_of(permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self::Composite(CompositeRequirement {
            permissions: permissions.into_iter().collect(),
            require_all: true,
            ..CompositeRequirement::default()
        })
    }

    pub fn roles(roles: impl IntoIterator<Item = SystemRole>) -> Self {
        Self::Composite(CompositeRequirement {
            roles: roles.into_iter().collect(),
            ..CompositeRequirement::default()
        })
    }

    pub fn min_role(role: SystemRole) -> Self {
        Self::Composite(CompositeRequirement {
            min_role: Some(role),
            ..CompositeRequirement::default()
        })
    }

    pub fn min_org_role(role: OrgRole) -> Self {
        Self::Composite(CompositeRequirement {
            min_org_role: Some(role),
            ..CompositeRequirement::default()
        })
    }

    /// True when nothing beyond authentication is required.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Authenticated => true,
            Self::SinglePermission { .. } => false,
            Self::PermissionList { permissions } => permissions.is_empty(),
            Self::Composite(composite) => composite.is_empty(),
        }
    }
}

impl CompositeRequirement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions = permissions.into_iter().collect();
        self
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = SystemRole>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    pub fn require_all(mut self, require_all: bool) -> Self {
        self.require_all = require_all;
        self
    }

    pub fn with_min_role(mut self, role: SystemRole) -> Self {
        self.min_role = Some(role);
        self
    }

    pub fn with_min_org_role(mut self, role: OrgRole) -> Self {
        self.min_org_role = Some(role);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
            && self.roles.is_empty()
            && self.min_role.is_none()
            && self.min_org_role.is_none()
    }
}

impl From<CompositeRequirement> for AccessRequirement {
    fn from(value: CompositeRequirement) -> Self {
        Self::Composite(value)
    }
}

/// Permission input of a UI gate: one permission or a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionSpec {
    One(Permission),
    Many(Vec<Permission>),
}

impl PermissionSpec {
    pub fn into_requirement(self, require_all: bool) -> AccessRequirement {
        match self {
            PermissionSpec::One(permission) => AccessRequirement::permission(permission),
            PermissionSpec::Many(permissions) if require_all => AccessRequirement::all_of(permissions),
            PermissionSpec::Many(permissions) => AccessRequirement::any_of(permissions),
        }
    }
}

impl From<Permission> for PermissionSpec {
    fn from(value: Permission) -> Self {
        Self::One(value)
    }
}

impl From<Vec<Permission>> for PermissionSpec {
    fn from(value: Vec<Permission>) -> Self {
        Self::Many(value)
    }
}

impl From<&[Permission]> for PermissionSpec {
    fn from(value: &[Permission]) -> Self {
        Self::Many(value.to_vec())
    }
}

impl<const N: usize> From<[Permission; N]> for PermissionSpec {
    fn from(value: [Permission; N]) -> Self {
        Self::Many(value.to_vec())
    }
}
