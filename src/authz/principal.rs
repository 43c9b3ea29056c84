use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::permissions::Permission;
use super::roles::{OrgRole, SystemRole};

/// The authenticated actor, as an immutable snapshot.
///
/// Built on sign-in, rebuilt on session rehydration, dropped on sign-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    /// `None` when the session carried no role or one the hierarchy does not know.
    pub role: Option<SystemRole>,
    /// Explicit override. When present and non-empty it replaces the role-derived set.
    pub permissions: Option<HashSet<Permission>>,
    /// Active organization context, if any.
    pub organization: Option<OrganizationMembership>,
    /// Raw role claim that failed to parse.
    pub unrecognized_role: Option<String>,
    /// Raw permission claims that failed to parse.
    pub unrecognized_permissions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrganizationMembership {
    pub org_id: Uuid,
    /// `None` when the organization role claim was not recognized.
    pub role: Option<OrgRole>,
}

impl Principal {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: None,
            permissions: None,
            organization: None,
            unrecognized_role: None,
            unrecognized_permissions: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: SystemRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_permissions(mut self, perms: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions = Some(perms.into_iter().collect());
        self
    }

    pub fn with_organization(mut self, org_id: Uuid, role: OrgRole) -> Self {
        self.organization = Some(OrganizationMembership {
            org_id,
            role: Some(role),
        });
        self
    }

    /// Build a principal from session claims.
    ///
    /// Parsing never fails. Names the registry does not know are kept aside in the
    /// `unrecognized_*` fields so they can never grant anything.
    pub fn from_claims(claims: &PrincipalClaims) -> Self {
        let role = SystemRole::parse(&claims.role);
        let unrecognized_role = match role {
            Some(_) => None,
            None => {
                tracing::warn!(
                    user_id = %claims.sub,
                    role = %claims.role,
                    "unrecognized system role in session claims"
                );
                Some(claims.role.clone())
            }
        };

        let mut unrecognized_permissions = Vec::new();
        let permissions = claims.permissions.as_ref().map(|names| {
            names
                .iter()
                .filter_map(|name| match Permission::parse(name) {
                    Some(permission) => Some(permission),
                    None => {
                        tracing::warn!(
                            user_id = %claims.sub,
                            permission = %name,
                            "unrecognized permission in session claims"
                        );
                        unrecognized_permissions.push(name.clone());
                        None
                    }
                })
                .collect::<HashSet<_>>()
        });

        let organization = claims.organization.as_ref().map(|org| {
            let org_role = OrgRole::parse(&org.role);
            if org_role.is_none() {
                tracing::warn!(
                    user_id = %claims.sub,
                    org_id = %org.id,
                    role = %org.role,
                    "unrecognized organization role in session claims"
                );
            }
            OrganizationMembership {
                org_id: org.id,
                role: org_role,
            }
        });

        Self {
            user_id: claims.sub,
            role,
            permissions,
            organization,
            unrecognized_role,
            unrecognized_permissions,
        }
    }

    /// True when the override set is present and non-empty.
    pub fn has_override(&self) -> bool {
        self.permissions.as_ref().is_some_and(|set| !set.is_empty())
    }

    /// True when any claim was dropped during parsing.
    pub fn has_unrecognized_claims(&self) -> bool {
        self.unrecognized_role.is_some()
            || !self.unrecognized_permissions.is_empty()
            || self.organization.is_some_and(|org| org.role.is_none())
    }

    /// Organization role, only if `org_id` is the active organization.
    pub fn org_role_in(&self, org_id: Uuid) -> Option<OrgRole> {
        self.organization
            .filter(|membership| membership.org_id == org_id)
            .and_then(|membership| membership.role)
    }
}

/// Wire shape of a principal inside a session token or a principal file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalClaims {
    pub sub: Uuid,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrganizationClaim>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationClaim {
    pub id: Uuid,
    pub role: String,
}
