use std::sync::Arc;

use uuid::Uuid;

use super::permissions::Permission;
use super::principal::Principal;
use super::registry::{PermissionSet, RoleRegistry};
use super::requirement::{AccessRequirement, CompositeRequirement};
use super::roles::{rank, OrgRole, RoleHierarchy, SystemRole};
use crate::errors::AccessDenied;

/// Policy evaluator trait, shared by the route guard and the UI gate.
///
/// Implementations are total: every call returns a decision, never panics.
pub trait PolicyEvaluator: Send + Sync {
    /// Decide whether `principal` meets `requirement`.
    fn evaluate(
        &self,
        principal: Option<&Principal>,
        requirement: &AccessRequirement,
    ) -> Result<(), AccessDenied>;

    /// Like [`PolicyEvaluator::evaluate`], scoped to one organization: the principal's
    /// active organization must be `org_id`.
    fn evaluate_in_org(
        &self,
        principal: Option<&Principal>,
        requirement: &AccessRequirement,
        org_id: Uuid,
    ) -> Result<(), AccessDenied>;

    fn satisfies(&self, principal: Option<&Principal>, requirement: &AccessRequirement) -> bool {
        self.evaluate(principal, requirement).is_ok()
    }
}

/// Default evaluator over an injected, immutable [`RoleRegistry`].
///
/// Composite requirements are a logical AND of every part they specify:
/// 1. permissions (any, or all with `require_all`)
/// 2. acceptable roles (exact match on the system role)
/// 3. minimum system role (hierarchy rank)
/// 4. minimum organization role (rank in the active organization)
#[derive(Debug, Clone)]
pub struct DefaultPolicyEvaluator {
    registry: Arc<RoleRegistry>,
    empty: PermissionSet,
}

impl DefaultPolicyEvaluator {
    pub fn new(registry: Arc<RoleRegistry>) -> Self {
        Self {
            registry,
            empty: PermissionSet::new(),
        }
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    /// Override set if present and non-empty, else the set of the system role.
    ///
    /// An override made only of unrecognized names yields the empty set rather than
    /// falling back to the role.
    pub fn effective_permissions<'a>(&'a self, principal: &'a Principal) -> &'a PermissionSet {
        if principal.has_override() {
            return principal.permissions.as_ref().unwrap_or(&self.empty);
        }
        if principal.permissions.is_some() && !principal.unrecognized_permissions.is_empty() {
            return &self.empty;
        }
        self.registry
            .permissions_for(principal.role)
            .unwrap_or(&self.empty)
    }

    /// Role-derived set of the principal's role in `org_id`. Empty outside that org.
    pub fn org_permissions<'a>(&'a self, principal: &'a Principal, org_id: Uuid) -> &'a PermissionSet {
        self.registry
            .org_permissions_for(principal.org_role_in(org_id))
            .unwrap_or(&self.empty)
    }

    pub fn has_permission(&self, principal: &Principal, permission: Permission) -> bool {
        self.effective_permissions(principal).contains(&permission)
    }

    pub fn has_any_permission(&self, principal: &Principal, permissions: &[Permission]) -> bool {
        let effective = self.effective_permissions(principal);
        permissions.iter().any(|permission| effective.contains(permission))
    }

    pub fn has_all_permissions(&self, principal: &Principal, permissions: &[Permission]) -> bool {
        let effective = self.effective_permissions(principal);
        permissions.iter().all(|permission| effective.contains(permission))
    }

    pub fn has_role(&self, principal: &Principal, role: SystemRole) -> bool {
        principal.role == Some(role)
    }

    pub fn has_any_role(&self, principal: &Principal, roles: &[SystemRole]) -> bool {
        roles.iter().any(|role| self.has_role(principal, *role))
    }

    /// `rank(principal.role) >= rank(min_role)`. No principal, or an unrecognized
    /// role, never meets any minimum.
    pub fn meets_minimum_role(&self, principal: Option<&Principal>, min_role: SystemRole) -> bool {
        principal.is_some_and(|principal| rank(principal.role) >= min_role.rank())
    }

    pub fn has_org_role(&self, principal: &Principal, org_id: Uuid, role: OrgRole) -> bool {
        principal.org_role_in(org_id) == Some(role)
    }

    pub fn meets_minimum_org_role(
        &self,
        principal: Option<&Principal>,
        org_id: Uuid,
        min_role: OrgRole,
    ) -> bool {
        principal.is_some_and(|principal| rank(principal.org_role_in(org_id)) >= min_role.rank())
    }

    /// Inside an organization context the org role's set counts alongside the
    /// effective set.
    fn grants(&self, principal: &Principal, permission: Permission, org_id: Option<Uuid>) -> bool {
        self.effective_permissions(principal).contains(&permission)
            || org_id.is_some_and(|org_id| self.org_permissions(principal, org_id).contains(&permission))
    }

    fn check_permissions(
        &self,
        principal: &Principal,
        permissions: &[Permission],
        require_all: bool,
        org_id: Option<Uuid>,
    ) -> Result<(), AccessDenied> {
        let granted = match permissions {
            [] => true,
            [single] => self.grants(principal, *single, org_id),
            many if require_all => many.iter().all(|p| self.grants(principal, *p, org_id)),
            many => many.iter().any(|p| self.grants(principal, *p, org_id)),
        };
        if granted {
            Ok(())
        } else {
            Err(permission_denial(principal))
        }
    }

    fn check_composite(
        &self,
        principal: &Principal,
        composite: &CompositeRequirement,
        org_id: Option<Uuid>,
    ) -> Result<(), AccessDenied> {
        self.check_permissions(principal, &composite.permissions, composite.require_all, org_id)?;

        if !composite.roles.is_empty() && !self.has_any_role(principal, &composite.roles) {
            return Err(role_denial(principal));
        }

        if let Some(min_role) = composite.min_role {
            if !self.meets_minimum_role(Some(principal), min_role) {
                return Err(role_denial(principal));
            }
        }

        if let Some(min_org_role) = composite.min_org_role {
            let org_id = match org_id.or(principal.organization.map(|org| org.org_id)) {
                Some(org_id) => org_id,
                None => return Err(AccessDenied::InsufficientRole),
            };
            if !self.meets_minimum_org_role(Some(principal), org_id, min_org_role) {
                return Err(org_denial(principal));
            }
        }

        Ok(())
    }

    fn decide(
        &self,
        principal: &Principal,
        requirement: &AccessRequirement,
        org_id: Option<Uuid>,
    ) -> Result<(), AccessDenied> {
        match requirement {
            AccessRequirement::Authenticated => Ok(()),
            AccessRequirement::SinglePermission { permission } => {
                self.check_permissions(principal, std::slice::from_ref(permission), false, org_id)
            }
            AccessRequirement::PermissionList { permissions } => {
                self.check_permissions(principal, permissions, false, org_id)
            }
            AccessRequirement::Composite(composite) => {
                self.check_composite(principal, composite, org_id)
            }
        }
    }

    fn log_outcome(
        principal: &Principal,
        requirement: &AccessRequirement,
        outcome: &Result<(), AccessDenied>,
    ) {
        match outcome {
            Ok(()) => tracing::debug!(
                user_id = %principal.user_id,
                requirement = ?requirement,
                "access granted"
            ),
            Err(denied) => tracing::debug!(
                user_id = %principal.user_id,
                requirement = ?requirement,
                reason = denied.as_str(),
                unrecognized_claims = principal.has_unrecognized_claims(),
                "access denied"
            ),
        }
    }
}

impl Default for DefaultPolicyEvaluator {
    fn default() -> Self {
        Self::new(Arc::new(RoleRegistry::standard()))
    }
}

impl PolicyEvaluator for DefaultPolicyEvaluator {
    fn evaluate(
        &self,
        principal: Option<&Principal>,
        requirement: &AccessRequirement,
    ) -> Result<(), AccessDenied> {
        let Some(principal) = principal else {
            return Err(AccessDenied::Unauthenticated);
        };
        let outcome = self.decide(principal, requirement, None);
        Self::log_outcome(principal, requirement, &outcome);
        outcome
    }

    fn evaluate_in_org(
        &self,
        principal: Option<&Principal>,
        requirement: &AccessRequirement,
        org_id: Uuid,
    ) -> Result<(), AccessDenied> {
        let Some(principal) = principal else {
            return Err(AccessDenied::Unauthenticated);
        };
        let outcome = match principal.organization {
            Some(membership) if membership.org_id == org_id => {
                self.decide(principal, requirement, Some(org_id))
            }
            _ => {
                tracing::debug!(
                    user_id = %principal.user_id,
                    org_id = %org_id,
                    "organization is not the principal's active organization"
                );
                Err(AccessDenied::InsufficientRole)
            }
        };
        Self::log_outcome(principal, requirement, &outcome);
        outcome
    }
}

/// Unknown names explain a denial only when they left the effective set empty.
fn permission_denial(principal: &Principal) -> AccessDenied {
    let emptied_by_unknown = if principal.has_override() {
        false
    } else if principal.permissions.is_some() && !principal.unrecognized_permissions.is_empty() {
        true
    } else {
        principal.unrecognized_role.is_some()
    };
    if emptied_by_unknown {
        AccessDenied::UnknownRoleOrPermission
    } else {
        AccessDenied::InsufficientPermission
    }
}

fn role_denial(principal: &Principal) -> AccessDenied {
    if principal.unrecognized_role.is_some() {
        AccessDenied::UnknownRoleOrPermission
    } else {
        AccessDenied::InsufficientRole
    }
}

fn org_denial(principal: &Principal) -> AccessDenied {
    match principal.organization {
        Some(membership) if membership.role.is_none() => AccessDenied::UnknownRoleOrPermission,
        _ => AccessDenied::InsufficientRole,
    }
}
