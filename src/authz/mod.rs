//! Authorization module - registry, principal and policy evaluator
//!
//! This module implements the RBAC model with support for:
//! - Two independent role hierarchies (system-wide and per organization)
//! - Explicit role -> permission tables, checked for totality
//! - Per-principal permission overrides
//! - Organization-scoped checks for multi-tenant routes
//!
//! Unknown roles and permissions never grant anything.

mod evaluator;
mod permissions;
mod principal;
mod registry;
mod requirement;
mod roles;

pub use evaluator::{DefaultPolicyEvaluator, PolicyEvaluator};
pub use permissions::Permission;
pub use principal::{OrganizationClaim, OrganizationMembership, Principal, PrincipalClaims};
pub use registry::{PermissionSet, RoleRegistry};
pub use requirement::{AccessRequirement, CompositeRequirement, PermissionSpec};
pub use roles::{rank, OrgRole, RoleHierarchy, SystemRole};
