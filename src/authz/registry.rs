//! Role -> permission registry.
//!
//! The registry is a total mapping: every system role and every organization role
//! has an entry, possibly empty. A table that leaves a role out is rejected when the
//! registry is built, so lookups never miss at evaluation time.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use super::permissions::Permission;
use super::roles::{OrgRole, RoleHierarchy, SystemRole};
use crate::errors::{AccessError, AppResult};

pub type PermissionSet = HashSet<Permission>;

#[derive(Debug, Clone)]
pub struct RoleRegistry {
    system: HashMap<SystemRole, PermissionSet>,
    organization: HashMap<OrgRole, PermissionSet>,
}

/// On-disk shape of a registry table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryFile {
    system: HashMap<String, Vec<String>>,
    organization: HashMap<String, Vec<String>>,
}

impl RoleRegistry {
    /// Build a registry from explicit tables, rejecting any unmapped role.
    pub fn from_tables(
        system: HashMap<SystemRole, PermissionSet>,
        organization: HashMap<OrgRole, PermissionSet>,
    ) -> AppResult<Self> {
        ensure_total(&system, "system")?;
        ensure_total(&organization, "organization")?;
        Ok(Self { system, organization })
    }

    /// The product's built-in table.
    pub fn standard() -> Self {
        use Permission::*;

        let guest = set(&[ViewDashboard]);
        let user = extend(
            &guest,
            &[ViewProjects, ViewTasks, CreateTask, EditTask, ViewChat, SendMessage, UploadFile],
        );
        let manager = extend(
            &user,
            &[CreateProject, EditProject, AssignTask, ManageBoard, ViewReports],
        );
        let admin = extend(
            &manager,
            &[DeleteProject, DeleteTask, ManageUsers, ManageSettings],
        );
        let super_admin = set(Permission::ALL);

        let org_guest = set(&[ViewProjects, ViewTasks]);
        let org_member = extend(
            &org_guest,
            &[CreateTask, EditTask, ViewChat, SendMessage, UploadFile],
        );
        let org_manager = extend(
            &org_member,
            &[CreateProject, EditProject, AssignTask, ManageBoard, ViewReports],
        );
        let org_admin = extend(&org_manager, &[DeleteProject, DeleteTask, ManageMembers]);
        let org_owner = extend(&org_admin, &[ManageOrganization]);

        Self {
            system: HashMap::from([
                (SystemRole::Guest, guest),
                (SystemRole::User, user),
                (SystemRole::Manager, manager),
                (SystemRole::Admin, admin),
                (SystemRole::SuperAdmin, super_admin),
            ]),
            organization: HashMap::from([
                (OrgRole::Guest, org_guest),
                (OrgRole::Member, org_member),
                (OrgRole::Manager, org_manager),
                (OrgRole::Admin, org_admin),
                (OrgRole::Owner, org_owner),
            ]),
        }
    }

    /// Parse a registry table from JSON.
    ///
    /// Unknown role names, unknown permission names and unmapped roles are all errors.
    pub fn from_json_str(json: &str) -> AppResult<Self> {
        let de = &mut serde_json::Deserializer::from_str(json);
        let file: RegistryFile = serde_path_to_error::deserialize(de)
            .map_err(|err| AccessError::registry(format!("{} at {}", err.inner(), err.path())))?;

        let system = parse_table(file.system, SystemRole::parse)?;
        let organization = parse_table(file.organization, OrgRole::parse)?;
        Self::from_tables(system, organization)
    }

    pub fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let registry = Self::from_json_str(&contents)?;
        tracing::info!(path = %path.display(), "loaded role registry");
        Ok(registry)
    }

    /// Permission set of a system role. Absent role => `None`.
    pub fn permissions_for(&self, role: Option<SystemRole>) -> Option<&PermissionSet> {
        role.and_then(|role| self.system.get(&role))
    }

    /// Permission set of an organization role. Absent role => `None`.
    pub fn org_permissions_for(&self, role: Option<OrgRole>) -> Option<&PermissionSet> {
        role.and_then(|role| self.organization.get(&role))
    }

    pub fn system_hierarchy(&self) -> &'static [SystemRole] {
        SystemRole::HIERARCHY
    }

    pub fn org_hierarchy(&self) -> &'static [OrgRole] {
        OrgRole::HIERARCHY
    }
}

impl Default for RoleRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn set(permissions: &[Permission]) -> PermissionSet {
    permissions.iter().copied().collect()
}

fn extend(base: &PermissionSet, more: &[Permission]) -> PermissionSet {
    base.iter().chain(more.iter()).copied().collect()
}

fn ensure_total<R: RoleHierarchy + std::hash::Hash>(
    table: &HashMap<R, PermissionSet>,
    label: &str,
) -> AppResult<()> {
    let missing: Vec<String> = R::HIERARCHY
        .iter()
        .filter(|role| !table.contains_key(*role))
        .map(|role| format!("{role:?}"))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AccessError::registry(format!(
            "{label} roles without a permission entry: {}",
            missing.join(", ")
        )))
    }
}

fn parse_table<R>(
    raw: HashMap<String, Vec<String>>,
    parse_role: fn(&str) -> Option<R>,
) -> AppResult<HashMap<R, PermissionSet>>
where
    R: RoleHierarchy + std::hash::Hash,
{
    let mut table = HashMap::with_capacity(raw.len());
    for (role_name, names) in raw {
        let role = parse_role(&role_name).ok_or_else(|| AccessError::unknown_role(&role_name))?;
        // BTreeSet keeps the error message stable when several names are bad.
        let unknown: BTreeSet<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|name| Permission::parse(name).is_none())
            .collect();
        if let Some(first) = unknown.iter().next() {
            return Err(AccessError::unknown_permission(*first));
        }
        let permissions = names.iter().filter_map(|name| Permission::parse(name)).collect();
        if table.insert(role, permissions).is_some() {
            return Err(AccessError::registry(format!("role {role_name} mapped twice")));
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_is_total() {
        let registry = RoleRegistry::standard();
        for role in SystemRole::HIERARCHY {
            assert!(registry.permissions_for(Some(*role)).is_some(), "{role} unmapped");
        }
        for role in OrgRole::HIERARCHY {
            assert!(registry.org_permissions_for(Some(*role)).is_some(), "{role} unmapped");
        }
    }

    #[test]
    fn test_standard_user_lacks_manage_settings() {
        let registry = RoleRegistry::standard();
        let user = registry.permissions_for(Some(SystemRole::User)).unwrap();
        assert!(!user.contains(&Permission::ManageSettings));
        assert!(user.contains(&Permission::CreateTask));

        let admin = registry.permissions_for(Some(SystemRole::Admin)).unwrap();
        assert!(admin.contains(&Permission::ManageSettings));
    }

    #[test]
    fn test_super_admin_holds_every_permission() {
        let registry = RoleRegistry::standard();
        let all = registry.permissions_for(Some(SystemRole::SuperAdmin)).unwrap();
        assert_eq!(all.len(), Permission::ALL.len());
    }

    #[test]
    fn test_absent_role_has_no_entry() {
        let registry = RoleRegistry::standard();
        assert!(registry.permissions_for(None).is_none());
        assert!(registry.org_permissions_for(None).is_none());
    }

    #[test]
    fn test_from_tables_rejects_unmapped_role() {
        let mut system: HashMap<SystemRole, PermissionSet> = SystemRole::HIERARCHY
            .iter()
            .map(|role| (*role, PermissionSet::new()))
            .collect();
        system.remove(&SystemRole::Manager);
        let organization = OrgRole::HIERARCHY
            .iter()
            .map(|role| (*role, PermissionSet::new()))
            .collect();

        let err = RoleRegistry::from_tables(system, organization).unwrap_err();
        assert!(err.to_string().contains("Manager"));
    }

    #[test]
    fn test_json_registry_with_empty_sets() {
        let json = r#"{
            "system": {"guest": [], "user": ["create_task"], "manager": [], "admin": [], "super_admin": []},
            "organization": {"guest": [], "member": [], "manager": [], "admin": [], "owner": ["manage_organization"]}
        }"#;
        let registry = RoleRegistry::from_json_str(json).unwrap();
        assert!(registry.permissions_for(Some(SystemRole::Guest)).unwrap().is_empty());
        assert!(registry
            .org_permissions_for(Some(OrgRole::Owner))
            .unwrap()
            .contains(&Permission::ManageOrganization));
    }

    #[test]
    fn test_json_registry_rejects_unknown_names() {
        let bad_role = r#"{"system": {"root": []}, "organization": {}}"#;
        assert!(matches!(
            RoleRegistry::from_json_str(bad_role),
            Err(AccessError::UnknownRole(_))
        ));

        let bad_permission = r#"{"system": {"guest": ["fly"]}, "organization": {}}"#;
        assert!(matches!(
            RoleRegistry::from_json_str(bad_permission),
            Err(AccessError::UnknownPermission(_))
        ));
    }

    #[test]
    fn test_json_registry_reports_path_on_shape_error() {
        let json = r#"{"system": {"guest": "view_dashboard"}, "organization": {}}"#;
        let err = RoleRegistry::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("system.guest"), "{err}");
    }
}
