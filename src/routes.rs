//! Route table: which screens are public and what the protected ones require.

use std::collections::HashMap;

use crate::authz::{AccessRequirement, CompositeRequirement, OrgRole, Permission, SystemRole};
use crate::errors::{AccessError, AppResult};

/// Path parameter that scopes a route to one organization.
pub const ORG_PARAM: &str = "org_id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAccess {
    /// Rendered without consulting the session.
    Public,
    /// Requires a principal; `None` means authenticated only.
    Protected(Option<AccessRequirement>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    fn parse(pattern: &str) -> AppResult<Self> {
        if !pattern.starts_with('/') {
            return Err(AccessError::route(format!("pattern must start with '/': {pattern}")));
        }

        let mut segments = Vec::new();
        for part in split_path(pattern) {
            let segment = match part.strip_prefix(':') {
                Some("") => {
                    return Err(AccessError::route(format!("empty parameter name in {pattern}")));
                }
                Some(name) => {
                    if segments.contains(&Segment::Param(name.to_string())) {
                        return Err(AccessError::route(format!(
                            "duplicate parameter :{name} in {pattern}"
                        )));
                    }
                    Segment::Param(name.to_string())
                }
                None => Segment::Literal(part.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// Segments are percent-decoded and literals compare ASCII case-insensitively,
    /// so every spelling a client router sends to a screen resolves to its pattern.
    fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<String> = split_path(path).map(decode_segment).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal.eq_ignore_ascii_case(&part) => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part);
                }
            }
        }
        Some(params)
    }
}

fn decode_segment(part: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(part.as_bytes())).into_owned()
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|part| !part.is_empty())
}

#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub pattern: &'a str,
    pub access: &'a RouteAccess,
    pub params: HashMap<String, String>,
}

/// Ordered list of route patterns. The first matching pattern wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<(RoutePattern, RouteAccess)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, pattern: &str, access: RouteAccess) -> AppResult<Self> {
        self.routes.push((RoutePattern::parse(pattern)?, access));
        Ok(self)
    }

    pub fn public(self, pattern: &str) -> AppResult<Self> {
        self.route(pattern, RouteAccess::Public)
    }

    pub fn protected(self, pattern: &str, requirement: AccessRequirement) -> AppResult<Self> {
        self.route(pattern, RouteAccess::Protected(Some(requirement)))
    }

    pub fn authenticated(self, pattern: &str) -> AppResult<Self> {
        self.route(pattern, RouteAccess::Protected(None))
    }

    /// The product's screens.
    pub fn standard() -> AppResult<Self> {
        Self::new()
            .public("/login")?
            .public("/register")?
            .public("/forgot-password")?
            .public("/unauthorized")?
            .authenticated("/")?
            .protected("/dashboard", AccessRequirement::permission(Permission::ViewDashboard))?
            .protected("/projects", AccessRequirement::permission(Permission::ViewProjects))?
            .protected("/projects/new", AccessRequirement::permission(Permission::CreateProject))?
            .protected("/projects/:project_id", AccessRequirement::permission(Permission::ViewProjects))?
            .protected(
                "/projects/:project_id/board",
                AccessRequirement::all_of([Permission::ViewProjects, Permission::ViewTasks]),
            )?
            .protected(
                "/projects/:project_id/settings",
                AccessRequirement::any_of([Permission::EditProject, Permission::DeleteProject]),
            )?
            .protected("/chat", AccessRequirement::permission(Permission::ViewChat))?
            .authenticated("/notifications")?
            .protected("/reports", AccessRequirement::permission(Permission::ViewReports))?
            .protected("/organizations/:org_id", AccessRequirement::min_org_role(OrgRole::Guest))?
            .protected(
                "/organizations/:org_id/projects",
                AccessRequirement::min_org_role(OrgRole::Member),
            )?
            .protected(
                "/organizations/:org_id/members",
                AccessRequirement::from(
                    CompositeRequirement::new()
                        .with_permissions([Permission::ManageMembers])
                        .with_min_org_role(OrgRole::Admin),
                ),
            )?
            .protected(
                "/organizations/:org_id/settings",
                AccessRequirement::from(
                    CompositeRequirement::new()
                        .with_permissions([Permission::ManageOrganization])
                        .with_min_org_role(OrgRole::Owner),
                ),
            )?
            .protected(
                "/admin/users",
                AccessRequirement::roles([SystemRole::Admin, SystemRole::SuperAdmin]),
            )?
            .protected(
                "/admin/settings",
                AccessRequirement::from(
                    CompositeRequirement::new()
                        .with_permissions([Permission::ManageSettings])
                        .with_min_role(SystemRole::Admin),
                ),
            )
    }

    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.iter().find_map(|(pattern, access)| {
            pattern.matches(path).map(|params| RouteMatch {
                pattern: &pattern.raw,
                access,
                params,
            })
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_builds() {
        let table = RouteTable::standard().unwrap();
        assert!(!table.is_empty());
    }

    #[test]
    fn test_literal_wins_when_listed_first() {
        let table = RouteTable::standard().unwrap();
        let matched = table.resolve("/projects/new").unwrap();
        assert_eq!(matched.pattern, "/projects/new");
        assert!(matched.params.is_empty());

        let matched = table.resolve("/projects/42").unwrap();
        assert_eq!(matched.pattern, "/projects/:project_id");
        assert_eq!(matched.params.get("project_id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_trailing_slash_and_root() {
        let table = RouteTable::standard().unwrap();
        assert_eq!(table.resolve("/reports/").unwrap().pattern, "/reports");
        assert_eq!(table.resolve("/").unwrap().pattern, "/");
        assert!(table.resolve("/nowhere/at/all").is_none());
    }

    #[test]
    fn test_case_and_percent_encoding_variants_resolve() {
        let table = RouteTable::standard().unwrap();
        assert_eq!(table.resolve("/Admin/Users").unwrap().pattern, "/admin/users");
        assert_eq!(table.resolve("/REPORTS").unwrap().pattern, "/reports");
        assert_eq!(table.resolve("/admin/%75sers").unwrap().pattern, "/admin/users");

        let matched = table.resolve("/projects/a%20b/board").unwrap();
        assert_eq!(matched.params.get("project_id").map(String::as_str), Some("a b"));
    }

    #[test]
    fn test_public_routes() {
        let table = RouteTable::standard().unwrap();
        assert_eq!(table.resolve("/login").unwrap().access, &RouteAccess::Public);
    }

    #[test]
    fn test_bad_patterns() {
        assert!(RouteTable::new().public("login").is_err());
        assert!(RouteTable::new().public("/a/:").is_err());
        assert!(RouteTable::new().public("/a/:id/b/:id").is_err());
    }
}
