use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use taskboard_access::config::GuardConfig;
use taskboard_access::routes::RouteTable;
use taskboard_access::{
    AccessDenied, DefaultPolicyEvaluator, GuardState, Location, OrgRole, Principal, RenderDecision,
    RouteGuard, SessionSnapshot, SystemRole,
};

fn guard() -> Result<RouteGuard> {
    Ok(RouteGuard::new(Arc::new(DefaultPolicyEvaluator::default()), GuardConfig::default())
        .with_routes(RouteTable::standard()?))
}

fn state(guard: &RouteGuard, session: &SessionSnapshot, path: &str) -> GuardState {
    guard.guard_path(session, &Location::parse(path)).state()
}

#[test]
fn public_routes_render_without_a_session() -> Result<()> {
    let guard = guard()?;
    for path in ["/login", "/register", "/unauthorized"] {
        assert_eq!(
            guard.guard_path(&SessionSnapshot::loading(), &Location::parse(path)),
            RenderDecision::Render
        );
        assert_eq!(state(&guard, &SessionSnapshot::signed_out(), path), GuardState::Authorized);
    }
    Ok(())
}

#[test]
fn project_screens_follow_system_permissions() -> Result<()> {
    let guard = guard()?;
    let guest = SessionSnapshot::signed_in(Principal::new(Uuid::new_v4()).with_role(SystemRole::Guest));
    let user = SessionSnapshot::signed_in(Principal::new(Uuid::new_v4()).with_role(SystemRole::User));
    let manager = SessionSnapshot::signed_in(Principal::new(Uuid::new_v4()).with_role(SystemRole::Manager));

    assert_eq!(state(&guard, &guest, "/dashboard"), GuardState::Authorized);
    assert_eq!(state(&guard, &guest, "/projects"), GuardState::Forbidden);

    assert_eq!(state(&guard, &user, "/projects/12/board"), GuardState::Authorized);
    assert_eq!(state(&guard, &user, "/projects/new"), GuardState::Forbidden);
    assert_eq!(state(&guard, &user, "/projects/12/settings"), GuardState::Forbidden);
    assert_eq!(state(&guard, &user, "/reports"), GuardState::Forbidden);

    assert_eq!(state(&guard, &manager, "/projects/new"), GuardState::Authorized);
    assert_eq!(state(&guard, &manager, "/projects/12/settings"), GuardState::Authorized);
    assert_eq!(state(&guard, &manager, "/reports"), GuardState::Authorized);
    Ok(())
}

#[test]
fn admin_screens() -> Result<()> {
    let guard = guard()?;
    let admin = SessionSnapshot::signed_in(Principal::new(Uuid::new_v4()).with_role(SystemRole::Admin));
    let manager_with_override = SessionSnapshot::signed_in(
        Principal::new(Uuid::new_v4())
            .with_role(SystemRole::Manager)
            .with_permissions([taskboard_access::Permission::ManageSettings]),
    );

    assert_eq!(state(&guard, &admin, "/admin/users"), GuardState::Authorized);
    assert_eq!(state(&guard, &admin, "/admin/settings"), GuardState::Authorized);

    // the override covers the permission but not the minimum role
    let decision = guard.guard_path(&manager_with_override, &Location::parse("/admin/settings"));
    assert!(matches!(
        decision,
        RenderDecision::Redirect {
            reason: AccessDenied::InsufficientRole,
            ..
        }
    ));
    Ok(())
}

#[test]
fn organization_routes_are_tenant_scoped() -> Result<()> {
    let guard = guard()?;
    let org_id = Uuid::new_v4();
    let member = SessionSnapshot::signed_in(
        Principal::new(Uuid::new_v4())
            .with_role(SystemRole::User)
            .with_organization(org_id, OrgRole::Member),
    );
    let owner = SessionSnapshot::signed_in(
        Principal::new(Uuid::new_v4())
            .with_role(SystemRole::User)
            .with_organization(org_id, OrgRole::Owner),
    );

    let home = format!("/organizations/{org_id}");
    let members = format!("/organizations/{org_id}/members");
    let settings = format!("/organizations/{org_id}/settings");
    let elsewhere = format!("/organizations/{}", Uuid::new_v4());

    assert_eq!(state(&guard, &member, &home), GuardState::Authorized);
    assert_eq!(state(&guard, &member, &members), GuardState::Forbidden);
    assert_eq!(state(&guard, &member, &elsewhere), GuardState::Forbidden);

    assert_eq!(state(&guard, &owner, &members), GuardState::Authorized);
    assert_eq!(state(&guard, &owner, &settings), GuardState::Authorized);
    assert_eq!(state(&guard, &owner, &elsewhere), GuardState::Forbidden);
    Ok(())
}

#[test]
fn malformed_organization_id_is_forbidden() -> Result<()> {
    let guard = guard()?;
    let org_id = Uuid::new_v4();
    let owner = SessionSnapshot::signed_in(
        Principal::new(Uuid::new_v4())
            .with_role(SystemRole::SuperAdmin)
            .with_organization(org_id, OrgRole::Owner),
    );

    assert_eq!(
        state(&guard, &owner, "/organizations/not-a-uuid/settings"),
        GuardState::Forbidden
    );
    // still asks for login first when nobody is signed in
    assert_eq!(
        state(&guard, &SessionSnapshot::signed_out(), "/organizations/not-a-uuid"),
        GuardState::Unauthenticated
    );
    Ok(())
}

#[test]
fn unknown_paths_require_authentication_only() -> Result<()> {
    let guard = guard()?;
    let guest = SessionSnapshot::signed_in(Principal::new(Uuid::new_v4()).with_role(SystemRole::Guest));

    assert_eq!(state(&guard, &guest, "/some/new/screen"), GuardState::Authorized);
    assert_eq!(
        state(&guard, &SessionSnapshot::signed_out(), "/some/new/screen"),
        GuardState::Unauthenticated
    );
    Ok(())
}

#[test]
fn path_spelling_variants_keep_their_requirement() -> Result<()> {
    let guard = guard()?;
    let guest = SessionSnapshot::signed_in(Principal::new(Uuid::new_v4()).with_role(SystemRole::Guest));
    let admin = SessionSnapshot::signed_in(Principal::new(Uuid::new_v4()).with_role(SystemRole::Admin));

    for path in ["/admin/users", "/Admin/Users", "/admin/%75sers", "/ADMIN/USERS/"] {
        assert_eq!(state(&guard, &guest, path), GuardState::Forbidden, "{path}");
        assert_eq!(state(&guard, &admin, path), GuardState::Authorized, "{path}");
    }
    assert_eq!(state(&guard, &guest, "/REPORTS"), GuardState::Forbidden);
    assert_eq!(state(&guard, &guest, "/%72eports"), GuardState::Forbidden);
    Ok(())
}

#[test]
fn organization_role_unlocks_organization_permissions() -> Result<()> {
    let guard = guard()?;
    let org_id = Uuid::new_v4();
    let admin_of_org = SessionSnapshot::signed_in(
        Principal::new(Uuid::new_v4())
            .with_role(SystemRole::User)
            .with_organization(org_id, OrgRole::Admin),
    );

    // manage_members comes only from the organization role
    assert_eq!(
        state(&guard, &admin_of_org, &format!("/organizations/{org_id}/members")),
        GuardState::Authorized
    );
    assert_eq!(
        state(&guard, &admin_of_org, &format!("/organizations/{}/members", Uuid::new_v4())),
        GuardState::Forbidden
    );
    assert_eq!(
        state(&guard, &admin_of_org, &format!("/organizations/{org_id}/settings")),
        GuardState::Forbidden
    );
    Ok(())
}
