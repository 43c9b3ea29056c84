use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use uuid::Uuid;

use taskboard_access::authz::PrincipalClaims;
use taskboard_access::config::GuardConfig;
use taskboard_access::jwt::JwtConfig;
use taskboard_access::{
    AccessRequirement, DefaultPolicyEvaluator, GuardState, Location, Permission, Principal,
    RenderDecision, RouteGuard, SessionProvider, SessionStore, SystemRole,
};

fn guard() -> Arc<RouteGuard> {
    Arc::new(RouteGuard::new(
        Arc::new(DefaultPolicyEvaluator::default()),
        GuardConfig::default(),
    ))
}

#[tokio::test]
async fn decision_waits_for_session_to_resolve() -> Result<()> {
    let store = SessionStore::loading();
    let guard = guard();
    let requirement = AccessRequirement::permission(Permission::ViewReports);

    // evaluated against the in-flight snapshot, only the placeholder is possible
    assert_eq!(
        guard.guard(&store.snapshot(), &"/reports".into(), Some(&requirement), None),
        RenderDecision::PendingPlaceholder
    );

    let mut rx = store.subscribe();
    let waiter = {
        let guard = Arc::clone(&guard);
        let requirement = requirement.clone();
        tokio::spawn(async move {
            guard
                .settle(&mut rx, &Location::parse("/reports"), Some(&requirement), None)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    store.sign_in(Principal::new(Uuid::new_v4()).with_role(SystemRole::Manager));
    let decision = waiter.await?;
    assert_eq!(decision, RenderDecision::Render);
    Ok(())
}

#[tokio::test]
async fn settle_on_resolved_session_returns_immediately() -> Result<()> {
    let store = SessionStore::new();
    let guard = guard();
    let mut rx = store.subscribe();

    let decision = guard.settle(&mut rx, &Location::parse("/chat"), None, None).await;
    assert_eq!(decision.state(), GuardState::Unauthenticated);
    Ok(())
}

#[tokio::test]
async fn provider_dropped_while_loading_stays_pending() -> Result<()> {
    let store = SessionStore::loading();
    let guard = guard();
    let mut rx = store.subscribe();
    drop(store);

    let decision = guard.settle(&mut rx, &Location::parse("/chat"), None, None).await;
    assert_eq!(decision, RenderDecision::PendingPlaceholder);
    Ok(())
}

#[tokio::test]
async fn rehydrate_then_sign_out() -> Result<()> {
    let jwt = JwtConfig::new("integration-secret", 1);
    let token = jwt.encode(PrincipalClaims {
        sub: Uuid::new_v4(),
        role: "user".into(),
        permissions: None,
        organization: None,
    })?;

    let store = SessionStore::loading();
    let guard = guard();
    let mut rx = store.subscribe();

    store.rehydrate(&jwt, &token)?;
    let decision = guard.settle(&mut rx, &Location::parse("/chat"), None, None).await;
    assert_eq!(decision, RenderDecision::Render);

    store.begin_loading();
    assert_eq!(
        guard.guard(&store.snapshot(), &"/chat".into(), None, None),
        RenderDecision::PendingPlaceholder
    );

    store.sign_out();
    let decision = guard.settle(&mut rx, &Location::parse("/chat"), None, None).await;
    assert_eq!(decision.state(), GuardState::Unauthenticated);
    Ok(())
}
