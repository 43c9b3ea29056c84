//! Route guard.
//!
//! A pure decision function re-evaluated on every navigation:
//!
//! ```text
//! PENDING ──(session ready)──┬─> UNAUTHENTICATED  redirect to login, keep return location
//!                            ├─> FORBIDDEN        redirect to the forbidden view
//!                            └─> AUTHORIZED       render
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use tokio::sync::watch;
use uuid::Uuid;

use crate::authz::{AccessRequirement, PolicyEvaluator};
use crate::config::GuardConfig;
use crate::errors::AccessDenied;
use crate::routes::{RouteAccess, RouteTable, ORG_PARAM};
use crate::session::SessionSnapshot;

/// A navigable location: path plus optional query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: Option<String>,
}

impl Location {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: None,
        }
    }

    /// Parse `"/path?query#fragment"`. The fragment is dropped.
    pub fn parse(s: &str) -> Self {
        let s = s.split('#').next().unwrap_or_default();
        let (path, query) = match s.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (s, None),
        };
        let path = if path.is_empty() { "/" } else { path };
        Self {
            path: path.to_string(),
            query: query.filter(|q| !q.is_empty()).map(str::to_string),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.query {
            Some(query) => write!(f, "{}?{}", self.path, query),
            None => write!(f, "{}", self.path),
        }
    }
}

impl From<&str> for Location {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    Pending,
    Authorized,
    Unauthenticated,
    Forbidden,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RenderDecision {
    /// Session still loading: render a neutral placeholder.
    PendingPlaceholder,
    Redirect {
        target: Location,
        /// Location the user asked for, kept for post-login return.
        #[serde(skip_serializing_if = "Option::is_none")]
        return_to: Option<Location>,
        reason: AccessDenied,
    },
    Render,
}

impl RenderDecision {
    pub fn state(&self) -> GuardState {
        match self {
            RenderDecision::PendingPlaceholder => GuardState::Pending,
            RenderDecision::Render => GuardState::Authorized,
            RenderDecision::Redirect {
                reason: AccessDenied::Unauthenticated,
                ..
            } => GuardState::Unauthenticated,
            RenderDecision::Redirect { .. } => GuardState::Forbidden,
        }
    }
}

pub struct RouteGuard {
    evaluator: Arc<dyn PolicyEvaluator>,
    config: GuardConfig,
    routes: RouteTable,
}

impl RouteGuard {
    pub fn new(evaluator: Arc<dyn PolicyEvaluator>, config: GuardConfig) -> Self {
        Self {
            evaluator,
            config,
            routes: RouteTable::new(),
        }
    }

    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decide what to render for `location` under `requirement`.
    ///
    /// `redirect_override` replaces the redirect target of both login and forbidden
    /// redirects.
    pub fn guard(
        &self,
        session: &SessionSnapshot,
        location: &Location,
        requirement: Option<&AccessRequirement>,
        redirect_override: Option<&Location>,
    ) -> RenderDecision {
        self.decide(session, location, requirement, None, redirect_override)
    }

    /// Look `location` up in the route table and guard it.
    ///
    /// Public routes render without consulting the session. Unknown paths are
    /// treated as authenticated-only.
    pub fn guard_path(&self, session: &SessionSnapshot, location: &Location) -> RenderDecision {
        let Some(matched) = self.routes.resolve(&location.path) else {
            return self.decide(session, location, None, None, None);
        };

        let requirement = match matched.access {
            RouteAccess::Public => return RenderDecision::Render,
            RouteAccess::Protected(requirement) => requirement.as_ref(),
        };

        let org_scope = match matched.params.get(ORG_PARAM) {
            None => None,
            Some(raw) => match Uuid::parse_str(raw) {
                Ok(org_id) => Some(OrgScope::Valid(org_id)),
                Err(_) => Some(OrgScope::Malformed),
            },
        };

        self.decide(session, location, requirement, org_scope, None)
    }

    /// Wait until the session has finished loading, then decide.
    ///
    /// If the provider goes away while still loading, the placeholder is returned.
    pub async fn settle(
        &self,
        session: &mut watch::Receiver<SessionSnapshot>,
        location: &Location,
        requirement: Option<&AccessRequirement>,
        redirect_override: Option<&Location>,
    ) -> RenderDecision {
        let ready = session
            .wait_for(|snapshot| !snapshot.is_loading)
            .await
            .map(|snapshot| snapshot.clone());
        let snapshot = match ready {
            Ok(snapshot) => snapshot,
            Err(_) => session.borrow().clone(),
        };
        self.guard(&snapshot, location, requirement, redirect_override)
    }

    /// Absolute href of a redirect, with the return location encoded as a query
    /// parameter when present.
    pub fn href(&self, decision: &RenderDecision) -> Option<String> {
        let RenderDecision::Redirect {
            target, return_to, ..
        } = decision
        else {
            return None;
        };

        let base = target.to_string();
        Some(match return_to {
            Some(return_to) => {
                let separator = if target.query.is_some() { '&' } else { '?' };
                format!(
                    "{base}{separator}{}={}",
                    self.config.return_param,
                    urlencoding::encode(&return_to.to_string())
                )
            }
            None => base,
        })
    }

    fn decide(
        &self,
        session: &SessionSnapshot,
        location: &Location,
        requirement: Option<&AccessRequirement>,
        org_scope: Option<OrgScope>,
        redirect_override: Option<&Location>,
    ) -> RenderDecision {
        if session.is_loading {
            return RenderDecision::PendingPlaceholder;
        }

        let Some(principal) = session.principal() else {
            tracing::debug!(location = %location, "unauthenticated, redirecting to login");
            return RenderDecision::Redirect {
                target: redirect_override
                    .cloned()
                    .unwrap_or_else(|| Location::new(&self.config.login_path)),
                return_to: Some(location.clone()),
                reason: AccessDenied::Unauthenticated,
            };
        };

        let authenticated = AccessRequirement::Authenticated;
        let requirement = requirement.unwrap_or(&authenticated);
        let outcome = match org_scope {
            None => self.evaluator.evaluate(Some(principal), requirement),
            Some(OrgScope::Valid(org_id)) => {
                self.evaluator.evaluate_in_org(Some(principal), requirement, org_id)
            }
            Some(OrgScope::Malformed) => Err(AccessDenied::InsufficientRole),
        };

        match outcome {
            Ok(()) => RenderDecision::Render,
            Err(reason) => {
                tracing::debug!(
                    user_id = %principal.user_id,
                    location = %location,
                    reason = reason.as_str(),
                    "forbidden, redirecting"
                );
                RenderDecision::Redirect {
                    target: redirect_override
                        .cloned()
                        .unwrap_or_else(|| Location::new(&self.config.forbidden_path)),
                    return_to: None,
                    reason,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum OrgScope {
    Valid(Uuid),
    Malformed,
}
