use std::sync::Arc;

use uuid::Uuid;

use crate::authz::{PermissionSpec, PolicyEvaluator, Principal};

/// Outcome of a UI gate: the children, or the fallback (nothing by default).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gated<T> {
    Children(T),
    Fallback(Option<T>),
}

impl<T> Gated<T> {
    pub fn is_children(&self) -> bool {
        matches!(self, Gated::Children(_))
    }

    /// Whatever ends up rendered, if anything.
    pub fn into_rendered(self) -> Option<T> {
        match self {
            Gated::Children(children) => Some(children),
            Gated::Fallback(fallback) => fallback,
        }
    }
}

/// Conditional-render wrapper over the shared evaluator. No navigation side effects.
#[derive(Clone)]
pub struct UiGate {
    evaluator: Arc<dyn PolicyEvaluator>,
}

impl UiGate {
    pub fn new(evaluator: Arc<dyn PolicyEvaluator>) -> Self {
        Self { evaluator }
    }

    pub fn allows(
        &self,
        principal: Option<&Principal>,
        permissions: impl Into<PermissionSpec>,
        require_all: bool,
    ) -> bool {
        let requirement = permissions.into().into_requirement(require_all);
        self.evaluator.satisfies(principal, &requirement)
    }

    /// Like [`UiGate::allows`] for a fragment that belongs to one organization. The
    /// principal's role in that organization contributes its permissions.
    pub fn allows_in_org(
        &self,
        principal: Option<&Principal>,
        permissions: impl Into<PermissionSpec>,
        require_all: bool,
        org_id: Uuid,
    ) -> bool {
        let requirement = permissions.into().into_requirement(require_all);
        self.evaluator
            .evaluate_in_org(principal, &requirement, org_id)
            .is_ok()
    }

    pub fn gate<T>(
        &self,
        principal: Option<&Principal>,
        permissions: impl Into<PermissionSpec>,
        require_all: bool,
        children: T,
        fallback: Option<T>,
    ) -> Gated<T> {
        if self.allows(principal, permissions, require_all) {
            Gated::Children(children)
        } else {
            Gated::Fallback(fallback)
        }
    }

    pub fn gate_in_org<T>(
        &self,
        principal: Option<&Principal>,
        permissions: impl Into<PermissionSpec>,
        require_all: bool,
        org_id: Uuid,
        children: T,
        fallback: Option<T>,
    ) -> Gated<T> {
        if self.allows_in_org(principal, permissions, require_all, org_id) {
            Gated::Children(children)
        } else {
            Gated::Fallback(fallback)
        }
    }

    /// Like [`UiGate::gate`], building the fragments only for the branch taken.
    pub fn gate_with<T>(
        &self,
        principal: Option<&Principal>,
        permissions: impl Into<PermissionSpec>,
        require_all: bool,
        children: impl FnOnce() -> T,
        fallback: impl FnOnce() -> Option<T>,
    ) -> Gated<T> {
        if self.allows(principal, permissions, require_all) {
            Gated::Children(children())
        } else {
            Gated::Fallback(fallback())
        }
    }
}
