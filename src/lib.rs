pub mod authz;
pub mod config;
pub mod errors;
pub mod gate;
pub mod guard;
pub mod jwt;
pub mod routes;
pub mod session;

// Re-export commonly used items for tests
pub use authz::{
    AccessRequirement, CompositeRequirement, DefaultPolicyEvaluator, OrgRole, Permission, PolicyEvaluator,
    Principal, RoleRegistry, SystemRole,
};
pub use errors::{AccessDenied, AccessError, AppResult};
pub use gate::{Gated, UiGate};
pub use guard::{GuardState, Location, RenderDecision, RouteGuard};
pub use session::{SessionProvider, SessionSnapshot, SessionStore};
