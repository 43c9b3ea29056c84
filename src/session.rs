//! Session/identity provider seam.
//!
//! The guard only ever reads a [`SessionSnapshot`]. [`SessionStore`] is the
//! in-process provider: it publishes snapshots over a `tokio::sync::watch` channel so
//! consumers re-evaluate whenever the session changes.

use std::sync::Arc;

use tokio::sync::watch;

use crate::authz::Principal;
use crate::errors::AccessError;
use crate::jwt::JwtConfig;

/// What the session provider exposes: the current principal and whether a session
/// fetch is still in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub principal: Option<Arc<Principal>>,
    pub is_loading: bool,
}

impl SessionSnapshot {
    pub fn loading() -> Self {
        Self {
            principal: None,
            is_loading: true,
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn signed_in(principal: Principal) -> Self {
        Self {
            principal: Some(Arc::new(principal)),
            is_loading: false,
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_deref()
    }
}

pub trait SessionProvider: Send + Sync {
    fn snapshot(&self) -> SessionSnapshot;
}

#[derive(Debug)]
pub struct SessionStore {
    tx: watch::Sender<SessionSnapshot>,
}

impl SessionStore {
    /// A store with no session.
    pub fn new() -> Self {
        Self::with_snapshot(SessionSnapshot::signed_out())
    }

    /// A store that starts out rehydrating (the usual state at application start).
    pub fn loading() -> Self {
        Self::with_snapshot(SessionSnapshot::loading())
    }

    fn with_snapshot(snapshot: SessionSnapshot) -> Self {
        let (tx, _rx) = watch::channel(snapshot);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    /// Mark a session fetch as in flight. The current principal is kept until the
    /// fetch resolves, but no decision is taken against it meanwhile.
    pub fn begin_loading(&self) {
        self.tx.send_modify(|snapshot| snapshot.is_loading = true);
    }

    pub fn sign_in(&self, principal: Principal) {
        tracing::info!(user_id = %principal.user_id, "session established");
        self.tx.send_replace(SessionSnapshot::signed_in(principal));
    }

    /// Rebuild the principal from a persisted token. On failure the session is
    /// cleared and the error returned.
    pub fn rehydrate(&self, jwt: &JwtConfig, token: &str) -> Result<(), AccessError> {
        match jwt.principal_from_token(token) {
            Ok(principal) => {
                tracing::debug!(user_id = %principal.user_id, "session rehydrated");
                self.tx.send_replace(SessionSnapshot::signed_in(principal));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "session rehydration failed");
                self.tx.send_replace(SessionSnapshot::signed_out());
                Err(err)
            }
        }
    }

    pub fn sign_out(&self) {
        if let Some(principal) = self.tx.borrow().principal() {
            tracing::info!(user_id = %principal.user_id, "session discarded");
        }
        self.tx.send_replace(SessionSnapshot::signed_out());
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProvider for SessionStore {
    fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }
}
