use serde::Serialize;

pub type AppResult<T> = Result<T, AccessError>;

/// Construction-time defects: bad configuration, malformed registry tables,
/// unknown names in declared requirements, undecodable tokens.
///
/// These never come out of an evaluation. Denials are [`AccessDenied`].
#[derive(thiserror::Error, Debug)]
pub enum AccessError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("registry error: {0}")]
    Registry(String),
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("unknown permission: {0}")]
    UnknownPermission(String),
    #[error("invalid route: {0}")]
    Route(String),
    #[error("token error: {0}")]
    Token(String),
    #[error("io error")]
    Io(#[from] std::io::Error),
}

impl AccessError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry(message.into())
    }

    pub fn unknown_role(name: impl Into<String>) -> Self {
        Self::UnknownRole(name.into())
    }

    pub fn unknown_permission(name: impl Into<String>) -> Self {
        Self::UnknownPermission(name.into())
    }

    pub fn route(message: impl Into<String>) -> Self {
        Self::Route(message.into())
    }

    pub fn token(err: impl Into<String>) -> Self {
        Self::Token(err.into())
    }
}

/// Why an evaluation denied access. Every variant resolves to "deny".
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDenied {
    #[error("no authenticated principal")]
    Unauthenticated,
    #[error("principal lacks the required permissions")]
    InsufficientPermission,
    #[error("principal lacks the required role")]
    InsufficientRole,
    #[error("principal carries a role or permission the registry does not know")]
    UnknownRoleOrPermission,
}

impl AccessDenied {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessDenied::Unauthenticated => "unauthenticated",
            AccessDenied::InsufficientPermission => "insufficient_permission",
            AccessDenied::InsufficientRole => "insufficient_role",
            AccessDenied::UnknownRoleOrPermission => "unknown_role_or_permission",
        }
    }
}
