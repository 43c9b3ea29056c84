use std::path::PathBuf;

use crate::authz::RoleRegistry;
use crate::errors::{AccessError, AppResult};

/// Redirect targets used by the route guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    pub login_path: String,
    pub forbidden_path: String,
    /// Query parameter carrying the requested location on login redirects.
    pub return_param: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            forbidden_path: "/unauthorized".to_string(),
            return_param: "redirect".to_string(),
        }
    }
}

impl GuardConfig {
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();
        let config = Self {
            login_path: env_or("ACCESS_LOGIN_PATH", defaults.login_path),
            forbidden_path: env_or("ACCESS_FORBIDDEN_PATH", defaults.forbidden_path),
            return_param: env_or("ACCESS_RETURN_PARAM", defaults.return_param),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        for (name, path) in [
            ("ACCESS_LOGIN_PATH", &self.login_path),
            ("ACCESS_FORBIDDEN_PATH", &self.forbidden_path),
        ] {
            if !path.starts_with('/') {
                return Err(AccessError::configuration(format!(
                    "{name} must be an absolute path, got {path:?}"
                )));
            }
        }
        if self.return_param.trim().is_empty() {
            return Err(AccessError::configuration("ACCESS_RETURN_PARAM must not be empty"));
        }
        Ok(())
    }
}

/// Process-wide access configuration, read once at startup.
#[derive(Debug, Clone, Default)]
pub struct AccessConfig {
    pub guard: GuardConfig,
    /// JSON registry table; the standard table when unset.
    pub registry_path: Option<PathBuf>,
}

impl AccessConfig {
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            guard: GuardConfig::from_env()?,
            registry_path: std::env::var("ACCESS_REGISTRY_PATH")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    pub fn load_registry(&self) -> AppResult<RoleRegistry> {
        match &self.registry_path {
            Some(path) => RoleRegistry::from_path(path),
            None => Ok(RoleRegistry::standard()),
        }
    }
}

/// Load `.env` from the working directory, falling back to the crate-local file.
pub fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(default)
}
