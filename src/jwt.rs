use std::sync::Arc;

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};

use crate::authz::{Principal, PrincipalClaims};
use crate::errors::AccessError;

/// Upper bound for `JWT_EXP_HOURS`, one year.
const MAX_EXP_HOURS: i64 = 24 * 366;

/// Signing configuration for persisted session tokens (HS256).
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Arc<Vec<u8>>,
    pub exp_hours: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<Vec<u8>>, exp_hours: i64) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            exp_hours,
        }
    }

    pub fn from_env() -> Result<Self, AccessError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| AccessError::configuration("JWT_SECRET not set"))?;
        let exp_hours = parse_exp_hours(std::env::var("JWT_EXP_HOURS").ok().as_deref())?;

        Ok(Self::new(secret.into_bytes(), exp_hours))
    }

    pub fn encode(&self, principal: PrincipalClaims) -> Result<String, AccessError> {
        use chrono::{Duration, Utc};

        let now = Utc::now();
        let exp = Duration::try_hours(self.exp_hours)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| AccessError::token("token lifetime out of range"))?;

        let claims = SessionClaims {
            principal,
            exp: timestamp(exp.timestamp())?,
            iat: timestamp(now.timestamp())?,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
            .map_err(|err| AccessError::token(err.to_string()))
    }

    pub fn decode(&self, token: &str) -> Result<SessionClaims, AccessError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        jsonwebtoken::decode::<SessionClaims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|err| AccessError::token(err.to_string()))
    }

    /// Decode a persisted token straight into a principal snapshot.
    pub fn principal_from_token(&self, token: &str) -> Result<Principal, AccessError> {
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
        let claims = self.decode(token)?;
        Ok(Principal::from_claims(&claims.principal))
    }
}

/// `JWT_EXP_HOURS`, defaulting to 24. Must be in `1..=MAX_EXP_HOURS`.
fn parse_exp_hours(raw: Option<&str>) -> Result<i64, AccessError> {
    let Some(raw) = raw else {
        return Ok(24);
    };
    let hours = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| AccessError::configuration("JWT_EXP_HOURS must be a valid integer"))?;
    if !(1..=MAX_EXP_HOURS).contains(&hours) {
        return Err(AccessError::configuration(format!(
            "JWT_EXP_HOURS must be between 1 and {MAX_EXP_HOURS}, got {hours}"
        )));
    }
    Ok(hours)
}

fn timestamp(seconds: i64) -> Result<usize, AccessError> {
    usize::try_from(seconds).map_err(|_| AccessError::token("token timestamp before the epoch"))
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionClaims {
    #[serde(flatten)]
    pub principal: PrincipalClaims,
    pub exp: usize,
    pub iat: usize,
}
