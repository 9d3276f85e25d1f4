use std::time::Duration;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::config::JwtConfig;

/// Identity carried inside a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPayload {
    pub user_id: Uuid,
    pub email: String,
}

/// JWT body as it goes over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub email: String,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

/// Signing and verification keys, built once from configuration.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_minutes.max(0) as u64) * 60),
        }
    }

    pub fn generate_token(&self, payload: &TokenPayload) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            user_id: payload.user_id,
            email: payload.email.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %payload.user_id, "jwt signed");
        Ok(token)
    }

    /// `None` for anything that is not a valid, unexpired token issued by us.
    pub fn verify_token(&self, token: &str) -> Option<TokenPayload> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => {
                debug!(user_id = %data.claims.user_id, "jwt verified");
                Some(TokenPayload {
                    user_id: data.claims.user_id,
                    email: data.claims.email,
                })
            }
            Err(e) => {
                debug!(error = %e, "jwt rejected");
                None
            }
        }
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn extract_token(header: Option<&str>) -> Option<&str> {
    let (scheme, token) = header?.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
