//! Token service for issuing, validating and revoking bearer tokens
//!
//! Tokens are HS256 JWTs carrying the account id, its role and a unique
//! `jti`. Revocation stores the `jti` in Redis for the remaining lifetime of
//! the token.

use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::{accounts::AccountRole, cache::RedisPool, settings::JwtSettings};

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Account ID
    pub sub: i64,
    pub role: AccountRole,
    /// Unique token ID used for revocation
    pub jti: Uuid,
    pub iss: String,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

impl Claims {
    /// Seconds until the token expires, saturating at zero
    pub fn remaining_lifetime(&self) -> u64 {
        self.exp.saturating_sub(unix_now())
    }
}

/// Issues and validates bearer tokens
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiration: u64,
    issuer: String,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn revocation_key(jti: &Uuid) -> String {
    format!("revoked_token:{}", jti)
}

impl TokenService {
    pub fn new(settings: &JwtSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        TokenService {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            expiration: settings.expiration,
            issuer: settings.issuer.clone(),
        }
    }

    /// Issue a token for an account
    pub fn issue(&self, account_id: i64, role: AccountRole) -> Result<String> {
        let now = unix_now();
        let claims = Claims {
            sub: account_id,
            role,
            jti: Uuid::new_v4(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now + self.expiration,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Validate a token and return the claims
    pub fn validate(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Token lifetime in seconds
    pub fn expiration(&self) -> u64 {
        self.expiration
    }

    /// Revoke a token until it would have expired anyway
    pub async fn revoke(&self, cache: &RedisPool, claims: &Claims) -> Result<()> {
        cache
            .set(
                &revocation_key(&claims.jti),
                "1",
                Some(claims.remaining_lifetime().max(1)),
            )
            .await
    }

    /// Check if a token was revoked
    pub async fn is_revoked(&self, cache: &RedisPool, claims: &Claims) -> Result<bool> {
        cache.exists(&revocation_key(&claims.jti)).await
    }
}
