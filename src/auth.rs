use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    server::Server,
    user::{Role, UserInfo},
};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i64,
    role: Role,
    exp: i64,
}

/// Signs and checks the bearer tokens handed out at login
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: time::Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl: time::Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user: &UserInfo) -> Result<String> {
        let exp = (time::OffsetDateTime::now_utc() + self.ttl).unix_timestamp();
        let claims = Claims {
            sub: user.id,
            role: user.role,
            exp,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| anyhow::anyhow!("Failed to sign token: {}", e))?;
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser> {
        let claims = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| Error::Unauthorized)?
            .claims;
        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

/// The caller identified by the `Authorization: Bearer` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub role: Role,
}

impl AuthUser {
    pub fn is_instructor(&self) -> bool {
        self.role == Role::Instructor
    }

    pub fn require_instructor(&self) -> Result<()> {
        if self.is_instructor() {
            Ok(())
        } else {
            Err(Error::forbidden("Instructor role required"))
        }
    }

    /// Learners act on their own records, instructors may read anyone's.
    pub fn ensure_self_or_instructor(&self, user_id: i64) -> Result<()> {
        if self.id == user_id || self.is_instructor() {
            Ok(())
        } else {
            Err(Error::forbidden("Not allowed to access another user's data"))
        }
    }

    pub fn ensure_self(&self, user_id: i64) -> Result<()> {
        if self.id == user_id {
            Ok(())
        } else {
            Err(Error::forbidden("Not allowed to act for another user"))
        }
    }
}

impl FromRequestParts<Arc<Server>> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        server: &Arc<Server>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, server)
                .await
                .map_err(|_| Error::Unauthorized)?;
        server.tokens.verify(bearer.token())
    }
}
