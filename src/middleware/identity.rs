// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Optional identity middleware.
//!
//! Sign-in is handled by the identity provider. This layer only reads the
//! session token it issued and records who is calling. A missing or invalid
//! token makes the request anonymous; nothing is ever rejected here.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cookie holding the identity provider's session token.
pub const SESSION_COOKIE: &str = "planner_token";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (identity-provider user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

/// Identity of the caller, if signed in. Inserted on every API request.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<Identity>);

impl CurrentUser {
    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }
}

/// Middleware that records the caller's identity, if any.
pub async fn resolve_identity(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = match (
        session_token(&jar, request.headers()),
        state.config.identity_signing_key.as_deref(),
    ) {
        (Some(token), Some(key)) => verify_token(&token, key),
        _ => None,
    };

    request.extensions_mut().insert(CurrentUser(identity));
    next.run(request).await
}

/// Cookie first, then `Authorization: Bearer`.
fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Verify a session token and return the identity it names.
pub fn verify_token(token: &str, signing_key: &[u8]) -> Option<Identity> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    match decode::<Claims>(token, &key, &validation) {
        Ok(data) if !data.claims.sub.is_empty() => Some(Identity {
            user_id: data.claims.sub,
        }),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring invalid session token");
            None
        }
    }
}

/// Create a session token for a user.
///
/// The identity provider issues these in production; this is used by local
/// tooling and tests.
pub fn create_token(user_id: &str, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + 7 * 24 * 60 * 60, // 7 days
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"test_identity_key_32_bytes_min!!";

    #[test]
    fn test_token_round_trip() {
        let token = create_token("user-42", KEY).unwrap();
        assert_eq!(
            verify_token(&token, KEY),
            Some(Identity {
                user_id: "user-42".to_string()
            })
        );
    }

    #[test]
    fn test_wrong_key_is_anonymous() {
        let token = create_token("user-42", KEY).unwrap();
        assert_eq!(verify_token(&token, b"another_key_that_is_32_bytes!!!!"), None);
        assert_eq!(verify_token("garbage", KEY), None);
    }

    #[test]
    fn test_bearer_header_is_read() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(
            session_token(&CookieJar::new(), &headers),
            Some("abc.def".to_string())
        );

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(session_token(&CookieJar::new(), &headers), None);
    }
}
