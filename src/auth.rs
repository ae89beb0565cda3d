//! Account authentication: password hashing, bearer tokens and the
//! middleware guarding protected routes

use std::time::Duration;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::errors::ErrorResponse;
use crate::handlers::AppState;
use crate::models::User;

/// Bearer token authentication errors
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidTokenFormat,
    InvalidToken,
    UserNotFound,
    Internal(String),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "MISSING_TOKEN",
            Self::InvalidTokenFormat => "INVALID_TOKEN_FORMAT",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::UserNotFound => "TOKEN_USER_NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing Authorization header"),
            AuthError::InvalidTokenFormat => (
                StatusCode::UNAUTHORIZED,
                "Authorization header must be 'Bearer <token>'",
            ),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            AuthError::UserNotFound => (StatusCode::UNAUTHORIZED, "User no longer exists"),
            AuthError::Internal(detail) => {
                error!(error = %detail, "authentication failed internally");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = ErrorResponse {
            code: self.code().to_string(),
            message: message.to_string(),
            details: None,
        };
        (status, Json(body)).into_response()
    }
}

/// JWT claims carried by every issued token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub username: String,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// HS256 signing and verification keys with the issued token lifetime
#[derive(Clone)]
pub struct JwtKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::default(),
            ttl,
        }
    }

    /// Sign a token for the user, expiring after the configured lifetime
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            exp: now + self.ttl.as_secs() as i64,
            iat: now,
            username: user.username.clone(),
        };
        self.encode(&claims)
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))
    }

    /// Check signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "token rejected");
                AuthError::InvalidToken
            })
    }
}

/// Hash a password with Argon2id and a random salt
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow::anyhow!("salt: {e}"))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))
}

/// Constant-time check of a password against a stored hash
///
/// Unparseable hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

lazy_static! {
    /// Stand-in hash checked when a login names no existing account
    static ref UNKNOWN_ACCOUNT_HASH: String =
        hash_password("no-such-account").unwrap_or_default();
}

/// Run a full Argon2 verification for a handle that does not exist
///
/// Always false; costs the same as checking a real account's password.
pub fn verify_unknown_account(password: &str) -> bool {
    let _ = verify_password(password, &UNKNOWN_ACCOUNT_HASH);
    false
}

/// Authenticated account, inserted into request extensions
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Extract the token from an `Authorization: Bearer <token>` header value
fn bearer_token(header: &str) -> Result<&str, AuthError> {
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthError::InvalidTokenFormat)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidTokenFormat);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidTokenFormat);
    }
    Ok(token)
}

/// Authentication middleware
///
/// Verifies the bearer token, loads the account and hands it to handlers
/// as an `AuthUser` extension.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = match request.headers().get(AUTHORIZATION) {
        Some(value) => match value.to_str() {
            Ok(v) => v.to_string(),
            Err(_) => return AuthError::InvalidTokenFormat.into_response(),
        },
        None => return AuthError::MissingToken.into_response(),
    };

    let token = match bearer_token(&header) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    let claims = match state.jwt.verify(token) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };
    let Some(user_id) = claims.user_id() else {
        return AuthError::InvalidToken.into_response();
    };

    let user = match state.with_db(move |db| db.find_user_by_id(user_id)).await {
        Ok(Some(user)) => user,
        Ok(None) => return AuthError::UserNotFound.into_response(),
        Err(e) => return AuthError::Internal(e.message()).into_response(),
    };

    request.extensions_mut().insert(AuthUser(user));
    next.run(request).await
}
