use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env, SuperuserSeed},
    error::ApiError,
    models::{NewAccount, Role, User},
    repository::{Repository, RepositoryState},
};

/// Claims
///
/// Payload of the tokens issued by `POST /login/`. `jti` names the stored token
/// row, which is what logout deletes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id, as a string.
    pub sub: String,
    pub jti: Uuid,
    pub iat: usize,
    pub exp: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request, and the input of every
/// rule in `policy`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub is_superuser: bool,
    pub role: Option<Role>,
    /// The token the request presented; `None` for the local `x-user-id` bypass.
    pub token_id: Option<Uuid>,
}

impl AuthUser {
    pub fn from_user(user: &User, token_id: Option<Uuid>) -> Self {
        AuthUser {
            id: user.id,
            email: user.email.clone(),
            is_superuser: user.is_superuser,
            role: user.role,
            token_id,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Resolution order:
/// 1. An identity already resolved by the authentication middleware.
/// 2. In `Env::Local`, an `x-user-id` header naming an existing account.
/// 3. `Authorization: Bearer <token>`: signature and expiry are checked, the
///    token must still be stored (not logged out), and the account must exist.
///
/// Rejection: `ApiError::Unauthorized` (401) on any authentication failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<i64>().ok());
            if let Some(user_id) = bypass_id {
                if let Some(user) = repo.get_user(user_id).await? {
                    tracing::debug!(user_id, "authenticated through local x-user-id bypass");
                    return Ok(AuthUser::from_user(&user, None));
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let claims = decode_token(token, &config.jwt_secret).ok_or(ApiError::Unauthorized)?;
        let user_id: i64 = claims.sub.parse().map_err(|_| ApiError::Unauthorized)?;

        if !repo.token_active(claims.jti).await? {
            tracing::debug!(user_id, jti = %claims.jti, "token revoked or expired");
            return Err(ApiError::Unauthorized);
        }

        let user = repo
            .get_user(user_id)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        Ok(AuthUser::from_user(&user, Some(claims.jti)))
    }
}

fn decode_token(token: &str, secret: &str) -> Option<Claims> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;
    match decode::<Claims>(token, &key, &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::debug!(error = %e, "rejected token");
            None
        }
    }
}

/// Signs a new token for `user_id` and stores its id so it can be revoked.
/// Expired tokens are swept out on the way.
pub async fn issue_token(
    repo: &dyn Repository,
    config: &AppConfig,
    user_id: i64,
) -> Result<String, ApiError> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(config.token_ttl_hours);
    let claims = Claims {
        sub: user_id.to_string(),
        jti: Uuid::new_v4(),
        iat: now.timestamp() as usize,
        exp: expires_at.timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;
    let purged = repo.purge_expired_tokens().await?;
    if purged > 0 {
        tracing::debug!(purged, "expired tokens removed");
    }
    repo.store_token(claims.jti, user_id, expires_at).await?;
    Ok(token)
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Password(e.to_string()))
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash could not be parsed");
            false
        }
    }
}

/// Creates the configured superuser unless an account already uses its email.
/// Returns whether an account was created.
pub async fn ensure_superuser(repo: &dyn Repository, seed: &SuperuserSeed) -> Result<bool, ApiError> {
    if repo.find_credentials(&seed.email).await?.is_some() {
        return Ok(false);
    }
    let account = NewAccount {
        email: seed.email.trim().to_lowercase(),
        first_name: String::new(),
        last_name: String::new(),
        password_hash: hash_password(&seed.password)?,
        is_superuser: true,
    };
    let user = repo.create_account(account, None).await?;
    tracing::info!(user_id = user.id, email = %user.email, "superuser created");
    Ok(true)
}
