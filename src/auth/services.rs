use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, warn};

use crate::auth::repo::{Admin, User};
use crate::config::JwtConfig;
use crate::delegates::repo::Delegate;
use crate::error::ApiError;
use crate::state::AppState;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Purpose tag carried inside every token. A verification token is not
/// accepted where an access token is required, and vice versa.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
    Verify,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // delegate or admin email
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub kind: TokenKind,
}

/// Expiry is user-actionable (resend the mail); a bad signature or a wrong
/// purpose tag is not, so the two are kept apart.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub verification_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            access_ttl_minutes,
            refresh_ttl_minutes,
            verification_ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            access_ttl: Duration::from_secs((access_ttl_minutes as u64) * 60),
            refresh_ttl: Duration::from_secs((refresh_ttl_minutes as u64) * 60),
            verification_ttl: Duration::from_secs((verification_ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    fn sign_with_kind(&self, email: &str, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
            TokenKind::Verify => self.verification_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(subject = %email, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, email: &str) -> anyhow::Result<String> {
        self.sign_with_kind(email, TokenKind::Access)
    }
    pub fn sign_refresh(&self, email: &str) -> anyhow::Result<String> {
        self.sign_with_kind(email, TokenKind::Refresh)
    }
    pub fn sign_verification(&self, email: &str) -> anyhow::Result<String> {
        self.sign_with_kind(email, TokenKind::Verify)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        // No expiry grace: a token one second past exp is expired.
        validation.leeway = 0;
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;
        debug!(subject = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.kind != kind {
            return Err(TokenError::Invalid);
        }
        Ok(claims)
    }
}

/// The resolved identity behind a request: exactly one of admin or delegate.
#[derive(Debug, Clone)]
pub enum Principal {
    Admin(Admin),
    Delegate(Delegate),
}

/// Resolve a bearer token to a principal. The admin store is consulted
/// before the delegate store; that precedence is a contract, not an
/// accident of lookup order. An unverified delegate is rejected with
/// `Forbidden` since resending the mail can fix it.
pub async fn resolve_principal(state: &AppState, token: &str) -> Result<Principal, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let claims = keys
        .verify_kind(token, TokenKind::Access)
        .map_err(|_| ApiError::Unauthenticated("Could not validate credentials".into()))?;

    if let Some(admin) = Admin::find_by_email(&state.main_db, &claims.sub).await? {
        return Ok(Principal::Admin(admin));
    }
    let delegate = Delegate::find_by_email(&state.main_db, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("Could not validate credentials".into()))?;
    if !delegate.verified {
        warn!(email = %delegate.email, "unverified delegate rejected");
        return Err(ApiError::Forbidden("Please verify your email!".into()));
    }
    Ok(Principal::Delegate(delegate))
}

/// Resolve a verification token back to its delegate, keeping expiry
/// distinct from malformed or mis-purposed tokens.
pub async fn resolve_verification_subject(
    state: &AppState,
    token: &str,
) -> Result<Delegate, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify_kind(token, TokenKind::Verify).map_err(|e| match e {
        TokenError::Expired => ApiError::Unauthenticated("Verification token expired".into()),
        TokenError::Invalid => ApiError::Unauthenticated("Could not validate credentials".into()),
    })?;
    Delegate::find_by_email(&state.main_db, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("Could not validate credentials".into()))
}

/// Login verifies the password against whichever credential store owns the
/// email, admin store first, and only then issues tokens.
pub async fn authenticate(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<String, ApiError> {
    if let Some(admin) = Admin::find_by_email(&state.main_db, email).await? {
        if !verify_password(password, &admin.password)? {
            return Err(ApiError::Unauthenticated("Invalid password".into()));
        }
        return Ok(admin.email);
    }
    let user = User::find_by_email(&state.main_db, email)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("Invalid email".into()))?;
    if !verify_password(password, &user.password)? {
        return Err(ApiError::Unauthenticated("Invalid password".into()));
    }
    Ok(user.email)
}

/// Extracts the bearer token and resolves it to a principal.
pub struct AuthPrincipal(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AuthPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthenticated("Missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::Unauthenticated("Invalid Authorization header".into()))?;

        let principal = resolve_principal(state, token).await?;
        Ok(AuthPrincipal(principal))
    }
}



#[cfg(test)]
mod principal_tests {
    use super::*;
    use crate::delegates::repo::new_delegate_id;

    async fn seed_delegate(state: &AppState, email: &str, verified: bool) {
        let delegate = Delegate {
            id: new_delegate_id(),
            firstname: "Test".into(),
            lastname: "Delegate".into(),
            email: email.into(),
            contact: String::new(),
            dateofbirth: String::new(),
            gender: String::new(),
            pastmuns: vec![],
            verified,
        };
        Delegate::create(&state.main_db, &delegate)
            .await
            .expect("seed delegate");
    }

    async fn seed_admin(state: &AppState, email: &str, hash: &str) {
        sqlx::query("INSERT INTO admins (email, password) VALUES (?, ?)")
            .bind(email)
            .bind(hash)
            .execute(&state.main_db)
            .await
            .expect("seed admin");
    }

    #[tokio::test]
    async fn admin_lookup_precedes_delegate_lookup() {
        let state = AppState::fake().await;
        seed_admin(&state, "both@example.com", "hash").await;
        seed_delegate(&state, "both@example.com", true).await;

        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign_access("both@example.com").expect("sign");
        let principal = resolve_principal(&state, &token).await.expect("resolve");
        assert!(matches!(principal, Principal::Admin(_)));
    }

    #[tokio::test]
    async fn unverified_delegate_is_forbidden() {
        let state = AppState::fake().await;
        seed_delegate(&state, "pending@example.com", false).await;

        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign_access("pending@example.com").expect("sign");
        let err = resolve_principal(&state, &token).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn unknown_subject_is_unauthenticated() {
        let state = AppState::fake().await;
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign_access("ghost@example.com").expect("sign");
        let err = resolve_principal(&state, &token).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn login_checks_admin_store_first() {
        let state = AppState::fake().await;
        let admin_hash = hash_password("admin-pass").expect("hash");
        seed_admin(&state, "root@example.com", &admin_hash).await;

        let email = authenticate(&state, "root@example.com", "admin-pass")
            .await
            .expect("authenticate");
        assert_eq!(email, "root@example.com");

        let err = authenticate(&state, "root@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }
}
