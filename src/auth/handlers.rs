use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Form, Json, Router,
};
use tracing::{info, instrument, warn};

use crate::auth::dto::{
    ChangePasswordRequest, EmailQuery, LoginForm, MessageResponse, RefreshRequest, RegisterRequest,
    ResetPasswordRequest, TokenResponse, VerifyEmailQuery,
};
use crate::auth::repo::{Admin, User};
use crate::auth::services::{
    authenticate, hash_password, is_valid_email, resolve_verification_subject, AuthPrincipal,
    JwtKeys, Principal, TokenKind,
};
use crate::delegates::repo::{new_delegate_id, Delegate};
use crate::error::ApiError;
use crate::mail;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/verify_email", get(verify_email))
        .route("/resend_verification", get(resend_verification))
        .route("/forgot_password", get(forgot_password))
        .route("/reset_password", post(reset_password))
        .route("/change_pass", patch(change_password))
}

/// Registration: create or reuse the delegate profile, create the user
/// credential, then send the verification mail. A mail failure surfaces as
/// an error but does not roll back the committed rows; resending the
/// verification is the recovery path.
#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Invalid("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::Invalid(
            "Password must be at least 8 characters long".into(),
        ));
    }

    if User::find_by_email(&state.main_db, &payload.email)
        .await?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("User already exists".into()));
    }

    // Reuse an existing profile so re-registration under the same email does
    // not duplicate it; otherwise create one atomically.
    let delegate = match Delegate::find_by_email(&state.main_db, &payload.email).await? {
        Some(d) => d,
        None => {
            let delegate = Delegate {
                id: new_delegate_id(),
                firstname: payload.firstname.clone(),
                lastname: payload.lastname.clone(),
                email: payload.email.clone(),
                contact: String::new(),
                dateofbirth: String::new(),
                gender: String::new(),
                pastmuns: vec![],
                verified: false,
            };
            match Delegate::create(&state.main_db, &delegate).await {
                Ok(()) => delegate,
                // Lost a create race; the winner's row is the profile.
                Err(ApiError::Conflict(_)) => {
                    Delegate::find_by_email(&state.main_db, &payload.email)
                        .await?
                        .ok_or_else(|| {
                            ApiError::Unexpected(anyhow::anyhow!("delegate vanished after conflict"))
                        })?
                }
                Err(e) => return Err(e),
            }
        }
    };

    let hash = hash_password(&payload.password)?;
    User::create(&state.main_db, &payload.email, &hash).await?;

    mail::send_verification_email(&state, &delegate).await?;

    info!(email = %payload.email, delegate_id = %delegate.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "User created successfully. Please verify your email.",
        )),
    ))
}

#[instrument(skip(state, form))]
async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = form.username.trim().to_lowercase();
    let subject = authenticate(&state, &email, &form.password).await?;

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(&subject)?;
    let refresh_token = keys.sign_refresh(&subject)?;

    info!(email = %subject, "logged in");
    Ok(Json(TokenResponse {
        access_token,
        refresh_token,
        token_type: "bearer".into(),
    }))
}

#[instrument(skip(state, payload))]
async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_kind(&payload.refresh_token, TokenKind::Refresh)
        .map_err(|_| ApiError::Unauthenticated("Could not validate credentials".into()))?;

    // The subject must still hold a credential in one of the two stores.
    let known = Admin::find_by_email(&state.main_db, &claims.sub)
        .await?
        .is_some()
        || User::find_by_email(&state.main_db, &claims.sub)
            .await?
            .is_some();
    if !known {
        return Err(ApiError::Unauthenticated(
            "Could not validate credentials".into(),
        ));
    }

    let access_token = keys.sign_access(&claims.sub)?;
    let refresh_token = keys.sign_refresh(&claims.sub)?;
    Ok(Json(TokenResponse {
        access_token,
        refresh_token,
        token_type: "bearer".into(),
    }))
}

#[instrument(skip(state, query))]
async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let delegate = resolve_verification_subject(&state, &query.token).await?;
    Delegate::mark_verified(&state.main_db, &delegate.email).await?;
    info!(email = %delegate.email, "email verified");
    Ok(Json(MessageResponse::new("Email verified!")))
}

#[instrument(skip(state))]
async fn resend_verification(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let delegate = Delegate::find_by_email(&state.main_db, &query.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("Delegate not found".into()))?;
    if delegate.verified {
        return Err(ApiError::Conflict("Email already verified".into()));
    }
    mail::send_verification_email(&state, &delegate).await?;
    Ok(Json(MessageResponse::new("Verification email sent!")))
}

#[instrument(skip(state))]
async fn forgot_password(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let delegate = Delegate::find_by_email(&state.main_db, &query.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    if !delegate.verified {
        return Err(ApiError::Forbidden("User not verified".into()));
    }
    mail::send_password_reset_email(&state, &delegate).await?;
    Ok(Json(MessageResponse::new("Password reset email sent!")))
}

/// Consume the token from the reset mail and set a new password. The token
/// is the only credential; the old password is not required.
#[instrument(skip(state, payload))]
async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.password.len() < 8 {
        return Err(ApiError::Invalid(
            "Password must be at least 8 characters long".into(),
        ));
    }
    let delegate = resolve_verification_subject(&state, &payload.token).await?;
    let user = User::find_by_email(&state.main_db, &delegate.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    let hash = hash_password(&payload.password)?;
    User::change_password(&state.main_db, &user.email, &hash).await?;
    info!(email = %user.email, "password reset");
    Ok(Json(MessageResponse::new("Password changed!")))
}

#[instrument(skip(state, principal, payload))]
async fn change_password(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let delegate = match principal {
        Principal::Delegate(d) => d,
        Principal::Admin(_) => return Err(ApiError::Forbidden("Forbidden".into())),
    };
    if payload.password.len() < 8 {
        return Err(ApiError::Invalid(
            "Password must be at least 8 characters long".into(),
        ));
    }
    let user = User::find_by_email(&state.main_db, &delegate.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    let hash = hash_password(&payload.password)?;
    User::change_password(&state.main_db, &user.email, &hash).await?;
    info!(email = %user.email, "password changed");
    Ok(Json(MessageResponse::new("Password changed!")))
}

#[cfg(test)]
mod reset_tests {
    use super::*;

    async fn seed_credential(state: &AppState, email: &str, password: &str) {
        let delegate = Delegate {
            id: new_delegate_id(),
            firstname: "Reset".into(),
            lastname: "Subject".into(),
            email: email.into(),
            contact: String::new(),
            dateofbirth: String::new(),
            gender: String::new(),
            pastmuns: vec![],
            verified: true,
        };
        Delegate::create(&state.main_db, &delegate)
            .await
            .expect("seed delegate");
        let hash = hash_password(password).expect("hash");
        User::create(&state.main_db, email, &hash)
            .await
            .expect("seed user");
    }

    #[tokio::test]
    async fn mailed_token_resets_the_password() {
        let state = AppState::fake().await;
        seed_credential(&state, "reset@example.com", "old-password").await;

        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign_verification("reset@example.com").expect("sign");
        reset_password(
            State(state.clone()),
            Json(ResetPasswordRequest {
                token,
                password: "new-password".into(),
            }),
        )
        .await
        .expect("reset");

        authenticate(&state, "reset@example.com", "new-password")
            .await
            .expect("new password logs in");
        let err = authenticate(&state, "reset@example.com", "old-password")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn access_token_cannot_reset_a_password() {
        let state = AppState::fake().await;
        seed_credential(&state, "holder@example.com", "old-password").await;

        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign_access("holder@example.com").expect("sign");
        let err = reset_password(
            State(state.clone()),
            Json(ResetPasswordRequest {
                token,
                password: "new-password".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));

        authenticate(&state, "holder@example.com", "old-password")
            .await
            .expect("password unchanged");
    }

    #[tokio::test]
    async fn short_replacement_password_is_rejected() {
        let state = AppState::fake().await;
        seed_credential(&state, "brief@example.com", "old-password").await;

        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign_verification("brief@example.com").expect("sign");
        let err = reset_password(
            State(state),
            Json(ResetPasswordRequest {
                token,
                password: "short".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Invalid(_)));
    }
}
