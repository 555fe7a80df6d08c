use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::auth::services::{AuthPrincipal, Principal};
use crate::delegates::dto::{NewDelegateRequest, UpdateDelegateRequest};
use crate::delegates::repo::{new_delegate_id, Delegate};
use crate::delegates::services::apply_update;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/delegates/me", get(current_delegate))
        .route("/delegates/:id", get(delegate_by_id).patch(update_delegate))
        .route("/add_delegate", post(add_delegate))
}

#[instrument(skip(principal))]
async fn current_delegate(
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<Delegate>, ApiError> {
    match principal {
        Principal::Delegate(d) => Ok(Json(d)),
        Principal::Admin(_) => Err(ApiError::Forbidden("You are an admin".into())),
    }
}

#[instrument(skip(state, principal))]
async fn delegate_by_id(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
) -> Result<Json<Delegate>, ApiError> {
    match principal {
        Principal::Delegate(d) if d.id == id => Ok(Json(d)),
        Principal::Delegate(_) => Err(ApiError::Forbidden("Forbidden".into())),
        Principal::Admin(_) => {
            let delegate = Delegate::find_by_id(&state.main_db, &id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Delegate not found".into()))?;
            Ok(Json(delegate))
        }
    }
}

/// Direct profile creation, used by the admin desk ahead of registration.
/// Unauthenticated in the original and kept that way.
#[instrument(skip(state, payload))]
async fn add_delegate(
    State(state): State<AppState>,
    Json(payload): Json<NewDelegateRequest>,
) -> Result<(StatusCode, Json<Delegate>), ApiError> {
    let delegate = Delegate {
        id: new_delegate_id(),
        firstname: payload.firstname,
        lastname: payload.lastname,
        email: payload.email.trim().to_lowercase(),
        contact: payload.contact,
        dateofbirth: payload.dateofbirth,
        gender: payload.gender,
        pastmuns: payload.pastmuns,
        verified: false,
    };
    Delegate::create(&state.main_db, &delegate).await?;
    info!(delegate_id = %delegate.id, email = %delegate.email, "delegate added");
    Ok((StatusCode::CREATED, Json(delegate)))
}

#[instrument(skip(state, principal, payload))]
async fn update_delegate(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
    Json(payload): Json<UpdateDelegateRequest>,
) -> Result<Json<Delegate>, ApiError> {
    if let Principal::Delegate(ref d) = principal {
        if d.id != id {
            warn!(delegate_id = %d.id, target = %id, "cross-delegate update rejected");
            return Err(ApiError::Forbidden("Forbidden".into()));
        }
    }
    let existing = Delegate::find_by_id(&state.main_db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Delegate not found".into()))?;
    let merged = apply_update(existing, payload);
    Delegate::update(&state.main_db, &id, &merged).await?;
    Ok(Json(merged))
}
