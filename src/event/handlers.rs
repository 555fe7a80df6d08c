use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::auth::services::{AuthPrincipal, Principal};
use crate::delegates::repo::Delegate;
use crate::error::ApiError;
use crate::event::dto::{EventRegisterRequest, UpdateMealsRequest};
use crate::event::repo::MMDelegate;
use crate::event::services::apply_meal_update;
use crate::qr;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/mm/register", axum::routing::post(register))
        .route("/mm/delegates", get(list_event_delegates))
        .route(
            "/mm/delegates/:id",
            get(meal_form).patch(update_meals).delete(remove),
        )
        .route("/mm/qr/:id", get(qr_image))
}

fn require_admin(principal: &Principal) -> Result<(), ApiError> {
    match principal {
        Principal::Admin(_) => Ok(()),
        Principal::Delegate(_) => Err(ApiError::Forbidden("Forbidden".into())),
    }
}

/// Snapshot a directory delegate into the event store and pre-generate the
/// badge QR so the check-in desk never waits on first scan.
#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<EventRegisterRequest>,
) -> Result<(StatusCode, Json<MMDelegate>), ApiError> {
    let email = payload.email.trim().to_lowercase();
    let delegate = Delegate::find_by_email(&state.main_db, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("Delegate not found".into()))?;

    let mm = MMDelegate::from_delegate(&delegate, payload.country, payload.committee);
    MMDelegate::create(&state.event_db, &mm).await?;

    qr::fetch_or_generate(state.qr.as_ref(), &state.config.qr_dir, &mm.id).await?;

    info!(delegate_id = %mm.id, email = %mm.email, "event registration");
    Ok((StatusCode::CREATED, Json(mm)))
}

#[instrument(skip(state, principal))]
async fn list_event_delegates(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<Vec<MMDelegate>>, ApiError> {
    require_admin(&principal)?;
    let mms = MMDelegate::list_all(&state.event_db).await?;
    Ok(Json(mms))
}

/// Meal form, keyed by the scanned delegate id. Deliberately
/// unauthenticated: the QR is only ever in the hands of the staffed desk.
#[instrument(skip(state))]
async fn meal_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MMDelegate>, ApiError> {
    let mm = MMDelegate::find_by_id(&state.event_db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Delegate not found".into()))?;
    Ok(Json(mm))
}

#[instrument(skip(state, payload))]
async fn update_meals(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateMealsRequest>,
) -> Result<Json<MMDelegate>, ApiError> {
    let existing = MMDelegate::find_by_id(&state.event_db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Delegate not found".into()))?;
    let merged = apply_meal_update(existing, payload);
    MMDelegate::update(&state.event_db, &id, &merged).await?;
    Ok(Json(merged))
}

#[instrument(skip(state, principal))]
async fn remove(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
) -> Result<Json<crate::auth::dto::MessageResponse>, ApiError> {
    require_admin(&principal)?;
    MMDelegate::delete(&state.event_db, &id).await?;
    info!(delegate_id = %id, "event registration removed");
    Ok(Json(crate::auth::dto::MessageResponse::new(
        "Delegate removed",
    )))
}

/// Badge QR image encoding the delegate id, cached on disk by id.
#[instrument(skip(state))]
async fn qr_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    if MMDelegate::find_by_id(&state.event_db, &id).await?.is_none() {
        return Err(ApiError::NotFound("Delegate not found".into()));
    }
    let bytes = qr::fetch_or_generate(state.qr.as_ref(), &state.config.qr_dir, &id).await?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], bytes).into_response())
}
