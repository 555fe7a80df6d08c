use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::admin::services::render_csv;
use crate::auth::services::{hash_password, AuthPrincipal, Principal};
use crate::db::backup_databases;
use crate::delegates::repo::Delegate;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/delegates", get(list_delegates))
        .route("/backup", get(backup))
        .route("/hash_password", get(hashed_password))
}

#[derive(Debug, Default, Deserialize)]
struct ExportQuery {
    #[serde(default)]
    format: String,
}

fn require_admin(principal: &Principal) -> Result<(), ApiError> {
    match principal {
        Principal::Admin(_) => Ok(()),
        Principal::Delegate(_) => Err(ApiError::Forbidden("Forbidden".into())),
    }
}

/// Bulk export of the directory, native JSON or CSV. An empty directory is
/// `NotFound`, not an empty document.
#[instrument(skip(state, principal))]
async fn list_delegates(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    require_admin(&principal)?;

    let delegates = Delegate::list_all(&state.main_db).await?;
    if delegates.is_empty() {
        return Err(ApiError::NotFound("Delegates not found".into()));
    }

    if query.format == "csv" {
        let csv = render_csv(&delegates);
        return Ok(([(header::CONTENT_TYPE, "text/csv")], csv).into_response());
    }
    Ok(Json(delegates).into_response())
}

/// Point-in-time snapshot of both stores, returned as a zip archive.
#[instrument(skip(state, principal))]
async fn backup(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Response, ApiError> {
    require_admin(&principal)?;

    let archive = backup_databases(&state.main_db, &state.event_db, &state.config.backup_dir)
        .await
        .map_err(ApiError::Unexpected)?;
    let bytes = tokio::fs::read(&archive)
        .await
        .map_err(|e| ApiError::Unexpected(e.into()))?;

    info!(archive = %archive.display(), "backup served");
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"backup_db.zip\"".to_string(),
            ),
        ],
        bytes,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct HashQuery {
    password: String,
}

/// Hashing utility for provisioning admin rows by hand. Unauthenticated in
/// the original and kept that way.
#[instrument(skip(query))]
async fn hashed_password(Query(query): Query<HashQuery>) -> Result<Json<String>, ApiError> {
    let hash = hash_password(&query.password)?;
    Ok(Json(hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::Admin;
    use crate::delegates::repo::new_delegate_id;
    use crate::state::AppState;

    fn admin_principal() -> AuthPrincipal {
        AuthPrincipal(Principal::Admin(Admin {
            email: "root@example.com".into(),
            password: "hash".into(),
        }))
    }

    fn sample_delegate() -> Delegate {
        Delegate {
            id: new_delegate_id(),
            firstname: "Asha".into(),
            lastname: "Menon".into(),
            email: "asha@example.com".into(),
            contact: String::new(),
            dateofbirth: String::new(),
            gender: String::new(),
            pastmuns: vec![],
            verified: true,
        }
    }

    #[tokio::test]
    async fn empty_directory_export_is_not_found() {
        let state = AppState::fake().await;
        for format in ["", "csv"] {
            let err = list_delegates(
                State(state.clone()),
                admin_principal(),
                Query(ExportQuery {
                    format: format.into(),
                }),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, ApiError::NotFound(_)));
        }
    }

    #[tokio::test]
    async fn delegate_cannot_export_the_directory() {
        let state = AppState::fake().await;
        Delegate::create(&state.main_db, &sample_delegate())
            .await
            .expect("seed");
        let err = list_delegates(
            State(state),
            AuthPrincipal(Principal::Delegate(sample_delegate())),
            Query(ExportQuery::default()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn populated_csv_export_is_text_csv() {
        let state = AppState::fake().await;
        Delegate::create(&state.main_db, &sample_delegate())
            .await
            .expect("seed");
        let res = list_delegates(
            State(state),
            admin_principal(),
            Query(ExportQuery {
                format: "csv".into(),
            }),
        )
        .await
        .expect("export");
        assert_eq!(res.status(), axum::http::StatusCode::OK);
        assert_eq!(res.headers().get(header::CONTENT_TYPE).unwrap(), "text/csv");
    }
}
