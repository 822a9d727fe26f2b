use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use marksheet_store::{Marksheet, QueryResult, Record, StoreResult};
use serde_json::json;

use crate::error::{ServerError, ServerResult};

pub type AppState = Arc<Marksheet>;

/// Run a store call off the async workers; ledger writes may hit disk.
async fn blocking<T, F>(service: AppState, f: F) -> ServerResult<T>
where
    F: FnOnce(&Marksheet) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
        .map_err(ServerError::from)
}

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn all_handler(State(service): State<AppState>) -> ServerResult<Json<Vec<QueryResult>>> {
    let all = blocking(service, |s| s.get_all()).await?;
    Ok(Json(all))
}

pub async fn find_handler(
    State(service): State<AppState>,
    Path(rollno): Path<String>,
) -> ServerResult<Json<QueryResult>> {
    let found = blocking(service, move |s| s.find(&rollno)).await?;
    Ok(Json(found))
}

pub async fn modify_handler(
    State(service): State<AppState>,
    Path((rollno, marks)): Path<(String, String)>,
) -> ServerResult<Json<QueryResult>> {
    let updated = blocking(service, move |s| s.update(&rollno, &marks)).await?;
    Ok(Json(updated))
}

/// Stores the record where `/find` and `/modify` resolve its roll number:
/// under the roll number itself for direct-key lookup, or in the first
/// free seed slot for secondary lookup.
pub async fn add_handler(
    State(service): State<AppState>,
    Path((name, year, board, mark, rollno)): Path<(String, String, String, String, String)>,
) -> ServerResult<(StatusCode, Json<QueryResult>)> {
    let record = Record::new(name, year, board, mark).with_rollno(rollno);
    let created = blocking(service, move |s| s.add(&record)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn seed_handler(State(service): State<AppState>) -> ServerResult<Json<serde_json::Value>> {
    let keys = blocking(service, |s| s.seed()).await?;
    Ok(Json(json!({ "seeded": keys })))
}
