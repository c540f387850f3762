use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use tracing::{error, info};

use crate::dto::{
    default_limit, default_offset, ActionResponse, CreateSearchRequest, ErrorBody,
    ListDomainsQuery, ListEmailsQuery, ListSearchesQuery,
};
use crate::AppState;

type ApiError = (StatusCode, Json<ErrorBody>);

fn internal_error(context: &str, err: anyhow::Error) -> ApiError {
    error!(error = %err, "{}", context);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            detail: err.to_string(),
        }),
    )
}

fn not_found(detail: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            detail: detail.to_string(),
        }),
    )
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "running",
        "service": "mailharvest",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Spawns a Search Runner for `search_id` in the background, matching the
/// original's `BackgroundTasks.add_task(run_extraction_worker, ...)` idiom.
fn spawn_search_runner(state: &Arc<AppState>, search_id: i64) {
    let storage = state.storage.clone();
    let fetcher = Arc::clone(&state.fetcher);
    let worker_id = format!("worker-api-{search_id}");
    let max_concurrent = state.crawl.max_concurrent;
    let max_depth = state.crawl.max_depth;
    tokio::spawn(async move {
        info!(search_id, "api dispatching search runner");
        if let Err(e) = mailharvest_runner::run_search(
            &storage,
            &fetcher,
            search_id,
            &worker_id,
            max_concurrent,
            max_depth,
        )
        .await
        {
            error!(search_id, error = %e, "background search runner error");
        }
    });
}

pub async fn create_search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSearchRequest>,
) -> Result<(StatusCode, Json<mailharvest_core::Search>), ApiError> {
    let domains = body.cleaned_domains().map_err(|detail| {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorBody { detail }))
    })?;

    let search_id = state
        .storage
        .create_search(body.batch_name.as_deref(), &domains)
        .await
        .map_err(|e| internal_error("error creating search", e))?;

    let search = state
        .storage
        .get_search(search_id)
        .await
        .map_err(|e| internal_error("error reloading created search", e))?
        .ok_or_else(|| not_found("search vanished after creation"))?;

    info!(search_id, domains = domains.len(), "created search");
    spawn_search_runner(&state, search_id);

    Ok((StatusCode::CREATED, Json(search)))
}

pub async fn list_searches(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListSearchesQuery>,
) -> Result<Json<Vec<mailharvest_core::Search>>, ApiError> {
    let searches = state
        .storage
        .list_searches(q.status.as_deref(), default_limit(q.limit, 100), default_offset(q.offset))
        .await
        .map_err(|e| internal_error("error listing searches", e))?;
    Ok(Json(searches))
}

pub async fn get_search(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<mailharvest_core::Search>, ApiError> {
    let search = state
        .storage
        .get_search(id)
        .await
        .map_err(|e| internal_error("error getting search", e))?
        .ok_or_else(|| not_found("search not found"))?;
    Ok(Json(search))
}

pub async fn get_search_statistics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<mailharvest_storage::SearchStatistics>, ApiError> {
    let stats = state
        .storage
        .search_statistics(id)
        .await
        .map_err(|e| internal_error("error getting statistics", e))?
        .ok_or_else(|| not_found("search not found"))?;
    Ok(Json(stats))
}

pub async fn list_search_domains(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(q): Query<ListDomainsQuery>,
) -> Result<Json<Vec<mailharvest_core::Domain>>, ApiError> {
    let domains = state
        .storage
        .list_domains_for_search(
            id,
            q.status.as_deref(),
            default_limit(q.limit, 100),
            default_offset(q.offset),
        )
        .await
        .map_err(|e| internal_error("error listing domains", e))?;
    Ok(Json(domains))
}

pub async fn list_search_emails(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(q): Query<ListEmailsQuery>,
) -> Result<Json<Vec<mailharvest_storage::EmailWithContext>>, ApiError> {
    let emails = state
        .storage
        .list_emails_for_search(id, default_limit(q.limit, 1000), default_offset(q.offset))
        .await
        .map_err(|e| internal_error("error listing search emails", e))?;
    Ok(Json(emails))
}

pub async fn list_domain_emails(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<mailharvest_storage::EmailWithContext>>, ApiError> {
    let emails = state
        .storage
        .list_emails_for_domain(id)
        .await
        .map_err(|e| internal_error("error listing domain emails", e))?;
    Ok(Json(emails))
}

pub async fn pause_search(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ActionResponse>, ApiError> {
    let applied = state
        .storage
        .pause_search(id)
        .await
        .map_err(|e| internal_error("error pausing search", e))?;
    if !applied {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                detail: "search not found or not in progress".to_string(),
            }),
        ));
    }
    Ok(Json(ActionResponse {
        message: "search paused".to_string(),
        search_id: id,
    }))
}

pub async fn resume_search(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ActionResponse>, ApiError> {
    let applied = state
        .storage
        .resume_search(id)
        .await
        .map_err(|e| internal_error("error resuming search", e))?;
    if !applied {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                detail: "search not found or not paused".to_string(),
            }),
        ));
    }
    spawn_search_runner(&state, id);
    Ok(Json(ActionResponse {
        message: "search resumed".to_string(),
        search_id: id,
    }))
}

pub async fn cancel_search(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ActionResponse>, ApiError> {
    let applied = state
        .storage
        .cancel_search(id)
        .await
        .map_err(|e| internal_error("error cancelling search", e))?;
    if !applied {
        return Err(not_found("search not found"));
    }
    Ok(Json(ActionResponse {
        message: "search cancelled".to_string(),
        search_id: id,
    }))
}
