use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::Deserialize;
use tokio::sync::broadcast;

use super::db::DbHandle;
use super::models::{BoardLayout, DragResult, TaskColumn};
use super::ws::{BoardEvent, broadcast_event};
use crate::errors::BoardError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub events_tx: broadcast::Sender<String>,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub column: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TasksQuery {
    pub project_id: Option<i64>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    /// Map a store failure to a response. Domain errors keep their own
    /// message; anything else is logged and replaced by `context`.
    fn from_store(err: anyhow::Error, context: &str) -> Self {
        match err.downcast_ref::<BoardError>() {
            Some(board) if board.is_client_error() => board_error_to_api(board),
            _ => {
                tracing::error!(error = %format!("{:#}", err), "{}", context);
                ApiError::Internal(context.to_string())
            }
        }
    }
}

fn board_error_to_api(err: &BoardError) -> ApiError {
    match err {
        BoardError::ProjectNotFound { .. } | BoardError::TaskNotFound { .. } => {
            ApiError::NotFound(err.to_string())
        }
        _ => ApiError::BadRequest(err.to_string()),
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        board_error_to_api(&err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

// ── Extractors ────────────────────────────────────────────────────────
//
// Thin wrappers over axum's extractors so malformed input is reported in
// the same `{"error": ...}` shape as every other failure.

pub struct ApiJson<T>(pub T);

pub struct ApiPath<T>(pub T);

pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/project/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/project/{id}/board", get(get_board).put(put_board_layout))
        .route("/project/{id}/board/move", patch(move_task))
        .route("/project/{id}/task", post(create_task))
        .route(
            "/project/{id}/task/{task_id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks", get(list_tasks))
        .route("/health", get(health_check))
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Trim a required title, rejecting blank input.
fn required_title(title: Option<String>) -> Result<String, ApiError> {
    match title.map(|t| t.trim().to_string()) {
        Some(t) if !t.is_empty() => Ok(t),
        _ => Err(BoardError::Validation("title is required".into()).into()),
    }
}

/// Trim an optional title; present-but-blank is rejected.
fn optional_title(title: Option<String>) -> Result<Option<String>, ApiError> {
    match title {
        None => Ok(None),
        Some(t) => required_title(Some(t)).map(Some),
    }
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_projects(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let projects = state
        .db
        .call(move |db| db.list_projects())
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to fetch projects"))?;
    Ok(Json(projects))
}

async fn create_project(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = required_title(req.title)?;
    let description = req.description.unwrap_or_default();
    let project = state
        .db
        .call(move |db| db.create_project(&title, &description))
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to create project"))?;
    tracing::info!(project_id = project.id, "project created");
    broadcast_event(
        &state.events_tx,
        &BoardEvent::ProjectCreated {
            project: project.clone(),
        },
    );
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state
        .db
        .call(move |db| db.get_project(id))
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to fetch project"))?;
    match project {
        Some(project) => Ok(Json(project)),
        None => Err(BoardError::ProjectNotFound { id }.into()),
    }
}

async fn update_project(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = optional_title(req.title)?;
    let description = req.description;
    let project = state
        .db
        .call(move |db| db.update_project(id, title.as_deref(), description.as_deref()))
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to update project"))?
        .ok_or(BoardError::ProjectNotFound { id })?;
    broadcast_event(
        &state.events_tx,
        &BoardEvent::ProjectUpdated {
            project: project.clone(),
        },
    );
    Ok(Json(project))
}

async fn delete_project(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .call(move |db| db.delete_project(id))
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to delete project"))?;
    if !deleted {
        return Err(BoardError::ProjectNotFound { id }.into());
    }
    tracing::info!(project_id = id, "project deleted");
    broadcast_event(&state.events_tx, &BoardEvent::ProjectDeleted { project_id: id });
    Ok(StatusCode::NO_CONTENT)
}

async fn list_tasks(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<TasksQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let project_id = query.project_id;
    let tasks = state
        .db
        .call(move |db| db.list_tasks(project_id))
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to fetch tasks"))?;
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<SharedState>,
    ApiPath(project_id): ApiPath<i64>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = required_title(req.title)?;
    let column = match req.column.as_deref() {
        Some(c) => c
            .parse::<TaskColumn>()
            .map_err(|_| BoardError::InvalidColumn { column: c.to_string() })?,
        None => TaskColumn::default(),
    };
    let description = req.description.unwrap_or_default();
    let task = state
        .db
        .call(move |db| db.create_task(project_id, &title, &description, &column))
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to create task"))?;
    tracing::info!(project_id, task_id = task.id, "task created");
    broadcast_event(&state.events_tx, &BoardEvent::TaskCreated { task: task.clone() });
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<SharedState>,
    ApiPath((project_id, task_id)): ApiPath<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state
        .db
        .call(move |db| db.get_task(project_id, task_id))
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to fetch task"))?
        .ok_or(BoardError::TaskNotFound { id: task_id })?;
    Ok(Json(task))
}

async fn update_task(
    State(state): State<SharedState>,
    ApiPath((project_id, task_id)): ApiPath<(i64, i64)>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = optional_title(req.title)?;
    let description = req.description;
    let task = state
        .db
        .call(move |db| {
            db.update_task(project_id, task_id, title.as_deref(), description.as_deref())
        })
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to update task"))?
        .ok_or(BoardError::TaskNotFound { id: task_id })?;
    broadcast_event(&state.events_tx, &BoardEvent::TaskUpdated { task: task.clone() });
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<SharedState>,
    ApiPath((project_id, task_id)): ApiPath<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .call(move |db| db.delete_task(project_id, task_id))
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to delete task"))?;
    if !deleted {
        return Err(BoardError::TaskNotFound { id: task_id }.into());
    }
    broadcast_event(
        &state.events_tx,
        &BoardEvent::TaskDeleted {
            project_id,
            task_id,
        },
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn get_board(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state
        .db
        .call(move |db| db.get_board(id))
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to fetch board"))?
        .ok_or(BoardError::ProjectNotFound { id })?;
    Ok(Json(board))
}

async fn move_task(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(drag): ApiJson<DragResult>,
) -> Result<impl IntoResponse, ApiError> {
    let from_column = drag.source.droppable_id;
    let outcome = state
        .db
        .call(move |db| db.move_task(id, &drag))
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to move task"))?
        .ok_or(BoardError::ProjectNotFound { id })?;
    if let Some(task) = &outcome.moved {
        tracing::debug!(
            project_id = id,
            task_id = task.id,
            to_column = %task.column,
            position = task.position,
            "task moved"
        );
        broadcast_event(
            &state.events_tx,
            &BoardEvent::TaskMoved {
                project_id: id,
                task_id: task.id,
                from_column,
                to_column: task.column,
                position: task.position,
            },
        );
    }
    Ok(Json(outcome.board))
}

async fn put_board_layout(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(layout): ApiJson<BoardLayout>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state
        .db
        .call(move |db| db.apply_layout(id, &layout))
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to update board"))?
        .ok_or(BoardError::ProjectNotFound { id })?;
    broadcast_event(&state.events_tx, &BoardEvent::BoardReordered { project_id: id });
    Ok(Json(board))
}

// ── Tests ─────────────────────────────────────────────────────────────
