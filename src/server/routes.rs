use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::error::ReportError;
use crate::index::student_index::RebuildSummary;
use crate::parser::flatten::GradeRow;
use crate::report::trends::ClassTrend;
use crate::server::server::AppState;
use crate::service::grade_service::GradeService;
use crate::sinks::export::rows_to_csv_bytes;

const CSV_FILE_NAME: &str = "student_data.csv";

#[derive(Clone)]
pub struct GradesState {
    service: GradeService,
}

impl GradesState {
    pub fn new(service: GradeService) -> Self {
        Self { service }
    }

    pub fn router(&self) -> Router<AppState> {
        Router::new()
            .route("/grades", get(get_grades))
            .route("/grades.csv", get(get_grades_csv))
            .route("/trends", get(get_trends))
            .route("/students/rebuild", post(rebuild_students))
    }
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

async fn get_grades(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<GradeRow>>, ApiError> {
    let rows = state.grades_state.service.resolve_grades(&query.email).await?;
    Ok(Json(rows))
}

async fn get_grades_csv(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Response, ApiError> {
    let rows = state.grades_state.service.resolve_grades(&query.email).await?;
    let body = rows_to_csv_bytes(&rows)?;
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", CSV_FILE_NAME)),
        ],
        body,
    )
        .into_response())
}

async fn get_trends(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<ClassTrend>>, ApiError> {
    let trends = state.grades_state.service.trends(&query.email).await?;
    Ok(Json(trends))
}

async fn rebuild_students(State(state): State<AppState>) -> Result<Json<RebuildSummary>, ApiError> {
    info!("student index rebuild requested");
    let summary = state.grades_state.service.rebuild_student_index().await?;
    Ok(Json(summary))
}

/// HTTP face of [`ReportError`].
#[derive(Debug)]
pub struct ApiError(pub ReportError);

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ReportError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
            ReportError::Lookup { .. } => StatusCode::NOT_FOUND,
            ReportError::RebuildInProgress => StatusCode::CONFLICT,
            ReportError::Auth(_)
            | ReportError::Pipeline { .. }
            | ReportError::Status { .. }
            | ReportError::RateLimited { .. }
            | ReportError::Http(_)
            | ReportError::Decode { .. } => StatusCode::BAD_GATEWAY,
            ReportError::Io(_) | ReportError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, "request failed: {}", self.0);
        } else {
            warn!(%status, "request rejected: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
