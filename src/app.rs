use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::attendance::MealRecord;
use crate::calculation::{AllowancePolicy, CalculationResult, DailyAllowance};
use crate::config::AppConfig;
use crate::error::{ConfigError, ErrorKind, PipelineError, ValidationError};
use crate::export::{meals_to_csv, meals_to_xlsx};
use crate::holidays::{HolidaySource, NoHolidays, StaticHolidays};
use crate::locator::FileDescriptor;
use crate::pipeline::Pipeline;
use crate::semester::{Month, SemesterInfo, resolve};
use crate::store::{BlobStore, LocalDirStore};

pub struct AppState {
    pub pipeline: Pipeline,
    pub holidays: Arc<dyn HolidaySource>,
    pub allowance: Arc<dyn AllowancePolicy>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn BlobStore>,
        storage_prefix: &str,
        holidays: Arc<dyn HolidaySource>,
        allowance: Arc<dyn AllowancePolicy>,
    ) -> Self {
        Self {
            pipeline: Pipeline::new(store, storage_prefix),
            holidays,
            allowance,
        }
    }

    /// Local directory store, optional holiday file, per-day allowance.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let holidays: Arc<dyn HolidaySource> = match &config.holidays_file {
            Some(path) => {
                let holidays = StaticHolidays::from_json_file(path)?;
                log::info!("loaded {} holidays from {}", holidays.len(), path.display());
                Arc::new(holidays)
            }
            None => Arc::new(NoHolidays),
        };

        Ok(Self::new(
            Arc::new(LocalDirStore::new(config.storage_dir.clone())),
            &config.storage_prefix,
            holidays,
            Arc::new(DailyAllowance::new(config.daily_allowance)),
        ))
    }
}

#[derive(Debug, Default, Deserialize)]
struct PeriodQuery {
    name: Option<String>,
    month: Option<String>,
    year: Option<String>,
    format: Option<String>,
}

impl PeriodQuery {
    fn name(&self) -> Result<&str, ValidationError> {
        let name = self.name.as_deref().ok_or(ValidationError::Missing("name"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankName);
        }
        Ok(name)
    }

    fn month(&self) -> Result<Month, ValidationError> {
        let month = self
            .month
            .as_deref()
            .ok_or(ValidationError::Missing("month"))?;
        Month::parse(month)
    }

    fn year(&self) -> Result<Option<i32>, ValidationError> {
        let Some(raw) = self.year.as_deref().map(str::trim).filter(|y| !y.is_empty()) else {
            return Ok(None);
        };
        match raw.parse::<i32>() {
            Ok(year) if (2000..=2100).contains(&year) => Ok(Some(year)),
            _ => Err(ValidationError::InvalidYear(raw.to_string())),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError {
            status: status_for(ErrorKind::Validation),
            message: err.to_string(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = status_for(err.kind());
        if status.is_server_error() {
            log::warn!("pipeline failed: {}", err);
        } else {
            log::debug!("pipeline miss: {}", err);
        }
        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                status: "error",
                message: self.message,
            }),
        )
            .into_response()
    }
}

/// Status code for each error kind. Malformed workbooks read as "not found".
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound | ErrorKind::Malformed => StatusCode::NOT_FOUND,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[derive(Serialize)]
struct FilesResponse {
    semester: SemesterInfo,
    files: Vec<FileDescriptor>,
}

#[derive(Serialize)]
struct MealsResponse {
    name: String,
    year: i32,
    month: Month,
    file: String,
    meals: Vec<MealRecord>,
}

#[derive(Serialize)]
struct CalculationResponse {
    name: String,
    year: i32,
    month: Month,
    file: String,
    calculation: CalculationResult,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/semester", get(get_semester))
        .route("/api/files", get(get_files))
        .route("/api/meals", get(get_meals))
        .route("/api/meals/export", get(export_meals))
        .route("/api/calculation", get(get_calculation))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Setup app state
    let state = Arc::new(AppState::from_config(&config)?);

    // Build router
    let app = router(state);

    // Start server
    let listener = TcpListener::bind(config.bind).await?;
    log::info!(
        "listening on http://{} (storage: {})",
        config.bind,
        config.storage_dir.display()
    );
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn get_semester(Query(params): Query<PeriodQuery>) -> Result<Json<SemesterInfo>, ApiError> {
    let month = params.month()?;
    let year = params.year()?;
    Ok(Json(resolve(month, year)))
}

async fn get_files(
    Query(params): Query<PeriodQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<FilesResponse>, ApiError> {
    let name = params.name()?;
    let month = params.month()?;
    let year = params.year()?;

    let (semester, files) = state.pipeline.find_files(name, month, year).await?;
    Ok(Json(FilesResponse { semester, files }))
}

async fn get_meals(
    Query(params): Query<PeriodQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<MealsResponse>, ApiError> {
    let name = params.name()?;
    let month = params.month()?;
    let year = params.year()?;

    let resolved = state.pipeline.meals(name, month, year).await?;
    Ok(Json(MealsResponse {
        name: name.to_string(),
        year: resolved.semester.current_year,
        month,
        file: resolved.file.name,
        meals: resolved.output,
    }))
}

async fn get_calculation(
    Query(params): Query<PeriodQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<CalculationResponse>, ApiError> {
    let name = params.name()?;
    let month = params.month()?;
    let year = params.year()?;

    // Holidays are looked up for the resolved year, not the raw query
    let semester = resolve(month, year);
    let holidays = state.holidays.holidays(semester.current_year, month).await;
    let resolved = state
        .pipeline
        .calculation(
            name,
            month,
            Some(semester.current_year),
            &holidays,
            state.allowance.as_ref(),
        )
        .await?;

    Ok(Json(CalculationResponse {
        name: name.to_string(),
        year: resolved.semester.current_year,
        month,
        file: resolved.file.name,
        calculation: resolved.output,
    }))
}

async fn export_meals(
    Query(params): Query<PeriodQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let name = params.name()?;
    let month = params.month()?;
    let year = params.year()?;
    // Default to CSV when no format is given
    let format = params.format.as_deref().unwrap_or("csv").trim().to_lowercase();
    if format != "csv" && format != "xlsx" {
        return Err(ValidationError::InvalidFormat(format).into());
    }

    let resolved = state.pipeline.meals(name, month, year).await?;
    let disposition = format!(
        "attachment; filename=\"meals-{}-{:02}.{}\"",
        resolved.semester.current_year,
        month.get(),
        format
    );

    // Serialize the listing in the requested format
    let (content_type, body) = if format == "xlsx" {
        let bytes = meals_to_xlsx(&resolved.output).map_err(|e| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("failed to build xlsx: {e}"),
        })?;
        (crate::store::XLSX_CONTENT_TYPE, bytes)
    } else {
        (
            "text/csv; charset=utf-8",
            meals_to_csv(&resolved.output).into_bytes(),
        )
    };

    // Return the listing as a downloadable file
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
