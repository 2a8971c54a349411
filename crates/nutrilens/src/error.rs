use crate::catalog::CatalogImportError;
use crate::compatibility::{CompatibilityError, EngineConfigError, RestrictionConfigError};
use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Restrictions(RestrictionConfigError),
    EngineConfig(EngineConfigError),
    CatalogImport(CatalogImportError),
    Compatibility(CompatibilityError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Restrictions(err) => write!(f, "restriction tables error: {}", err),
            AppError::EngineConfig(err) => write!(f, "engine configuration error: {}", err),
            AppError::CatalogImport(err) => write!(f, "catalog import error: {}", err),
            AppError::Compatibility(err) => write!(f, "compatibility error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Restrictions(err) => Some(err),
            AppError::EngineConfig(err) => Some(err),
            AppError::CatalogImport(err) => Some(err),
            AppError::Compatibility(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Compatibility(CompatibilityError::Validation(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Compatibility(CompatibilityError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Compatibility(CompatibilityError::Transient(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::CatalogImport(_) => StatusCode::BAD_REQUEST,
            AppError::Compatibility(CompatibilityError::Fatal(_))
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Restrictions(_)
            | AppError::EngineConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<RestrictionConfigError> for AppError {
    fn from(value: RestrictionConfigError) -> Self {
        Self::Restrictions(value)
    }
}

impl From<EngineConfigError> for AppError {
    fn from(value: EngineConfigError) -> Self {
        Self::EngineConfig(value)
    }
}

impl From<CatalogImportError> for AppError {
    fn from(value: CatalogImportError) -> Self {
        Self::CatalogImport(value)
    }
}

impl From<CompatibilityError> for AppError {
    fn from(value: CompatibilityError) -> Self {
        Self::Compatibility(value)
    }
}
