use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::estimation::{EstimationError, ReportError, WizardError};
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
    HttpClient(reqwest::Error),
    Estimation(EstimationError),
    Wizard(WizardError),
    Report(ReportError),
    SessionNotFound(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Estimation(err) => match err {
                EstimationError::MissingInput | EstimationError::Parse(_) => {
                    StatusCode::BAD_REQUEST
                }
                EstimationError::Geocode(_) => StatusCode::UNPROCESSABLE_ENTITY,
                EstimationError::Network(_) => StatusCode::BAD_GATEWAY,
            },
            AppError::Wizard(err) => match err {
                WizardError::SurfaceOutOfRange(_)
                | WizardError::YearOutOfRange { .. }
                | WizardError::InvalidField(_)
                | WizardError::Geocode(_) => StatusCode::UNPROCESSABLE_ENTITY,
                WizardError::Submitting | WizardError::NotConfirmed(_) => StatusCode::CONFLICT,
                WizardError::Handoff(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Report(err) => match err {
                ReportError::RateNotReady(_) => StatusCode::CONFLICT,
                ReportError::UnknownFormat(_) => StatusCode::BAD_REQUEST,
                ReportError::Csv(_) | ReportError::Encoding(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::HttpClient(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::HttpClient(err) => write!(f, "http client error: {}", err),
            AppError::Estimation(err) => write!(f, "{}", err.user_message()),
            AppError::Wizard(err) => write!(f, "{}", err),
            AppError::Report(err) => write!(f, "report error: {}", err),
            AppError::SessionNotFound(id) => write!(f, "no wizard session '{}'", id),
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
            AppError::HttpClient(err) => Some(err),
            AppError::Estimation(err) => Some(err),
            AppError::Wizard(err) => Some(err),
            AppError::Report(err) => Some(err),
            AppError::SessionNotFound(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Estimation(err) => Json(json!({
                "error": self.to_string(),
                "kind": err.kind(),
                "recovery_actions": err.recovery_actions(),
            })),
            _ => Json(json!({ "error": self.to_string() })),
        };
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

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        Self::HttpClient(value)
    }
}

impl From<EstimationError> for AppError {
    fn from(value: EstimationError) -> Self {
        Self::Estimation(value)
    }
}

impl From<WizardError> for AppError {
    fn from(value: WizardError) -> Self {
        Self::Wizard(value)
    }
}

impl From<ReportError> for AppError {
    fn from(value: ReportError) -> Self {
        Self::Report(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::estimation::GeocodeError;

    #[test]
    fn estimation_errors_map_to_distinct_statuses() {
        assert_eq!(
            AppError::from(EstimationError::MissingInput).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(EstimationError::Network("HTTP 500".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(WizardError::Geocode(GeocodeError::EmptyAddress)).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::from(ReportError::RateNotReady("loading")).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn estimation_error_body_lists_recovery_actions() {
        let response = AppError::from(EstimationError::MissingInput).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
