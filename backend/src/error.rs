use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    geocoding::GeocodingError,
    models::RouteNumber,
    planner::PlanError,
};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("failed to build GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
}

/// Errors surfaced by the HTTP handlers, rendered as a JSON `ApiError`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("route {0} not found")]
    UnknownRoute(RouteNumber),
    #[error("stop {0:?} not found")]
    UnknownStop(String),
    #[error("no stops loaded")]
    NoStops,
    #[error("no routes loaded")]
    NoRoutes,
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Geocoding(#[from] GeocodingError),
    #[error(transparent)]
    Route(#[from] RouteError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Plan(PlanError::InvalidCoordinates { .. }) => {
                StatusCode::BAD_REQUEST
            }
            AppError::UnknownRoute(_)
            | AppError::UnknownStop(_)
            | AppError::NoStops
            | AppError::NoRoutes => {
                StatusCode::NOT_FOUND
            }
            AppError::Plan(PlanError::NoRoute | PlanError::AddressNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            AppError::Plan(PlanError::Geocoding(_) | PlanError::Directions(_))
            | AppError::Geocoding(_) => StatusCode::BAD_GATEWAY,
            AppError::Route(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        } else {
            tracing::warn!("request rejected: {self}");
        }
        let body = shared::ApiError {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
