//! Service info, health and greeting handlers

use axum::{extract::Query, Json};
use serde::{Deserialize, Serialize};

use crate::{AppError, API_VERSION};

/// Response for `GET /`
#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub message: &'static str,
    pub status: &'static str,
    pub version: &'static str,
}

/// GET / - Service banner
pub async fn home() -> Json<HomeResponse> {
    Json(HomeResponse {
        message: "Welcome to Finoly Backend API",
        status: "success",
        version: API_VERSION,
    })
}

/// Response for `GET /api/health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// GET /api/health - Liveness check
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "Server is running",
    })
}

#[derive(Debug, Deserialize)]
pub struct HelloQuery {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HelloResponse {
    pub message: String,
    pub status: &'static str,
}

/// GET /api/hello?name=X
pub async fn hello(Query(params): Query<HelloQuery>) -> Json<HelloResponse> {
    let name = params.name.as_deref().unwrap_or("World");
    Json(HelloResponse {
        message: format!("Hello, {}!", name),
        status: "success",
    })
}

/// Fallback for unmatched routes
pub async fn not_found() -> AppError {
    AppError::not_found("Not Found", "The requested resource was not found")
}
