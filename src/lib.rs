use axum::{Router, routing::get};
use sqlx::SqlitePool;

pub mod config;
pub mod error;
pub mod filters;
pub mod geometry;
pub mod loader;
pub mod store;
pub mod vehicles;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/vehicles/", get(vehicles::latest_tracks))
        .route("/api/v1/vehicles/:vehicle_id", get(vehicles::latest_track_for_vehicle))
        .route(
            "/api/v1/vehicles/:vehicle_id/track",
            get(vehicles::tracks_for_vehicle),
        )
        .with_state(state)
}
