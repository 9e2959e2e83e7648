use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::controllers::admin_controller::AdminController;
use crate::dto::assignment_dto::{
    AssignTripRequest, AssignmentResponse, ReassignTripRequest, UnassignTripRequest,
};
use crate::dto::common::ApiResponse;
use crate::dto::trip_dto::{FareOptionsQuery, TripListQuery, TripListResponse, TripResponse};
use crate::providers::FareOption;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/trips", get(list_trips))
        .route("/trips/assign", post(assign_trip))
        .route("/trips/unassign", post(unassign_trip))
        .route("/trips/reassign", post(reassign_trip))
        .route("/trips/fare-options", get(fare_options))
        .route("/trips/:id/partner-booking", get(partner_booking))
}

async fn assign_trip(
    State(state): State<AppState>,
    Json(request): Json<AssignTripRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AssignmentResponse>>), AppError> {
    let controller = AdminController::new(state);
    let response = controller.assign(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn unassign_trip(
    State(state): State<AppState>,
    Json(request): Json<UnassignTripRequest>,
) -> Result<Json<ApiResponse<TripResponse>>, AppError> {
    let controller = AdminController::new(state);
    let response = controller.unassign(request).await?;
    Ok(Json(response))
}

async fn reassign_trip(
    State(state): State<AppState>,
    Json(request): Json<ReassignTripRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AssignmentResponse>>), AppError> {
    let controller = AdminController::new(state);
    let response = controller.reassign(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_trips(
    State(state): State<AppState>,
    Query(query): Query<TripListQuery>,
) -> Result<Json<TripListResponse>, AppError> {
    let controller = AdminController::new(state);
    let response = controller.list(query).await?;
    Ok(Json(response))
}

async fn fare_options(
    State(state): State<AppState>,
    Query(query): Query<FareOptionsQuery>,
) -> Result<Json<Vec<FareOption>>, AppError> {
    let controller = AdminController::new(state);
    let response = controller.fare_options(query).await?;
    Ok(Json(response))
}

async fn partner_booking(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let controller = AdminController::new(state);
    let response = controller.partner_booking(id).await?;
    Ok(Json(response))
}
