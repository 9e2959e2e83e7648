use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::trip_controller::TripController;
use crate::dto::common::ApiResponse;
use crate::dto::trip_dto::{
    ArriveTripRequest, CancelTripRequest, CompleteTripRequest, CreateTripRequest,
    CreateTripResponse, NoShowTripRequest, StartTripRequest, TrackingResponse, TripListItem,
    TripResponse,
};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_trip_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_trip))
        .route("/:id", get(get_trip))
        .route("/:id/tracking", get(trip_tracking))
        .route("/:id/start", post(start_trip))
        .route("/:id/arrive", post(arrive_trip))
        .route("/:id/onboard", post(onboard_trip))
        .route("/:id/noshow", post(no_show_trip))
        .route("/:id/complete", post(complete_trip))
        .route("/:id/cancel", post(cancel_trip))
}

async fn create_trip(
    State(state): State<AppState>,
    Json(request): Json<CreateTripRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateTripResponse>>), AppError> {
    let controller = TripController::new(state);
    let response = controller.create(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TripListItem>, AppError> {
    let controller = TripController::new(state);
    let response = controller.get(id).await?;
    Ok(Json(response))
}

async fn trip_tracking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TrackingResponse>, AppError> {
    let controller = TripController::new(state);
    let response = controller.tracking(id).await?;
    Ok(Json(response))
}

async fn start_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<StartTripRequest>,
) -> Result<Json<ApiResponse<TripResponse>>, AppError> {
    let controller = TripController::new(state);
    let response = controller.start(id, request).await?;
    Ok(Json(response))
}

async fn arrive_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ArriveTripRequest>,
) -> Result<Json<ApiResponse<TripResponse>>, AppError> {
    let controller = TripController::new(state);
    let response = controller.arrive(id, request).await?;
    Ok(Json(response))
}

async fn onboard_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TripResponse>>, AppError> {
    let controller = TripController::new(state);
    let response = controller.onboard(id).await?;
    Ok(Json(response))
}

async fn no_show_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    _request: Option<Json<NoShowTripRequest>>,
) -> Result<Json<ApiResponse<TripResponse>>, AppError> {
    let controller = TripController::new(state);
    let response = controller.no_show(id).await?;
    Ok(Json(response))
}

async fn complete_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CompleteTripRequest>,
) -> Result<Json<ApiResponse<TripResponse>>, AppError> {
    let controller = TripController::new(state);
    let response = controller.complete(id, request).await?;
    Ok(Json(response))
}

async fn cancel_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<CancelTripRequest>>,
) -> Result<Json<ApiResponse<TripResponse>>, AppError> {
    let controller = TripController::new(state);
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let response = controller.cancel(id, request).await?;
    Ok(Json(response))
}
