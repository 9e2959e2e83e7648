use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, post},
    Json, Router,
};

use crate::controllers::partner_controller::PartnerController;
use crate::dto::partner_dto::{
    QuickCabsBlockRequest, QuickCabsCancelRequest, QuickCabsConfirmRequest, QuickCabsEnvelope,
    QuickCabsRescheduleRequest,
};
use crate::middleware::partner_auth::quickcabs_basic_auth;
use crate::state::AppState;

/// Router inbound de QuickCabs, protegido con las credenciales del partner
pub fn create_quickcabs_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/block", post(block_booking))
        .route("/confirm", post(confirm_booking))
        .route("/cancel", post(cancel_booking))
        .route("/reschedule", post(reschedule_booking))
        .route("/booking-status/:booking_id", get(booking_status))
        .layer(middleware::from_fn_with_state(state, quickcabs_basic_auth))
}

async fn block_booking(
    State(state): State<AppState>,
    Json(request): Json<QuickCabsBlockRequest>,
) -> (axum::http::StatusCode, Json<QuickCabsEnvelope>) {
    let controller = PartnerController::new(state);
    let (status, envelope) = controller.block(request).await;
    (status, Json(envelope))
}

async fn confirm_booking(
    State(state): State<AppState>,
    Json(request): Json<QuickCabsConfirmRequest>,
) -> (axum::http::StatusCode, Json<QuickCabsEnvelope>) {
    let controller = PartnerController::new(state);
    let (status, envelope) = controller.confirm(request).await;
    (status, Json(envelope))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Json(request): Json<QuickCabsCancelRequest>,
) -> (axum::http::StatusCode, Json<QuickCabsEnvelope>) {
    let controller = PartnerController::new(state);
    let (status, envelope) = controller.cancel(request).await;
    (status, Json(envelope))
}

async fn reschedule_booking(
    State(state): State<AppState>,
    Json(request): Json<QuickCabsRescheduleRequest>,
) -> (axum::http::StatusCode, Json<QuickCabsEnvelope>) {
    let controller = PartnerController::new(state);
    let (status, envelope) = controller.reschedule(request).await;
    (status, Json(envelope))
}

async fn booking_status(
    State(state): State<AppState>,
    Path(booking_id): Path<String>,
) -> (axum::http::StatusCode, Json<QuickCabsEnvelope>) {
    let controller = PartnerController::new(state);
    let (status, envelope) = controller.booking_status(booking_id).await;
    (status, Json(envelope))
}
