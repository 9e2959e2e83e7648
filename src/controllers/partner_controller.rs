//! Controller inbound de QuickCabs
//!
//! El partner llama con sus payloads nativos para bloquear, confirmar,
//! cancelar o reprogramar una reserva, y para consultar su estado. Los
//! errores se traducen al envelope que QuickCabs espera
//! ({status, errorCode, errorMessage}); el AppError genérico no sale por
//! esta superficie.

use axum::http::StatusCode;
use serde_json::json;

use crate::dto::partner_dto::{
    QuickCabsBlockRequest, QuickCabsCancelRequest, QuickCabsConfirmRequest, QuickCabsEnvelope,
    QuickCabsRescheduleRequest,
};
use crate::models::provider_mapping::{partner_status, ProviderMapping};
use crate::repositories::provider_mapping_repository::ProviderMappingRepository;
use crate::repositories::trip_repository::TripRepository;
use crate::services::lifecycle_service::LifecycleService;
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

pub struct PartnerController {
    state: AppState,
    lifecycle: LifecycleService,
}

type PartnerReply = (StatusCode, QuickCabsEnvelope);

/// Traduce errores internos al envelope y los códigos de error del partner
fn partner_error(e: AppError) -> PartnerReply {
    let (status, code) = match &e {
        AppError::NotFound(_) => (StatusCode::NOT_FOUND, "ERR_BOOKING_NOT_FOUND"),
        AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "ERR_INVALID_STATE"),
        AppError::Conflict(_) => (StatusCode::CONFLICT, "ERR_CONFLICT"),
        AppError::Unauthorized(_) | AppError::Forbidden(_) => {
            (StatusCode::UNAUTHORIZED, "ERR_AUTH")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "ERR_INTERNAL"),
    };
    (status, QuickCabsEnvelope::failure(code, e.to_string()))
}

impl PartnerController {
    pub fn new(state: AppState) -> Self {
        let lifecycle = LifecycleService::new(
            state.pool.clone(),
            state.providers.clone(),
            state.config.clone(),
        );
        Self { state, lifecycle }
    }

    async fn mapping_for(&self, booking_id: &str) -> AppResult<ProviderMapping> {
        let mut conn = self.state.pool.acquire().await?;
        ProviderMappingRepository::find_by_external_booking_id(&mut conn, booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("booking '{}' not found", booking_id)))
    }

    /// El partner retiene la reserva mientras arma suministro
    pub async fn block(&self, request: QuickCabsBlockRequest) -> PartnerReply {
        match self.apply_block(&request).await {
            Ok(()) => (StatusCode::OK, QuickCabsEnvelope::ok(request.booking_id)),
            Err(e) => partner_error(e),
        }
    }

    async fn apply_block(&self, request: &QuickCabsBlockRequest) -> AppResult<()> {
        let mapping = self.mapping_for(&request.booking_id).await?;
        let mut conn = self.state.pool.acquire().await?;
        ProviderMappingRepository::update_partner_status(
            &mut conn,
            mapping.id,
            partner_status::BLOCKED,
            None,
        )
        .await?;
        Ok(())
    }

    /// Confirmación del partner, con los datos de su conductor si ya existen
    pub async fn confirm(&self, request: QuickCabsConfirmRequest) -> PartnerReply {
        match self.apply_confirm(&request).await {
            Ok(()) => (StatusCode::OK, QuickCabsEnvelope::ok(request.booking_id)),
            Err(e) => partner_error(e),
        }
    }

    async fn apply_confirm(&self, request: &QuickCabsConfirmRequest) -> AppResult<()> {
        let mapping = self.mapping_for(&request.booking_id).await?;
        let raw = json!({
            "driverName": request.driver_name,
            "driverPhone": request.driver_phone,
            "vehicleNumber": request.vehicle_number,
        });

        let mut conn = self.state.pool.acquire().await?;
        ProviderMappingRepository::update_partner_status(
            &mut conn,
            mapping.id,
            partner_status::CONFIRMED,
            Some(raw),
        )
        .await?;
        Ok(())
    }

    /// Cancelación iniciada por el partner. Cancela localmente sin devolver
    /// la llamada al partner (la notificación saliente sería un eco).
    pub async fn cancel(&self, request: QuickCabsCancelRequest) -> PartnerReply {
        match self.apply_cancel(&request).await {
            Ok(()) => (StatusCode::OK, QuickCabsEnvelope::ok(request.booking_id)),
            Err(e) => partner_error(e),
        }
    }

    async fn apply_cancel(&self, request: &QuickCabsCancelRequest) -> AppResult<()> {
        let mapping = self.mapping_for(&request.booking_id).await?;
        let reason = request
            .reason
            .clone()
            .unwrap_or_else(|| "cancelled by supply partner".to_string());

        self.lifecycle
            .cancel(mapping.trip_id, Some(reason), false)
            .await?;

        let mut conn = self.state.pool.acquire().await?;
        ProviderMappingRepository::update_partner_status(
            &mut conn,
            mapping.id,
            partner_status::CANCELLED,
            None,
        )
        .await?;
        Ok(())
    }

    /// Reprogramación: mueve la hora de recogida. El precio quedó fijado en
    /// la creación y no se recalcula.
    pub async fn reschedule(&self, request: QuickCabsRescheduleRequest) -> PartnerReply {
        match self.apply_reschedule(&request).await {
            Ok(()) => (StatusCode::OK, QuickCabsEnvelope::ok(request.booking_id)),
            Err(e) => partner_error(e),
        }
    }

    async fn apply_reschedule(&self, request: &QuickCabsRescheduleRequest) -> AppResult<()> {
        let mapping = self.mapping_for(&request.booking_id).await?;

        let mut conn = self.state.pool.acquire().await?;
        let trip = TripRepository::find_by_id(&mut conn, mapping.trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", mapping.trip_id)))?;

        if trip.trip_status.is_terminal() {
            return Err(AppError::BadRequest(format!(
                "booking cannot be rescheduled in status {:?}",
                trip.trip_status
            )));
        }

        TripRepository::set_pickup_time(&mut conn, trip.id, request.new_pickup_time).await?;
        Ok(())
    }

    /// Estado de la reserva en el vocabulario del partner
    pub async fn booking_status(&self, booking_id: String) -> PartnerReply {
        match self.fetch_status(&booking_id).await {
            Ok((partner, trip)) => (
                StatusCode::OK,
                QuickCabsEnvelope::ok_with_status(booking_id, partner, trip),
            ),
            Err(e) => partner_error(e),
        }
    }

    async fn fetch_status(&self, booking_id: &str) -> AppResult<(String, String)> {
        let mapping = self.mapping_for(booking_id).await?;

        let mut conn = self.state.pool.acquire().await?;
        let trip = TripRepository::find_by_id(&mut conn, mapping.trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", mapping.trip_id)))?;

        Ok((
            mapping.partner_status,
            trip.trip_status.as_str().to_string(),
        ))
    }
}
