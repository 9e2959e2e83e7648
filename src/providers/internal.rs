//! Adapter del suministro interno (flota propia)
//!
//! El suministro interno no tiene API remota: despacha manualmente vía el
//! flujo de operaciones y responde tracking y estado desde el store. Las
//! tarifas salen del pricing engine propio.

use async_trait::async_trait;
use lazy_static::lazy_static;
use serde_json::json;
use sqlx::PgPool;

use crate::config::environment::EnvironmentConfig;
use crate::models::trip::{ProviderType, TripStatus};
use crate::repositories::provider_mapping_repository::ProviderMappingRepository;
use crate::repositories::trip_repository::TripRepository;
use crate::services::pricing_engine::{self, FareInput, PricingConfig};
use crate::utils::errors::{AppError, AppResult};

use super::{
    ConfirmPaymentInput, DispatchMode, FareOption, FareSearchInput, PrebookInput, PrebookOutcome,
    SupplyProvider, TrackingInfo, TrackingInput,
};

lazy_static! {
    /// El vocabulario interno coincide con el propio estado del viaje
    static ref INTERNAL_STATUS_MAP: Vec<(&'static str, TripStatus)> = vec![
        ("DRIVER_ASSIGNED", TripStatus::DriverAssigned),
        ("STARTED", TripStatus::Started),
        ("COMPLETED", TripStatus::Completed),
        ("CANCELLED", TripStatus::Cancelled),
        ("NO_SHOW", TripStatus::NoShow),
    ];
}

pub struct InternalProvider {
    pool: PgPool,
    pricing: PricingConfig,
}

impl InternalProvider {
    pub fn new(pool: PgPool, config: &EnvironmentConfig) -> Self {
        Self {
            pool,
            pricing: PricingConfig::from_environment(config),
        }
    }
}

#[async_trait]
impl SupplyProvider for InternalProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Internal
    }

    fn dispatch_mode(&self) -> DispatchMode {
        DispatchMode::Manual
    }

    fn status_map(&self) -> &'static [(&'static str, TripStatus)] {
        &INTERNAL_STATUS_MAP
    }

    async fn search_fare(&self, input: &FareSearchInput) -> AppResult<Vec<FareOption>> {
        let fare = pricing_engine::calculate_fare(
            &self.pricing,
            &FareInput {
                distance_km: input.distance_km,
                trip_type: input.trip_type,
                pickup_time: input.pickup_time,
                booking_time: chrono::Utc::now(),
                vehicle_class: input.vehicle_class,
            },
        );

        Ok(vec![FareOption {
            provider: ProviderType::Internal,
            fare: fare.final_fare,
            currency: "INR".to_string(),
        }])
    }

    /// El despacho interno es manual: la "pre-reserva" solo emite una
    /// referencia interna, sin sistema externo que consultar.
    async fn prebook(&self, input: &PrebookInput) -> AppResult<PrebookOutcome> {
        let reference = format!("INT-{}", &input.trip_id.simple().to_string()[..8]);
        Ok(PrebookOutcome {
            provider: ProviderType::Internal,
            external_booking_id: reference.clone(),
            raw_payload: json!({ "reference": reference, "dispatch": "manual" }),
        })
    }

    async fn confirm_payment(&self, _input: &ConfirmPaymentInput) -> AppResult<()> {
        // El cobro de la flota propia lo liquida el colaborador de pagos
        Ok(())
    }

    async fn cancel_booking(&self, _external_booking_id: &str) -> AppResult<()> {
        // No hay sistema externo que notificar
        Ok(())
    }

    async fn get_booking_details(&self, external_booking_id: &str) -> AppResult<serde_json::Value> {
        let mut conn = self.pool.acquire().await.map_err(AppError::Database)?;
        let mapping =
            ProviderMappingRepository::find_by_external_booking_id(&mut conn, external_booking_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("booking '{}' not found", external_booking_id))
                })?;

        let trip = TripRepository::find_by_id(&mut conn, mapping.trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", mapping.trip_id)))?;

        Ok(json!({
            "reference": external_booking_id,
            "tripId": trip.id,
            "status": trip.trip_status,
            "pickupTime": trip.pickup_time,
        }))
    }

    async fn track_ride(&self, input: &TrackingInput) -> AppResult<TrackingInfo> {
        let mut conn = self.pool.acquire().await.map_err(AppError::Database)?;
        let trip = TripRepository::find_by_id(&mut conn, input.trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", input.trip_id)))?;

        let source = trip.pickup_point().ok_or_else(|| {
            AppError::BadRequest("trip has no pickup coordinates recorded".to_string())
        })?;
        let destination = trip.drop_point().ok_or_else(|| {
            AppError::BadRequest("trip has no drop coordinates recorded".to_string())
        })?;

        Ok(TrackingInfo {
            source,
            destination,
            live: None,
        })
    }

    async fn get_ride_status(&self, external_booking_id: &str) -> AppResult<String> {
        let mut conn = self.pool.acquire().await.map_err(AppError::Database)?;
        let mapping =
            ProviderMappingRepository::find_by_external_booking_id(&mut conn, external_booking_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("booking '{}' not found", external_booking_id))
                })?;

        let trip = TripRepository::find_by_id(&mut conn, mapping.trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("trip '{}' not found", mapping.trip_id)))?;

        Ok(trip.trip_status.as_str().to_string())
    }
}
