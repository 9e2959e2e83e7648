//! Trip orchestrator
//!
//! Crea el viaje: valida constraints, calcula la tarifa, persiste, y decide
//! vía la política de asignación qué provider lo cumple. Los providers de
//! despacho manual quedan con mapping PENDING sin booking externo; los de
//! reserva inmediata se pre-reservan contra el partner después del commit.
//! El orchestrator nunca asigna conductor: eso es siempre una llamada
//! explícita al assignment service.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::environment::EnvironmentConfig;
use crate::dto::trip_dto::{CreateTripRequest, FareOptionsQuery};
use crate::models::provider_mapping::{partner_status, ProviderMapping};
use crate::models::trip::{ProviderType, Trip, TripType};
use crate::providers::{DispatchMode, FareOption, FareSearchInput, PrebookInput, ProviderRegistry};
use crate::repositories::provider_mapping_repository::ProviderMappingRepository;
use crate::repositories::trip_repository::{NewTrip, TripRepository};
use crate::services::constraint_engine::{self, ConstraintConfig, ConstraintInput};
use crate::services::pricing_engine::{self, FareBreakdown, FareInput, PricingConfig};
use crate::utils::errors::{AppError, AppResult};

pub struct TripOrchestrator {
    pool: PgPool,
    registry: Arc<ProviderRegistry>,
    config: Arc<EnvironmentConfig>,
}

/// Política de asignación de provider: el override explícito gana; si no,
/// cada tipo de viaje tiene su canal de suministro por defecto.
pub fn decide_provider(preferred: Option<ProviderType>, trip_type: TripType) -> ProviderType {
    if let Some(provider) = preferred {
        return provider;
    }
    match trip_type {
        TripType::Airport => ProviderType::Internal,
        TripType::Rental => ProviderType::CityDrive,
        TripType::InterCity => ProviderType::QuickCabs,
    }
}

impl TripOrchestrator {
    pub fn new(pool: PgPool, registry: Arc<ProviderRegistry>, config: Arc<EnvironmentConfig>) -> Self {
        Self {
            pool,
            registry,
            config,
        }
    }

    pub async fn create_trip(
        &self,
        request: CreateTripRequest,
    ) -> AppResult<(Trip, ProviderMapping, FareBreakdown)> {
        let now = Utc::now();
        let booking_time = request.booking_time.unwrap_or(now);
        let is_prebooked = request.is_prebooked.unwrap_or(true);
        let origin_city = request.origin_city.trim().to_uppercase();
        let destination_city = request.destination_city.trim().to_uppercase();

        let verdict = constraint_engine::validate(
            &ConstraintConfig::from_environment(&self.config),
            &ConstraintInput {
                trip_type: request.trip_type,
                origin_city: &origin_city,
                pickup_time: request.pickup_time,
                now,
                distance_km: request.distance_km,
                vehicle_class: request.vehicle_class,
                is_prebooked,
            },
        );
        if !verdict.allowed {
            return Err(AppError::BadRequest(
                verdict
                    .reason
                    .unwrap_or_else(|| "trip request is not allowed".to_string()),
            ));
        }

        let fare = pricing_engine::calculate_fare(
            &PricingConfig::from_environment(&self.config),
            &FareInput {
                distance_km: request.distance_km,
                trip_type: request.trip_type,
                pickup_time: request.pickup_time,
                booking_time,
                vehicle_class: request.vehicle_class,
            },
        );

        let provider = decide_provider(request.preferred_provider, request.trip_type);
        let adapter = self.registry.get(provider)?;

        let mut tx = self.pool.begin().await?;
        let trip = TripRepository::insert(
            &mut tx,
            NewTrip {
                id: Uuid::new_v4(),
                trip_type: request.trip_type,
                origin_city,
                destination_city,
                pickup_location: request.pickup_location,
                pickup_lat: request.pickup_lat,
                pickup_lng: request.pickup_lng,
                drop_lat: request.drop_lat,
                drop_lng: request.drop_lng,
                pickup_time: request.pickup_time,
                booking_time,
                distance_km: request.distance_km,
                billable_km: fare.billable_km,
                rate_per_km: fare.rate_per_km,
                price: fare.final_fare,
                vehicle_class: request.vehicle_class,
                is_prebooked,
                provider: Some(provider),
            },
        )
        .await?;

        let mapping = ProviderMappingRepository::insert(
            &mut tx,
            trip.id,
            provider,
            None,
            partner_status::PENDING,
            None,
        )
        .await?;
        tx.commit().await?;

        info!(
            "🚕 Trip {} created ({} from {}, provider {})",
            trip.id, trip.trip_type, trip.origin_city, provider
        );

        // Pre-reserva contra el partner, siempre fuera de la transacción.
        // Si falla, el viaje queda despachable con el mapping PENDING.
        let mapping = if adapter.dispatch_mode() == DispatchMode::Immediate {
            match adapter
                .prebook(&PrebookInput {
                    trip_id: trip.id,
                    trip_type: trip.trip_type,
                    origin_city: trip.origin_city.clone(),
                    destination_city: trip.destination_city.clone(),
                    pickup_location: trip.pickup_location.clone(),
                    pickup: trip.pickup_point(),
                    drop: trip.drop_point(),
                    pickup_time: trip.pickup_time,
                    distance_km: trip.distance_km,
                    vehicle_class: trip.vehicle_class,
                    price: trip.price,
                })
                .await
            {
                Ok(outcome) => {
                    let mut conn = self.pool.acquire().await?;
                    let updated = ProviderMappingRepository::supersede_booking(
                        &mut conn,
                        trip.id,
                        outcome.provider,
                        Some(outcome.external_booking_id.clone()),
                        partner_status::PREBOOKED,
                        Some(outcome.raw_payload),
                    )
                    .await?;
                    info!(
                        "📗 Trip {} prebooked with {} (booking {})",
                        trip.id, provider, outcome.external_booking_id
                    );
                    updated
                }
                Err(e) => {
                    warn!(
                        "⚠️ Prebook with {} failed for trip {}: {} - trip stays dispatchable",
                        provider, trip.id, e
                    );
                    mapping
                }
            }
        } else {
            mapping
        };

        Ok((trip, mapping, fare))
    }

    /// Compara tarifas entre todos los providers registrados. Los fallos de
    /// un partner se loguean y no tumban la comparación.
    pub async fn fare_options(&self, query: &FareOptionsQuery) -> Vec<FareOption> {
        let input = FareSearchInput {
            trip_type: query.trip_type,
            vehicle_class: query.vehicle_class,
            distance_km: query.distance_km,
            pickup_time: query.pickup_time,
        };

        let searches = self.registry.registered().map(|adapter| {
            let adapter = Arc::clone(adapter);
            let input = input.clone();
            async move {
                let provider = adapter.provider_type();
                match adapter.search_fare(&input).await {
                    Ok(options) => options,
                    Err(e) => {
                        warn!("⚠️ Fare search failed for {}: {}", provider, e);
                        Vec::new()
                    }
                }
            }
        });

        join_all(searches).await.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_provider_override_wins() {
        assert_eq!(
            decide_provider(Some(ProviderType::QuickCabs), TripType::Airport),
            ProviderType::QuickCabs
        );
    }

    #[test]
    fn trip_types_route_to_their_default_supply_channel() {
        assert_eq!(
            decide_provider(None, TripType::Airport),
            ProviderType::Internal
        );
        assert_eq!(
            decide_provider(None, TripType::Rental),
            ProviderType::CityDrive
        );
        assert_eq!(
            decide_provider(None, TripType::InterCity),
            ProviderType::QuickCabs
        );
    }
}
