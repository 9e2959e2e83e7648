//! DTOs de viajes: creación, ciclo de vida, tracking y listados

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::provider_mapping::ProviderMapping;
use crate::models::trip::{GeoPoint, ProviderType, Trip, TripStatus, TripType, VehicleClass};
use crate::services::pricing_engine::FareBreakdown;

/// Request para crear un viaje
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTripRequest {
    pub trip_type: TripType,

    #[validate(length(min = 2, max = 60))]
    pub origin_city: String,

    #[validate(length(min = 2, max = 60))]
    pub destination_city: String,

    #[validate(length(min = 3, max = 200))]
    pub pickup_location: String,

    pub pickup_lat: Option<f64>,
    pub pickup_lng: Option<f64>,
    pub drop_lat: Option<f64>,
    pub drop_lng: Option<f64>,

    pub pickup_time: DateTime<Utc>,

    /// Momento de la reserva; por defecto "ahora"
    pub booking_time: Option<DateTime<Utc>>,

    #[validate(range(min = 0.1, max = 5000.0))]
    pub distance_km: f64,

    pub vehicle_class: VehicleClass,

    /// Las reservas por API son pre-booked salvo que se indique lo contrario
    pub is_prebooked: Option<bool>,

    /// Override explícito de la política de asignación de provider
    pub preferred_provider: Option<ProviderType>,
}

/// Response de viaje para la API
#[derive(Debug, Serialize)]
pub struct TripResponse {
    pub id: Uuid,
    pub trip_type: TripType,
    pub origin_city: String,
    pub destination_city: String,
    pub pickup_location: String,
    pub pickup: Option<GeoPoint>,
    pub drop: Option<GeoPoint>,
    pub pickup_time: DateTime<Utc>,
    pub booking_time: DateTime<Utc>,
    pub distance_km: f64,
    pub billable_km: i32,
    pub rate_per_km: Decimal,
    pub price: Decimal,
    pub vehicle_class: VehicleClass,
    pub trip_status: TripStatus,
    pub provider: Option<ProviderType>,
    pub created_at: DateTime<Utc>,
}

impl From<Trip> for TripResponse {
    fn from(trip: Trip) -> Self {
        Self {
            pickup: trip.pickup_point(),
            drop: trip.drop_point(),
            id: trip.id,
            trip_type: trip.trip_type,
            origin_city: trip.origin_city,
            destination_city: trip.destination_city,
            pickup_location: trip.pickup_location,
            pickup_time: trip.pickup_time,
            booking_time: trip.booking_time,
            distance_km: trip.distance_km,
            billable_km: trip.billable_km,
            rate_per_km: trip.rate_per_km,
            price: trip.price,
            vehicle_class: trip.vehicle_class,
            trip_status: trip.trip_status,
            provider: trip.provider,
            created_at: trip.created_at,
        }
    }
}

/// Response de creación: viaje + desglose de tarifa para auditoría
#[derive(Debug, Serialize)]
pub struct CreateTripResponse {
    pub trip: TripResponse,
    pub fare: FareBreakdown,
    pub provider: ProviderType,
    pub partner_status: String,
}

/// Resumen del mapping de provider para responses
#[derive(Debug, Serialize)]
pub struct ProviderMappingResponse {
    pub provider: ProviderType,
    pub external_booking_id: Option<String>,
    pub partner_status: String,
    pub updated_at: DateTime<Utc>,
}

impl From<ProviderMapping> for ProviderMappingResponse {
    fn from(mapping: ProviderMapping) -> Self {
        Self {
            provider: mapping.provider,
            external_booking_id: mapping.external_booking_id,
            partner_status: mapping.partner_status,
            updated_at: mapping.updated_at,
        }
    }
}

/// Request para iniciar el viaje; solo el conductor asignado puede hacerlo
#[derive(Debug, Deserialize)]
pub struct StartTripRequest {
    pub driver_id: Uuid,
}

/// Request de llegada al punto de recogida, con geolocalización del caller
#[derive(Debug, Deserialize)]
pub struct ArriveTripRequest {
    pub lat: f64,
    pub lng: f64,
}

/// Request de no-show; la geolocalización es opcional
#[derive(Debug, Deserialize)]
pub struct NoShowTripRequest {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Request para completar el viaje
#[derive(Debug, Deserialize)]
pub struct CompleteTripRequest {
    pub driver_id: Uuid,
}

/// Request de cancelación
#[derive(Debug, Deserialize, Default)]
pub struct CancelTripRequest {
    pub reason: Option<String>,
}

/// Response de tracking con las coordenadas del provider vinculado
#[derive(Debug, Serialize)]
pub struct TrackingResponse {
    pub source: GeoPoint,
    pub destination: GeoPoint,
    pub live: Option<GeoPoint>,
}

/// Query de listado paginado para administración
#[derive(Debug, Deserialize)]
pub struct TripListQuery {
    pub status: Option<TripStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Fila del listado administrativo, con joins de assignment y mapping
#[derive(Debug, Serialize)]
pub struct TripListItem {
    pub trip: TripResponse,
    pub assignment: Option<super::assignment_dto::AssignmentResponse>,
    pub provider_mapping: Option<ProviderMappingResponse>,
}

/// Response del listado paginado
#[derive(Debug, Serialize)]
pub struct TripListResponse {
    pub trips: Vec<TripListItem>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

/// Query para comparar tarifas entre providers registrados
#[derive(Debug, Deserialize, Validate)]
pub struct FareOptionsQuery {
    pub trip_type: TripType,
    pub vehicle_class: VehicleClass,

    #[validate(range(min = 0.1, max = 5000.0))]
    pub distance_km: f64,

    pub pickup_time: DateTime<Utc>,
}
