//! Modelo de Trip
//!
//! Este módulo contiene el struct Trip y los enums de su ciclo de vida.
//! Mapea exactamente al schema PostgreSQL con primary key 'id'.
//!
//! Invariante: price y billable_km se fijan una sola vez al crear el viaje
//! y ninguna transición de estado los recalcula.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Tipo de viaje - mapea al ENUM trip_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "trip_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripType {
    Airport,
    Rental,
    InterCity,
}

impl std::fmt::Display for TripType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TripType::Airport => write!(f, "AIRPORT"),
            TripType::Rental => write!(f, "RENTAL"),
            TripType::InterCity => write!(f, "INTER_CITY"),
        }
    }
}

/// Estado del viaje - mapea al ENUM trip_status
///
/// CREATED → DRIVER_ASSIGNED → STARTED → COMPLETED | CANCELLED | NO_SHOW,
/// con la arista de retorno DRIVER_ASSIGNED → CREATED al desasignar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "trip_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Created,
    DriverAssigned,
    Started,
    Completed,
    Cancelled,
    NoShow,
}

impl TripStatus {
    /// Los estados terminales son finales: ninguna transición sale de ellos
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TripStatus::Completed | TripStatus::Cancelled | TripStatus::NoShow
        )
    }

    /// Vocablo externo del estado, como viaja en las APIs
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Created => "CREATED",
            TripStatus::DriverAssigned => "DRIVER_ASSIGNED",
            TripStatus::Started => "STARTED",
            TripStatus::Completed => "COMPLETED",
            TripStatus::Cancelled => "CANCELLED",
            TripStatus::NoShow => "NO_SHOW",
        }
    }
}

/// Clase de vehículo - mapea al ENUM vehicle_class
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "vehicle_class", rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleClass {
    Sedan,
    Suv,
    Electric,
}

impl VehicleClass {
    pub fn is_electric(&self) -> bool {
        matches!(self, VehicleClass::Electric)
    }
}

/// Identificador de proveedor de suministro - mapea al ENUM provider_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "provider_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Internal,
    QuickCabs,
    CityDrive,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::Internal => write!(f, "internal"),
            ProviderType::QuickCabs => write!(f, "quickcabs"),
            ProviderType::CityDrive => write!(f, "citydrive"),
        }
    }
}

/// Coordenada geográfica
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Trip principal - mapea exactamente a la tabla trips
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: Uuid,
    pub trip_type: TripType,
    pub origin_city: String,
    pub destination_city: String,
    pub pickup_location: String,
    pub pickup_lat: Option<f64>,
    pub pickup_lng: Option<f64>,
    pub drop_lat: Option<f64>,
    pub drop_lng: Option<f64>,
    pub pickup_time: DateTime<Utc>,
    pub booking_time: DateTime<Utc>,
    pub distance_km: f64,
    pub billable_km: i32,
    pub rate_per_km: Decimal,
    pub price: Decimal,
    pub vehicle_class: VehicleClass,
    pub trip_status: TripStatus,
    pub is_prebooked: bool,
    pub provider: Option<ProviderType>,
    pub cancellation_reason: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub onboarded_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// Coordenada de recogida, si fue registrada al crear el viaje
    pub fn pickup_point(&self) -> Option<GeoPoint> {
        match (self.pickup_lat, self.pickup_lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        }
    }

    /// Coordenada de destino, si fue registrada al crear el viaje
    pub fn drop_point(&self) -> Option<GeoPoint> {
        match (self.drop_lat, self.drop_lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        }
    }
}
