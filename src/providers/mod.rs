//! Capa de providers de suministro
//!
//! Contrato uniforme sobre las APIs heterogéneas de los partners que pueden
//! cumplir un viaje, y el registry que resuelve "quién cumple este viaje".
//! Cada adapter es dueño de su propia autenticación contra el partner; las
//! llamadas salientes son JSON sobre HTTPS con timeout acotado y un header
//! de correlación por request.

pub mod citydrive;
pub mod internal;
pub mod quickcabs;
pub mod token_cache;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::environment::EnvironmentConfig;
use crate::models::trip::{GeoPoint, ProviderType, TripStatus, TripType, VehicleClass};
use crate::utils::errors::{AppError, AppResult};

pub use citydrive::CityDriveProvider;
pub use internal::InternalProvider;
pub use quickcabs::QuickCabsProvider;

/// Cómo despacha el provider: con reserva inmediata contra su API o con
/// despacho manual/diferido por operaciones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Manual,
    Immediate,
}

/// Input de búsqueda de tarifas
#[derive(Debug, Clone, Serialize)]
pub struct FareSearchInput {
    pub trip_type: TripType,
    pub vehicle_class: VehicleClass,
    pub distance_km: f64,
    pub pickup_time: DateTime<Utc>,
}

/// Una opción de tarifa devuelta por un provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FareOption {
    pub provider: ProviderType,
    pub fare: Decimal,
    pub currency: String,
}

/// Input de pre-reserva contra el partner
#[derive(Debug, Clone)]
pub struct PrebookInput {
    pub trip_id: Uuid,
    pub trip_type: TripType,
    pub origin_city: String,
    pub destination_city: String,
    pub pickup_location: String,
    pub pickup: Option<GeoPoint>,
    pub drop: Option<GeoPoint>,
    pub pickup_time: DateTime<Utc>,
    pub distance_km: f64,
    pub vehicle_class: VehicleClass,
    pub price: Decimal,
}

/// Resultado de una pre-reserva exitosa
#[derive(Debug, Clone)]
pub struct PrebookOutcome {
    pub provider: ProviderType,
    pub external_booking_id: String,
    pub raw_payload: serde_json::Value,
}

/// Input de confirmación de pago de una reserva existente
#[derive(Debug, Clone)]
pub struct ConfirmPaymentInput {
    pub external_booking_id: String,
    pub amount: Decimal,
}

/// Input de tracking; los providers externos resuelven por booking id,
/// el interno por trip id.
#[derive(Debug, Clone)]
pub struct TrackingInput {
    pub trip_id: Uuid,
    pub external_booking_id: Option<String>,
}

/// Coordenadas de tracking de un viaje
#[derive(Debug, Clone, Serialize)]
pub struct TrackingInfo {
    pub source: GeoPoint,
    pub destination: GeoPoint,
    pub live: Option<GeoPoint>,
}

/// Contrato uniforme de un provider de suministro
#[async_trait]
pub trait SupplyProvider: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    fn dispatch_mode(&self) -> DispatchMode;

    /// Tabla de mapeo del vocabulario de estados del partner al estado
    /// interno del viaje.
    fn status_map(&self) -> &'static [(&'static str, TripStatus)];

    async fn search_fare(&self, input: &FareSearchInput) -> AppResult<Vec<FareOption>>;

    async fn prebook(&self, input: &PrebookInput) -> AppResult<PrebookOutcome>;

    async fn confirm_payment(&self, input: &ConfirmPaymentInput) -> AppResult<()>;

    async fn cancel_booking(&self, external_booking_id: &str) -> AppResult<()>;

    async fn get_booking_details(&self, external_booking_id: &str) -> AppResult<serde_json::Value>;

    async fn track_ride(&self, input: &TrackingInput) -> AppResult<TrackingInfo>;

    async fn get_ride_status(&self, external_booking_id: &str) -> AppResult<String>;

    /// Traduce un estado reportado por el partner al estado interno.
    /// Devuelve None para estados que no nos interesan (intermedios propios
    /// del partner).
    fn map_partner_status(&self, partner_status: &str) -> Option<TripStatus> {
        let normalized = partner_status.trim().to_uppercase();
        self.status_map()
            .iter()
            .find(|(key, _)| *key == normalized)
            .map(|(_, status)| *status)
    }
}

/// Registry en memoria de providers: un adapter por identificador.
pub struct ProviderRegistry {
    adapters: HashMap<ProviderType, Arc<dyn SupplyProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Construye el registry con los tres adapters configurados.
    pub fn with_configured(config: &EnvironmentConfig, pool: PgPool) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {}", e)))?;

        let mut registry = Self::new();
        registry.register(Arc::new(InternalProvider::new(pool, config)));
        registry.register(Arc::new(QuickCabsProvider::new(http_client.clone(), config)));
        registry.register(Arc::new(CityDriveProvider::new(http_client, config)));
        Ok(registry)
    }

    pub fn register(&mut self, adapter: Arc<dyn SupplyProvider>) {
        self.adapters.insert(adapter.provider_type(), adapter);
    }

    /// Un provider no registrado es un error de configuración, no uno
    /// recuperable en runtime: falla fuerte.
    pub fn get(&self, provider: ProviderType) -> AppResult<Arc<dyn SupplyProvider>> {
        self.adapters.get(&provider).cloned().ok_or_else(|| {
            AppError::Internal(format!(
                "provider '{}' is not registered - configuration error",
                provider
            ))
        })
    }

    pub fn registered(&self) -> impl Iterator<Item = &Arc<dyn SupplyProvider>> {
        self.adapters.values()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Header de correlación que viaja en toda llamada saliente a partners
pub(crate) const CORRELATION_HEADER: &str = "x-correlation-id";

pub(crate) fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}
