//! Modelo de Provider Mapping
//!
//! El vínculo persistido entre un viaje y la reserva del partner externo.
//! Un mapping por viaje durante toda su vida: una reasignación no crea un
//! segundo mapping, supersede el provider/booking id del existente.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::trip::ProviderType;

/// Estados conocidos del lado partner. partner_status es texto libre porque
/// cada partner maneja su propio vocabulario; estos son los que escribimos
/// nosotros.
pub mod partner_status {
    pub const PENDING: &str = "PENDING";
    pub const PREBOOKED: &str = "PREBOOKED";
    pub const BLOCKED: &str = "BLOCKED";
    pub const CONFIRMED: &str = "CONFIRMED";
    pub const CANCELLED: &str = "CANCELLED";
}

/// Provider Mapping principal - mapea exactamente a la tabla provider_mappings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProviderMapping {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub provider: ProviderType,
    pub external_booking_id: Option<String>,
    pub partner_status: String,
    pub raw_payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
