//! Modelo de Driver
//!
//! El conductor pertenece al colaborador de gestión de flota; este servicio
//! solo lo lee y voltea su flag de disponibilidad como efecto de los cambios
//! de assignment. Invariante: is_available = false mientras exista un
//! assignment abierto que lo referencie, y true en cuanto ese assignment
//! se cierra.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Driver {
    pub id: Uuid,
    pub full_name: String,
    pub fleet_id: Uuid,
    pub hub_id: Option<Uuid>,
    pub is_available: bool,
    pub driver_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    /// Un conductor operativo puede recibir assignments
    pub fn is_active(&self) -> bool {
        self.driver_status == "active"
    }
}
