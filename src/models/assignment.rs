//! Modelo de Assignment
//!
//! La reclamación de un conductor sobre un viaje. Para un viaje dado puede
//! existir como máximo un assignment abierto (ASSIGNED o ACTIVE) en cualquier
//! instante; lo mismo aplica por conductor y por vehículo. Los índices únicos
//! parciales del schema son el garante final de esa exclusividad.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del assignment - mapea al ENUM assignment_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "assignment_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Assigned,
    Active,
    Unassigned,
    Cancelled,
    Completed,
}

impl AssignmentStatus {
    /// Un assignment abierto mantiene al conductor reclamado
    pub fn is_open(&self) -> bool {
        matches!(self, AssignmentStatus::Assigned | AssignmentStatus::Active)
    }
}

/// Assignment principal - mapea exactamente a la tabla assignments.
/// Nunca se borra físicamente; se cierra con un estado final.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub driver_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub assignment_status: AssignmentStatus,
    pub booking_attempted: bool,
    pub booking_failure_reason: Option<String>,
    pub assigned_at: DateTime<Utc>,
    pub unassigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
