//! DTOs de asignación de conductores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::assignment::{Assignment, AssignmentStatus};

/// Request para asignar un conductor a un viaje
#[derive(Debug, Deserialize)]
pub struct AssignTripRequest {
    pub trip_id: Uuid,
    pub driver_id: Uuid,
    /// Vehículo de flota sustituto, cuando aplica
    pub vehicle_id: Option<Uuid>,
}

/// Request para desasignar el conductor de un viaje
#[derive(Debug, Deserialize)]
pub struct UnassignTripRequest {
    pub trip_id: Uuid,
}

/// Request para reasignar un viaje a otro conductor
#[derive(Debug, Deserialize)]
pub struct ReassignTripRequest {
    pub trip_id: Uuid,
    pub driver_id: Uuid,
    pub vehicle_id: Option<Uuid>,
}

/// Response de assignment para la API
#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub driver_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub assignment_status: AssignmentStatus,
    pub booking_attempted: bool,
    pub booking_failure_reason: Option<String>,
    pub assigned_at: DateTime<Utc>,
    pub unassigned_at: Option<DateTime<Utc>>,
}

impl From<Assignment> for AssignmentResponse {
    fn from(assignment: Assignment) -> Self {
        Self {
            id: assignment.id,
            trip_id: assignment.trip_id,
            driver_id: assignment.driver_id,
            vehicle_id: assignment.vehicle_id,
            assignment_status: assignment.assignment_status,
            booking_attempted: assignment.booking_attempted,
            booking_failure_reason: assignment.booking_failure_reason,
            assigned_at: assignment.assigned_at,
            unassigned_at: assignment.unassigned_at,
        }
    }
}
