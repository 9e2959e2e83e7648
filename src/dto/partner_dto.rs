//! DTOs inbound de partners
//!
//! Payloads nativos de QuickCabs para sus llamadas entrantes. QuickCabs
//! espera su propio envelope de error ({status, errorCode, errorMessage}),
//! nunca el genérico del sistema, así que estas responses no pasan por
//! AppError.

use serde::{Deserialize, Serialize};

/// Request de bloqueo: el partner retiene la reserva mientras arma el suministro
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickCabsBlockRequest {
    pub booking_id: String,
}

/// Confirmación del partner, con los datos de su conductor si ya los tiene
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickCabsConfirmRequest {
    pub booking_id: String,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub vehicle_number: Option<String>,
}

/// Cancelación iniciada por el partner
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickCabsCancelRequest {
    pub booking_id: String,
    pub reason: Option<String>,
}

/// Reprogramación de la hora de recogida iniciada por el partner
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickCabsRescheduleRequest {
    pub booking_id: String,
    pub new_pickup_time: chrono::DateTime<chrono::Utc>,
}

/// Envelope de respuesta que QuickCabs espera de nosotros
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickCabsEnvelope {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl QuickCabsEnvelope {
    pub fn ok(booking_id: String) -> Self {
        Self {
            status: "SUCCESS",
            booking_id: Some(booking_id),
            booking_status: None,
            trip_status: None,
            error_code: None,
            error_message: None,
        }
    }

    pub fn ok_with_status(booking_id: String, booking_status: String, trip_status: String) -> Self {
        Self {
            status: "SUCCESS",
            booking_id: Some(booking_id),
            booking_status: Some(booking_status),
            trip_status: Some(trip_status),
            error_code: None,
            error_message: None,
        }
    }

    pub fn failure(error_code: &'static str, error_message: String) -> Self {
        Self {
            status: "FAILURE",
            booking_id: None,
            booking_status: None,
            trip_status: None,
            error_code: Some(error_code),
            error_message: Some(error_message),
        }
    }
}
