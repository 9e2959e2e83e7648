//! Adapter de CityDrive
//!
//! Partner externo de rentals con API JSON autenticada por API key estática
//! (header x-api-key); no hay intercambio de tokens que refrescar. Reserva
//! de inmediato contra su endpoint de reservations.

use async_trait::async_trait;
use lazy_static::lazy_static;
use serde::Deserialize;
use serde_json::json;

use crate::config::environment::EnvironmentConfig;
use crate::models::trip::{GeoPoint, ProviderType, TripStatus};
use crate::utils::errors::{AppError, AppResult};

use super::{
    correlation_id, ConfirmPaymentInput, DispatchMode, FareOption, FareSearchInput, PrebookInput,
    PrebookOutcome, SupplyProvider, TrackingInfo, TrackingInput, CORRELATION_HEADER,
};

const API_KEY_HEADER: &str = "x-api-key";

lazy_static! {
    /// Vocabulario de estados de CityDrive → estado interno del viaje
    static ref CITYDRIVE_STATUS_MAP: Vec<(&'static str, TripStatus)> = vec![
        ("ASSIGNED", TripStatus::DriverAssigned),
        ("IN_PROGRESS", TripStatus::Started),
        ("FINISHED", TripStatus::Completed),
        ("CANCELLED", TripStatus::Cancelled),
        ("CLIENT_ABSENT", TripStatus::NoShow),
    ];
}

pub struct CityDriveProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CityDrivePriceResponse {
    total_price: rust_decimal::Decimal,
    currency: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CityDriveReservationResponse {
    reservation_ref: String,
}

#[derive(Debug, Deserialize)]
struct CityDriveStateResponse {
    state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CityDriveLocationResponse {
    pickup: GeoPoint,
    dropoff: GeoPoint,
    vehicle: Option<GeoPoint>,
}

impl CityDriveProvider {
    pub fn new(client: reqwest::Client, config: &EnvironmentConfig) -> Self {
        Self {
            client,
            base_url: config.citydrive_base_url.trim_end_matches('/').to_string(),
            api_key: config.citydrive_api_key.clone(),
        }
    }

    fn check_status(response: &reqwest::Response) -> AppResult<()> {
        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AppError::PartnerAuth(
                "citydrive rejected the API key".to_string(),
            ));
        }
        if !response.status().is_success() {
            return Err(AppError::PartnerApi(format!(
                "citydrive returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SupplyProvider for CityDriveProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::CityDrive
    }

    fn dispatch_mode(&self) -> DispatchMode {
        DispatchMode::Immediate
    }

    fn status_map(&self) -> &'static [(&'static str, TripStatus)] {
        &CITYDRIVE_STATUS_MAP
    }

    async fn search_fare(&self, input: &FareSearchInput) -> AppResult<Vec<FareOption>> {
        let url = format!("{}/api/v2/price-check", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(CORRELATION_HEADER, correlation_id())
            .json(&json!({
                "tripType": input.trip_type,
                "vehicleClass": input.vehicle_class,
                "distanceKm": input.distance_km,
                "pickupTime": input.pickup_time,
            }))
            .send()
            .await
            .map_err(|e| AppError::PartnerApi(format!("citydrive price-check failed: {}", e)))?;

        Self::check_status(&response)?;
        let price: CityDrivePriceResponse = response
            .json()
            .await
            .map_err(|e| AppError::PartnerApi(format!("citydrive price parse error: {}", e)))?;

        Ok(vec![FareOption {
            provider: ProviderType::CityDrive,
            fare: price.total_price,
            currency: price.currency,
        }])
    }

    async fn prebook(&self, input: &PrebookInput) -> AppResult<PrebookOutcome> {
        let url = format!("{}/api/v2/reservations", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(CORRELATION_HEADER, correlation_id())
            .json(&json!({
                "externalRef": input.trip_id,
                "tripType": input.trip_type,
                "from": input.origin_city,
                "to": input.destination_city,
                "pickupAddress": input.pickup_location,
                "pickupPoint": input.pickup,
                "dropPoint": input.drop,
                "pickupAt": input.pickup_time,
                "distanceKm": input.distance_km,
                "vehicleClass": input.vehicle_class,
                "agreedPrice": input.price,
            }))
            .send()
            .await
            .map_err(|e| AppError::PartnerApi(format!("citydrive reservation failed: {}", e)))?;

        Self::check_status(&response)?;
        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::PartnerApi(format!("citydrive reservation parse error: {}", e)))?;

        let reservation: CityDriveReservationResponse = serde_json::from_value(raw.clone())
            .map_err(|e| {
                AppError::PartnerApi(format!("citydrive reservation missing reservationRef: {}", e))
            })?;

        Ok(PrebookOutcome {
            provider: ProviderType::CityDrive,
            external_booking_id: reservation.reservation_ref,
            raw_payload: raw,
        })
    }

    async fn confirm_payment(&self, input: &ConfirmPaymentInput) -> AppResult<()> {
        let url = format!(
            "{}/api/v2/reservations/{}/payment",
            self.base_url, input.external_booking_id
        );

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(CORRELATION_HEADER, correlation_id())
            .json(&json!({ "amount": input.amount }))
            .send()
            .await
            .map_err(|e| AppError::PartnerApi(format!("citydrive payment failed: {}", e)))?;

        Self::check_status(&response)
    }

    async fn cancel_booking(&self, external_booking_id: &str) -> AppResult<()> {
        let url = format!(
            "{}/api/v2/reservations/{}/cancel",
            self.base_url, external_booking_id
        );

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(CORRELATION_HEADER, correlation_id())
            .send()
            .await
            .map_err(|e| AppError::PartnerApi(format!("citydrive cancel failed: {}", e)))?;

        Self::check_status(&response)
    }

    async fn get_booking_details(&self, external_booking_id: &str) -> AppResult<serde_json::Value> {
        let url = format!(
            "{}/api/v2/reservations/{}",
            self.base_url, external_booking_id
        );

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(CORRELATION_HEADER, correlation_id())
            .send()
            .await
            .map_err(|e| AppError::PartnerApi(format!("citydrive details failed: {}", e)))?;

        Self::check_status(&response)?;
        let raw = response
            .json()
            .await
            .map_err(|e| AppError::PartnerApi(format!("citydrive details parse error: {}", e)))?;

        Ok(raw)
    }

    async fn track_ride(&self, input: &TrackingInput) -> AppResult<TrackingInfo> {
        let booking_id = input.external_booking_id.as_deref().ok_or_else(|| {
            AppError::BadRequest("trip has no external booking to track".to_string())
        })?;

        let url = format!(
            "{}/api/v2/reservations/{}/location",
            self.base_url, booking_id
        );

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(CORRELATION_HEADER, correlation_id())
            .send()
            .await
            .map_err(|e| AppError::PartnerApi(format!("citydrive location failed: {}", e)))?;

        Self::check_status(&response)?;
        let location: CityDriveLocationResponse = response
            .json()
            .await
            .map_err(|e| AppError::PartnerApi(format!("citydrive location parse error: {}", e)))?;

        Ok(TrackingInfo {
            source: location.pickup,
            destination: location.dropoff,
            live: location.vehicle,
        })
    }

    async fn get_ride_status(&self, external_booking_id: &str) -> AppResult<String> {
        let url = format!(
            "{}/api/v2/reservations/{}/state",
            self.base_url, external_booking_id
        );

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(CORRELATION_HEADER, correlation_id())
            .send()
            .await
            .map_err(|e| AppError::PartnerApi(format!("citydrive state failed: {}", e)))?;

        Self::check_status(&response)?;
        let state: CityDriveStateResponse = response
            .json()
            .await
            .map_err(|e| AppError::PartnerApi(format!("citydrive state parse error: {}", e)))?;

        Ok(state.state)
    }
}
