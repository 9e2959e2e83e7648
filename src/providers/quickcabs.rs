//! Adapter de QuickCabs
//!
//! Partner externo con API JSON autenticada por bearer token
//! (client_credentials). El token se cachea por instancia y se refresca de
//! forma transparente; ver token_cache. QuickCabs reserva de inmediato:
//! prebook devuelve un booking id utilizable para cancelar, trackear y
//! consultar estado.

use async_trait::async_trait;
use lazy_static::lazy_static;
use serde::Deserialize;
use serde_json::json;

use crate::config::environment::EnvironmentConfig;
use crate::models::trip::{GeoPoint, ProviderType, TripStatus};
use crate::utils::errors::{AppError, AppResult};

use super::token_cache::{FreshToken, TokenCache};
use super::{
    correlation_id, ConfirmPaymentInput, DispatchMode, FareOption, FareSearchInput, PrebookInput,
    PrebookOutcome, SupplyProvider, TrackingInfo, TrackingInput, CORRELATION_HEADER,
};

lazy_static! {
    /// Vocabulario de estados de QuickCabs → estado interno del viaje
    static ref QUICKCABS_STATUS_MAP: Vec<(&'static str, TripStatus)> = vec![
        ("ALLOTTED", TripStatus::DriverAssigned),
        ("DRIVER_ALLOTTED", TripStatus::DriverAssigned),
        ("TRIP_STARTED", TripStatus::Started),
        ("COMPLETED", TripStatus::Completed),
        ("CANCELLED", TripStatus::Cancelled),
        ("NO_SHOW", TripStatus::NoShow),
    ];
}

pub struct QuickCabsProvider {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    token_cache: TokenCache,
}

#[derive(Debug, Deserialize)]
struct QuickCabsTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct QuickCabsQuoteResponse {
    options: Vec<QuickCabsQuoteOption>,
}

#[derive(Debug, Deserialize)]
struct QuickCabsQuoteOption {
    fare: rust_decimal::Decimal,
    currency: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuickCabsBookingResponse {
    booking_id: String,
}

#[derive(Debug, Deserialize)]
struct QuickCabsStatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct QuickCabsTrackResponse {
    source: GeoPoint,
    destination: GeoPoint,
    live: Option<GeoPoint>,
}

impl QuickCabsProvider {
    pub fn new(client: reqwest::Client, config: &EnvironmentConfig) -> Self {
        Self {
            client,
            base_url: config.quickcabs_base_url.trim_end_matches('/').to_string(),
            client_id: config.quickcabs_client_id.clone(),
            client_secret: config.quickcabs_client_secret.clone(),
            token_cache: TokenCache::new(
                config.partner_auth_max_attempts,
                config.partner_auth_backoff_ms,
            ),
        }
    }

    async fn fetch_token(&self) -> AppResult<FreshToken> {
        let url = format!("{}/oauth/token", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(CORRELATION_HEADER, correlation_id())
            .json(&json!({
                "grant_type": "client_credentials",
                "client_id": self.client_id,
                "client_secret": self.client_secret,
            }))
            .send()
            .await
            .map_err(|e| AppError::PartnerApi(format!("quickcabs token request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::PartnerApi(format!(
                "quickcabs token endpoint returned {}",
                response.status()
            )));
        }

        let token: QuickCabsTokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::PartnerApi(format!("quickcabs token parse error: {}", e)))?;

        Ok(FreshToken {
            token: token.access_token,
            expires_in_secs: token.expires_in,
        })
    }

    async fn bearer_token(&self) -> AppResult<String> {
        self.token_cache
            .get_or_refresh(|| self.fetch_token())
            .await
    }

    /// Interpreta la respuesta del partner: 401 invalida el token cacheado,
    /// el resto de los no-2xx se reporta como error de API del partner.
    async fn check_response(&self, response: reqwest::Response) -> AppResult<reqwest::Response> {
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.token_cache.invalidate().await;
            return Err(AppError::PartnerApi(
                "quickcabs rejected the bearer token".to_string(),
            ));
        }
        if !response.status().is_success() {
            return Err(AppError::PartnerApi(format!(
                "quickcabs returned {}",
                response.status()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl SupplyProvider for QuickCabsProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::QuickCabs
    }

    fn dispatch_mode(&self) -> DispatchMode {
        DispatchMode::Immediate
    }

    fn status_map(&self) -> &'static [(&'static str, TripStatus)] {
        &QUICKCABS_STATUS_MAP
    }

    async fn search_fare(&self, input: &FareSearchInput) -> AppResult<Vec<FareOption>> {
        let token = self.bearer_token().await?;
        let url = format!("{}/partner/v1/quotes", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(CORRELATION_HEADER, correlation_id())
            .json(&json!({
                "tripType": input.trip_type,
                "vehicleClass": input.vehicle_class,
                "distanceKm": input.distance_km,
                "pickupTime": input.pickup_time,
            }))
            .send()
            .await
            .map_err(|e| AppError::PartnerApi(format!("quickcabs quote failed: {}", e)))?;

        let quote: QuickCabsQuoteResponse = self
            .check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::PartnerApi(format!("quickcabs quote parse error: {}", e)))?;

        Ok(quote
            .options
            .into_iter()
            .map(|o| FareOption {
                provider: ProviderType::QuickCabs,
                fare: o.fare,
                currency: o.currency,
            })
            .collect())
    }

    async fn prebook(&self, input: &PrebookInput) -> AppResult<PrebookOutcome> {
        let token = self.bearer_token().await?;
        let url = format!("{}/partner/v1/bookings", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(CORRELATION_HEADER, correlation_id())
            .json(&json!({
                "partnerTripRef": input.trip_id,
                "tripType": input.trip_type,
                "originCity": input.origin_city,
                "destinationCity": input.destination_city,
                "pickupLocation": input.pickup_location,
                "pickup": input.pickup,
                "drop": input.drop,
                "pickupTime": input.pickup_time,
                "distanceKm": input.distance_km,
                "vehicleClass": input.vehicle_class,
                "quotedFare": input.price,
            }))
            .send()
            .await
            .map_err(|e| AppError::PartnerApi(format!("quickcabs prebook failed: {}", e)))?;

        let raw: serde_json::Value = self
            .check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::PartnerApi(format!("quickcabs prebook parse error: {}", e)))?;

        let booking: QuickCabsBookingResponse = serde_json::from_value(raw.clone())
            .map_err(|e| AppError::PartnerApi(format!("quickcabs prebook missing bookingId: {}", e)))?;

        Ok(PrebookOutcome {
            provider: ProviderType::QuickCabs,
            external_booking_id: booking.booking_id,
            raw_payload: raw,
        })
    }

    async fn confirm_payment(&self, input: &ConfirmPaymentInput) -> AppResult<()> {
        let token = self.bearer_token().await?;
        let url = format!(
            "{}/partner/v1/bookings/{}/confirm-payment",
            self.base_url, input.external_booking_id
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(CORRELATION_HEADER, correlation_id())
            .json(&json!({ "amount": input.amount }))
            .send()
            .await
            .map_err(|e| AppError::PartnerApi(format!("quickcabs confirm-payment failed: {}", e)))?;

        self.check_response(response).await?;
        Ok(())
    }

    async fn cancel_booking(&self, external_booking_id: &str) -> AppResult<()> {
        let token = self.bearer_token().await?;
        let url = format!(
            "{}/partner/v1/bookings/{}/cancel",
            self.base_url, external_booking_id
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(CORRELATION_HEADER, correlation_id())
            .send()
            .await
            .map_err(|e| AppError::PartnerApi(format!("quickcabs cancel failed: {}", e)))?;

        self.check_response(response).await?;
        Ok(())
    }

    async fn get_booking_details(&self, external_booking_id: &str) -> AppResult<serde_json::Value> {
        let token = self.bearer_token().await?;
        let url = format!(
            "{}/partner/v1/bookings/{}",
            self.base_url, external_booking_id
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(CORRELATION_HEADER, correlation_id())
            .send()
            .await
            .map_err(|e| AppError::PartnerApi(format!("quickcabs details failed: {}", e)))?;

        let raw = self
            .check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::PartnerApi(format!("quickcabs details parse error: {}", e)))?;

        Ok(raw)
    }

    async fn track_ride(&self, input: &TrackingInput) -> AppResult<TrackingInfo> {
        let booking_id = input.external_booking_id.as_deref().ok_or_else(|| {
            AppError::BadRequest("trip has no external booking to track".to_string())
        })?;

        let token = self.bearer_token().await?;
        let url = format!("{}/partner/v1/bookings/{}/track", self.base_url, booking_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(CORRELATION_HEADER, correlation_id())
            .send()
            .await
            .map_err(|e| AppError::PartnerApi(format!("quickcabs track failed: {}", e)))?;

        let track: QuickCabsTrackResponse = self
            .check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::PartnerApi(format!("quickcabs track parse error: {}", e)))?;

        Ok(TrackingInfo {
            source: track.source,
            destination: track.destination,
            live: track.live,
        })
    }

    async fn get_ride_status(&self, external_booking_id: &str) -> AppResult<String> {
        let token = self.bearer_token().await?;
        let url = format!(
            "{}/partner/v1/bookings/{}/status",
            self.base_url, external_booking_id
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(CORRELATION_HEADER, correlation_id())
            .send()
            .await
            .map_err(|e| AppError::PartnerApi(format!("quickcabs status failed: {}", e)))?;

        let status: QuickCabsStatusResponse = self
            .check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::PartnerApi(format!("quickcabs status parse error: {}", e)))?;

        Ok(status.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> QuickCabsProvider {
        let config = test_config();
        QuickCabsProvider::new(reqwest::Client::new(), &config)
    }

    fn test_config() -> EnvironmentConfig {
        crate::config::environment::test_support::config_fixture()
    }

    #[test]
    fn partner_statuses_map_to_internal_vocabulary() {
        let adapter = adapter();
        assert_eq!(
            adapter.map_partner_status("completed"),
            Some(TripStatus::Completed)
        );
        assert_eq!(
            adapter.map_partner_status(" TRIP_STARTED "),
            Some(TripStatus::Started)
        );
        assert_eq!(adapter.map_partner_status("SOME_PARTNER_NOISE"), None);
    }
}
