//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración
//! del servicio de despacho: ciudades permitidas, tarifas, ventanas horarias,
//! credenciales de partners y el worker de sincronización.

use rust_decimal::Decimal;
use std::env;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,

    // Reglas de constraint
    pub allowed_origin_cities: Vec<String>,
    pub ev_intercity_max_km: f64,

    // Tarifas
    pub min_billable_km: u32,
    pub rate_per_km: Decimal,
    pub trip_type_mult_airport: Decimal,
    pub trip_type_mult_rental: Decimal,
    pub trip_type_mult_inter_city: Decimal,
    pub advance_booking_mult: Decimal,
    pub standard_booking_mult: Decimal,
    pub vehicle_ev_mult: Decimal,
    pub vehicle_non_ev_mult: Decimal,
    pub advance_booking_hours: i64,

    // Ventanas del ciclo de vida
    pub geofence_radius_m: f64,
    pub start_window_mins: i64,
    pub arrive_window_mins: i64,
    pub no_show_wait_mins: i64,

    // Worker de sincronización de partners
    pub sync_worker_enabled: bool,
    pub sync_worker_interval_secs: u64,

    // Partners
    pub quickcabs_base_url: String,
    pub quickcabs_client_id: String,
    pub quickcabs_client_secret: String,
    pub quickcabs_inbound_user: String,
    pub quickcabs_inbound_password: String,
    pub citydrive_base_url: String,
    pub citydrive_api_key: String,
    pub partner_auth_max_attempts: u32,
    pub partner_auth_backoff_ms: u64,
}

fn required(name: &'static str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("{} must be set", name))
}

fn parsed_or<T: std::str::FromStr>(name: &'static str, default: &str) -> T {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{} must be a valid number", name))
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: required("ENVIRONMENT"),
            port: parsed_or("PORT", "3000"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().to_string())
                .collect(),

            allowed_origin_cities: env::var("ALLOWED_ORIGIN_CITIES")
                .unwrap_or_else(|_| "DELHI,GURGAON,NOIDA".to_string())
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
            ev_intercity_max_km: parsed_or("EV_INTERCITY_MAX_KM", "300"),

            min_billable_km: parsed_or("MIN_BILLABLE_KM", "5"),
            rate_per_km: parsed_or("RATE_PER_KM", "25"),
            trip_type_mult_airport: parsed_or("TRIP_TYPE_MULT_AIRPORT", "1.0"),
            trip_type_mult_rental: parsed_or("TRIP_TYPE_MULT_RENTAL", "1.2"),
            trip_type_mult_inter_city: parsed_or("TRIP_TYPE_MULT_INTER_CITY", "1.15"),
            advance_booking_mult: parsed_or("ADVANCE_BOOKING_MULT", "0.95"),
            standard_booking_mult: parsed_or("STANDARD_BOOKING_MULT", "1.0"),
            vehicle_ev_mult: parsed_or("VEHICLE_EV_MULT", "1.0"),
            vehicle_non_ev_mult: parsed_or("VEHICLE_NON_EV_MULT", "1.1"),
            advance_booking_hours: parsed_or("ADVANCE_BOOKING_HOURS", "24"),

            geofence_radius_m: parsed_or("GEOFENCE_RADIUS_M", "500"),
            start_window_mins: parsed_or("START_WINDOW_MINS", "150"),
            arrive_window_mins: parsed_or("ARRIVE_WINDOW_MINS", "30"),
            no_show_wait_mins: parsed_or("NO_SHOW_WAIT_MINS", "30"),

            sync_worker_enabled: env::var("SYNC_WORKER_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            sync_worker_interval_secs: parsed_or("SYNC_WORKER_INTERVAL_SECS", "120"),

            quickcabs_base_url: required("QUICKCABS_BASE_URL"),
            quickcabs_client_id: required("QUICKCABS_CLIENT_ID"),
            quickcabs_client_secret: required("QUICKCABS_CLIENT_SECRET"),
            quickcabs_inbound_user: required("QUICKCABS_INBOUND_USER"),
            quickcabs_inbound_password: required("QUICKCABS_INBOUND_PASSWORD"),
            citydrive_base_url: required("CITYDRIVE_BASE_URL"),
            citydrive_api_key: required("CITYDRIVE_API_KEY"),
            partner_auth_max_attempts: parsed_or("PARTNER_AUTH_MAX_ATTEMPTS", "3"),
            partner_auth_backoff_ms: parsed_or("PARTNER_AUTH_BACKOFF_MS", "500"),
        }
    }
}

impl EnvironmentConfig {
    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Las credenciales inbound de partners se comparan tal cual contra el header
// Authorization; la emisión de credenciales vive en el colaborador de cuentas.

#[cfg(test)]
pub mod test_support {
    use super::EnvironmentConfig;
    use rust_decimal::Decimal;

    /// Configuración fija para unit tests, sin tocar el entorno del proceso
    pub fn config_fixture() -> EnvironmentConfig {
        EnvironmentConfig {
            environment: "test".to_string(),
            port: 3000,
            host: "127.0.0.1".to_string(),
            cors_origins: vec![],
            allowed_origin_cities: vec![
                "DELHI".to_string(),
                "GURGAON".to_string(),
                "NOIDA".to_string(),
            ],
            ev_intercity_max_km: 300.0,
            min_billable_km: 5,
            rate_per_km: Decimal::new(25, 0),
            trip_type_mult_airport: Decimal::new(10, 1),
            trip_type_mult_rental: Decimal::new(12, 1),
            trip_type_mult_inter_city: Decimal::new(115, 2),
            advance_booking_mult: Decimal::new(95, 2),
            standard_booking_mult: Decimal::new(10, 1),
            vehicle_ev_mult: Decimal::new(10, 1),
            vehicle_non_ev_mult: Decimal::new(11, 1),
            advance_booking_hours: 24,
            geofence_radius_m: 500.0,
            start_window_mins: 150,
            arrive_window_mins: 30,
            no_show_wait_mins: 30,
            sync_worker_enabled: false,
            sync_worker_interval_secs: 120,
            quickcabs_base_url: "http://quickcabs.test".to_string(),
            quickcabs_client_id: "qc-client".to_string(),
            quickcabs_client_secret: "qc-secret".to_string(),
            quickcabs_inbound_user: "quickcabs".to_string(),
            quickcabs_inbound_password: "inbound-secret".to_string(),
            citydrive_base_url: "http://citydrive.test".to_string(),
            citydrive_api_key: "cd-key".to_string(),
            partner_auth_max_attempts: 3,
            partner_auth_backoff_ms: 1,
        }
    }
}
