//! Constraint engine
//!
//! Evaluador puro de reglas de negocio: dada la solicitud de un viaje decide
//! permitir o denegar, con una razón apta para mostrar al usuario. Sin I/O.
//! Las denegaciones normales nunca son errores; el enum cerrado de tipos de
//! viaje hace irrepresentable un tipo no soportado.

use chrono::{DateTime, Duration, FixedOffset, Utc};

use crate::config::environment::EnvironmentConfig;
use crate::models::trip::{TripType, VehicleClass};

/// Las ventanas de reserva se evalúan en hora local de operación (IST)
fn operating_tz() -> FixedOffset {
    FixedOffset::east_opt(5 * 3600 + 30 * 60).expect("IST offset is valid")
}

/// Configuración del constraint engine
#[derive(Debug, Clone)]
pub struct ConstraintConfig {
    pub allowed_origin_cities: Vec<String>,
    pub ev_intercity_max_km: f64,
    /// Fuera de producción la ventana de reserva se relaja a "al menos un
    /// minuto en el futuro" para no bloquear pruebas.
    pub relaxed_booking_window: bool,
}

impl ConstraintConfig {
    pub fn from_environment(config: &EnvironmentConfig) -> Self {
        Self {
            allowed_origin_cities: config.allowed_origin_cities.clone(),
            ev_intercity_max_km: config.ev_intercity_max_km,
            relaxed_booking_window: !config.is_production(),
        }
    }
}

/// Atributos del viaje a validar
#[derive(Debug, Clone)]
pub struct ConstraintInput<'a> {
    pub trip_type: TripType,
    pub origin_city: &'a str,
    pub pickup_time: DateTime<Utc>,
    pub now: DateTime<Utc>,
    pub distance_km: f64,
    pub vehicle_class: VehicleClass,
    pub is_prebooked: bool,
}

/// Veredicto del engine
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintVerdict {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl ConstraintVerdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: String) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Valida la solicitud de un viaje contra las reglas de negocio
pub fn validate(config: &ConstraintConfig, input: &ConstraintInput<'_>) -> ConstraintVerdict {
    let origin = input.origin_city.trim();
    let city_allowed = config
        .allowed_origin_cities
        .iter()
        .any(|city| city.eq_ignore_ascii_case(origin));

    if !city_allowed {
        return ConstraintVerdict::deny(format!(
            "trips can only originate from: {}",
            config.allowed_origin_cities.join(", ")
        ));
    }

    match input.trip_type {
        TripType::Airport | TripType::Rental => booking_window_rule(config, input),
        TripType::InterCity => inter_city_rule(config, input),
    }
}

/// AIRPORT y RENTAL exigen pre-reserva con pickup en o después de las 04:00
/// del día calendario siguiente (hora de operación).
fn booking_window_rule(config: &ConstraintConfig, input: &ConstraintInput<'_>) -> ConstraintVerdict {
    if !input.is_prebooked {
        return ConstraintVerdict::deny(format!(
            "{} trips must be pre-booked in advance",
            input.trip_type
        ));
    }

    if config.relaxed_booking_window {
        if input.pickup_time >= input.now + Duration::minutes(1) {
            return ConstraintVerdict::allow();
        }
        return ConstraintVerdict::deny(format!(
            "{} trips must be booked at least 1 minute ahead",
            input.trip_type
        ));
    }

    let boundary = next_day_four_am(input.now);
    if input.pickup_time >= boundary {
        ConstraintVerdict::allow()
    } else {
        ConstraintVerdict::deny(format!(
            "{} trips must be booked for 04:00 or later of the next day (earliest allowed pickup: {})",
            input.trip_type,
            boundary
                .with_timezone(&operating_tz())
                .format("%Y-%m-%d %H:%M")
        ))
    }
}

/// Los viajes INTER_CITY largos no se permiten en vehículos eléctricos
fn inter_city_rule(config: &ConstraintConfig, input: &ConstraintInput<'_>) -> ConstraintVerdict {
    if input.vehicle_class.is_electric() && input.distance_km > config.ev_intercity_max_km {
        return ConstraintVerdict::deny(format!(
            "electric vehicles cannot serve inter-city trips over {} km",
            config.ev_intercity_max_km
        ));
    }
    ConstraintVerdict::allow()
}

/// Las 04:00 del día calendario siguiente a "ahora", en hora de operación
fn next_day_four_am(now: DateTime<Utc>) -> DateTime<Utc> {
    let local_now = now.with_timezone(&operating_tz());
    let next_day = local_now.date_naive() + Duration::days(1);
    next_day
        .and_hms_opt(4, 0, 0)
        .expect("04:00:00 is a valid time")
        .and_local_timezone(operating_tz())
        .single()
        .expect("04:00 IST is unambiguous")
        .with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> ConstraintConfig {
        ConstraintConfig {
            allowed_origin_cities: vec![
                "DELHI".to_string(),
                "GURGAON".to_string(),
                "NOIDA".to_string(),
            ],
            ev_intercity_max_km: 300.0,
            relaxed_booking_window: false,
        }
    }

    fn input_at<'a>(
        trip_type: TripType,
        origin: &'a str,
        now: DateTime<Utc>,
        pickup: DateTime<Utc>,
    ) -> ConstraintInput<'a> {
        ConstraintInput {
            trip_type,
            origin_city: origin,
            pickup_time: pickup,
            now,
            distance_km: 30.0,
            vehicle_class: VehicleClass::Sedan,
            is_prebooked: true,
        }
    }

    // 2025-03-10 12:00 IST => frontera 2025-03-11 04:00 IST = 2025-03-10 22:30 UTC
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 6, 30, 0).unwrap()
    }

    fn boundary() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 22, 30, 0).unwrap()
    }

    #[test]
    fn airport_pickup_at_exact_boundary_is_allowed() {
        let verdict = validate(
            &config(),
            &input_at(TripType::Airport, "DELHI", fixed_now(), boundary()),
        );
        assert!(verdict.allowed);
    }

    #[test]
    fn airport_pickup_one_second_before_boundary_is_denied_naming_it() {
        let pickup = boundary() - Duration::seconds(1);
        let verdict = validate(
            &config(),
            &input_at(TripType::Airport, "DELHI", fixed_now(), pickup),
        );
        assert!(!verdict.allowed);
        let reason = verdict.reason.unwrap();
        assert!(reason.contains("04:00"), "reason should name the boundary: {}", reason);
    }

    #[test]
    fn unknown_origin_city_is_denied_naming_allowed_cities() {
        let verdict = validate(
            &config(),
            &input_at(TripType::Airport, "MUMBAI", fixed_now(), boundary()),
        );
        assert!(!verdict.allowed);
        let reason = verdict.reason.unwrap();
        assert!(reason.contains("DELHI"));
        assert!(reason.contains("NOIDA"));
    }

    #[test]
    fn origin_city_match_is_case_insensitive() {
        let verdict = validate(
            &config(),
            &input_at(TripType::Airport, "delhi", fixed_now(), boundary()),
        );
        assert!(verdict.allowed);
    }

    #[test]
    fn rental_without_prebooking_is_denied() {
        let mut input = input_at(TripType::Rental, "DELHI", fixed_now(), boundary());
        input.is_prebooked = false;
        let verdict = validate(&config(), &input);
        assert!(!verdict.allowed);
        assert!(verdict.reason.unwrap().contains("pre-booked"));
    }

    #[test]
    fn relaxed_mode_allows_near_term_pickups() {
        let mut cfg = config();
        cfg.relaxed_booking_window = true;
        let now = fixed_now();
        let verdict = validate(
            &cfg,
            &input_at(TripType::Airport, "DELHI", now, now + Duration::minutes(5)),
        );
        assert!(verdict.allowed);

        let verdict = validate(
            &cfg,
            &input_at(TripType::Airport, "DELHI", now, now + Duration::seconds(30)),
        );
        assert!(!verdict.allowed);
    }

    #[test]
    fn long_inter_city_trips_are_denied_for_electric_vehicles() {
        let mut input = input_at(TripType::InterCity, "DELHI", fixed_now(), boundary());
        input.vehicle_class = VehicleClass::Electric;
        input.distance_km = 450.0;
        let verdict = validate(&config(), &input);
        assert!(!verdict.allowed);
        assert!(verdict.reason.unwrap().contains("300"));

        input.vehicle_class = VehicleClass::Suv;
        let verdict = validate(&config(), &input);
        assert!(verdict.allowed);
    }

    #[test]
    fn short_inter_city_trips_are_fine_for_electric_vehicles() {
        let mut input = input_at(TripType::InterCity, "NOIDA", fixed_now(), boundary());
        input.vehicle_class = VehicleClass::Electric;
        input.distance_km = 120.0;
        assert!(validate(&config(), &input).allowed);
    }
}
