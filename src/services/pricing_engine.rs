//! Pricing engine
//!
//! Cálculo puro y determinista de tarifas. La distancia facturable es el
//! techo de la distancia real con un mínimo configurado; sobre la tarifa
//! base se aplican en secuencia el multiplicador por tipo de viaje, el del
//! bucket de anticipación de la reserva y el de clase de vehículo. El
//! desglose expone cada factor para auditoría.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::config::environment::EnvironmentConfig;
use crate::models::trip::{TripType, VehicleClass};

/// Configuración del pricing engine
#[derive(Debug, Clone)]
pub struct PricingConfig {
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
}

impl PricingConfig {
    pub fn from_environment(config: &EnvironmentConfig) -> Self {
        Self {
            min_billable_km: config.min_billable_km,
            rate_per_km: config.rate_per_km,
            trip_type_mult_airport: config.trip_type_mult_airport,
            trip_type_mult_rental: config.trip_type_mult_rental,
            trip_type_mult_inter_city: config.trip_type_mult_inter_city,
            advance_booking_mult: config.advance_booking_mult,
            standard_booking_mult: config.standard_booking_mult,
            vehicle_ev_mult: config.vehicle_ev_mult,
            vehicle_non_ev_mult: config.vehicle_non_ev_mult,
            advance_booking_hours: config.advance_booking_hours,
        }
    }
}

/// Input del cálculo de tarifa
#[derive(Debug, Clone)]
pub struct FareInput {
    pub distance_km: f64,
    pub trip_type: TripType,
    pub pickup_time: DateTime<Utc>,
    pub booking_time: DateTime<Utc>,
    pub vehicle_class: VehicleClass,
}

/// Desglose completo de la tarifa calculada
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FareBreakdown {
    pub billable_km: i32,
    pub rate_per_km: Decimal,
    pub base_fare: Decimal,
    pub trip_type_multiplier: Decimal,
    pub booking_multiplier: Decimal,
    pub vehicle_multiplier: Decimal,
    pub final_fare: Decimal,
}

/// Calcula la tarifa de un viaje. Determinista: mismos inputs, mismo desglose.
pub fn calculate_fare(config: &PricingConfig, input: &FareInput) -> FareBreakdown {
    let billable_km = (input.distance_km.ceil() as i64).max(i64::from(config.min_billable_km)) as i32;

    let base_fare = Decimal::from(billable_km) * config.rate_per_km;

    let trip_type_multiplier = match input.trip_type {
        TripType::Airport => config.trip_type_mult_airport,
        TripType::Rental => config.trip_type_mult_rental,
        TripType::InterCity => config.trip_type_mult_inter_city,
    };

    let advance_window = Duration::hours(config.advance_booking_hours);
    let booking_multiplier = if input.pickup_time - input.booking_time >= advance_window {
        config.advance_booking_mult
    } else {
        config.standard_booking_mult
    };

    let vehicle_multiplier = if input.vehicle_class.is_electric() {
        config.vehicle_ev_mult
    } else {
        config.vehicle_non_ev_mult
    };

    let final_fare = (base_fare * trip_type_multiplier * booking_multiplier * vehicle_multiplier)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    FareBreakdown {
        billable_km,
        rate_per_km: config.rate_per_km,
        base_fare,
        trip_type_multiplier,
        booking_multiplier,
        vehicle_multiplier,
        final_fare,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> PricingConfig {
        PricingConfig {
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
        }
    }

    fn booking_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap()
    }

    #[test]
    fn airport_trip_with_advance_booking_matches_expected_fare() {
        // 30 km, no-EV, reservado con más de 24h: 30×25×1.0×0.95×1.1 = 783.75 → 784
        let input = FareInput {
            distance_km: 30.0,
            trip_type: TripType::Airport,
            pickup_time: booking_time() + Duration::hours(30),
            booking_time: booking_time(),
            vehicle_class: VehicleClass::Sedan,
        };

        let fare = calculate_fare(&config(), &input);
        assert_eq!(fare.billable_km, 30);
        assert_eq!(fare.base_fare, Decimal::new(750, 0));
        assert_eq!(fare.booking_multiplier, Decimal::new(95, 2));
        assert_eq!(fare.final_fare, Decimal::new(784, 0));
    }

    #[test]
    fn short_trips_bill_the_minimum_distance() {
        let input = FareInput {
            distance_km: 2.3,
            trip_type: TripType::Airport,
            pickup_time: booking_time() + Duration::hours(2),
            booking_time: booking_time(),
            vehicle_class: VehicleClass::Sedan,
        };

        let fare = calculate_fare(&config(), &input);
        assert_eq!(fare.billable_km, 5);
        assert_eq!(fare.base_fare, Decimal::new(125, 0));
    }

    #[test]
    fn fractional_distance_rounds_up_before_billing() {
        let input = FareInput {
            distance_km: 30.2,
            trip_type: TripType::Airport,
            pickup_time: booking_time() + Duration::hours(2),
            booking_time: booking_time(),
            vehicle_class: VehicleClass::Sedan,
        };

        assert_eq!(calculate_fare(&config(), &input).billable_km, 31);
    }

    #[test]
    fn booking_bucket_boundary_is_inclusive_at_exactly_24_hours() {
        let exactly = FareInput {
            distance_km: 30.0,
            trip_type: TripType::Airport,
            pickup_time: booking_time() + Duration::hours(24),
            booking_time: booking_time(),
            vehicle_class: VehicleClass::Sedan,
        };
        assert_eq!(
            calculate_fare(&config(), &exactly).booking_multiplier,
            Decimal::new(95, 2)
        );

        let just_under = FareInput {
            pickup_time: booking_time() + Duration::hours(24) - Duration::seconds(1),
            ..exactly
        };
        assert_eq!(
            calculate_fare(&config(), &just_under).booking_multiplier,
            Decimal::new(10, 1)
        );
    }

    #[test]
    fn electric_vehicles_skip_the_non_ev_surcharge() {
        let input = FareInput {
            distance_km: 100.0,
            trip_type: TripType::InterCity,
            pickup_time: booking_time() + Duration::hours(2),
            booking_time: booking_time(),
            vehicle_class: VehicleClass::Electric,
        };

        let fare = calculate_fare(&config(), &input);
        assert_eq!(fare.vehicle_multiplier, Decimal::new(10, 1));
        // 100×25×1.15×1.0×1.0 = 2875
        assert_eq!(fare.final_fare, Decimal::new(2875, 0));
    }

    #[test]
    fn pricing_is_deterministic() {
        let input = FareInput {
            distance_km: 47.8,
            trip_type: TripType::Rental,
            pickup_time: booking_time() + Duration::hours(36),
            booking_time: booking_time(),
            vehicle_class: VehicleClass::Suv,
        };

        let first = calculate_fare(&config(), &input);
        let second = calculate_fare(&config(), &input);
        assert_eq!(first, second);
    }
}
