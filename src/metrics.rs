//! Métricas Prometheus del servicio

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    pub trips_created_total: IntCounter,
    pub assignments_total: IntCounterVec,
    pub sync_cycles_total: IntCounterVec,
    pub sync_trip_updates_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let trips_created_total =
            IntCounter::new("trips_created_total", "Total trips created").expect("valid metric");

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Assignment operations by outcome"),
            &["outcome"],
        )
        .expect("valid metric");

        let sync_cycles_total = IntCounterVec::new(
            Opts::new("sync_cycles_total", "Provider sync worker cycles by outcome"),
            &["outcome"],
        )
        .expect("valid metric");

        let sync_trip_updates_total = IntCounter::new(
            "sync_trip_updates_total",
            "Trips updated from partner status by the sync worker",
        )
        .expect("valid metric");

        registry
            .register(Box::new(trips_created_total.clone()))
            .expect("register trips_created_total");
        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(sync_cycles_total.clone()))
            .expect("register sync_cycles_total");
        registry
            .register(Box::new(sync_trip_updates_total.clone()))
            .expect("register sync_trip_updates_total");

        Self {
            registry,
            trips_created_total,
            assignments_total,
            sync_cycles_total,
            sync_trip_updates_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
