//! Prometheus Metrics Definitions
//!
//! This module owns the metric sink the poll cycle publishes into: one
//! Prometheus registry per process, holding a gauge per meter quantity and two
//! bridge health metrics.
//!
//! # Metrics
//!
//! With the default `powermeter` namespace and `watt` power unit:
//!
//! - `powermeter_frequency_hz`
//! - `powermeter_voltage_l1_v`
//! - `powermeter_current_l1_a`
//! - `powermeter_power_active_w`
//! - `powermeter_power_reactive_var`
//! - `powermeter_power_apparent_va`
//! - `powermeter_power_factor`
//! - `powermeter_energy_total_kwh`
//! - `powermeter_up` - 1 if the last poll succeeded, 0 otherwise
//! - `powermeter_poll_failures_total` - failed poll cycles since start
//!
//! # Consistency
//!
//! [`MetricsCollector::publish`] and [`MetricsCollector::render`] exclude each
//! other, so a scrape sees either all gauges of one snapshot or all gauges of
//! the next, never a mix.

use crate::error::Result;
use crate::meter::MetricSnapshot;
use crate::registers::{PowerUnit, Quantity};
use parking_lot::RwLock;
use prometheus::{Encoder, Gauge, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;

pub const DEFAULT_NAMESPACE: &str = "powermeter";

/// Metrics collector for the power meter
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,
    publish_lock: Arc<RwLock<()>>,

    // Meter quantities
    pub frequency: Arc<Gauge>,
    pub voltage_l1: Arc<Gauge>,
    pub current_l1: Arc<Gauge>,
    pub active_power_l1: Arc<Gauge>,
    pub reactive_power_l1: Arc<Gauge>,
    pub apparent_power_l1: Arc<Gauge>,
    pub power_factor_l1: Arc<Gauge>,
    pub energy_total: Arc<Gauge>,

    // Bridge health
    pub up: Arc<Gauge>,
    pub poll_failures: Arc<IntCounter>,
}

impl MetricsCollector {
    pub fn new(namespace: &str, power_unit: PowerUnit) -> Result<Self> {
        let registry = Registry::new();

        let gauge = |quantity: Quantity| -> Result<Gauge> {
            let gauge = Gauge::with_opts(
                Opts::new(quantity.metric_name(power_unit), quantity.help(power_unit))
                    .namespace(namespace),
            )?;
            registry.register(Box::new(gauge.clone()))?;
            Ok(gauge)
        };

        let frequency = gauge(Quantity::Frequency)?;
        let voltage_l1 = gauge(Quantity::VoltageL1)?;
        let current_l1 = gauge(Quantity::CurrentL1)?;
        let active_power_l1 = gauge(Quantity::ActivePowerL1)?;
        let reactive_power_l1 = gauge(Quantity::ReactivePowerL1)?;
        let apparent_power_l1 = gauge(Quantity::ApparentPowerL1)?;
        let power_factor_l1 = gauge(Quantity::PowerFactorL1)?;
        let energy_total = gauge(Quantity::EnergyTotal)?;

        let up = Gauge::with_opts(
            Opts::new("up", "Whether the last poll of the power meter succeeded")
                .namespace(namespace),
        )?;
        registry.register(Box::new(up.clone()))?;

        let poll_failures = IntCounter::with_opts(
            Opts::new(
                "poll_failures_total",
                "Number of poll cycles aborted by a connection or read failure",
            )
            .namespace(namespace),
        )?;
        registry.register(Box::new(poll_failures.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            publish_lock: Arc::new(RwLock::new(())),
            frequency: Arc::new(frequency),
            voltage_l1: Arc::new(voltage_l1),
            current_l1: Arc::new(current_l1),
            active_power_l1: Arc::new(active_power_l1),
            reactive_power_l1: Arc::new(reactive_power_l1),
            apparent_power_l1: Arc::new(apparent_power_l1),
            power_factor_l1: Arc::new(power_factor_l1),
            energy_total: Arc::new(energy_total),
            up: Arc::new(up),
            poll_failures: Arc::new(poll_failures),
        })
    }

    /// Gauge slot for a quantity
    pub fn gauge(&self, quantity: Quantity) -> &Gauge {
        match quantity {
            Quantity::Frequency => &self.frequency,
            Quantity::VoltageL1 => &self.voltage_l1,
            Quantity::CurrentL1 => &self.current_l1,
            Quantity::ActivePowerL1 => &self.active_power_l1,
            Quantity::ReactivePowerL1 => &self.reactive_power_l1,
            Quantity::ApparentPowerL1 => &self.apparent_power_l1,
            Quantity::PowerFactorL1 => &self.power_factor_l1,
            Quantity::EnergyTotal => &self.energy_total,
        }
    }

    /// Replace the exposed values with those of `snapshot`.
    pub fn publish(&self, snapshot: &MetricSnapshot) {
        let _guard = self.publish_lock.write();
        for reading in snapshot.readings() {
            self.gauge(reading.quantity).set(reading.value);
        }
        self.up.set(1.0);
    }

    /// Mark a failed poll. Quantity gauges keep their last published values.
    pub fn record_failure(&self) {
        self.up.set(0.0);
        self.poll_failures.inc();
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = {
            let _guard = self.publish_lock.read();
            self.registry.gather()
        };
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE, PowerUnit::default())
            .expect("Failed to create metrics collector")
    }
}
