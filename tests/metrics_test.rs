mod common;

use common::{assert_close, SCALED};
use powermeter_exporter::error::ExporterError;
use powermeter_exporter::meter::{MetricSnapshot, Reading};
use powermeter_exporter::metrics::MetricsCollector;
use powermeter_exporter::registers::{PowerUnit, Quantity};

fn snapshot(values: [f64; 8]) -> MetricSnapshot {
    MetricSnapshot::new(
        Quantity::ALL
            .into_iter()
            .zip(values)
            .map(|(quantity, value)| Reading {
                quantity,
                raw: 0,
                value,
            })
            .collect(),
    )
}

#[test]
fn test_metrics_registration() {
    let metrics = MetricsCollector::new("powermeter", PowerUnit::Watt)
        .expect("Failed to create metrics collector");

    let output = metrics.render().expect("Failed to render metrics");

    for name in [
        "powermeter_frequency_hz",
        "powermeter_voltage_l1_v",
        "powermeter_current_l1_a",
        "powermeter_power_active_w",
        "powermeter_power_reactive_var",
        "powermeter_power_apparent_va",
        "powermeter_power_factor",
        "powermeter_energy_total_kwh",
        "powermeter_up",
        "powermeter_poll_failures_total",
    ] {
        assert!(output.contains(name), "Missing {} metric", name);
    }
}

#[test]
fn test_custom_namespace_and_kilowatt_names() {
    let metrics = MetricsCollector::new("meter2", PowerUnit::Kilowatt).unwrap();

    let output = metrics.render().unwrap();
    assert!(output.contains("meter2_power_active_kw"));
    assert!(output.contains("meter2_power_reactive_kvar"));
    assert!(output.contains("meter2_power_apparent_kva"));
    assert!(!output.contains("powermeter_"));
}

#[test]
fn test_publish_sets_every_gauge() {
    let metrics = MetricsCollector::default();

    metrics.publish(&snapshot(SCALED));

    for (quantity, expected) in Quantity::ALL.into_iter().zip(SCALED) {
        assert_close(metrics.gauge(quantity).get(), expected);
    }
    assert_eq!(metrics.up.get(), 1.0);

    let rendered = metrics.render().unwrap();
    assert!(rendered.contains("powermeter_frequency_hz 50.14"));
    assert!(rendered.contains("powermeter_up 1"));
}

#[test]
fn test_second_publish_overwrites_all_values() {
    let metrics = MetricsCollector::default();
    let second = [49.9, 229.0, 1.0, 10.0, 20.0, 30.0, 0.5, 99.0];

    metrics.publish(&snapshot(SCALED));
    metrics.publish(&snapshot(second));

    for (quantity, expected) in Quantity::ALL.into_iter().zip(second) {
        assert_close(metrics.gauge(quantity).get(), expected);
    }
}

#[test]
fn test_record_failure_keeps_published_values() {
    let metrics = MetricsCollector::default();
    metrics.publish(&snapshot(SCALED));

    metrics.record_failure();
    metrics.record_failure();

    for (quantity, expected) in Quantity::ALL.into_iter().zip(SCALED) {
        assert_close(metrics.gauge(quantity).get(), expected);
    }
    assert_eq!(metrics.up.get(), 0.0);
    assert_eq!(metrics.poll_failures.get(), 2);
}

#[test]
fn test_collectors_are_independent() {
    // Each collector owns its registry; nothing is shared process-wide
    let a = MetricsCollector::default();
    let b = MetricsCollector::default();

    a.publish(&snapshot(SCALED));

    assert_close(a.frequency.get(), 50.14);
    assert_eq!(b.frequency.get(), 0.0);
}

#[test]
fn test_metrics_rendering_is_stable() {
    let metrics = MetricsCollector::default();
    metrics.publish(&snapshot(SCALED));

    let render1 = metrics.render().expect("First render failed");
    let render2 = metrics.render().expect("Second render failed");

    assert_eq!(render1, render2, "Metrics rendering is not stable");
}

#[test]
fn test_invalid_namespace_is_rejected() {
    // Given: A namespace that is not a valid metric name prefix
    let result = MetricsCollector::new("power meter", PowerUnit::Watt);

    // Then: Construction fails with a metrics error naming the cause
    match result {
        Err(error @ ExporterError::Metrics(_)) => {
            assert!(error.to_string().contains("Metrics error"));
            assert!(!error.is_connection());
        }
        Err(other) => panic!("expected a metrics error, got {}", other),
        Ok(_) => panic!("invalid namespace was accepted"),
    }
}
