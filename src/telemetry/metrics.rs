//! Metric instrument factories for ebvcheck.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an OTLP endpoint the global provider is a no-op.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("ebvcheck")
}

/// Counter: packages checked.
/// Labels: `status` ("passed" | "failed" | "unknown" | ...).
pub fn packages_checked() -> Counter<u64> {
    meter()
        .u64_counter("ebvcheck.packages.checked")
        .with_description("Number of packages checked, by status")
        .build()
}

/// Counter: repology requests retried after a timeout or connect error.
pub fn lookup_retries() -> Counter<u64> {
    meter()
        .u64_counter("ebvcheck.lookup.retries")
        .with_description("Number of retried version lookups")
        .build()
}

/// Histogram: duration of one package check in milliseconds.
/// Labels: `outcome` ("ok" | "error").
pub fn check_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("ebvcheck.check.duration_ms")
        .with_description("Package check duration in milliseconds")
        .with_unit("ms")
        .build()
}
