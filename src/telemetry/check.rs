//! Package check span helpers.

use tracing::Span;

use crate::model::{Seq, Status, WorkKey};

/// Start a span covering one package check.
///
/// The `check.status` field is declared empty and filled in by
/// [`record_status`] once the outcome is known.
pub fn start_check_span(key: &WorkKey, seq: Seq) -> Span {
    tracing::info_span!(
        "check.package",
        "check.package" = %key,
        "check.seq" = seq.0,
        "check.status" = tracing::field::Empty,
    )
}

/// Record the outcome of a check on `span` and emit a debug event.
pub fn record_status(span: &Span, status: &Status) {
    span.record("check.status", status.as_str());
    span.in_scope(|| {
        tracing::debug!(status = status.as_str(), "package checked");
    });
}
