//! The package check: installed version against the latest upstream one.

use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::{Span, warn};

use crate::dispatch::Checker;
use crate::error::Result;
use crate::model::{Message, Status, WorkKey};
use crate::portage::{Installed, Portage};
use crate::repology::{Ranking, RepologyClient};
use crate::telemetry::check::record_status;
use crate::telemetry::metrics;

/// Which optional statuses are printed, and how.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub color: bool,
    /// Print LIVE BUILD lines instead of skipping live ebuilds.
    pub show_live: bool,
    /// Print NOT INSTALLED lines instead of skipping.
    pub show_offline: bool,
}

pub struct PackageChecker {
    portage: Portage,
    repology: RepologyClient,
    options: OutputOptions,
}

impl PackageChecker {
    pub fn new(portage: Portage, repology: RepologyClient, options: OutputOptions) -> Self {
        Self {
            portage,
            repology,
            options,
        }
    }

    /// Work out the status of `pkg`, or `None` if it should not be printed.
    pub async fn status(&self, pkg: &WorkKey) -> Result<Option<Status>> {
        let installed = match self.portage.installed_version(pkg).await? {
            Installed::NotInstalled => {
                return Ok(self.options.show_offline.then_some(Status::NotInstalled));
            }
            Installed::Live => return Ok(self.options.show_live.then_some(Status::LiveBuild)),
            Installed::Version(version) => version,
        };

        let shortest = match self.repology.latest_version(pkg, Ranking::Shortest).await {
            Ok(Some(version)) => version,
            Ok(None) => return Ok(Some(Status::Unknown)),
            Err(e) => {
                warn!(%pkg, error = %e, "version lookup failed");
                return Ok(Some(Status::Unknown));
            }
        };
        if shortest == installed {
            return Ok(Some(Status::Passed));
        }

        let fuzzy = match self.repology.latest_version(pkg, Ranking::Fuzzy).await {
            Ok(Some(version)) => version,
            Ok(None) => shortest.clone(),
            Err(e) => {
                warn!(%pkg, error = %e, "fuzzy version lookup failed");
                shortest.clone()
            }
        };
        if fuzzy == installed {
            return Ok(Some(Status::Passed));
        }

        let latest = if shortest == fuzzy {
            shortest
        } else {
            format!("{shortest} OR {fuzzy}")
        };
        Ok(Some(Status::Failed { latest }))
    }
}

impl Checker for PackageChecker {
    async fn check(&self, key: &WorkKey) -> Result<Message> {
        let start = Instant::now();
        let status = self.status(key).await;
        let outcome = if status.is_ok() { "ok" } else { "error" };
        metrics::check_duration_ms().record(
            start.elapsed().as_secs_f64() * 1000.0,
            &[KeyValue::new("outcome", outcome)],
        );

        let Some(status) = status? else {
            metrics::packages_checked().add(1, &[KeyValue::new("status", "skipped")]);
            return Ok(Message::Skip);
        };
        record_status(&Span::current(), &status);
        metrics::packages_checked().add(1, &[KeyValue::new("status", status.as_str())]);
        Ok(Message::Line(status.line(key, self.options.color)))
    }
}
