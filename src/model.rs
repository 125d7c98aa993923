//! Core data model.
//!
//! A work key names one package to check. Admission hands it a sequence
//! number, and the worker that checks it produces a message that is
//! released to the output in sequence order.

use std::path::Path;
use std::sync::LazyLock;

use anstyle::{AnsiColor, Style};
use regex::Regex;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Work key
// ---------------------------------------------------------------------------

/// Identifies one unit of batch work, e.g. `dev-python/foo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkKey(String);

impl WorkKey {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::Other("work key must not be empty".to_string()));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The package name without its category (`dev-python/foo` -> `foo`).
    pub fn bare_name(&self) -> &str {
        match self.0.split_once('/') {
            Some((_, name)) => name,
            None => &self.0,
        }
    }
}

impl std::fmt::Display for WorkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Sequence number
// ---------------------------------------------------------------------------

/// Dense admission-order sequence number. The first admitted key gets 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Seq(pub u64);

impl std::fmt::Display for Seq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// What a finished worker hands to the release buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A status line to print.
    Line(String),
    /// Nothing to print, but the slot still has to be released.
    Skip,
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Outcome of checking one package against the upstream version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Passed,
    /// Installed version is behind. `latest` may read `A OR B`.
    Failed { latest: String },
    /// No upstream version could be determined.
    Unknown,
    NotInstalled,
    /// Installed from a 9999 ebuild.
    LiveBuild,
    Error(String),
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Passed => "passed",
            Status::Failed { .. } => "failed",
            Status::Unknown => "unknown",
            Status::NotInstalled => "not_installed",
            Status::LiveBuild => "live_build",
            Status::Error(_) => "error",
        }
    }

    pub fn label(&self) -> String {
        match self {
            Status::Passed => "PASSED".to_string(),
            Status::Failed { latest } => format!("FAILED  (New Version: {latest})"),
            Status::Unknown => "UNKNOWN".to_string(),
            Status::NotInstalled => "NOT INSTALLED".to_string(),
            Status::LiveBuild => "LIVE BUILD".to_string(),
            Status::Error(reason) => format!("ERROR ({reason})"),
        }
    }

    fn style(&self) -> Style {
        let color = match self {
            Status::Passed => AnsiColor::Green,
            Status::Failed { .. } | Status::Error(_) => AnsiColor::Red,
            Status::Unknown => AnsiColor::Yellow,
            Status::NotInstalled => AnsiColor::Magenta,
            Status::LiveBuild => AnsiColor::Blue,
        };
        Style::new().fg_color(Some(color.into()))
    }

    /// Format the status line printed for `key`: `KEY:: LABEL`.
    pub fn line(&self, key: &WorkKey, color: bool) -> String {
        if color {
            let style = self.style();
            format!("{key}:: {style}{}{style:#}", self.label())
        } else {
            format!("{key}:: {}", self.label())
        }
    }
}

// ---------------------------------------------------------------------------
// Ebuild
// ---------------------------------------------------------------------------

static VERSION_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-([0-9])+\..*ebuild$").expect("version suffix regex is valid")
});

/// An ebuild file in the overlay, as `CATEGORY/PACKAGE-VERSION.ebuild`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ebuild(String);

impl Ebuild {
    /// Build from a file path under `overlay_root`.
    ///
    /// Returns `None` for files that are not ebuilds or that do not sit at
    /// `CATEGORY/PACKAGE/FILE` depth.
    pub fn from_path(overlay_root: &Path, path: &Path) -> Option<Self> {
        let rel = path.strip_prefix(overlay_root).ok()?;
        let parts: Vec<&str> = rel
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();
        if parts.len() < 3 {
            return None;
        }
        let file = parts[parts.len() - 1];
        if !file.ends_with(".ebuild") {
            return None;
        }
        let category = parts[parts.len() - 3];
        Some(Self(format!("{category}/{file}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The package this ebuild belongs to, with the version stripped.
    pub fn package(&self) -> Result<WorkKey> {
        WorkKey::new(VERSION_SUFFIX.replace(&self.0, "").into_owned())
    }
}
