//! Installed version lookup through `eix`.

use std::sync::LazyLock;

use regex::Regex;
use tokio::process::Command;
use tracing::trace;

use crate::error::{Error, Result};
use crate::model::WorkKey;

static INSTALLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_\-\d]+/[A-Za-z_\-\d]+-[\d.]+(_[A-Za-z_]+\d*)?(-r\d*)?$")
        .expect("installed version regex is valid")
});

/// What is installed locally for a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Installed {
    NotInstalled,
    /// A live (9999) build.
    Live,
    Version(String),
}

impl Installed {
    /// Classify the first line of `eix`'s NAMEVERSION output.
    pub fn parse(name_version: &str) -> Self {
        let name_version = name_version.trim();
        if !INSTALLED.is_match(name_version) {
            return Installed::NotInstalled;
        }
        // The text after the last dash; a revision (`-r1`) is kept as-is.
        let version = name_version.rsplit('-').next().unwrap_or(name_version);
        if version == "9999" {
            Installed::Live
        } else {
            Installed::Version(version.to_string())
        }
    }
}

/// Queries the local package database.
#[derive(Debug, Clone)]
pub struct Portage {
    eix: String,
}

impl Portage {
    pub fn new(eix: impl Into<String>) -> Self {
        Self { eix: eix.into() }
    }

    /// Look up the installed version of `pkg`.
    ///
    /// # Errors
    ///
    /// [`Error::Command`] when the lookup command exits non-zero, [`Error::Io`]
    /// when it cannot be started.
    pub async fn installed_version(&self, pkg: &WorkKey) -> Result<Installed> {
        let output = Command::new(&self.eix)
            .args([
                "--nocolor",
                "--format",
                "<installedversions:NAMEVERSION>",
                pkg.as_str(),
            ])
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(Error::Command {
                command: format!(
                    "{} --nocolor --format '<installedversions:NAMEVERSION>' {pkg}",
                    self.eix
                ),
                code: output.status.code().unwrap_or(-1),
                stdout: stdout.trim().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let first = stdout.lines().next().unwrap_or("");
        trace!(%pkg, output = first, "eix lookup");
        Ok(Installed::parse(first))
    }
}
