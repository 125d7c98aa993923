//! Per-package repology overrides.
//!
//! Some packages are named differently on repology, or only have a usable
//! version in one repository. A TOML file can extend the built-in table:
//!
//! ```toml
//! [projects]
//! "dev-util/ix" = "ix"
//!
//! [repos]
//! "dev-python/tldr-python-client" = "arch"
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::WorkKey;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Overrides {
    /// Package -> repology project name.
    #[serde(default)]
    pub projects: HashMap<String, String>,
    /// Package -> repository whose version is authoritative.
    #[serde(default)]
    pub repos: HashMap<String, String>,
}

impl Overrides {
    /// The overrides this tool ships with.
    pub fn builtin() -> Self {
        let projects = [
            ("dev-util/ix", "ix"),
            ("dev-ruby/xdg", "ruby:xdg"),
            ("dev-python/tldr-python-client", "tldr"),
            ("dev-python/python-stdlib-list", "python:stdlib-list"),
        ];
        let repos = [("dev-python/tldr-python-client", "arch")];
        Self {
            projects: projects
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            repos: repos
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Built-in overrides extended (and overridden) by the file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read overrides {}: {e}", path.display()))
        })?;
        let extra: Overrides = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("bad overrides file {}: {e}", path.display()))
        })?;

        let mut merged = Self::builtin();
        merged.projects.extend(extra.projects);
        merged.repos.extend(extra.repos);
        Ok(merged)
    }

    pub fn project(&self, pkg: &WorkKey) -> Option<&str> {
        self.projects.get(pkg.as_str()).map(String::as_str)
    }

    pub fn repo(&self, pkg: &WorkKey) -> Option<&str> {
        self.repos.get(pkg.as_str()).map(String::as_str)
    }
}
