//! Repology client: upstream version lookups.
//!
//! Project groups are fetched once per package per run and cached for the
//! lifetime of the client. Transient failures (timeouts, refused
//! connections) are retried with a doubling request timeout.

pub mod fuzzy;
pub mod overrides;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::WorkKey;
use crate::telemetry::metrics;

pub use fuzzy::fuzzy_ratio;
pub use overrides::Overrides;

/// Repology returns at most this many projects per page.
pub const PAGE_SIZE: usize = 200;

/// One package entry of a repology project.
#[derive(Debug, Clone, Deserialize)]
pub struct Package {
    #[serde(default)]
    pub repo: String,
    pub version: String,
}

pub type Project = Vec<Package>;

/// Projects keyed by repology project name.
pub type ProjectGroup = BTreeMap<String, Project>;

/// How to pick the project that represents a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    /// Shortest project name first.
    Shortest,
    /// Project name most similar to the package name first.
    Fuzzy,
}

/// Retry schedule for transient request failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Timeout of the first attempt; doubled on every retry.
    pub initial_timeout: Duration,
    /// Pause between attempts.
    pub pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial_timeout: Duration::from_secs(1),
            pause: Duration::from_secs(1),
        }
    }
}

pub struct RepologyClient {
    http: reqwest::Client,
    base_url: String,
    overrides: Overrides,
    retry: RetryPolicy,
    cache: Mutex<HashMap<WorkKey, Arc<ProjectGroup>>>,
}

impl RepologyClient {
    pub fn new(base_url: impl Into<String>, overrides: Overrides) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("ebvcheck/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self {
            http,
            base_url,
            overrides,
            retry: RetryPolicy::default(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Entries of a single named project.
    pub async fn project(&self, name: &str) -> Result<Project> {
        let url = format!("{}project/{name}", self.base_url);
        self.get_json(&url, &[]).await
    }

    /// One page of projects matching `search`, starting at project `from`.
    pub async fn projects_page(&self, search: &str, from: &str) -> Result<ProjectGroup> {
        let url = if from.is_empty() {
            format!("{}projects/", self.base_url)
        } else {
            format!("{}projects/{from}/", self.base_url)
        };
        self.get_json(&url, &[("search", search)]).await
    }

    /// Every project matching `search`, following pagination.
    pub async fn all_projects(&self, search: &str) -> Result<ProjectGroup> {
        let mut page = self.projects_page(search, "").await?;
        let mut result = page.clone();
        while page.len() == PAGE_SIZE {
            let Some(last) = page.keys().next_back().cloned() else {
                break;
            };
            page = self.projects_page(search, &last).await?;
            let before = result.len();
            result.extend(page.clone());
            if result.len() == before {
                break;
            }
        }
        Ok(result)
    }

    /// Latest upstream version of `pkg`, or `None` if repology has nothing usable.
    pub async fn latest_version(&self, pkg: &WorkKey, ranking: Ranking) -> Result<Option<String>> {
        let group = self.project_group(pkg).await?;

        let mut names: Vec<&String> = group.keys().collect();
        match ranking {
            Ranking::Shortest => names.sort_by_key(|name| name.len()),
            Ranking::Fuzzy => {
                let target = pkg.as_str();
                names.sort_by(|a, b| fuzzy_ratio(target, b).total_cmp(&fuzzy_ratio(target, a)));
            }
        }
        let Some(&best) = names.first() else {
            return Ok(None);
        };
        let entries = &group[best];
        debug!(%pkg, project = best.as_str(), ?ranking, "selected project");

        if let Some(repo) = self.overrides.repo(pkg)
            && let Some(entry) = entries.iter().find(|p| p.repo == repo)
        {
            return Ok(Some(entry.version.clone()));
        }

        Ok(entries
            .iter()
            .map(|p| p.version.as_str())
            .filter(|v| is_plain_release(v))
            .max_by_key(|v| version_key(v))
            .map(str::to_string))
    }

    async fn project_group(&self, pkg: &WorkKey) -> Result<Arc<ProjectGroup>> {
        if let Some(cached) = self.cached(pkg) {
            return Ok(cached);
        }

        let group = match self.overrides.project(pkg) {
            Some(name) => {
                let project = self.project(name).await?;
                ProjectGroup::from([(name.to_string(), project)])
            }
            None => self.all_projects(pkg.bare_name()).await?,
        };

        let group = Arc::new(group);
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(pkg.clone())
            .or_insert_with(|| Arc::clone(&group));
        Ok(group)
    }

    fn cached(&self, pkg: &WorkKey) -> Option<Arc<ProjectGroup>> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pkg)
            .cloned()
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let mut timeout = self.retry.initial_timeout;
        let mut attempt = 1;
        loop {
            match self.fetch(url, query, timeout).await {
                Ok(value) => return Ok(value),
                Err(e) if is_transient(&e) && attempt < self.retry.attempts => {
                    warn!(url, attempt, error = %e, "repology request failed, retrying");
                    metrics::lookup_retries().add(1, &[]);
                    attempt += 1;
                    timeout *= 2;
                    tokio::time::sleep(self.retry.pause).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> reqwest::Result<T> {
        self.http
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect()
}

/// Only dotted, purely numeric versions count (`1.2.3`, not `1.2a` or `20240101`).
fn is_plain_release(version: &str) -> bool {
    version.contains('.') && version.chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn version_key(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_releases_only() {
        assert!(is_plain_release("1.2.3"));
        assert!(!is_plain_release("20240101"));
        assert!(!is_plain_release("1.2_rc1"));
        assert!(!is_plain_release("1.2a"));
    }

    #[test]
    fn versions_compare_numerically() {
        assert!(version_key("1.10") > version_key("1.9"));
        assert!(version_key("2.0") > version_key("1.99.99"));
        assert!(version_key("1.2.1") > version_key("1.2"));
    }
}
