//! Package ledger client.
//!
//! Paginated enumeration of package versions for a container package, plus
//! per-version deletion. The production implementation talks to the GitHub
//! Packages API; the [`Ledger`] trait is the seam tests mock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use regsweep_reconcile::PackageRecord;

use crate::config::Config;
use crate::repo::Repository;

/// Page size used for enumeration; a shorter page ends the sequence.
pub const PER_PAGE: usize = 100;

const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";

/// Ledger API failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger API error: {status} {message}")]
    Api { status: u16, message: String },

    #[error("ledger network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Package version ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Fetch one page (1-based) of package versions, in server order.
    ///
    /// The sequence is finite and not restartable mid-run; a page shorter
    /// than [`PER_PAGE`] is the last one.
    async fn list_page(
        &self,
        repo: &Repository,
        page: u32,
    ) -> Result<Vec<PackageRecord>, LedgerError>;

    /// Delete a single package version by its ledger id.
    async fn delete_version(&self, repo: &Repository, id: u64) -> Result<(), LedgerError>;
}

/// GitHub Packages implementation of [`Ledger`].
pub struct GithubLedger {
    client: reqwest::Client,
    base_url: String,
}

impl GithubLedger {
    /// Create a new ledger client from config.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
        // The API rejects requests without a User-Agent.
        headers.insert(USER_AGENT, HeaderValue::from_static("regsweep"));
        if let Some(token) = &config.token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
        })
    }

    fn versions_url(&self, repo: &Repository) -> String {
        format!(
            "{}/users/{}/packages/container/{}/versions",
            self.base_url, repo.account, repo.package
        )
    }

    async fn api_error(response: reqwest::Response) -> LedgerError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        LedgerError::Api { status, message }
    }
}

#[async_trait]
impl Ledger for GithubLedger {
    async fn list_page(
        &self,
        repo: &Repository,
        page: u32,
    ) -> Result<Vec<PackageRecord>, LedgerError> {
        let url = self.versions_url(repo);
        debug!(url = %url, page, "fetching package versions page");

        let response = self
            .client
            .get(&url)
            .query(&[("per_page", PER_PAGE as u32), ("page", page)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let versions: Vec<PackageVersion> = response.json().await?;
        Ok(versions.into_iter().map(PackageRecord::from).collect())
    }

    async fn delete_version(&self, repo: &Repository, id: u64) -> Result<(), LedgerError> {
        let url = format!("{}/{}", self.versions_url(repo), id);
        debug!(url = %url, "deleting package version");

        let response = self.client.delete(&url).send().await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(())
    }
}

/// Package version payload from the ledger API.
///
/// The version "name" is the content digest; tags sit under
/// provider-specific container metadata.
#[derive(Debug, Deserialize)]
struct PackageVersion {
    id: u64,
    name: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    metadata: Option<VersionMetadata>,
}

#[derive(Debug, Deserialize)]
struct VersionMetadata {
    #[serde(default)]
    container: Option<ContainerMetadata>,
}

#[derive(Debug, Deserialize)]
struct ContainerMetadata {
    #[serde(default)]
    tags: Vec<String>,
}

impl From<PackageVersion> for PackageRecord {
    fn from(version: PackageVersion) -> Self {
        let tags = version
            .metadata
            .and_then(|m| m.container)
            .map(|c| c.tags)
            .unwrap_or_default();
        Self {
            id: version.id,
            digest: version.name,
            tags,
            created_at: version.created_at,
        }
    }
}
