//! Container registry client.
//!
//! Token-authenticated fetch of a multiplatform image index (manifest list)
//! for a repository and reference, returning the constituent manifest
//! digests. `not-found` is a distinguished error; other HTTP failures carry
//! their status code. The [`Registry`] trait is the seam tests mock.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::config::Config;
use crate::repo::Repository;

/// Accept both the OCI image index and the Docker manifest list types.
const MANIFEST_ACCEPT: &str = "application/vnd.oci.image.index.v1+json, \
     application/vnd.docker.distribution.manifest.list.v2+json";

/// Registry API failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The reference has no manifest in the registry.
    #[error("no manifest found for reference '{reference}'")]
    NotFound { reference: String },

    #[error("registry API error: {status} {message}")]
    Api { status: u16, message: String },

    #[error("registry network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Manifest index access.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Constituent manifest digests of the index at `reference`, in the
    /// order the index lists them. The index's own digest is NOT included;
    /// the engine appends it.
    async fn manifest_digests(
        &self,
        repo: &Repository,
        reference: &str,
    ) -> Result<Vec<String>, RegistryError>;
}

/// GHCR implementation of [`Registry`] (Docker Registry HTTP API v2).
pub struct GhcrRegistry {
    client: reqwest::Client,
    base_url: String,
    credential: Option<String>,
    /// Pull token, exchanged once per run.
    token: OnceCell<String>,
}

impl GhcrRegistry {
    /// Create a new registry client from config.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: config.registry_url.clone(),
            credential: config.token.clone(),
            token: OnceCell::new(),
        })
    }

    /// Exchange the configured credential for a pull token.
    ///
    /// Anonymous exchange works for public packages; the credential is sent
    /// as basic auth when present.
    async fn pull_token(&self, repo: &Repository) -> Result<String, RegistryError> {
        let url = format!("{}/token", self.base_url);
        let scope = format!("repository:{}/{}:pull", repo.account, repo.package);
        debug!(url = %url, scope = %scope, "exchanging pull token");

        let mut request = self
            .client
            .get(&url)
            .query(&[("service", "ghcr.io"), ("scope", scope.as_str())]);
        if let Some(credential) = &self.credential {
            request = request.basic_auth(&repo.account, Some(credential));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: TokenResponse = response.json().await?;
        Ok(body.token)
    }
}

#[async_trait]
impl Registry for GhcrRegistry {
    async fn manifest_digests(
        &self,
        repo: &Repository,
        reference: &str,
    ) -> Result<Vec<String>, RegistryError> {
        let token = self
            .token
            .get_or_try_init(|| self.pull_token(repo))
            .await?;

        let url = format!(
            "{}/v2/{}/{}/manifests/{}",
            self.base_url, repo.account, repo.package, reference
        );
        debug!(url = %url, "fetching manifest index");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(ACCEPT, MANIFEST_ACCEPT)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound {
                reference: reference.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let index: ManifestIndex = response.json().await?;
        let mut digests = Vec::with_capacity(index.manifests.len());
        for entry in index.manifests {
            match entry.digest {
                Some(digest) => digests.push(digest),
                // A single malformed entry is skipped; the rest of the
                // index is still usable.
                None => warn!(reference, "manifest entry missing digest, skipping"),
            }
        }
        Ok(digests)
    }
}

async fn api_error(response: reqwest::Response) -> RegistryError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    RegistryError::Api { status, message }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ManifestIndex {
    #[serde(default)]
    manifests: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(default)]
    digest: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_index_deserialization() {
        let json = r#"{
            "schemaVersion": 2,
            "mediaType": "application/vnd.oci.image.index.v1+json",
            "manifests": [
                { "digest": "sha256:aa", "platform": { "os": "linux", "architecture": "amd64" } },
                { "digest": "sha256:bb", "platform": { "os": "linux", "architecture": "arm64" } },
                { "platform": { "os": "unknown" } }
            ]
        }"#;

        let index: ManifestIndex = serde_json::from_str(json).unwrap();
        assert_eq!(index.manifests.len(), 3);
        assert_eq!(index.manifests[0].digest.as_deref(), Some("sha256:aa"));
        assert!(index.manifests[2].digest.is_none());
    }
}
