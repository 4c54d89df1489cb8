//! Runtime configuration for a regsweep run.

/// Default package ledger API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default container registry base URL.
pub const DEFAULT_REGISTRY_URL: &str = "https://ghcr.io";

/// Default bound on concurrent manifest fetches.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Resolved configuration: CLI flags layered over environment defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Package ledger API base URL, no trailing slash.
    pub api_url: String,

    /// Container registry base URL, no trailing slash.
    pub registry_url: String,

    /// API token, from `GITHUB_TOKEN` or `GH_TOKEN`. Anonymous when absent.
    pub token: Option<String>,

    /// Maximum concurrent manifest fetches.
    pub concurrency: usize,
}

impl Config {
    /// Resolve configuration from flag values and the environment.
    pub fn resolve(
        api_url: Option<String>,
        registry_url: Option<String>,
        concurrency: usize,
    ) -> Self {
        let token = std::env::var("GITHUB_TOKEN")
            .or_else(|_| std::env::var("GH_TOKEN"))
            .ok()
            .filter(|token| !token.is_empty());

        Self {
            api_url: trim_url(api_url.as_deref().unwrap_or(DEFAULT_API_URL)),
            registry_url: trim_url(registry_url.as_deref().unwrap_or(DEFAULT_REGISTRY_URL)),
            token,
            concurrency: concurrency.max(1),
        }
    }
}

fn trim_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() {
        let config = Config::resolve(None, None, DEFAULT_CONCURRENCY);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.registry_url, DEFAULT_REGISTRY_URL);
        assert_eq!(config.concurrency, 5);
    }

    #[test]
    fn test_resolve_trims_trailing_slash() {
        let config = Config::resolve(
            Some("http://localhost:8080/".to_string()),
            Some("http://localhost:5000//".to_string()),
            3,
        );
        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.registry_url, "http://localhost:5000");
    }

    #[test]
    fn test_resolve_floors_concurrency() {
        let config = Config::resolve(None, None, 0);
        assert_eq!(config.concurrency, 1);
    }
}
