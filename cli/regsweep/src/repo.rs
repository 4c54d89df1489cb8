//! Repository identifier parsing.
//!
//! Commands address a container package as `account/package`. Malformed
//! identifiers are rejected here, before any network activity.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Invalid repository identifier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepoError {
    #[error("repository must be written as account/package, got '{0}'")]
    Malformed(String),

    #[error("repository component '{0}' contains invalid characters")]
    InvalidComponent(String),
}

/// An `account/package` pair identifying one container package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub account: String,
    pub package: String,
}

fn valid_component(component: &str) -> bool {
    !component.is_empty()
        && component
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

impl FromStr for Repository {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (account, package) = s
            .split_once('/')
            .ok_or_else(|| RepoError::Malformed(s.to_string()))?;
        if package.contains('/') {
            return Err(RepoError::Malformed(s.to_string()));
        }
        for component in [account, package] {
            if !valid_component(component) {
                return Err(RepoError::InvalidComponent(component.to_string()));
            }
        }
        Ok(Self {
            account: account.to_string(),
            package: package.to_string(),
        })
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.account, self.package)
    }
}
