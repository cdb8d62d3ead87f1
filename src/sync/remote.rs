//! Remote addressing
//!
//! A remote is a base URL plus typed routing/auth parameters. Parameters
//! are validated when the remote is built and only become opaque query
//! pairs when a request URL is constructed.

use crate::error::SyncError;
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Caller-supplied routing and auth values forwarded with every request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteParams {
    /// Repository selector for servers hosting more than one working directory
    #[serde(default)]
    pub repository: Option<String>,

    /// Opaque access token
    #[serde(default)]
    pub token: Option<String>,
}

impl RemoteParams {
    pub fn validate(&self) -> Result<(), SyncError> {
        for (name, value) in self.fields() {
            if value.is_empty() {
                return Err(SyncError::InvalidRemote(format!("{} must not be empty", name)));
            }
            if value.chars().any(char::is_control) {
                return Err(SyncError::InvalidRemote(format!(
                    "{} contains control characters",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Overlay `other` on top of `self`, field by field.
    pub fn overlay(&self, other: &RemoteParams) -> RemoteParams {
        RemoteParams {
            repository: other.repository.clone().or_else(|| self.repository.clone()),
            token: other.token.clone().or_else(|| self.token.clone()),
        }
    }

    fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("repository", self.repository.as_deref()),
            ("token", self.token.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value)))
    }
}

/// A validated sync server address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    base: Url,
    params: RemoteParams,
}

impl Remote {
    pub fn parse(url: &str, params: RemoteParams) -> Result<Self, SyncError> {
        let base = Url::parse(url)
            .map_err(|e| SyncError::InvalidRemote(format!("{}: {}", url, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(SyncError::InvalidRemote(format!(
                "unsupported scheme {:?} in {}",
                base.scheme(),
                url
            )));
        }
        if base.cannot_be_a_base() {
            return Err(SyncError::InvalidRemote(format!("{} cannot be a base URL", url)));
        }
        params.validate()?;

        Ok(Self { base, params })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn params(&self) -> &RemoteParams {
        &self.params
    }

    /// Request URL for `route` with the remote parameters and `extra` query pairs.
    pub fn endpoint(&self, route: &str, extra: &[(&str, &str)]) -> Result<Url, SyncError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidRemote(format!("{} cannot be a base URL", self.base)))?
            .pop_if_empty()
            .push(route);

        let has_pairs = self.params.fields().next().is_some() || !extra.is_empty();
        if has_pairs {
            let mut query = url.query_pairs_mut();
            for (name, value) in self.params.fields() {
                query.append_pair(name, value);
            }
            for (name, value) in extra {
                query.append_pair(name, value);
            }
        }

        Ok(url)
    }
}
