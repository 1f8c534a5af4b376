//! Credential resolution from the shared, profile-sectioned credentials file.
//!
//! Reads `<home>/.aws/credentials` once and extracts the product-advertising
//! API keys from a named profile (`paapi` by default). Every failure here is
//! a configuration error and fatal for the run.

pub mod ini;

use std::path::Path;

use tracing::{debug, instrument, warn};

use igniter_shared::{Credentials, DEFAULT_PROFILE, IgniterError, Result, StartupConfig};

use crate::ini::IniDocument;

const ACCESS_KEY_ID: &str = "aws_access_key_id";
const SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
const ASSOCIATE_TAG: &str = "associate_tag";

/// Resolves [`Credentials`] from a credentials store profile.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    profile: String,
    fallback_associate_tag: Option<String>,
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::new(DEFAULT_PROFILE)
    }
}

impl CredentialResolver {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            fallback_associate_tag: None,
        }
    }

    /// Tag used when the profile has no `associate_tag` key.
    pub fn with_fallback_associate_tag(mut self, tag: Option<String>) -> Self {
        self.fallback_associate_tag = tag;
        self
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Read the store named by `startup.credentials_path` and extract the profile.
    #[instrument(skip_all, fields(profile = %self.profile))]
    pub async fn resolve(&self, startup: &StartupConfig) -> Result<Credentials> {
        self.resolve_from(&startup.credentials_path).await
    }

    /// Read a specific store file and extract the profile.
    pub async fn resolve_from(&self, path: &Path) -> Result<Credentials> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            IgniterError::config(format!(
                "cannot read credentials store {}: {e}",
                path.display()
            ))
        })?;

        let doc = IniDocument::parse(&content).map_err(|e| {
            IgniterError::config(format!(
                "malformed credentials store {}: {e}",
                path.display()
            ))
        })?;

        let section = doc.section(&self.profile).ok_or_else(|| {
            IgniterError::config(format!(
                "profile [{}] not found in {}",
                self.profile,
                path.display()
            ))
        })?;

        let field = |key: &str| {
            let value = section.get(key).cloned();
            if value.is_none() {
                warn!(profile = %self.profile, key, "credentials profile is missing a key");
            }
            value
        };

        let access_key_id = field(ACCESS_KEY_ID);
        let secret_access_key = field(SECRET_ACCESS_KEY);
        let associate_tag = section
            .get(ASSOCIATE_TAG)
            .cloned()
            .or_else(|| self.fallback_associate_tag.clone());
        if associate_tag.is_none() {
            warn!(profile = %self.profile, key = ASSOCIATE_TAG, "credentials profile is missing a key");
        }

        debug!(path = %path.display(), "credentials resolved");

        Ok(Credentials {
            access_key_id,
            secret_access_key,
            associate_tag,
        })
    }
}

/// Resolve the given profile using the startup paths.
pub async fn resolve(startup: &StartupConfig, profile: &str) -> Result<Credentials> {
    CredentialResolver::new(profile).resolve(startup).await
}
