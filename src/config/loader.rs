use super::types::*;
use crate::error::{Result, StorageError};

use std::path::{Path, PathBuf};

/// The outcome of choosing a credential source, before any I/O happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialPlan {
    Ready(Credentials),
    ReadFile(PathBuf),
}

/// Picks the credential source according to the documented precedence.
pub fn plan_credentials(source: &CredentialSource, env: &EnvSnapshot, cwd: &Path) -> CredentialPlan {
    match source {
        CredentialSource::Inline(credentials) => CredentialPlan::Ready(credentials.clone()),
        CredentialSource::KeyFile(path) => CredentialPlan::ReadFile(path.clone()),
        CredentialSource::Discover => {
            if let Some(path) = &env.keyfilename {
                return CredentialPlan::ReadFile(PathBuf::from(path));
            }
            if let (Some(email), Some(id), Some(key)) = (&env.email, &env.id, &env.key) {
                return CredentialPlan::Ready(Credentials {
                    id: id.clone(),
                    email: email.clone(),
                    key: key.clone(),
                });
            }
            CredentialPlan::ReadFile(cwd.join(CF_CREDENTIALS_FILENAME))
        }
    }
}

/// Executes a plan, reading and parsing the key file if one is needed.
pub fn load_credentials(plan: CredentialPlan) -> Result<Credentials> {
    match plan {
        CredentialPlan::Ready(credentials) => Ok(credentials),
        CredentialPlan::ReadFile(path) => {
            tracing::debug!("Loading credentials from {}", path.display());
            let raw = std::fs::read_to_string(&path).map_err(|e| {
                StorageError::Config(format!("cannot read key file {}: {}", path.display(), e))
            })?;
            serde_json::from_str(&raw).map_err(|e| {
                StorageError::Config(format!("invalid key file {}: {}", path.display(), e))
            })
        }
    }
}

impl ApiConfig {
    /// Resolves credentials from `source` using the live process environment and
    /// working directory.
    pub fn discover(source: &CredentialSource) -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| StorageError::Config(format!("cannot determine working directory: {}", e)))?;
        let plan = plan_credentials(source, &EnvSnapshot::from_process(), &cwd);
        Ok(ApiConfig::new(load_credentials(plan)?))
    }
}
