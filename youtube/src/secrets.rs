//! Google OAuth client-secrets files.
//!
//! The file downloaded from the cloud console holds one section, keyed
//! `installed` for desktop clients or `web` for web clients.

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientType {
    Installed,
    Web,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client_id:     String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri:      String,
    #[serde(default = "default_token_uri")]
    pub token_uri:     String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub project_id:    Option<String>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct SecretsFile {
    installed: Option<ClientConfig>,
    web:       Option<ClientConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSecrets {
    pub client_type: ClientType,
    pub config:      ClientConfig,
}

impl ClientSecrets {
    pub fn from_file(path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| match e {
            ApiError::InvalidSecrets { reason, .. } => ApiError::InvalidSecrets {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    pub fn from_json(content: &str) -> ApiResult<Self> {
        let file: SecretsFile = serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;

        let (client_type, config) = match (file.installed, file.web) {
            (Some(c), _)    => (ClientType::Installed, c),
            (None, Some(c)) => (ClientType::Web, c),
            (None, None)    => {
                return Err(invalid("expected an 'installed' or 'web' section".into()))
            }
        };

        if config.client_id.trim().is_empty() {
            return Err(invalid("client_id is empty".into()));
        }
        Ok(Self { client_type, config })
    }
}

fn invalid(reason: String) -> ApiError {
    ApiError::InvalidSecrets { path: "<inline>".into(), reason }
}
