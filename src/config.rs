use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::field::FieldId;

pub const TOKEN_ENV_VAR: &str = "PERSONAL_ACCESS_TOKEN";

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_SOURCE_FIELD: u64 = 10112;
const DEFAULT_DESTINATION_FIELD: u64 = 10113;
const DEFAULT_PAGE_SIZE: u64 = 50;
const DEFAULT_DEVELOPMENT_CLAUSE: &str = "cf[10000]";

/// Optional `config.toml` contents. Every key may be omitted.
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub development_field_clause: Option<String>,
    pub copy: Option<CopyConfig>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CopyConfig {
    pub source_field_id: Option<u64>,
    pub destination_field_id: Option<u64>,
    pub page_size: Option<u64>,
}

/// Values given on the command line; they win over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub source_field_id: Option<u64>,
    pub destination_field_id: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub auth_token: String,
    pub source_field: FieldId,
    pub destination_field: FieldId,
    pub page_size: u64,
    /// Clause of the "Development" field, queried through its commit summary.
    pub development_field_clause: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("PERSONAL_ACCESS_TOKEN environment variable is not set.")]
    MissingToken,
    #[error("page size must be greater than zero")]
    ZeroPageSize,
    #[error("source and destination field are both {0}")]
    SameField(FieldId),
}

impl Settings {
    pub fn resolve(
        file: FileConfig,
        overrides: &Overrides,
        token: Option<String>,
    ) -> Result<Self, ConfigError> {
        let auth_token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;
        let copy = file.copy.unwrap_or_default();

        let page_size = overrides
            .page_size
            .or(copy.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let source_field = FieldId(
            overrides
                .source_field_id
                .or(copy.source_field_id)
                .unwrap_or(DEFAULT_SOURCE_FIELD),
        );
        let destination_field = FieldId(
            overrides
                .destination_field_id
                .or(copy.destination_field_id)
                .unwrap_or(DEFAULT_DESTINATION_FIELD),
        );

        Ok(Self {
            base_url: overrides
                .base_url
                .clone()
                .or(file.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            auth_token,
            source_field,
            destination_field,
            page_size,
            development_field_clause: file
                .development_field_clause
                .unwrap_or_else(|| DEFAULT_DEVELOPMENT_CLAUSE.to_string()),
        })
    }

    /// Checks the `[copy]` settings. Only the multi-select copy reads them.
    pub fn validate_copy(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.source_field == self.destination_field {
            return Err(ConfigError::SameField(self.source_field));
        }
        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".jira-field-tools")
        .join("config.toml")
}

/// Read the config file. A missing file means "all defaults".
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: FileConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

/// Resolve settings from the config file, command line and environment.
pub fn load_settings(config_path: Option<&Path>, overrides: &Overrides) -> Result<Settings> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);
    let file = load_file_config(&path)?;
    let token = std::env::var(TOKEN_ENV_VAR).ok();
    Ok(Settings::resolve(file, overrides, token)?)
}
