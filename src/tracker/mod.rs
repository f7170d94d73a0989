pub mod jira;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::field::{CustomField, FieldId};
use crate::model::issue::{SearchPage, SearchRequest};
use crate::model::project::Project;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("tracker returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl TrackerError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TrackerError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body for status failures, empty otherwise.
    pub fn body(&self) -> &str {
        match self {
            TrackerError::Status { body, .. } => body,
            _ => "",
        }
    }
}

/// Allowed values of a select field, keyed by display value.
pub type AllowedValues = BTreeMap<String, String>;

/// The REST operations the utilities need. Each call either yields parsed
/// data or a `TrackerError` the caller must handle; nothing is retried here.
#[async_trait]
pub trait TrackerApi: Send + Sync {
    /// Custom fields only, ordered by id.
    async fn list_custom_fields(&self) -> Result<Vec<CustomField>, TrackerError>;

    async fn list_projects(&self) -> Result<Vec<Project>, TrackerError>;

    async fn search_issues(&self, request: &SearchRequest) -> Result<SearchPage, TrackerError>;

    /// Allowed options of `field` as reported by the edit metadata of `issue_key`.
    async fn allowed_values(
        &self,
        issue_key: &str,
        field: FieldId,
    ) -> Result<AllowedValues, TrackerError>;

    /// Succeeds only when the tracker answers 204 No Content.
    async fn update_issue_fields(&self, issue_key: &str, fields: Value)
        -> Result<(), TrackerError>;
}

#[cfg(test)]
pub mod mock;
