use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{AllowedValues, TrackerApi, TrackerError};
use crate::model::field::{custom_fields_sorted, CustomField, FieldDefinition, FieldId};
use crate::model::issue::{SearchPage, SearchRequest};
use crate::model::project::Project;

pub struct JiraClient {
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
}

impl JiraClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self::with_client(base_url, token, reqwest::Client::new())
    }

    pub fn with_client(base_url: &str, token: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header: format!("Bearer {token}"),
            client,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/rest/api/2/{path}", self.base_url)
    }

    fn issue_endpoint(&self, issue_key: &str) -> String {
        self.endpoint(&format!("issue/{}", urlencoding::encode(issue_key)))
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
    }

    /// Send and decode a 200 OK JSON response.
    async fn fetch<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, TrackerError> {
        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if status != StatusCode::OK {
            return Err(TrackerError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl TrackerApi for JiraClient {
    async fn list_custom_fields(&self) -> Result<Vec<CustomField>, TrackerError> {
        let req = self.request(reqwest::Method::GET, self.endpoint("field"));
        let definitions: Vec<FieldDefinition> = self.fetch(req).await?;
        Ok(custom_fields_sorted(definitions))
    }

    async fn list_projects(&self) -> Result<Vec<Project>, TrackerError> {
        let req = self.request(reqwest::Method::GET, self.endpoint("project"));
        self.fetch(req).await
    }

    async fn search_issues(&self, request: &SearchRequest) -> Result<SearchPage, TrackerError> {
        let req = self
            .request(reqwest::Method::POST, self.endpoint("search"))
            .json(request);
        self.fetch(req).await
    }

    async fn allowed_values(
        &self,
        issue_key: &str,
        field: FieldId,
    ) -> Result<AllowedValues, TrackerError> {
        let req = self
            .request(reqwest::Method::GET, self.issue_endpoint(issue_key))
            .query(&[("expand", "editmeta"), ("fields", field.json_name().as_str())]);
        let meta: Value = self.fetch(req).await?;
        parse_allowed_values(&meta, field)
    }

    async fn update_issue_fields(
        &self,
        issue_key: &str,
        fields: Value,
    ) -> Result<(), TrackerError> {
        let body = serde_json::json!({ "fields": fields });
        let resp = self
            .request(reqwest::Method::PUT, self.issue_endpoint(issue_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(TrackerError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Pull `editmeta.fields.<field>.allowedValues` out of an issue response.
/// A missing path means the field has no options; a malformed option is an error.
pub fn parse_allowed_values(meta: &Value, field: FieldId) -> Result<AllowedValues, TrackerError> {
    let Some(options) = meta
        .get("editmeta")
        .and_then(|m| m.get("fields"))
        .and_then(|f| f.get(field.json_name()))
        .and_then(|f| f.get("allowedValues"))
    else {
        return Ok(AllowedValues::new());
    };

    let options = options
        .as_array()
        .ok_or_else(|| TrackerError::Unexpected("allowedValues is not a list".into()))?;

    options
        .iter()
        .map(|option| {
            let value = option.get("value").and_then(Value::as_str);
            let id = option.get("id").and_then(Value::as_str);
            match (value, id) {
                (Some(value), Some(id)) => Ok((value.to_string(), id.to_string())),
                _ => Err(TrackerError::Unexpected(format!(
                    "allowed value without id/value: {option}"
                ))),
            }
        })
        .collect()
}
