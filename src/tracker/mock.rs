use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{AllowedValues, TrackerApi, TrackerError};
use crate::model::field::{CustomField, FieldId, SchemaType};
use crate::model::issue::{Issue, SearchPage, SearchRequest};
use crate::model::project::Project;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListFields,
    ListProjects,
    Search(SearchRequest),
    AllowedValues(String, FieldId),
    Update(String, Value),
    /// A flush of the backup sink, recorded to check write ordering.
    BackupFlush,
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

/// Scripted in-memory tracker with a log of every call it receives.
#[derive(Default)]
pub struct MockTracker {
    pub fields: Vec<CustomField>,
    pub fields_status: Option<u16>,
    pub projects: Vec<Project>,
    pub projects_status: Option<u16>,
    /// Count-only searches answer from here by exact JQL; unknown JQL counts 0.
    pub counts: HashMap<String, Result<u64, u16>>,
    /// Paged searches slice this list; updates write back into it.
    pub issues: Mutex<Vec<Issue>>,
    pub search_status: Option<u16>,
    pub allowed: AllowedValues,
    pub allowed_status: Option<u16>,
    /// Issue keys whose update is answered with the given status.
    pub update_failures: HashMap<String, u16>,
    pub calls: CallLog,
}

fn failure(status: u16) -> TrackerError {
    TrackerError::Status {
        status,
        body: format!("{{\"errorMessages\":[\"mock {status}\"]}}"),
    }
}

impl MockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issues(issues: Vec<Issue>) -> Self {
        Self {
            issues: Mutex::new(issues),
            ..Self::default()
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn update_calls(&self) -> Vec<(String, Value)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update(key, fields) => Some((key, fields)),
                _ => None,
            })
            .collect()
    }

    pub fn search_calls(&self) -> Vec<SearchRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Search(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    pub fn issue(&self, key: &str) -> Option<Issue> {
        self.issues
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.key == key)
            .cloned()
    }
}

#[async_trait]
impl TrackerApi for MockTracker {
    async fn list_custom_fields(&self) -> Result<Vec<CustomField>, TrackerError> {
        self.record(Call::ListFields);
        match self.fields_status {
            Some(status) => Err(failure(status)),
            None => Ok(self.fields.clone()),
        }
    }

    async fn list_projects(&self) -> Result<Vec<Project>, TrackerError> {
        self.record(Call::ListProjects);
        match self.projects_status {
            Some(status) => Err(failure(status)),
            None => Ok(self.projects.clone()),
        }
    }

    async fn search_issues(&self, request: &SearchRequest) -> Result<SearchPage, TrackerError> {
        self.record(Call::Search(request.clone()));
        if let Some(status) = self.search_status {
            return Err(failure(status));
        }

        if request.max_results == 0 {
            return match self.counts.get(&request.jql) {
                Some(Ok(total)) => Ok(SearchPage {
                    issues: Vec::new(),
                    total: *total,
                }),
                Some(Err(status)) => Err(failure(*status)),
                None => Ok(SearchPage::default()),
            };
        }

        let issues = self.issues.lock().unwrap();
        let start = (request.start_at as usize).min(issues.len());
        let end = (start + request.max_results as usize).min(issues.len());
        Ok(SearchPage {
            issues: issues[start..end].to_vec(),
            total: issues.len() as u64,
        })
    }

    async fn allowed_values(
        &self,
        issue_key: &str,
        field: FieldId,
    ) -> Result<AllowedValues, TrackerError> {
        self.record(Call::AllowedValues(issue_key.to_string(), field));
        match self.allowed_status {
            Some(status) => Err(failure(status)),
            None => Ok(self.allowed.clone()),
        }
    }

    async fn update_issue_fields(
        &self,
        issue_key: &str,
        fields: Value,
    ) -> Result<(), TrackerError> {
        self.record(Call::Update(issue_key.to_string(), fields.clone()));
        if let Some(status) = self.update_failures.get(issue_key) {
            return Err(failure(*status));
        }

        // Store the new selection with display values, as the tracker would.
        let mut issues = self.issues.lock().unwrap();
        if let Some(issue) = issues.iter_mut().find(|i| i.key == issue_key) {
            if let Value::Object(map) = fields {
                for (name, entries) in map {
                    let resolved: Vec<Value> = entries
                        .as_array()
                        .cloned()
                        .unwrap_or_default()
                        .into_iter()
                        .map(|entry| {
                            let id = entry["id"].as_str().unwrap_or_default().to_string();
                            let value = self
                                .allowed
                                .iter()
                                .find(|(_, v)| **v == id)
                                .map(|(k, _)| k.clone())
                                .unwrap_or_default();
                            json!({"id": id, "value": value})
                        })
                        .collect();
                    issue.fields.insert(name, Value::Array(resolved));
                }
            }
        }
        Ok(())
    }
}

/// Writer that keeps the bytes and logs every flush into a shared call log.
pub struct RecordingSink {
    pub bytes: Vec<u8>,
    calls: CallLog,
}

impl RecordingSink {
    pub fn new(calls: CallLog) -> Self {
        Self {
            bytes: Vec::new(),
            calls,
        }
    }
}

impl Write for RecordingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.calls.lock().unwrap().push(Call::BackupFlush);
        Ok(())
    }
}

pub fn custom_field(id: &str, name: &str, clause: &str, schema: SchemaType) -> CustomField {
    CustomField {
        id: id.to_string(),
        name: name.to_string(),
        clause_names: vec![clause.to_string()],
        schema_type: schema,
    }
}

pub fn project(key: &str, name: &str) -> Project {
    Project {
        key: key.to_string(),
        name: name.to_string(),
    }
}

/// Issue with the given `(id, value)` options in the source and destination fields.
pub fn multi_select_issue(
    key: &str,
    source: FieldId,
    source_options: &[(&str, &str)],
    destination: FieldId,
    destination_options: &[(&str, &str)],
) -> Issue {
    let render = |options: &[(&str, &str)]| {
        Value::Array(
            options
                .iter()
                .map(|(id, value)| json!({"id": id, "value": value}))
                .collect(),
        )
    };
    let mut fields = HashMap::new();
    fields.insert(source.json_name(), render(source_options));
    if destination_options.is_empty() {
        fields.insert(destination.json_name(), Value::Null);
    } else {
        fields.insert(destination.json_name(), render(destination_options));
    }
    Issue {
        key: key.to_string(),
        fields,
    }
}
