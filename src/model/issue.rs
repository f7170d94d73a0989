use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

use super::field::FieldId;

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub key: String,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

/// A selected option of a select-type field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: String,
    pub value: String,
}

impl Issue {
    /// Options currently selected in a multi-select field. Absent, null or
    /// non-list values read as empty; entries without `id` or `value` are ignored.
    pub fn select_options(&self, field: FieldId) -> Vec<SelectOption> {
        match self.fields.get(&field.json_name()) {
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Ids of the options selected in a multi-select field. Only `id` is
    /// read, so an entry without a `value` still counts.
    pub fn option_ids(&self, field: FieldId) -> BTreeSet<String> {
        match self.fields.get(&field.json_name()) {
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(|entry| entry.get("id").and_then(Value::as_str))
                .map(str::to_string)
                .collect(),
            _ => BTreeSet::new(),
        }
    }
}

/// Body of `POST /rest/api/2/search`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub jql: String,
    pub start_at: u64,
    pub max_results: u64,
    pub fields: Vec<String>,
}

impl SearchRequest {
    /// A request that returns no issues, only the matching total.
    pub fn count_only(jql: impl Into<String>) -> Self {
        Self {
            jql: jql.into(),
            start_at: 0,
            max_results: 0,
            fields: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub total: u64,
}
