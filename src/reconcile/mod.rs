pub mod backup;
pub mod mapping;

use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::io::Write;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::model::field::FieldId;
use crate::model::issue::{Issue, SearchRequest};
use crate::tracker::{AllowedValues, TrackerApi};
use backup::{BackupRow, BackupWriter};
use mapping::{observed_options, OptionMapping};

/// What should happen to one issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    AlreadyConsistent,
    NoValidMappings,
    Update(BTreeSet<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueOutcome {
    Updated,
    AlreadyConsistent,
    NoValidMappings,
    UpdateFailed { status: Option<u16>, reason: String },
}

#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub collected: usize,
    pub mapping: OptionMapping,
    pub outcomes: Vec<(String, IssueOutcome)>,
}

impl ReconcileReport {
    fn count(&self, pred: impl Fn(&IssueOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    pub fn updated(&self) -> usize {
        self.count(|o| *o == IssueOutcome::Updated)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                IssueOutcome::AlreadyConsistent | IssueOutcome::NoValidMappings
            )
        })
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, IssueOutcome::UpdateFailed { .. }))
    }

    #[cfg(test)]
    pub fn outcome(&self, issue_key: &str) -> Option<&IssueOutcome> {
        self.outcomes
            .iter()
            .find(|(key, _)| key == issue_key)
            .map(|(_, o)| o)
    }
}

pub struct Reconciler<'a> {
    api: &'a dyn TrackerApi,
    source: FieldId,
    destination: FieldId,
    page_size: u64,
}

impl<'a> Reconciler<'a> {
    pub fn new(api: &'a dyn TrackerApi, settings: &Settings) -> Self {
        Self::with_fields(
            api,
            settings.source_field,
            settings.destination_field,
            settings.page_size,
        )
    }

    pub fn with_fields(
        api: &'a dyn TrackerApi,
        source: FieldId,
        destination: FieldId,
        page_size: u64,
    ) -> Self {
        Self {
            api,
            source,
            destination,
            page_size,
        }
    }

    fn search_request(&self, start_at: u64) -> SearchRequest {
        SearchRequest {
            jql: format!("{} IS NOT EMPTY ORDER BY ID", self.source.jql_clause()),
            start_at,
            max_results: self.page_size,
            fields: vec![self.source.json_name(), self.destination.json_name()],
        }
    }

    /// Page through every issue holding a source value, backing each one up
    /// as it arrives. Stops at the first empty or failed page.
    pub async fn collect<W: Write>(&self, backup: &mut BackupWriter<W>) -> Vec<Issue> {
        info!(
            "Fetching issues with source field '{}'...",
            self.source.jql_clause()
        );
        let mut collected = Vec::new();
        let mut start_at = 0;
        loop {
            let page = match self.api.search_issues(&self.search_request(start_at)).await {
                Ok(page) => page,
                Err(e) => {
                    error!(
                        status = ?e.status(),
                        response = e.body(),
                        "Error fetching issues with source field '{}': {e}",
                        self.source.jql_clause()
                    );
                    break;
                }
            };
            if page.issues.is_empty() {
                break;
            }

            for issue in &page.issues {
                let row = BackupRow::from_issue(issue, self.source, self.destination);
                match backup.append(&row) {
                    Ok(()) => debug!(issue = %issue.key, "Successfully saved issue"),
                    Err(e) => error!(issue = %issue.key, "Error appending backup file: {e}"),
                }
            }
            collected.extend(page.issues);
            start_at += self.page_size;
        }
        info!(count = collected.len(), "Collected issues");
        collected
    }

    async fn destination_options(&self, issues: &[Issue]) -> AllowedValues {
        let Some(first) = issues.first() else {
            warn!("No issues available to fetch destination field allowed values");
            return AllowedValues::new();
        };
        info!(
            "Fetching allowed values for '{}' from issue '{}'...",
            self.destination.json_name(),
            first.key
        );
        match self.api.allowed_values(&first.key, self.destination).await {
            Ok(values) => values,
            Err(e) => {
                error!(
                    status = ?e.status(),
                    response = e.body(),
                    "Error fetching options for field '{}': {e}",
                    self.destination.json_name()
                );
                AllowedValues::new()
            }
        }
    }

    /// Join the source options seen on `issues` with the destination field's
    /// allowed values. The first issue's edit metadata stands in for all.
    pub async fn build_mapping(&self, issues: &[Issue]) -> OptionMapping {
        let source = observed_options(issues, self.source);
        let destination = self.destination_options(issues).await;

        if source.is_empty() {
            warn!("No options found for field '{}'", self.source.json_name());
        }
        if destination.is_empty() {
            warn!(
                "No options found for field '{}'",
                self.destination.json_name()
            );
        }

        let mapping = OptionMapping::build(&source, &destination);
        info!("Option mapping created: {mapping}");
        mapping
    }

    pub fn plan(&self, issue: &Issue, mapping: &OptionMapping) -> Plan {
        let current = issue.option_ids(self.destination);
        let desired = mapping.translate(&issue.option_ids(self.source));

        if current == desired {
            Plan::AlreadyConsistent
        } else if desired.is_empty() {
            Plan::NoValidMappings
        } else {
            Plan::Update(desired)
        }
    }

    fn update_payload(&self, ids: &BTreeSet<String>) -> Value {
        let options: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
        let mut fields = Map::new();
        fields.insert(self.destination.json_name(), Value::Array(options));
        Value::Object(fields)
    }

    async fn apply(&self, issue: &Issue, mapping: &OptionMapping) -> IssueOutcome {
        let desired = match self.plan(issue, mapping) {
            Plan::AlreadyConsistent => {
                info!(
                    "Skipping issue '{}' because the destination values are already up-to-date",
                    issue.key
                );
                return IssueOutcome::AlreadyConsistent;
            }
            Plan::NoValidMappings => {
                let source_ids = issue.option_ids(self.source);
                info!(
                    "Skipping issue '{}' as no valid mappings were found for source value ids: {source_ids:?}",
                    issue.key
                );
                return IssueOutcome::NoValidMappings;
            }
            Plan::Update(desired) => desired,
        };

        let payload = self.update_payload(&desired);
        debug!(issue = %issue.key, "Updating issue with payload: {payload}");

        match self.api.update_issue_fields(&issue.key, payload).await {
            Ok(()) => {
                info!("Successfully updated issue '{}'", issue.key);
                IssueOutcome::Updated
            }
            Err(e) => {
                error!(
                    status = ?e.status(),
                    response = e.body(),
                    "Failed to update issue '{}' for field '{}': {e}",
                    issue.key,
                    self.destination.json_name()
                );
                IssueOutcome::UpdateFailed {
                    status: e.status(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Collect every issue with a non-empty source field, backing up each one
    /// as it arrives. Then join the source options seen on those issues with
    /// the destination's allowed values by value, and update each issue whose
    /// destination selection differs from its translated source selection.
    /// A failed update is recorded and the run moves on to the next issue.
    pub async fn run<W: Write>(&self, backup: &mut BackupWriter<W>) -> ReconcileReport {
        let issues = self.collect(backup).await;
        let mapping = self.build_mapping(&issues).await;

        let mut outcomes = Vec::with_capacity(issues.len());
        for issue in &issues {
            let outcome = self.apply(issue, &mapping).await;
            outcomes.push((issue.key.clone(), outcome));
        }

        ReconcileReport {
            collected: issues.len(),
            mapping,
            outcomes,
        }
    }
}
