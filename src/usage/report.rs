use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

use super::query::count_issues_using_field;
use crate::model::field::CustomField;
use crate::model::project::Project;
use crate::tracker::TrackerApi;

pub const GLOBAL_HEADER: [&str; 3] = ["custom_field_id", "custom_field_name", "issues_using_field"];
pub const PROJECT_HEADER: [&str; 5] = [
    "custom_field_id",
    "custom_field_name",
    "project_key",
    "project_name",
    "issues_using_field",
];
pub const FIELD_LIST_HEADER: [&str; 2] = ["id", "name"];

#[derive(Debug, Clone, PartialEq)]
pub struct UsageRow {
    pub field_id: String,
    pub field_name: String,
    pub project: Option<Project>,
    pub issue_count: u64,
}

async fn field_usage(
    api: &dyn TrackerApi,
    field: &CustomField,
    project: Option<&Project>,
    development_clause: &str,
) -> u64 {
    let Some(clause) = field.clause_name() else {
        warn!(field = %field.id, "Field '{}' has no JQL clause name", field.name);
        return 0;
    };
    count_issues_using_field(
        api,
        clause,
        &field.schema_type,
        project.map(|p| p.key.as_str()),
        development_clause,
    )
    .await
}

/// One row per field, counting matches across all projects.
pub async fn collect_global_usage(
    api: &dyn TrackerApi,
    fields: &[CustomField],
    development_clause: &str,
) -> Vec<UsageRow> {
    let mut rows = Vec::with_capacity(fields.len());
    for field in fields {
        info!(
            "Querying usage for field '{}' ({})...",
            field.name,
            field.clause_name().unwrap_or("-")
        );
        let issue_count = field_usage(api, field, None, development_clause).await;
        rows.push(UsageRow {
            field_id: field.id.clone(),
            field_name: field.name.clone(),
            project: None,
            issue_count,
        });
    }
    rows
}

/// One row per field and project, fields outermost.
pub async fn collect_project_usage(
    api: &dyn TrackerApi,
    fields: &[CustomField],
    projects: &[Project],
    development_clause: &str,
) -> Vec<UsageRow> {
    let mut rows = Vec::with_capacity(fields.len() * projects.len());
    for field in fields {
        for project in projects {
            info!(
                "Querying usage for field '{}' in project '{}'...",
                field.name, project.name
            );
            let issue_count = field_usage(api, field, Some(project), development_clause).await;
            rows.push(UsageRow {
                field_id: field.id.clone(),
                field_name: field.name.clone(),
                project: Some(project.clone()),
                issue_count,
            });
        }
    }
    rows
}

pub fn write_global_report<W: Write>(out: W, rows: &[UsageRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(GLOBAL_HEADER)?;
    for row in rows {
        let count = row.issue_count.to_string();
        wtr.write_record([row.field_id.as_str(), row.field_name.as_str(), count.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_project_report<W: Write>(out: W, rows: &[UsageRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(PROJECT_HEADER)?;
    for row in rows {
        let (key, name) = row
            .project
            .as_ref()
            .map(|p| (p.key.as_str(), p.name.as_str()))
            .unwrap_or_default();
        let count = row.issue_count.to_string();
        wtr.write_record([
            row.field_id.as_str(),
            row.field_name.as_str(),
            key,
            name,
            count.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_field_list<W: Write>(out: W, fields: &[CustomField]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(FIELD_LIST_HEADER)?;
    for field in fields {
        wtr.write_record([field.id.as_str(), field.name.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Create (or truncate) `path` and hand it to `write`.
pub fn write_to_path<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(File) -> Result<()>,
{
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write(file).with_context(|| format!("Failed to write {}", path.display()))
}
