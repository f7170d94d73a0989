use tracing::{error, warn};

use crate::model::field::SchemaType;
use crate::model::issue::SearchRequest;
use crate::tracker::TrackerApi;

const IS_NOT_EMPTY: &str = "IS NOT EMPTY";
const GREATER_THAN_ZERO: &str = "> 0";
const BAD_REQUEST: u16 = 400;

fn project_condition(project_key: Option<&str>) -> String {
    project_key
        .map(|key| format!("project = \"{key}\" AND "))
        .unwrap_or_default()
}

/// JQL matching issues where the field holds a value, or `None` when the
/// schema type cannot be queried.
pub fn build_usage_jql(
    clause: &str,
    schema: &SchemaType,
    project_key: Option<&str>,
    development_clause: &str,
) -> Option<String> {
    let project = project_condition(project_key);
    if clause == development_clause {
        return Some(format!("{project}{clause}[commits].all {IS_NOT_EMPTY}"));
    }
    match schema {
        SchemaType::Number => Some(format!("{project}{clause} {GREATER_THAN_ZERO}")),
        s if s.is_supported() => Some(format!("{project}{clause} {IS_NOT_EMPTY}")),
        _ => None,
    }
}

/// Count issues using a field, optionally within one project. Failures are
/// logged and count as zero.
pub async fn count_issues_using_field(
    api: &dyn TrackerApi,
    clause: &str,
    schema: &SchemaType,
    project_key: Option<&str>,
    development_clause: &str,
) -> u64 {
    let Some(jql) = build_usage_jql(clause, schema, project_key, development_clause) else {
        warn!(field_type = %schema, "Unsupported field type '{schema}'. Skipping...");
        return 0;
    };

    let mut result = api.search_issues(&SearchRequest::count_only(jql)).await;

    // Some "any" fields reject IS NOT EMPTY but accept a numeric comparison.
    if *schema == SchemaType::Any
        && result.as_ref().err().and_then(|e| e.status()) == Some(BAD_REQUEST)
    {
        warn!(
            clause,
            "Got 400 BAD_REQUEST for 'any' field type with '{IS_NOT_EMPTY}', retrying with '{GREATER_THAN_ZERO}'"
        );
        let retry = format!(
            "{}{clause} {GREATER_THAN_ZERO}",
            project_condition(project_key)
        );
        result = api.search_issues(&SearchRequest::count_only(retry)).await;
    }

    match result {
        Ok(page) => page.total,
        Err(e) => {
            let scope = project_key
                .map(|key| format!("project {key}"))
                .unwrap_or_else(|| "all projects".to_string());
            error!(
                clause,
                scope = %scope,
                status = ?e.status(),
                response = e.body(),
                "Error querying issues for {clause} in {scope}: {e}"
            );
            0
        }
    }
}
