use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{self, Overrides, Settings};
use crate::reconcile::backup::BackupWriter;
use crate::reconcile::Reconciler;
use crate::tracker::jira::JiraClient;
use crate::tracker::TrackerApi;
use crate::usage::report;

#[derive(Parser, Debug)]
#[command(
    name = "jft",
    version,
    about = "Custom-field reports and multi-select copies for a Jira instance"
)]
pub struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to ~/.jira-field-tools/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Base URL of the Jira instance.
    #[arg(long, global = true, env = "JIRA_BASE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write every custom field's id and name to CSV.
    ListFields {
        #[arg(long, default_value = "list_jira_custom_fields.csv")]
        output: PathBuf,
    },
    /// Count issues using each custom field across all projects.
    Usage {
        #[arg(long, default_value = "1_custom_field_usage_report.csv")]
        output: PathBuf,
    },
    /// Count issues using each custom field in each project.
    UsageByProject {
        #[arg(long, default_value = "2_custom_field_usage_by_project.csv")]
        output: PathBuf,
    },
    /// Copy the source multi-select field's values into the destination field.
    CopyMultiSelect(CopyArgs),
}

#[derive(Args, Debug)]
pub struct CopyArgs {
    /// Numeric id of the field to copy from.
    #[arg(long, value_name = "ID")]
    pub source_field: Option<u64>,

    /// Numeric id of the field to copy into.
    #[arg(long, value_name = "ID")]
    pub destination_field: Option<u64>,

    /// Issues fetched per search request.
    #[arg(long)]
    pub page_size: Option<u64>,

    /// Backup of the pre-change field values.
    #[arg(long, default_value = "3-after_current_multi_select_fields.csv")]
    pub output: PathBuf,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        let mut overrides = Overrides {
            base_url: self.base_url.clone(),
            ..Overrides::default()
        };
        if let Command::CopyMultiSelect(args) = &self.command {
            overrides.source_field_id = args.source_field;
            overrides.destination_field_id = args.destination_field;
            overrides.page_size = args.page_size;
        }
        overrides
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let settings = config::load_settings(cli.config.as_deref(), &cli.overrides())?;
    let client = JiraClient::new(&settings.base_url, &settings.auth_token);

    match &cli.command {
        Command::ListFields { output } => handle_list_fields(&client, output).await,
        Command::Usage { output } => handle_usage(&client, &settings, output).await,
        Command::UsageByProject { output } => {
            handle_usage_by_project(&client, &settings, output).await
        }
        Command::CopyMultiSelect(args) => {
            handle_copy_multi_select(&client, &settings, &args.output).await
        }
    }
}

pub async fn handle_list_fields(api: &dyn TrackerApi, output: &Path) -> Result<()> {
    info!("Fetching custom fields...");
    let fields = api
        .list_custom_fields()
        .await
        .context("Failed to retrieve fields")?;
    if fields.is_empty() {
        bail!("No custom fields were retrieved from the Jira API");
    }

    report::write_to_path(output, |file| report::write_field_list(file, &fields))?;
    info!(
        "Custom fields have been written to {} successfully",
        output.display()
    );
    Ok(())
}

pub async fn handle_usage(api: &dyn TrackerApi, settings: &Settings, output: &Path) -> Result<()> {
    info!("Fetching custom fields...");
    let fields = api
        .list_custom_fields()
        .await
        .context("Failed to retrieve fields")?;

    let rows =
        report::collect_global_usage(api, &fields, &settings.development_field_clause).await;

    report::write_to_path(output, |file| report::write_global_report(file, &rows))?;
    info!(
        "Custom field usage data has been written to {} successfully",
        output.display()
    );
    Ok(())
}

pub async fn handle_usage_by_project(
    api: &dyn TrackerApi,
    settings: &Settings,
    output: &Path,
) -> Result<()> {
    info!("Fetching projects...");
    let projects = api
        .list_projects()
        .await
        .context("Failed to retrieve projects")?;

    info!("Fetching custom fields...");
    let fields = api
        .list_custom_fields()
        .await
        .context("Failed to retrieve fields")?;

    let rows = report::collect_project_usage(
        api,
        &fields,
        &projects,
        &settings.development_field_clause,
    )
    .await;

    report::write_to_path(output, |file| report::write_project_report(file, &rows))?;
    info!(
        "Custom field usage data (by project) has been written to {} successfully",
        output.display()
    );
    Ok(())
}

pub async fn handle_copy_multi_select(
    api: &dyn TrackerApi,
    settings: &Settings,
    output: &Path,
) -> Result<()> {
    settings.validate_copy()?;
    let mut backup = BackupWriter::create(output)?;
    let report = Reconciler::new(api, settings).run(&mut backup).await;

    println!(
        "Collected {} issues ({} mapped options): {} updated, {} skipped, {} failed. Backup: {}",
        report.collected,
        report.mapping.len(),
        report.updated(),
        report.skipped(),
        report.failed(),
        output.display()
    );
    Ok(())
}
