// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document commands: create, show, list, update, delete

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use rv_core::{Relval, RelvalId, RelvalStatus, StepSpec};
use rv_storage::{Page, Query, SortOrder};

use crate::app::Controller;
use crate::color;
use crate::exit_error::ExitError;
use crate::output::{print_json, OutputFormat};
use crate::table::{Column, Table};

#[derive(Args, Debug, Default)]
pub struct CreateArgs {
    /// JSON draft with steps and settings ("-" reads stdin)
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,
    /// Explicit id instead of the next serial
    #[arg(long)]
    pub id: Option<String>,
    #[arg(long)]
    pub release: Option<String>,
    #[arg(long)]
    pub batch: Option<String>,
    #[arg(long = "workflow-name")]
    pub workflow_name: Option<String>,
    #[arg(long)]
    pub label: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

impl CreateArgs {
    /// Build the draft: the file if given, then flag overrides.
    pub fn draft(&self) -> Result<Relval> {
        let json = match &self.file {
            Some(path) => super::read_input(path)?,
            None => "{}".to_string(),
        };
        let mut draft = parse_draft(&json)?;
        if let Some(id) = &self.id {
            draft.id = RelvalId::new(id.as_str());
        }
        if let Some(release) = &self.release {
            draft.cmssw_release = release.clone();
        }
        if let Some(batch) = &self.batch {
            draft.batch_name = batch.clone();
        }
        if let Some(name) = &self.workflow_name {
            draft.workflow_name = name.clone();
        }
        if let Some(label) = &self.label {
            draft.label = label.clone();
        }
        if let Some(notes) = &self.notes {
            draft.notes = notes.clone();
        }
        Ok(draft)
    }
}

/// Parse a draft document. `id` and `status` may be omitted.
pub fn parse_draft(json: &str) -> Result<Relval> {
    let mut value: serde_json::Value = serde_json::from_str(json).context("invalid draft JSON")?;
    let Some(object) = value.as_object_mut() else {
        bail!("draft must be a JSON object");
    };
    object.entry("id").or_insert_with(|| "".into());
    object.entry("cmssw_release").or_insert_with(|| "".into());
    object.insert("status".to_string(), RelvalStatus::New.as_str().into());
    serde_json::from_value(value).context("invalid draft")
}

#[derive(Args, Debug, Default)]
pub struct UpdateArgs {
    pub id: String,
    /// Full JSON document to store ("-" reads stdin)
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long = "jira")]
    pub jira_ticket: Option<String>,
    #[arg(long)]
    pub label: Option<String>,
    #[arg(long)]
    pub cpu_cores: Option<u32>,
    #[arg(long)]
    pub memory_mb: Option<u32>,
    #[arg(long)]
    pub scram_arch: Option<String>,
}

impl UpdateArgs {
    /// Overlay the requested changes on the stored document.
    pub fn apply(&self, current: Relval) -> Result<Relval> {
        let mut changed = match &self.file {
            Some(path) => {
                let doc: Relval = serde_json::from_str(&super::read_input(path)?)
                    .context("invalid RelVal JSON")?;
                if doc.id != current.id {
                    bail!("document id {} does not match {}", doc.id, current.id);
                }
                doc
            }
            None => current,
        };
        if let Some(notes) = &self.notes {
            changed.notes = notes.clone();
        }
        if let Some(ticket) = &self.jira_ticket {
            changed.jira_ticket = ticket.clone();
        }
        if let Some(label) = &self.label {
            changed.label = label.clone();
        }
        if let Some(cores) = self.cpu_cores {
            changed.cpu_cores = cores;
        }
        if let Some(memory) = self.memory_mb {
            changed.memory_mb = memory;
        }
        if let Some(arch) = &self.scram_arch {
            changed.scram_arch = arch.clone();
        }
        Ok(changed)
    }
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    pub status: Option<RelvalStatus>,
    #[arg(long)]
    pub release: Option<String>,
    #[arg(long)]
    pub batch: Option<String>,
    /// Id prefix without serial, e.g. CMSSW_14_0_0__fall-TTbar
    #[arg(long)]
    pub namespace: Option<String>,
    /// Order by id instead of newest campaign
    #[arg(long)]
    pub by_id: bool,
    #[arg(long, default_value_t = 0)]
    pub page: usize,
    /// Page size; 0 lists everything
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

impl ListArgs {
    pub fn query(&self) -> Query {
        Query {
            status: self.status,
            cmssw_release: self.release.clone(),
            batch_name: self.batch.clone(),
            namespace: self.namespace.clone(),
            sort: if self.by_id {
                SortOrder::Id
            } else {
                SortOrder::CampaignDesc
            },
            page: self.page,
            limit: self.limit,
        }
    }
}

pub async fn create(
    args: CreateArgs,
    ctl: &Controller,
    user: &str,
    format: OutputFormat,
) -> Result<()> {
    let relval = ctl.create(args.draft()?, user).await?;
    match format {
        OutputFormat::Text => println!("Created {}", relval.id),
        OutputFormat::Json => print_json(&relval)?,
    }
    Ok(())
}

pub fn show(ids: &[String], ctl: &Controller, format: OutputFormat) -> Result<()> {
    let relvals = ids
        .iter()
        .map(|id| ctl.get(&RelvalId::new(id.as_str())))
        .collect::<Result<Vec<_>, _>>()?;
    match format {
        OutputFormat::Text => {
            let now = crate::output::now_secs();
            let rendered: Vec<String> = relvals.iter().map(|r| render_relval(r, now)).collect();
            print!("{}", rendered.join("\n"));
        }
        OutputFormat::Json => match relvals.as_slice() {
            [single] => print_json(single)?,
            many => print_json(many)?,
        },
    }
    Ok(())
}

pub fn list(args: &ListArgs, ctl: &Controller, format: OutputFormat) -> Result<()> {
    let page = ctl.query(&args.query())?;
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "total": page.total,
            "items": page.items,
        }))?,
        OutputFormat::Text => {
            if page.items.is_empty() {
                println!("No relvals found");
                return Ok(());
            }
            let mut table = Table::new(list_columns());
            for row in list_rows(&page, crate::output::now_secs()) {
                table.row(row);
            }
            table.render(&mut std::io::stdout());
            if page.total > page.items.len() {
                println!(
                    "\n{}",
                    color::context(&format!(
                        "page {}: {} of {} relvals",
                        args.page,
                        page.items.len(),
                        page.total
                    ))
                );
            }
        }
    }
    Ok(())
}

pub fn update(args: &UpdateArgs, ctl: &Controller, user: &str, format: OutputFormat) -> Result<()> {
    let current = ctl.get(&RelvalId::new(args.id.as_str()))?;
    let before = current.history.len();
    let updated = ctl.update(&args.apply(current)?, user)?;
    match format {
        OutputFormat::Text if updated.history.len() == before => {
            println!("{} unchanged", updated.id)
        }
        OutputFormat::Text => println!("Updated {}", updated.id),
        OutputFormat::Json => print_json(&updated)?,
    }
    Ok(())
}

pub fn delete(ids: &[String], ctl: &Controller, user: &str) -> Result<()> {
    let mut failed = 0;
    for id in ids {
        match ctl.delete(&RelvalId::new(id.as_str()), user) {
            Ok(()) => println!("Deleted {}", id),
            Err(e) => {
                eprintln!("{}", e);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        let message = format!("{} of {} deletions failed", failed, ids.len());
        return Err(ExitError::new(1, message).into());
    }
    Ok(())
}

fn list_columns() -> Vec<Column> {
    vec![
        Column::left("ID"),
        Column::status("STATUS"),
        Column::left("RELEASE"),
        Column::left("BATCH"),
        Column::right("STEPS"),
        Column::muted("CAMPAIGN"),
        Column::left("WORKFLOW").with_max(60),
    ]
}

pub(crate) fn list_rows(page: &Page, now: u64) -> Vec<Vec<String>> {
    page.items
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.status.to_string(),
                r.cmssw_release.clone(),
                r.batch_name.clone(),
                r.steps.len().to_string(),
                rv_core::format_age(now, r.campaign_timestamp),
                r.workflows
                    .last()
                    .map(|w| w.name.clone())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect()
}

/// Multi-line text view of one RelVal.
pub(crate) fn render_relval(relval: &Relval, now: u64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", color::header("RelVal:"), relval.id);
    let _ = writeln!(out, "  Status:   {}", color::status(relval.status.as_str()));
    let _ = writeln!(
        out,
        "  Release:  {} ({})",
        relval.cmssw_release,
        relval.scram_arch
    );
    if !relval.batch_name.is_empty() {
        let _ = writeln!(out, "  Batch:    {}", relval.batch_name);
    }
    if !relval.workflow_name.is_empty() {
        let _ = writeln!(out, "  Workflow: {}", relval.workflow_name);
    }
    if !relval.label.is_empty() {
        let _ = writeln!(out, "  Label:    {}", relval.label);
    }
    if !relval.jira_ticket.is_empty() {
        let _ = writeln!(out, "  Jira:     {}", relval.jira_ticket);
    }
    if !relval.notes.is_empty() {
        let _ = writeln!(out, "  Notes:    {}", relval.notes);
    }
    let _ = writeln!(
        out,
        "  Resources: {} cores, {} MB",
        relval.cpu_cores, relval.memory_mb
    );
    if relval.campaign_timestamp > 0 {
        let _ = writeln!(
            out,
            "  Campaign: {} ({} ago)",
            relval.campaign_timestamp,
            rv_core::format_age(now, relval.campaign_timestamp)
        );
    }

    if !relval.steps.is_empty() {
        let _ = writeln!(out, "{}", color::header("Steps:"));
        for (i, step) in relval.steps.iter().enumerate() {
            let detail = match &step.spec {
                StepSpec::InputDataset(input) => format!("input {}", input.dataset),
                StepSpec::CommandDriven(driver) => {
                    let conditions = if step.resolved_conditions.is_empty() {
                        driver.conditions.as_str()
                    } else {
                        step.resolved_conditions.as_str()
                    };
                    format!("driver {}", conditions)
                }
            };
            let _ = write!(out, "  {}. {}  {}", i + 1, step.name, detail);
            if !step.config_id.is_empty() {
                let _ = write!(out, "  config {}", step.config_id);
            }
            out.push('\n');
        }
    }

    if !relval.workflows.is_empty() {
        let _ = writeln!(out, "{}", color::header("Workflows:"));
        for workflow in &relval.workflows {
            let _ = writeln!(
                out,
                "  {}  {}",
                workflow.name,
                color::status(workflow.last_status().unwrap_or("-"))
            );
        }
    }

    if !relval.output_datasets.is_empty() {
        let _ = writeln!(out, "{}", color::header("Output datasets:"));
        for dataset in &relval.output_datasets {
            let _ = writeln!(out, "  {}", dataset);
        }
    }

    if !relval.history.is_empty() {
        let _ = writeln!(out, "{}", color::header("History:"));
        for entry in &relval.history {
            let value = match &entry.value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let _ = writeln!(
                out,
                "  {:>4} ago  {}  {}  {}",
                rv_core::format_age(now, entry.time),
                entry.user,
                entry.action,
                value
            );
        }
    }
    out
}

#[cfg(test)]
#[path = "relval_tests.rs"]
mod tests;
