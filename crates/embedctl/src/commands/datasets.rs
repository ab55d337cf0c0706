//! Dataset command handlers. These call the HTTP client directly; the
//! session controller only covers the embed chain.

use tabled::Tabled;

use embedctl_core::{Dataset, RefreshRecord};

use crate::cli::{DatasetsArgs, DatasetsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

#[derive(Tabled)]
struct DatasetRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Owner")]
    owner: String,
    #[tabled(rename = "Refreshable")]
    refreshable: String,
}

impl From<&Dataset> for DatasetRow {
    fn from(d: &Dataset) -> Self {
        Self {
            id: d.id.clone(),
            name: d.name.clone(),
            owner: d.configured_by.clone().unwrap_or_default(),
            refreshable: if d.is_refreshable { "yes" } else { "no" }.into(),
        }
    }
}

#[derive(Tabled)]
struct RefreshRow {
    #[tabled(rename = "Started")]
    started: String,
    #[tabled(rename = "Type")]
    refresh_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Duration")]
    duration: String,
}

impl From<&RefreshRecord> for RefreshRow {
    fn from(r: &RefreshRecord) -> Self {
        Self {
            started: r
                .started_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            refresh_type: r.refresh_type.clone().unwrap_or_default(),
            status: r.status.to_string(),
            duration: r
                .duration()
                .and_then(|d| d.to_std().ok())
                .map(util::human_duration)
                .unwrap_or_default(),
        }
    }
}

pub async fn handle(
    ctx: &Context,
    args: DatasetsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DatasetsCommand::List { workspace } => {
            let ws = util::resolve_workspace(ctx, global, workspace).await?;
            let datasets = ctx.client.list_datasets(&ws).await?;
            let out = output::render_list(&global.output, &datasets, |d| DatasetRow::from(d), |d| {
                d.id.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DatasetsCommand::Refresh { dataset, workspace } => {
            let ws = util::resolve_workspace(ctx, global, workspace).await?;
            ctx.client
                .refresh_dataset(&ws, &dataset)
                .await
                .map_err(|e| dataset_error(e, &dataset, &ws.to_string()))?;
            if !global.quiet {
                eprintln!("Refresh of dataset {dataset} requested");
            }
            Ok(())
        }

        DatasetsCommand::History {
            dataset,
            workspace,
            top,
        } => {
            let ws = util::resolve_workspace(ctx, global, workspace).await?;
            let history = ctx
                .client
                .refresh_history(&ws, &dataset, Some(top))
                .await
                .map_err(|e| dataset_error(e, &dataset, &ws.to_string()))?;
            let out = output::render_list(&global.output, &history, |r| RefreshRow::from(r), |r| {
                r.request_id.clone().unwrap_or_default()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

fn dataset_error(err: embedctl_core::CoreError, dataset: &str, workspace: &str) -> CliError {
    if err.is_not_found() {
        CliError::NotFound {
            resource_type: "dataset".into(),
            identifier: dataset.into(),
            list_command: format!("datasets list -w {workspace}"),
        }
    } else {
        err.into()
    }
}
