//! Report command handlers.

use tabled::Tabled;

use embedctl_core::{CoreError, Report, ReportId, ReportPage, ReportParameter, WorkspaceId};

use crate::cli::{GlobalOpts, ReportsArgs, ReportsCommand, SelectionArgs};
use crate::error::CliError;
use crate::output;

use super::Context;
use super::util::{self, Depth};

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    report_type: String,
    #[tabled(rename = "Dataset")]
    dataset: String,
}

#[derive(Tabled)]
struct PageRow {
    #[tabled(rename = "#")]
    order: String,
    #[tabled(rename = "Name")]
    display_name: String,
    #[tabled(rename = "Section")]
    name: String,
}

impl From<&ReportPage> for PageRow {
    fn from(p: &ReportPage) -> Self {
        Self {
            order: p.order.map(|o| o.to_string()).unwrap_or_default(),
            display_name: p.display_name.clone(),
            name: p.name.clone(),
        }
    }
}

#[derive(Tabled)]
struct ParameterRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Required")]
    required: String,
    #[tabled(rename = "Value")]
    current_value: String,
}

impl From<&ReportParameter> for ParameterRow {
    fn from(p: &ReportParameter) -> Self {
        Self {
            name: p.name.clone(),
            kind: p.kind.clone().unwrap_or_default(),
            required: if p.required { "yes" } else { "no" }.into(),
            current_value: p.current_value.clone().unwrap_or_default(),
        }
    }
}

impl From<&Report> for ReportRow {
    fn from(r: &Report) -> Self {
        Self {
            id: r.id.to_string(),
            name: r.name.clone(),
            report_type: r.report_type.clone().unwrap_or_default(),
            dataset: r.dataset_id.clone().unwrap_or_default(),
        }
    }
}

pub async fn handle(ctx: &Context, args: ReportsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ReportsCommand::List { workspace } => {
            let selection = SelectionArgs {
                workspace,
                report: None,
            };
            let state = util::drive(ctx, global, &selection, Depth::Reports).await?;
            tracing::debug!(
                workspace = ?state.selected_workspace_id,
                count = state.available_reports.len(),
                "reports loaded"
            );
            let out = output::render_list(
                &global.output,
                &state.available_reports,
                |r| ReportRow::from(r),
                |r| r.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ReportsCommand::Pages { selection } => {
            let (ws, r) = util::resolve_report(ctx, global, &selection).await?;
            let pages = ctx
                .client
                .report_pages(&ws, &r)
                .await
                .map_err(|e| report_error(e, &ws, &r))?;
            let out = output::render_list(
                &global.output,
                &pages,
                |p| PageRow::from(p),
                |p| p.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ReportsCommand::Parameters { selection } => {
            let (ws, r) = util::resolve_report(ctx, global, &selection).await?;
            let params = ctx
                .client
                .report_parameters(&ws, &r)
                .await
                .map_err(|e| report_error(e, &ws, &r))?;
            if params.is_empty() && !global.quiet {
                eprintln!("Report {r} has no parameters");
            }
            let out = output::render_list(
                &global.output,
                &params,
                |p| ParameterRow::from(p),
                |p| p.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

fn report_error(err: CoreError, workspace_id: &WorkspaceId, report_id: &ReportId) -> CliError {
    if err.is_not_found() {
        CliError::NotFound {
            resource_type: "report".into(),
            identifier: report_id.to_string(),
            list_command: format!("reports list -w {workspace_id}"),
        }
    } else {
        err.into()
    }
}
