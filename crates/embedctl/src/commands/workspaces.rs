//! Workspace command handlers.

use tabled::Tabled;

use embedctl_core::Workspace;

use crate::cli::{GlobalOpts, SelectionArgs, WorkspacesArgs, WorkspacesCommand};
use crate::error::CliError;
use crate::output;

use super::Context;
use super::util::{self, Depth};

#[derive(Tabled)]
struct WorkspaceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Read-only")]
    read_only: String,
}

impl From<&Workspace> for WorkspaceRow {
    fn from(w: &Workspace) -> Self {
        Self {
            id: w.id.to_string(),
            name: w.name.clone(),
            read_only: if w.read_only { "yes" } else { "" }.into(),
        }
    }
}

pub async fn handle(
    ctx: &Context,
    args: WorkspacesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        WorkspacesCommand::List => {
            let state =
                util::drive(ctx, global, &SelectionArgs::default(), Depth::Workspaces).await?;
            let out = output::render_list(
                &global.output,
                &state.available_workspaces,
                |w| WorkspaceRow::from(w),
                |w| w.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
