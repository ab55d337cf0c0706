//! Command dispatch: bridges CLI args -> session controller -> output formatting.

pub mod config_cmd;
pub mod datasets;
pub mod embed;
pub mod reports;
pub mod status;
pub mod util;
pub mod watch;
pub mod workspaces;

use std::sync::Arc;

use embedctl_core::{EmbedController, HttpResourceClient, ResourceClient};

use crate::cli::{Command, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;

/// What every service-bound command gets: the session controller, the HTTP
/// client it runs on, and the profile's selection defaults.
pub struct Context {
    pub controller: EmbedController,
    pub client: Arc<HttpResourceClient>,
    pub default_workspace: Option<String>,
    pub default_report: Option<String>,
}

impl Context {
    /// Build the client and spawn the controller. Must run inside the runtime.
    pub fn new(resolved: Resolved) -> Result<Self, CliError> {
        let client = Arc::new(HttpResourceClient::new(&resolved.session)?);
        let shared: Arc<dyn ResourceClient> = client.clone();
        let controller = EmbedController::new(shared, resolved.session.session_options());
        Ok(Self {
            controller,
            client,
            default_workspace: resolved.workspace,
            default_report: resolved.report,
        })
    }
}

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Workspaces(args) => workspaces::handle(ctx, args, global).await,
        Command::Reports(args) => reports::handle(ctx, args, global).await,
        Command::Embed(args) => embed::handle(ctx, args, global).await,
        Command::Watch(args) => watch::handle(ctx, args, global).await,
        Command::Datasets(args) => datasets::handle(ctx, args, global).await,
        Command::Status => status::handle(ctx, global).await,
        // Config and Completions are handled before a session exists
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
