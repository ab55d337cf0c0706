//! Clap derive structures for the `embedctl` CLI.
//!
//! Defines the command tree, global flags, and shared argument groups. Kept
//! free of crate-internal imports so `build.rs` can render man pages from it.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// embedctl -- drive report embed sessions from the command line
#[derive(Debug, Parser)]
#[command(
    name = "embedctl",
    version,
    about = "Resolve workspaces, reports and embed configurations from the command line",
    long_about = "Walks the workspace -> report -> embed configuration chain of a\n\
        report catalog service, issuing short-lived view tokens and tracking\n\
        their expiry.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "EMBEDCTL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Catalog service base URL (overrides profile)
    #[arg(long, env = "EMBEDCTL_SERVICE_URL", global = true)]
    pub service_url: Option<String>,

    /// Pre-issued bearer token (skips the client-credentials flow)
    #[arg(long, env = "EMBEDCTL_ACCESS_TOKEN", global = true, hide_env_values = true)]
    pub access_token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "EMBEDCTL_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "EMBEDCTL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List workspaces
    #[command(alias = "ws")]
    Workspaces(WorkspacesArgs),

    /// List reports in a workspace
    #[command(alias = "r")]
    Reports(ReportsArgs),

    /// Issue an embed configuration for a report
    Embed(EmbedArgs),

    /// Keep an embed session alive and report expiry transitions
    Watch(WatchArgs),

    /// Inspect and refresh datasets
    #[command(alias = "ds")]
    Datasets(DatasetsArgs),

    /// Check service configuration and authentication
    Status,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared argument groups ───────────────────────────────────────────

/// Which workspace and report to settle on. Unset means the profile's
/// choice, then the first one listed.
#[derive(Debug, Clone, Default, Args)]
pub struct SelectionArgs {
    /// Workspace ID
    #[arg(long, short = 'w')]
    pub workspace: Option<String>,

    /// Report ID
    #[arg(long, short = 'r')]
    pub report: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct DisplayArgs {
    /// Report theme (overrides profile)
    #[arg(long)]
    pub theme: Option<ThemeArg>,

    /// Hide the filter pane
    #[arg(long)]
    pub hide_filter_pane: bool,

    /// Hide page navigation
    #[arg(long)]
    pub hide_navigation: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ThemeArg {
    Light,
    Dark,
    HighContrast,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WORKSPACES / REPORTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WorkspacesArgs {
    #[command(subcommand)]
    pub command: WorkspacesCommand,
}

#[derive(Debug, Subcommand)]
pub enum WorkspacesCommand {
    /// List workspaces visible to the configured identity
    #[command(alias = "ls")]
    List,
}

#[derive(Debug, Args)]
pub struct ReportsArgs {
    #[command(subcommand)]
    pub command: ReportsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ReportsCommand {
    /// List reports in a workspace
    #[command(alias = "ls")]
    List {
        /// Workspace ID (default: profile's, then the first listed)
        #[arg(long, short = 'w')]
        workspace: Option<String>,
    },

    /// List the pages of a report
    Pages {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// List the parameters of a report
    #[command(alias = "params")]
    Parameters {
        #[command(flatten)]
        selection: SelectionArgs,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  EMBED / WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct EmbedArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub display: DisplayArgs,

    /// Print the access token and the full embed locator
    #[arg(long)]
    pub show_token: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub display: DisplayArgs,

    /// Refresh the configuration when it nears expiry (and retry failures)
    #[arg(long, short = 'a')]
    pub auto_refresh: bool,

    /// Seconds between expiry checks
    #[arg(long, default_value = "15")]
    pub interval: u64,

    /// Seconds before expiry that count as nearing expiry (overrides profile)
    #[arg(long)]
    pub lead: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DATASETS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DatasetsArgs {
    #[command(subcommand)]
    pub command: DatasetsCommand,
}

#[derive(Debug, Subcommand)]
pub enum DatasetsCommand {
    /// List datasets in a workspace
    #[command(alias = "ls")]
    List {
        /// Workspace ID (default: profile's, then the first listed)
        #[arg(long, short = 'w')]
        workspace: Option<String>,
    },

    /// Trigger a dataset refresh
    Refresh {
        /// Dataset ID
        dataset: String,

        /// Workspace ID (default: profile's, then the first listed)
        #[arg(long, short = 'w')]
        workspace: Option<String>,
    },

    /// Show recent refreshes of a dataset
    History {
        /// Dataset ID
        dataset: String,

        /// Workspace ID (default: profile's, then the first listed)
        #[arg(long, short = 'w')]
        workspace: Option<String>,

        /// Number of entries to show
        #[arg(long, short = 'n', default_value = "10")]
        top: u32,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG / COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a secret for the active profile in the system keyring
    SetSecret {
        /// Which secret to store
        #[arg(value_enum, default_value = "client-secret")]
        kind: SecretArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SecretArg {
    ClientSecret,
    AccessToken,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
