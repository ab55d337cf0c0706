//! Embed-session controller sitting between `embedctl-api` and presentation
//! layers (the `embedctl` CLI, or any other adapter).
//!
//! The crate resolves the three-tier dependent chain
//! workspace → report → embed configuration and keeps it consistent while
//! selections and display settings change underneath in-flight requests:
//!
//! - **[`EmbedController`]** — Cheaply cloneable handle to a single-writer
//!   session actor. Commands ([`initialize`](EmbedController::initialize),
//!   [`select_workspace`](EmbedController::select_workspace),
//!   [`select_report`](EmbedController::select_report),
//!   [`update_settings`](EmbedController::update_settings),
//!   [`refresh`](EmbedController::refresh),
//!   [`retry`](EmbedController::retry)) travel through an `mpsc` channel;
//!   every fetch is stamped and its result is dropped if a later command
//!   superseded it.
//!
//! - **[`SessionState`]** — The aggregate published after every mutation via a
//!   `tokio::sync::watch` channel. Consumers read snapshots or subscribe
//!   through [`SessionStream`].
//!
//! - **[`ExpiryMonitor`]** — Pure observation of the active configuration's
//!   lifetime (`valid` / `nearing expiry` / `expired`). It never triggers a
//!   refresh on its own.
//!
//! - **[`ResourceClient`]** — The seam to the remote catalog and token
//!   services. [`HttpResourceClient`] is the production implementation over
//!   [`embedctl_api::CatalogClient`].

pub mod client;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod expiry;
pub mod model;
pub mod session;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::{HttpResourceClient, ResourceClient};
pub use config::{
    IdentityConfig, ServiceCredentials, SessionConfig, SessionOptions, TlsVerification,
};
pub use controller::EmbedController;
pub use error::{CoreError, ErrorRecord, SessionError};
pub use expiry::{ExpiryMonitor, ExpiryStatus};
pub use session::{SessionState, SessionStatus};
pub use stream::SessionStream;

pub use model::{
    Dataset, DisplaySettings, EmbedConfiguration, RefreshRecord, RefreshStatus, Report, ReportId,
    ReportPage, ReportParameter, ServiceStatus, Theme, Workspace, WorkspaceId,
};
