// ── Domain model ──
//
// Canonical types the controller and its consumers work with. Wire types
// from `embedctl-api` are mapped into these by `crate::convert`.

pub mod catalog;
pub mod dataset;
pub mod embed;
pub mod ids;
pub mod settings;
pub mod status;

pub use catalog::{Report, ReportPage, ReportParameter, Workspace};
pub use dataset::{Dataset, RefreshRecord, RefreshStatus};
pub use embed::EmbedConfiguration;
pub use ids::{ReportId, WorkspaceId};
pub use settings::{DisplaySettings, Theme};
pub use status::ServiceStatus;
