use serde::Serialize;

use super::ids::{ReportId, WorkspaceId};

/// A tenant-scoped container of reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    pub read_only: bool,
}

impl Workspace {
    pub fn new(id: impl Into<WorkspaceId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            read_only: false,
        }
    }
}

/// A single report. Belongs to exactly one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub id: ReportId,
    pub name: String,
    pub workspace_id: WorkspaceId,
    /// Service-reported kind, e.g. `PowerBIReport` or `PaginatedReport`.
    pub report_type: Option<String>,
    pub dataset_id: Option<String>,
    pub web_url: Option<String>,
}

impl Report {
    pub fn new(
        id: impl Into<ReportId>,
        name: impl Into<String>,
        workspace_id: impl Into<WorkspaceId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            workspace_id: workspace_id.into(),
            report_type: None,
            dataset_id: None,
            web_url: None,
        }
    }
}

/// One page of a report, as listed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportPage {
    /// Internal section name, used to deep-link a page.
    pub name: String,
    pub display_name: String,
    pub order: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportParameter {
    pub name: String,
    pub kind: Option<String>,
    pub required: bool,
    pub current_value: Option<String>,
}
