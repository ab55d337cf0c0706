// ── API-to-domain type conversions ──
//
// Bridges `embedctl_api` wire types into `embedctl_core::model` types.
// Reports don't carry their workspace on the wire, so the caller supplies it.

use embedctl_api::catalog_types::{
    DatasetResponse, PageResponse, ParameterResponse, RefreshResponse, ReportResponse,
    WorkspaceResponse,
};

use crate::model::{
    Dataset, RefreshRecord, RefreshStatus, Report, ReportPage, ReportParameter, Workspace,
    WorkspaceId,
};

impl From<WorkspaceResponse> for Workspace {
    fn from(w: WorkspaceResponse) -> Self {
        Self {
            id: w.id.into(),
            name: w.name,
            read_only: w.is_read_only,
        }
    }
}

impl Report {
    /// Map a wire report listed under `workspace_id`.
    pub fn from_response(r: ReportResponse, workspace_id: &WorkspaceId) -> Self {
        Self {
            id: r.id.into(),
            name: r.name,
            workspace_id: workspace_id.clone(),
            report_type: r.report_type,
            dataset_id: r.dataset_id,
            web_url: r.web_url,
        }
    }
}

impl From<DatasetResponse> for Dataset {
    fn from(d: DatasetResponse) -> Self {
        Self {
            id: d.id,
            name: d.name,
            configured_by: d.configured_by,
            is_refreshable: d.is_refreshable.unwrap_or(false),
        }
    }
}

impl From<RefreshResponse> for RefreshRecord {
    fn from(r: RefreshResponse) -> Self {
        Self {
            request_id: r.request_id,
            refresh_type: r.refresh_type,
            started_at: r.start_time,
            ended_at: r.end_time,
            status: RefreshStatus::from(r.status.as_str()),
        }
    }
}

impl From<PageResponse> for ReportPage {
    fn from(p: PageResponse) -> Self {
        Self {
            display_name: p.display_name.unwrap_or_else(|| p.name.clone()),
            name: p.name,
            order: p.order,
        }
    }
}

impl From<ParameterResponse> for ReportParameter {
    fn from(p: ParameterResponse) -> Self {
        Self {
            name: p.name,
            kind: p.kind,
            required: p.is_required.unwrap_or(false),
            current_value: p.current_value,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn report_takes_workspace_from_caller() {
        let wire: ReportResponse = serde_json::from_str(
            r#"{"id":"r-1","name":"Quarterly","reportType":"PowerBIReport","datasetId":"ds-9"}"#,
        )
        .unwrap();
        let report = Report::from_response(wire, &WorkspaceId::from("ws-1"));
        assert_eq!(report.workspace_id.as_str(), "ws-1");
        assert_eq!(report.report_type.as_deref(), Some("PowerBIReport"));
        assert_eq!(report.dataset_id.as_deref(), Some("ds-9"));
    }

    #[test]
    fn in_flight_refresh_maps_to_in_progress() {
        let wire: RefreshResponse =
            serde_json::from_str(r#"{"status":"Unknown","startTime":"2030-01-01T00:00:00Z"}"#)
                .unwrap();
        let record = RefreshRecord::from(wire);
        assert_eq!(record.status, RefreshStatus::InProgress);
        assert!(record.duration().is_none());
    }

    #[test]
    fn unknown_refresh_status_is_preserved() {
        assert_eq!(
            RefreshStatus::from("NotStarted"),
            RefreshStatus::Other("NotStarted".into())
        );
    }

    #[test]
    fn dataset_refreshable_defaults_false() {
        let wire: DatasetResponse = serde_json::from_str(r#"{"id":"ds","name":"Sales"}"#).unwrap();
        assert!(!Dataset::from(wire).is_refreshable);
    }

    #[test]
    fn page_without_display_name_uses_section_name() {
        let wire: PageResponse =
            serde_json::from_str(r#"{"name":"ReportSection2","order":1}"#).unwrap();
        let page = ReportPage::from(wire);
        assert_eq!(page.display_name, "ReportSection2");
        assert_eq!(page.order, Some(1));
    }

    #[test]
    fn parameter_type_and_required_flag() {
        let wire: ParameterResponse = serde_json::from_str(
            r#"{"name":"Region","type":"Text","isRequired":true,"currentValue":"EMEA"}"#,
        )
        .unwrap();
        let param = ReportParameter::from(wire);
        assert_eq!(param.kind.as_deref(), Some("Text"));
        assert!(param.required);
        assert_eq!(param.current_value.as_deref(), Some("EMEA"));
    }
}
