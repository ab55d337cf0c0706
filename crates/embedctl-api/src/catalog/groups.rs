// Workspace ("group") and report endpoints

use tracing::debug;

use crate::catalog::client::CatalogClient;
use crate::catalog::types::{
    PageResponse, ParameterResponse, ReportResponse, ValueList, WorkspaceResponse,
};
use crate::error::Error;

impl CatalogClient {
    /// List all workspaces visible to the authenticated principal, in the
    /// order the service returns them.
    ///
    /// `GET groups`
    pub async fn list_workspaces(&self) -> Result<Vec<WorkspaceResponse>, Error> {
        let url = self.url(&["groups"])?;
        let list: ValueList<WorkspaceResponse> = self.get(url).await?;
        debug!(count = list.value.len(), "listed workspaces");
        Ok(list.value)
    }

    /// List reports within one workspace.
    ///
    /// `GET groups/{workspace_id}/reports`
    pub async fn list_reports(&self, workspace_id: &str) -> Result<Vec<ReportResponse>, Error> {
        let url = self.url(&["groups", workspace_id, "reports"])?;
        let list: ValueList<ReportResponse> = self.get(url).await?;
        debug!(workspace_id, count = list.value.len(), "listed reports");
        Ok(list.value)
    }

    /// Fetch a single report's metadata.
    ///
    /// `GET groups/{workspace_id}/reports/{report_id}`
    pub async fn get_report(
        &self,
        workspace_id: &str,
        report_id: &str,
    ) -> Result<ReportResponse, Error> {
        let url = self.url(&["groups", workspace_id, "reports", report_id])?;
        self.get(url).await
    }

    /// Pages of a report in the order the service returns them.
    ///
    /// `GET groups/{workspace_id}/reports/{report_id}/pages`
    pub async fn list_report_pages(
        &self,
        workspace_id: &str,
        report_id: &str,
    ) -> Result<Vec<PageResponse>, Error> {
        let url = self.url(&["groups", workspace_id, "reports", report_id, "pages"])?;
        let list: ValueList<PageResponse> = self.get(url).await?;
        debug!(workspace_id, report_id, count = list.value.len(), "listed report pages");
        Ok(list.value)
    }

    /// `GET groups/{workspace_id}/reports/{report_id}/parameters`
    pub async fn list_report_parameters(
        &self,
        workspace_id: &str,
        report_id: &str,
    ) -> Result<Vec<ParameterResponse>, Error> {
        let url = self.url(&["groups", workspace_id, "reports", report_id, "parameters"])?;
        let list: ValueList<ParameterResponse> = self.get(url).await?;
        debug!(workspace_id, report_id, count = list.value.len(), "listed report parameters");
        Ok(list.value)
    }
}
