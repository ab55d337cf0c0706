// Dataset endpoints
//
// Datasets back reports; refreshing one re-runs its data import so embedded
// reports show current numbers.

use tracing::debug;

use crate::catalog::client::CatalogClient;
use crate::catalog::types::{DatasetResponse, RefreshResponse, ValueList};
use crate::error::Error;

impl CatalogClient {
    /// `GET groups/{workspace_id}/datasets`
    pub async fn list_datasets(&self, workspace_id: &str) -> Result<Vec<DatasetResponse>, Error> {
        let url = self.url(&["groups", workspace_id, "datasets"])?;
        let list: ValueList<DatasetResponse> = self.get(url).await?;
        debug!(workspace_id, count = list.value.len(), "listed datasets");
        Ok(list.value)
    }

    /// Queue a dataset refresh. The service answers `202 Accepted` with an
    /// empty body; progress shows up in [`refresh_history`](Self::refresh_history).
    ///
    /// `POST groups/{workspace_id}/datasets/{dataset_id}/refreshes`
    pub async fn refresh_dataset(&self, workspace_id: &str, dataset_id: &str) -> Result<(), Error> {
        let url = self.url(&["groups", workspace_id, "datasets", dataset_id, "refreshes"])?;
        self.post_no_response(url).await?;
        debug!(workspace_id, dataset_id, "dataset refresh queued");
        Ok(())
    }

    /// Most recent refreshes first, optionally limited to `top` entries.
    ///
    /// `GET groups/{workspace_id}/datasets/{dataset_id}/refreshes`
    pub async fn refresh_history(
        &self,
        workspace_id: &str,
        dataset_id: &str,
        top: Option<u32>,
    ) -> Result<Vec<RefreshResponse>, Error> {
        let url = self.url(&["groups", workspace_id, "datasets", dataset_id, "refreshes"])?;
        let params: Vec<(&str, String)> =
            top.map(|n| ("$top", n.to_string())).into_iter().collect();
        let list: ValueList<RefreshResponse> = self.get_with_params(url, &params).await?;
        Ok(list.value)
    }
}
