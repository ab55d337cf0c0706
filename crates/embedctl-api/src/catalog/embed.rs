// Embed token endpoint

use tracing::debug;

use crate::catalog::client::CatalogClient;
use crate::catalog::types::{GenerateTokenRequest, GenerateTokenResponse};
use crate::error::Error;

impl CatalogClient {
    /// Issue a short-lived embed token for one report.
    ///
    /// `POST groups/{workspace_id}/reports/{report_id}/GenerateToken`
    pub async fn generate_report_token(
        &self,
        workspace_id: &str,
        report_id: &str,
        request: &GenerateTokenRequest,
    ) -> Result<GenerateTokenResponse, Error> {
        let url = self.url(&["groups", workspace_id, "reports", report_id, "GenerateToken"])?;
        let resp: GenerateTokenResponse = self.post(url, request).await?;
        debug!(
            workspace_id,
            report_id,
            expiration = %resp.expiration,
            "generated embed token"
        );
        Ok(resp)
    }
}
