//! Build history endpoints

use kiln_core::domain::build::BuildRecord;

use crate::KilnClient;
use crate::error::Result;

impl KilnClient {
    /// List every recorded build, oldest first
    pub async fn list_builds(&self) -> Result<Vec<BuildRecord>> {
        let url = format!("{}/builds", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Get a single build by its record id
    ///
    /// A missing build surfaces as an `ApiError` with status 404, see
    /// [`ClientError::is_not_found`](crate::ClientError::is_not_found).
    pub async fn get_build(&self, id: i64) -> Result<BuildRecord> {
        let url = format!("{}/builds/{}", self.base_url, id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}
