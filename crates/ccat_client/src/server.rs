//! Server status API.

use crate::client::CatClient;
use crate::error::Result;
use crate::types::Version;

/// Server API client.
pub struct ServerApi {
    client: CatClient,
}

impl ServerApi {
    pub(crate) fn new(client: CatClient) -> Self {
        Self { client }
    }

    pub async fn version(&self) -> Result<Version> {
        self.client.get(&[]).await
    }

    /// Simple connectivity check - returns true if the server answers.
    pub async fn is_up(&self) -> bool {
        self.version().await.is_ok()
    }
}
