//! Settings API.

use crate::client::CatClient;
use crate::error::Result;
use crate::types::{Setting, SettingEnvelope, SettingRequest, SettingsEnvelope};

/// Settings API client.
pub struct SettingsApi {
    client: CatClient,
}

impl SettingsApi {
    pub(crate) fn new(client: CatClient) -> Self {
        Self { client }
    }

    /// List settings, optionally filtered by a name search.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Setting>> {
        let envelope: SettingsEnvelope = match search.filter(|s| !s.is_empty()) {
            Some(search) => {
                self.client
                    .get_with_query(&["settings"], &[("search", search)])
                    .await?
            }
            None => self.client.get(&["settings"]).await?,
        };
        Ok(envelope.settings)
    }

    pub async fn get(&self, id: &str) -> Result<Setting> {
        let envelope: SettingEnvelope = self.client.get(&["settings", id]).await?;
        Ok(envelope.required()?)
    }

    pub async fn create(&self, request: &SettingRequest) -> Result<Setting> {
        let envelope: SettingEnvelope = self.client.post(&["settings"], request).await?;
        Ok(envelope.required()?)
    }

    /// Update a setting. `None` when the server did not echo it back.
    pub async fn update(&self, id: &str, request: &SettingRequest) -> Result<Option<Setting>> {
        let envelope: SettingEnvelope = self.client.put(&["settings", id], request).await?;
        Ok(envelope.setting)
    }

    /// Delete a setting, returning what the server removed if it says.
    pub async fn delete(&self, id: &str) -> Result<Option<Setting>> {
        let envelope: SettingEnvelope = self.client.delete(&["settings", id]).await?;
        Ok(envelope.setting)
    }
}
