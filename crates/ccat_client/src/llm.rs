//! LLM configuration API.

use serde_json::{Map, Value};

use crate::client::CatClient;
use crate::error::Result;
use crate::types::{LlmSetting, LlmSettingsEnvelope, Setting, SettingEnvelope};

/// LLM API client.
pub struct LlmApi {
    client: CatClient,
}

impl LlmApi {
    pub(crate) fn new(client: CatClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<LlmSetting>> {
        let envelope: LlmSettingsEnvelope = self.client.get(&["llm", "settings"]).await?;
        Ok(envelope.settings)
    }

    pub async fn get(&self, name: &str) -> Result<LlmSetting> {
        self.client.get(&["llm", "settings", name]).await
    }

    /// Replace the values of the named LLM configuration and make it active.
    /// Servers that answer with the bare configuration yield `None`.
    pub async fn update(&self, name: &str, values: &Map<String, Value>) -> Result<Option<Setting>> {
        let envelope: SettingEnvelope = self
            .client
            .put(&["llm", "settings", name], values)
            .await?;
        Ok(envelope.setting)
    }
}
