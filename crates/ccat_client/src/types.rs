//! Request and response types for the REST endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored setting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    #[serde(rename = "setting_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub value: Map<String, Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

/// Body of a setting create or update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SettingRequest {
    pub name: String,
    pub category: String,
    pub value: Map<String, Value>,
}

impl SettingRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_value(mut self, value: Map<String, Value>) -> Self {
        self.value = value;
        self
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SettingsEnvelope {
    #[serde(default)]
    pub settings: Vec<Setting>,
}

/// `{"setting": ..}` body. Update and delete answers may leave it out.
#[derive(Debug, Deserialize)]
pub(crate) struct SettingEnvelope {
    #[serde(default)]
    pub setting: Option<Setting>,
}

impl SettingEnvelope {
    /// The setting, for endpoints that always return one.
    pub fn required(self) -> Result<Setting, serde_json::Error> {
        self.setting
            .ok_or_else(|| serde::de::Error::missing_field("setting"))
    }
}

/// Configuration of one LLM backend, with the schema of its fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmSetting {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub value: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<LlmSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmSchema {
    #[serde(rename = "humanReadableName", default)]
    pub human_readable_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: BTreeMap<String, SchemaProperty>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaProperty {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub default: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LlmSettingsEnvelope {
    #[serde(default)]
    pub settings: Vec<LlmSetting>,
}

/// Names of the LLM configurations a stock server understands.
pub const LLM_CONFIG_NAMES: &[&str] = &[
    "LLMOpenAIChatConfig",
    "LLMOpenAIConfig",
    "LLMGeminiChatConfig",
    "LLMCohereConfig",
    "LLMAzureOpenAIConfig",
    "LLMAzureChatOpenAIConfig",
    "LLMHuggingFaceEndpointConfig",
    "LLMHuggingFaceTextGenInferenceConfig",
    "LLMOllamaConfig",
    "LLMOpenAICompatibleConfig",
    "LLMCustomConfig",
    "LLMDefaultConfig",
];

/// Server status and version, as served on `/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Version {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: String,
}
