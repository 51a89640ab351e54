//! Client library for a Cheshire Cat server (settings, LLM config, version, live chat).
//! Used by the `catctl` CLI.
//!
//! ```no_run
//! use ccat_client::CatClient;
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> ccat_client::Result<()> {
//! let client = CatClient::builder().api_key("secret").build()?;
//! println!("server {}", client.server().version().await?.version);
//!
//! let (in_tx, mut in_rx) = mpsc::channel(32);
//! let (out_tx, mut out_rx) = mpsc::channel(32);
//! out_tx.send("hello".to_string()).await.ok();
//! tokio::spawn(async move {
//!     while let Some(reply) = in_rx.recv().await {
//!         println!("{reply}");
//!     }
//! });
//! client.chat().chat(CancellationToken::new(), in_tx, &mut out_rx).await?;
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod llm;
pub mod messages;
pub mod server;
pub mod settings;
pub mod types;

pub use chat::{run_session, ChatApi, DEFAULT_WS_URL};
pub use client::{CatClient, ClientBuilder, DEFAULT_BASE_URL};
pub use config::{default_config_path, AuthSection, Config, ConfigError, ServerSection};
pub use error::{Error, Result};
pub use llm::LlmApi;
pub use server::ServerApi;
pub use settings::SettingsApi;
pub use types::{
    LlmSchema, LlmSetting, SchemaProperty, Setting, SettingRequest, Version, LLM_CONFIG_NAMES,
};
