//! catctl: command line client for a Cheshire Cat server.
//! Reads config, then manages settings and LLM configuration over HTTP or
//! relays an interactive chat over the server's WebSocket.

use anyhow::{Context, Result};
use ccat_client::config::{self, Config};
use ccat_client::{CatClient, Setting, SettingRequest, LLM_CONFIG_NAMES};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::engine::{ArgValueCandidates, CompletionCandidate};
use clap_complete::{generate, CompleteEnv, Shell};
use comfy_table::{presets, Table};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Manage and chat with a Cheshire Cat server.
#[derive(Parser)]
#[command(name = "catctl", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (default: ~/.catctl/config.yaml)
    #[arg(long, global = true, env = "CATCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Server HTTP URL (default: http://localhost:1865)
    #[arg(long, global = true, env = "CATCTL_URL")]
    url: Option<String>,

    /// Chat WebSocket URL (default: ws://localhost:1865/ws/user)
    #[arg(long, global = true, env = "CATCTL_WS_URL")]
    ws_url: Option<String>,

    /// API key sent as the Access_token header
    #[arg(long, global = true, env = "CATCTL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chat with the cat: stdin lines go out, replies are printed
    Chat,

    /// Manage settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },

    /// Manage LLM settings
    Llm {
        #[command(subcommand)]
        command: LlmCommand,
    },

    /// Show client and server version
    Version,

    /// Generate a static shell completion script. For completion of live
    /// setting IDs and LLM fields, source `COMPLETE=<shell> catctl` instead.
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Get settings, all of them or only the given IDs
    Get {
        /// Setting IDs to show
        #[arg(add = ArgValueCandidates::new(setting_id_candidates))]
        ids: Vec<String>,

        /// Search query used to filter the settings by name
        #[arg(long)]
        search: Option<String>,
    },

    /// Create a setting
    Create(SettingArgs),

    /// Update a setting
    Update {
        /// Setting ID
        #[arg(add = ArgValueCandidates::new(setting_id_candidates))]
        id: String,

        #[command(flatten)]
        setting: SettingArgs,
    },

    /// Delete a setting
    Delete {
        /// Setting ID
        #[arg(add = ArgValueCandidates::new(setting_id_candidates))]
        id: String,
    },
}

#[derive(Args)]
struct SettingArgs {
    /// Setting value as a JSON object
    value: Option<String>,

    /// The name of the setting
    #[arg(long, default_value = "")]
    name: String,

    /// The category of the setting
    #[arg(long, default_value = "")]
    category: String,
}

impl SettingArgs {
    fn into_request(self) -> Result<SettingRequest> {
        let value = match self.value.as_deref() {
            Some(json) => serde_json::from_str::<Map<String, Value>>(json)
                .context("invalid JSON setting")?,
            None => Map::new(),
        };
        Ok(SettingRequest::new(self.name)
            .with_category(self.category)
            .with_value(value))
    }
}

#[derive(Subcommand)]
enum LlmCommand {
    /// Print LLM settings as YAML, all of them or the named one
    Get {
        /// LLM config name, e.g. LLMOllamaConfig
        #[arg(add = ArgValueCandidates::new(llm_name_candidates))]
        name: Option<String>,
    },

    /// Update an LLM setting
    Update {
        /// LLM config name, e.g. LLMOllamaConfig
        #[arg(add = ArgValueCandidates::new(llm_name_candidates))]
        name: String,

        /// Field to set, as key=value (repeatable)
        #[arg(
            long = "set",
            value_name = "KEY=VALUE",
            add = ArgValueCandidates::new(llm_field_candidates)
        )]
        set: Vec<String>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "catctl=debug,ccat_client=debug"
    } else {
        "catctl=info,ccat_client=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let cfg = match &cli.config {
        Some(path) => config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => match config::default_config_path() {
            Some(path) => config::load_or_default(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => Config::default(),
        },
    };
    Ok(cfg.with_overrides(cli.url.clone(), cli.ws_url.clone(), cli.api_key.clone()))
}

fn main() {
    CompleteEnv::with_factory(Cli::command).complete();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Shell completions don't need a client
    if let Command::Completions { shell } = &cli.command {
        generate(*shell, &mut Cli::command(), "catctl", &mut std::io::stdout());
        return;
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to create runtime: {}", e);
            process::exit(1);
        });

    let result = rt.block_on(run(cli));
    // The stdin reader of `chat` may still be parked on a blocking read.
    rt.shutdown_background();

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli)?;
    let client = cfg.client_builder().build()?;

    match cli.command {
        Command::Chat => chat(&client).await,
        Command::Settings { command } => settings(&client, command).await,
        Command::Llm { command } => llm(&client, command).await,
        Command::Version => version(&client).await,
        Command::Completions { .. } => Ok(()),
    }
}

async fn chat(client: &CatClient) -> Result<()> {
    let (in_tx, mut in_rx) = mpsc::channel::<String>(32);
    let (out_tx, mut out_rx) = mpsc::channel::<String>(32);
    let cancel = CancellationToken::new();

    println!("Say hi!");

    // EOF on stdin drops `out_tx`, which closes the session.
    let stdin_task = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if out_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(reply) = in_rx.recv().await {
            println!("{}", reply);
        }
    });

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt, cancelling");
            interrupt.cancel();
        }
    });

    let result = client.chat().chat(cancel, in_tx, &mut out_rx).await;
    stdin_task.abort();
    let _ = printer.await;

    result.context("chat session ended")
}

async fn settings(client: &CatClient, command: SettingsCommand) -> Result<()> {
    let api = client.settings();
    let shown = match command {
        SettingsCommand::Get { ids, search } => {
            if search.is_none() && ids.len() == 1 {
                vec![api.get(&ids[0]).await?]
            } else {
                let all = api.list(search.as_deref()).await?;
                filter_by_ids(all, &ids)
            }
        }
        SettingsCommand::Create(args) => {
            let request = args.into_request()?;
            vec![api.create(&request).await.context("creating setting")?]
        }
        SettingsCommand::Update { id, setting } => {
            let request = setting.into_request()?;
            match api.update(&id, &request).await.context("updating setting")? {
                Some(updated) => vec![updated],
                None => {
                    println!("{} updated", id);
                    return Ok(());
                }
            }
        }
        SettingsCommand::Delete { id } => match api.delete(&id).await.context("deleting setting")? {
            Some(deleted) => vec![deleted],
            None => {
                println!("{} deleted", id);
                return Ok(());
            }
        },
    };

    println!("{}", settings_table(&shown));
    Ok(())
}

/// Keep only `ids`, or everything when no ids were given.
fn filter_by_ids(settings: Vec<Setting>, ids: &[String]) -> Vec<Setting> {
    if ids.is_empty() {
        return settings;
    }
    settings
        .into_iter()
        .filter(|s| ids.iter().any(|id| *id == s.id))
        .collect()
}

fn settings_table(settings: &[Setting]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_header(vec!["ID", "NAME", "CATEGORY"]);
    for setting in settings {
        table.add_row(vec![
            setting.id.as_str(),
            setting.name.as_str(),
            setting.category.as_str(),
        ]);
    }
    table
}

async fn llm(client: &CatClient, command: LlmCommand) -> Result<()> {
    let api = client.llm();
    match command {
        LlmCommand::Get { name } => {
            let settings = match name {
                Some(name) => {
                    warn_if_unknown(&name);
                    vec![api.get(&name).await?]
                }
                None => api.list().await?,
            };
            for setting in &settings {
                println!("{}", serde_yaml::to_string(setting)?);
            }
        }
        LlmCommand::Update { name, set } => {
            warn_if_unknown(&name);
            let values = parse_key_values(&set)?;
            api.update(&name, &values).await?;
            println!("{} updated", name);
        }
    }
    Ok(())
}

fn warn_if_unknown(name: &str) {
    if !LLM_CONFIG_NAMES.contains(&name) {
        tracing::warn!(
            name,
            known = %LLM_CONFIG_NAMES.join(", "),
            "not a stock LLM config name"
        );
    }
}

fn parse_key_values(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut values = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("invalid set flag for '{}': missing value", pair))?;
        values.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(values)
}

async fn version(client: &CatClient) -> Result<()> {
    let client_version = env!("CARGO_PKG_VERSION");
    match client.server().version().await {
        Ok(version) => {
            println!("😸 {}", version.status);
            println!("Client Version: {}", client_version);
            println!("Server Version: {}", version.version);
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not fetch server version");
            println!("Client Version: {}", client_version);
            println!("Server Version: unknown");
        }
    }
    Ok(())
}

/// Upper bound on a server round trip made while the shell waits.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(2);

fn llm_name_candidates() -> Vec<CompletionCandidate> {
    LLM_CONFIG_NAMES
        .iter()
        .map(|name| CompletionCandidate::new(*name))
        .collect()
}

fn setting_id_candidates() -> Vec<CompletionCandidate> {
    complete_from_server(|client| async move { setting_ids(&client).await })
}

fn llm_field_candidates() -> Vec<CompletionCandidate> {
    complete_from_server(|client| async move { llm_fields(&client).await })
}

/// Runs `fetch` against the configured server. Any failure completes nothing.
fn complete_from_server<F, Fut>(fetch: F) -> Vec<CompletionCandidate>
where
    F: FnOnce(CatClient) -> Fut,
    Fut: Future<Output = ccat_client::Result<Vec<CompletionCandidate>>>,
{
    let Some(client) = completion_client() else {
        return Vec::new();
    };
    let Ok(rt) = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    else {
        return Vec::new();
    };
    rt.block_on(fetch(client)).unwrap_or_default()
}

/// Client for completion requests. The command line is not parsed yet, so
/// only the config file and the environment are consulted.
fn completion_client() -> Option<CatClient> {
    let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
    let cfg = match env("CATCTL_CONFIG") {
        Some(path) => config::load(Path::new(&path)).ok()?,
        None => match config::default_config_path() {
            Some(path) => config::load_or_default(&path).ok()?,
            None => Config::default(),
        },
    };
    cfg.with_overrides(env("CATCTL_URL"), env("CATCTL_WS_URL"), env("CATCTL_API_KEY"))
        .client_builder()
        .timeout(COMPLETION_TIMEOUT)
        .build()
        .ok()
}

/// Stored setting IDs, described by their names.
async fn setting_ids(client: &CatClient) -> ccat_client::Result<Vec<CompletionCandidate>> {
    let settings = client.settings().list(None).await?;
    Ok(settings
        .into_iter()
        .map(|setting| {
            let help = (!setting.name.is_empty()).then(|| setting.name.into());
            CompletionCandidate::new(setting.id).help(help)
        })
        .collect())
}

/// `key=` prefixes for every field any LLM config schema declares.
async fn llm_fields(client: &CatClient) -> ccat_client::Result<Vec<CompletionCandidate>> {
    let mut fields = BTreeMap::new();
    for setting in client.llm().list().await? {
        let Some(schema) = setting.schema else {
            continue;
        };
        for (key, property) in schema.properties {
            fields.entry(key).or_insert(property.title);
        }
    }
    Ok(fields
        .into_iter()
        .map(|(key, title)| {
            let help = (!title.is_empty()).then(|| title.into());
            CompletionCandidate::new(format!("{}=", key)).help(help)
        })
        .collect())
}
