//! Command-line argument parsing for a single-binary frontend with no
//! daemon/RPC split: one in-process Agent Loop driven by a bus, not a
//! client talking to a separate gateway process.

use clap::{Parser, Subcommand};

/// KafClaw — multi-channel AI agent runtime.
#[derive(Parser)]
#[command(name = "kafclaw")]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Enable verbose (debug-level) logging, overriding the config file.
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,

    /// Workspace root (defaults to the current directory).
    #[arg(short, long, global = true)]
    pub(crate) workspace: Option<String>,

    #[command(subcommand)]
    pub(crate) command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the agent over a stdin/stdout CLI channel (default command).
    Run(RunArgs),

    /// Initialize the current directory as a KafClaw workspace.
    Init,

    /// Run startup health checks against the resolved configuration.
    Doctor,

    /// Inspect and verify the audit chain.
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },
}

#[derive(Subcommand)]
pub(crate) enum AuditCommands {
    /// Verify the hash chain of the workspace's audit log.
    Verify,
}

#[derive(clap::Args)]
pub(crate) struct RunArgs {
    /// Agent identity presented in the assembled system message.
    #[arg(long, default_value = "kafclaw")]
    pub(crate) agent_name: String,

    /// Model identifier passed to every completion call, overriding the
    /// config file's `[model].model`.
    #[arg(long)]
    pub(crate) model: Option<String>,

    /// Use a pure in-memory storage backend instead of the embedded
    /// on-disk store (handy for a quick trial run; nothing persists).
    #[arg(long)]
    pub(crate) in_memory: bool,

    #[command(flatten)]
    pub(crate) provider: ProviderArgs,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self { agent_name: "kafclaw".to_string(), model: None, in_memory: false, provider: ProviderArgs::default() }
    }
}

/// LLM provider selection. With neither flag set, defaults to a local
/// `OpenAI`-compatible endpoint at `localhost:1234` (LM Studio's default),
/// which needs no API key.
#[derive(clap::Args, Default)]
pub(crate) struct ProviderArgs {
    /// Custom `OpenAI`-compatible base URL (LM Studio, vLLM, a
    /// self-hosted gateway). Mutually exclusive with `--api-key` alone
    /// selecting the public `OpenAI` API.
    #[arg(long, env = "KAFCLAW_LLM_BASE_URL")]
    pub(crate) base_url: Option<String>,

    /// API key for the selected endpoint.
    #[arg(long, env = "KAFCLAW_LLM_API_KEY")]
    pub(crate) api_key: Option<String>,
}
