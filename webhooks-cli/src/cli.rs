//! Command-line arguments for the webhook listener.

use clap::{Parser, ValueEnum};
use url::Url;

use crate::api::DEFAULT_API_URL;
use crate::relay::ForwardingRule;
use crate::tunnel::ngrok::DEFAULT_NGROK_API;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "webhooks",
    version,
    about = "Receive platform webhooks locally and forward them to your app"
)]
pub struct Args {
    #[arg(long = "forward-to", value_name = "RULE")]
    /// Forward webhooks to a URL, e.g. http://localhost:3000/api/webhook.
    /// Prefix with EVENTS= to forward only some event types, e.g.
    /// deployment.created,domain.created=http://localhost:3000/api/webhook
    pub forward_to: Vec<ForwardingRule>,

    #[arg(long)]
    /// Don't output the webhook payloads
    pub no_log: bool,

    #[arg(long, short)]
    /// Debug mode
    pub debug: bool,

    #[arg(long, short, env = "VERCEL_TOKEN", hide_env_values = true)]
    /// Login token
    pub token: String,

    #[arg(long, short = 'S', env = "VERCEL_TEAM_ID")]
    /// Team id to register the webhook under
    pub scope: Option<String>,

    #[arg(long, env = "VERCEL_API_URL", default_value = DEFAULT_API_URL)]
    /// Platform API base URL
    pub api_url: Url,

    #[arg(long, default_value_t = 0)]
    /// Local port for the webhook server (0 picks a free port)
    pub port: u16,

    #[arg(long, env = "WEBHOOKS_PUBLIC_URL")]
    /// Use an existing public URL that already tunnels to --port instead of starting ngrok
    pub public_url: Option<Url>,

    #[arg(long, env = "NGROK_BIN", default_value = "ngrok")]
    /// ngrok executable
    pub ngrok_bin: String,

    #[arg(long, env = "NGROK_API_URL", default_value = DEFAULT_NGROK_API)]
    /// ngrok agent API address
    pub ngrok_api: Url,

    #[arg(long, value_delimiter = ',', value_name = "EVENTS")]
    /// Additional event types to subscribe to, comma separated
    pub events: Vec<String>,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    /// Log output format
    pub log_format: LogFormat,
}

pub fn args() -> Args {
    Args::parse()
}
