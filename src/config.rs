use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use dialoguer::Password;
use reqwest::Url;

use crate::http_client::resolve_url;

/// Production backend
pub const DEFAULT_BASE_URL: &str = "https://api.livetouch.chat";

/// LiveTouch chat client
#[derive(Parser, Debug)]
#[command(name = "livetouch", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Backend base URL
    #[arg(long, env = "LIVETOUCH_API_URL", default_value = DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Notification feed URL (derived from the base URL when unset)
    #[arg(long, env = "LIVETOUCH_WS_URL")]
    pub ws_url: Option<String>,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "10")]
    pub http_timeout: u64,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "10")]
    pub connect_timeout: u64,

    /// Keep cookies set by the backend
    #[arg(long, env = "LIVETOUCH_WITH_CREDENTIALS", default_value_t = true, action = ArgAction::Set)]
    pub with_credentials: bool,

    /// Treat 403 like 401 and refresh the access token
    #[arg(long, env = "LIVETOUCH_REFRESH_ON_FORBIDDEN", default_value_t = true, action = ArgAction::Set)]
    pub refresh_on_forbidden: bool,

    /// Path to the session store (SQLite)
    #[arg(short = 's', long, env = "LIVETOUCH_STORE_FILE")]
    pub store_file: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        email: String,

        /// Prompted for when omitted
        #[arg(short, long, env = "LIVETOUCH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account
    Register {
        #[arg(long)]
        username: String,

        #[arg(long)]
        surname: String,

        #[arg(long)]
        email: String,

        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,

        /// Token issued by the CAPTCHA provider
        #[arg(long)]
        captcha_token: Option<String>,
    },

    /// Reset a forgotten password
    ForgotPassword {
        #[arg(long)]
        email: String,

        /// Prompted for when omitted
        #[arg(long)]
        new_password: Option<String>,
    },

    /// Show the logged-in user
    Me,

    /// List chats
    Chats,

    /// Start a private chat with the user registered under EMAIL
    CreateChat { email: String },

    /// Update profile fields
    UpdateProfile {
        #[arg(long)]
        username: String,

        #[arg(long)]
        surname: String,

        #[arg(long, default_value = "")]
        bio: String,

        #[arg(long, default_value = "")]
        phone: String,
    },

    /// Upload an image and set it as the avatar
    UploadAvatar { path: PathBuf },

    /// Stream chat notifications
    Watch {
        /// Defaults to the logged-in user
        #[arg(long)]
        user_id: Option<i64>,
    },

    /// Forget the stored session
    Logout,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Backend
    pub base_url: Url,
    pub ws_url: Url,

    // HTTP client
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub with_credentials: bool,
    pub refresh_on_forbidden: bool,

    // Storage
    pub store_file: PathBuf,

    // Logging
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Config {
    /// Configuration with defaults for the given backend
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;
        let ws_url = derive_ws_url(&base_url)?;

        Ok(Config {
            base_url,
            ws_url,
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            with_credentials: true,
            refresh_on_forbidden: true,
            store_file: default_store_file(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        })
    }

    /// Build configuration from parsed CLI arguments (CLI > ENV > defaults)
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let mut config = Config::new(&args.api_url)?;

        if let Some(ref ws_url) = args.ws_url {
            config.ws_url =
                Url::parse(ws_url).with_context(|| format!("Invalid feed URL: {}", ws_url))?;
        }

        config.request_timeout = Duration::from_secs(args.http_timeout);
        config.connect_timeout = Duration::from_secs(args.connect_timeout);
        config.with_credentials = args.with_credentials;
        config.refresh_on_forbidden = args.refresh_on_forbidden;

        if let Some(ref store_file) = args.store_file {
            config.store_file = expand_tilde(store_file);
        }

        config.log_level = args.log_level.clone();
        config.log_format = parse_log_format(&args.log_format);

        Ok(config)
    }

    /// Load configuration: `.env`, then environment and CLI
    pub fn load() -> Result<(Self, Command)> {
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let config = Config::from_args(&args)?;
        Ok((config, args.command))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            anyhow::bail!("Base URL must be http or https: {}", self.base_url);
        }

        if self.base_url.host_str().is_none() {
            anyhow::bail!("Base URL has no host: {}", self.base_url);
        }

        if !matches!(self.ws_url.scheme(), "ws" | "wss") {
            anyhow::bail!("Feed URL must be ws or wss: {}", self.ws_url);
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("HTTP_REQUEST_TIMEOUT must be greater than zero");
        }

        if self.connect_timeout.is_zero() {
            anyhow::bail!("HTTP_CONNECT_TIMEOUT must be greater than zero");
        }

        Ok(())
    }
}

/// Feed URL for a backend: same host, `ws`/`wss` scheme, `/ws` under the base path
pub fn derive_ws_url(base_url: &Url) -> Result<Url> {
    let scheme = match base_url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => anyhow::bail!("Cannot derive feed URL from {} URL", other),
    };

    let mut base = base_url.clone();
    base.set_scheme(scheme)
        .map_err(|_| anyhow::anyhow!("Cannot switch {} to {}", base_url, scheme))?;

    resolve_url(&base, "/ws").context("Failed to derive feed URL")
}

/// Default session store location
fn default_store_file() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("livetouch").join("session.sqlite3"))
        .unwrap_or_else(|| PathBuf::from("livetouch-session.sqlite3"))
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse log format from string
fn parse_log_format(s: &str) -> LogFormat {
    match s.to_lowercase().as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

// === Interactive Prompts ===

/// Read a secret from the terminal without echo
pub fn prompt_secret(prompt: &str) -> Result<String> {
    let secret: String = Password::new()
        .with_prompt(prompt)
        .interact()
        .with_context(|| format!("Failed to read {}", prompt.to_lowercase()))?;

    if secret.is_empty() {
        anyhow::bail!("{} cannot be empty", prompt);
    }

    Ok(secret)
}

/// Read a new secret, asking twice
pub fn prompt_new_secret(prompt: &str) -> Result<String> {
    let secret: String = Password::new()
        .with_prompt(prompt)
        .with_confirmation("Repeat to confirm", "Values do not match")
        .interact()
        .with_context(|| format!("Failed to read {}", prompt.to_lowercase()))?;

    if secret.is_empty() {
        anyhow::bail!("{} cannot be empty", prompt);
    }

    Ok(secret)
}
