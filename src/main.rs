use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use livetouch_client::auth::RegisterRequest;
use livetouch_client::config::{self, Command, Config, LogFormat};
use livetouch_client::models::ProfileUpdate;
use livetouch_client::notifications::{FeedEvent, NotificationFeed};
use livetouch_client::{LiveTouchApi, SessionClient, SessionError, SqliteStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let (config, command) = Config::load()?;
    config.validate()?;

    init_logging(&config);

    tracing::debug!(
        base_url = %config.base_url,
        store = %config.store_file.display(),
        "Configuration loaded"
    );

    let store = SqliteStore::open(&config.store_file).with_context(|| {
        format!(
            "Failed to open session store: {}",
            config.store_file.display()
        )
    })?;

    let client = Arc::new(SessionClient::new(&config, Arc::new(store))?);
    let api = LiveTouchApi::new(client);

    match run(&api, &config, command).await {
        Err(e) if is_session_expired(&e) => {
            tracing::error!("{:#}", e);
            anyhow::bail!("Session expired, log in again with `livetouch login`");
        }
        other => other,
    }
}

/// Initialize logging on stderr so command output stays machine-readable
fn init_logging(config: &Config) {
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn is_session_expired(e: &anyhow::Error) -> bool {
    e.downcast_ref::<SessionError>()
        .is_some_and(SessionError::is_session_expired)
}

async fn run(api: &LiveTouchApi, config: &Config, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => config::prompt_secret("Password")?,
            };
            let user = api.login(&email, &password).await?;
            print_json(&user)?;
        }

        Command::Register {
            username,
            surname,
            email,
            password,
            captcha_token,
        } => {
            let password = match password {
                Some(p) => p,
                None => config::prompt_new_secret("Password")?,
            };
            api.register(&RegisterRequest {
                username,
                usersurname: surname,
                email,
                password,
                captcha_token,
            })
            .await?;
            println!("Registered. Check your inbox to verify the address.");
        }

        Command::ForgotPassword {
            email,
            new_password,
        } => {
            let new_password = match new_password {
                Some(p) => p,
                None => config::prompt_new_secret("New password")?,
            };
            api.forgot_password(&email, &new_password).await?;
            println!("Password reset requested for {}", email);
        }

        Command::Me => {
            let user = api.me().await?;
            print_json(&user)?;
        }

        Command::Chats => {
            let chats = api.get_chats().await?;
            print_json(&chats)?;
        }

        Command::CreateChat { email } => {
            let chat_id = api.create_private_chat(&email).await.map_err(|e| {
                if e.status() == Some(404) {
                    anyhow::anyhow!("No user is registered under {}", email)
                } else {
                    e.into()
                }
            })?;
            print_json(&serde_json::json!({ "chatId": chat_id }))?;
        }

        Command::UpdateProfile {
            username,
            surname,
            bio,
            phone,
        } => {
            let updated = api
                .update_profile(&ProfileUpdate {
                    username,
                    surname,
                    bio,
                    phone,
                })
                .await?;
            print_json(&updated)?;
        }

        Command::UploadAvatar { path } => {
            let url = api.upload_avatar(&path).await?;
            print_json(&serde_json::json!({ "avatar_url": url }))?;
        }

        Command::Watch { user_id } => {
            let user_id = match user_id {
                Some(id) => id,
                None => match api.client().credentials().cached_user()? {
                    Some(user) => user.id,
                    None => api.me().await?.id,
                },
            };
            watch(config, user_id).await?;
        }

        Command::Logout => {
            api.logout()?;
            println!("Logged out");
        }
    }

    Ok(())
}

/// Print feed events until the server closes the feed or Ctrl+C
async fn watch(config: &Config, user_id: i64) -> Result<()> {
    let mut feed = NotificationFeed::connect(&config.ws_url, user_id).await?;

    loop {
        tokio::select! {
            event = feed.next_event() => match event {
                Some(Ok(FeedEvent::ChatCreated(created))) => {
                    print_json(&serde_json::Value::Object(created.payload))?;
                }
                Some(Ok(FeedEvent::Other { kind, .. })) => {
                    tracing::debug!(kind = %kind, "Ignoring feed event");
                }
                Some(Err(e)) => tracing::warn!("Feed error: {}", e),
                None => {
                    tracing::info!("Notification feed closed");
                    return Ok(());
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C signal, closing feed...");
                feed.close().await?;
                return Ok(());
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
