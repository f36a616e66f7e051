//! Line-oriented stand-in for the chat widget.
//!
//! Plain lines are sent as messages. Lines starting with `:` drive the
//! host-side state the widget would normally own:
//!
//! ```text
//! :screen {"screen": "dashboard", "saldo": 1200}   push ambient context
//! :clear                                           drop ambient context
//! :route /flujo-de-caja                            set the current route
//! :currency USD                                    set the currency preference
//! :quit
//! ```

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use mycfo_context::{
    AmbientContextProvider, AssistConfig, AuthHeaders, ContextRouter, ConversationMessage,
    HttpAssistant, HttpBackend, MemorySession, SessionStore,
};

fn load_config() -> Result<AssistConfig> {
    let path = std::env::var("MYCFO_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| AssistConfig::default_path());

    let config = if path.exists() {
        tracing::info!(path = %path.display(), "loading config");
        AssistConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?
    } else {
        let base = std::env::var("MYCFO_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        tracing::info!(base = %base, "no config file, using gateway layout");
        AssistConfig::for_gateway(&base)
    };

    let config = config.with_env_overrides();
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn session_from_env() -> MemorySession {
    let mut session = MemorySession::new();
    if let (Ok(sub), Ok(token)) = (std::env::var("MYCFO_SUB"), std::env::var("MYCFO_TOKEN")) {
        session = session.with_auth(AuthHeaders::bearer(sub, &token));
    }
    session
}

/// Handle `:screen <json>`.
fn push_ambient(ambient: &AmbientContextProvider, raw: &str) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(raw).context("invalid JSON")?;
    if !ambient.set_value(value) {
        anyhow::bail!("ambient context must be a JSON object");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = load_config()?;
    let assistant_url = config
        .assistant
        .url
        .clone()
        .context("assistant.url is not configured")?;

    let session = Arc::new(session_from_env());
    let backend = Arc::new(HttpBackend::new(&config.http).context("failed to build backend client")?);
    let assistant = Arc::new(
        HttpAssistant::new(assistant_url, &config.http)?.with_auth(session.auth_headers()),
    );
    let ambient = Arc::new(AmbientContextProvider::new());
    let router = ContextRouter::new(config, backend, assistant, session.clone(), ambient.clone());

    let mut history: Vec<ConversationMessage> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix(':') {
            let (name, arg) = command.split_once(' ').unwrap_or((command, ""));
            let arg = arg.trim();
            match name {
                "quit" | "q" => break,
                "clear" => ambient.clear(),
                "route" => router.set_route(Some(arg.to_string())),
                "currency" => session.set_currency(Some(arg.to_string())),
                "screen" => {
                    if let Err(e) = push_ambient(&ambient, arg) {
                        eprintln!("{:#}", e);
                    }
                }
                other => eprintln!("unknown command :{}", other),
            }
            continue;
        }

        match router.handle(line, &history).await {
            Ok(reply) => {
                println!("{}", reply.reply.response);
                for link in reply.reply.links() {
                    println!("  -> {} ({})", link.label, link.route);
                }
                history.push(ConversationMessage::user(line));
                history.push(ConversationMessage::bot(reply.reply.response));
            }
            Err(e) => eprintln!("error: {}", e),
        }
    }

    Ok(())
}
