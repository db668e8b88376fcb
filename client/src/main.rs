use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use coconnect::api::{Api, HttpApi};
use coconnect::connection::{ConnectionManager, ConnectionState};
use coconnect::identity::IdentityCache;
use coconnect::logging;
use coconnect::registry::{Event, EventKey, LifecycleKind};
use coconnect::stores::{CannedResponseStore, ChannelStore, ConversationStore, PresenceStore};
use shared::config::load_config;
use shared::types::ClientConfig;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "coconnect")]
#[command(version)]
#[command(about = "Follow a CoConnect inbox from the terminal")]
struct Cli {
    /// Path to the TOML client configuration
    #[arg(short, long, default_value = "coconnect.toml")]
    config: PathBuf,

    /// Also follow messages and typing in this conversation
    #[arg(long)]
    conversation: Option<String>,

    /// Override `[logging] level`
    #[arg(long)]
    log_level: Option<String>,
}

/// Socket identity from the cache file, when one is configured.
fn resolve_identity(config: &ClientConfig) -> Result<Option<String>> {
    let Some(path) = &config.identity.cache_path else {
        return Ok(None);
    };
    let mut cache = IdentityCache::load(path)
        .with_context(|| format!("Failed to read identity cache {}", path.display()))?;
    let id = cache.resolve(&config.identity);
    if config.identity.channel_token.is_some() {
        cache.set_channel_token(config.identity.channel_token.clone());
    }
    if let Err(e) = cache.save() {
        warn!("Could not save identity cache: {}", e);
    }
    Ok(Some(id))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    logging::init(cli.log_level.as_deref().unwrap_or(&config.logging.level));

    let identity = resolve_identity(&config)?;
    let api: Arc<dyn Api> = Arc::new(HttpApi::from_config(&config));
    let conn = ConnectionManager::from_config(&config, identity.clone());

    let _server_log = conn.on(EventKey::AnyServer, |event| {
        if let Event::Server { name, data } = event {
            info!("<- {} {}", name, data);
        }
    });
    let _lifecycle_log: Vec<_> = [
        LifecycleKind::Established,
        LifecycleKind::Lost,
        LifecycleKind::Failed,
        LifecycleKind::Closed,
    ]
    .into_iter()
    .map(|kind| {
        conn.on(EventKey::Lifecycle(kind), |event| {
            if let Event::Lifecycle(lifecycle) = event {
                info!("Connection: {:?}", lifecycle);
            }
        })
    })
    .collect();

    let mut channels = ChannelStore::attach(&conn, Arc::clone(&api));
    channels.refetch_on_reconnect(&conn);
    let mut canned = CannedResponseStore::attach(&conn, Arc::clone(&api));
    canned.refetch_on_reconnect(&conn);
    let mut presence = PresenceStore::attach(&conn, Arc::clone(&api));
    presence.refetch_on_reconnect(&conn);

    let conversation = cli.conversation.as_ref().map(|id| {
        let user_id = identity
            .clone()
            .or_else(|| config.identity.user_id.clone())
            .unwrap_or_default();
        ConversationStore::attach(&conn, Arc::clone(&api), id.clone(), user_id)
    });

    conn.connect();

    let (ch, cr, pr) = tokio::join!(channels.load(), canned.load(), presence.load());
    for (what, result) in [("channels", ch), ("canned responses", cr), ("presence", pr)] {
        match result {
            Ok(()) => {}
            Err(e) if e.is_session_expired() => {
                error!("Session expired while loading {}; sign in again", what);
                conn.disconnect().await;
                return Err(e).context("Session expired");
            }
            Err(e) => warn!("Could not load {}: {}", what, e),
        }
    }
    if let Some(conversation) = &conversation {
        if let Err(e) = conversation.load().await {
            warn!("Could not load conversation {}: {}", conversation.conversation_id(), e);
        }
    }
    info!(
        "Loaded {} channels, {} canned responses, {} presence entries",
        channels.len(),
        canned.len(),
        presence.len()
    );

    let mut status = conn.watch_status();
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("Failed to listen for Ctrl-C")?;
            info!("Shutting down");
        }
        _ = status.wait_for(|s| *s == ConnectionState::Failed) => {
            error!("Server unreachable; giving up");
        }
    }

    conn.disconnect().await;
    if let Some(conversation) = &conversation {
        info!(
            "{} messages in {}",
            conversation.messages().len(),
            conversation.conversation_id()
        );
    }
    Ok(())
}
