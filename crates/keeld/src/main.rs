//! keeld — keel record-storage daemon.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use keel_core::config::KeelConfig;
use keel_core::identity::Keypair;
use keel_core::pk;

use keel_services::dht::MemorySource;
use keel_services::helper::read_password_from_helper;
use keel_services::{Backend, DhtClient, IdentityResolver, RecordSource, RecordStore};

/// How often the daemon re-publishes its own public-key record.
const REPUBLISH_INTERVAL: Duration = Duration::from_secs(4 * 3600);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = KeelConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = KeelConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        KeelConfig::default()
    });
    tracing::info!(state_dir = %config.node.state_dir.display(), "keeld starting");

    std::fs::create_dir_all(&config.node.state_dir).with_context(|| {
        format!(
            "failed to create state dir: {}",
            config.node.state_dir.display()
        )
    })?;

    // Storage backend
    let backend = Backend::init_by_name(&config.node.backend, &config.node.state_dir)
        .with_context(|| format!("failed to initialize `{}` backend", config.node.backend))?;
    tracing::info!(backend = backend.name(), "storage backend ready");

    // Repository password, if a helper is configured
    if !config.security.password_command.is_empty() {
        let password =
            read_password_from_helper(&config.security.password_command, &config.node.state_dir)
                .await
                .context("password helper failed")?;
        tracing::info!(length = password.len(), "password obtained from helper");
    }

    // Keypair
    let keypair = Arc::new(load_or_generate_keypair(&config.node.keypair_path)?);
    let peer_id = keypair.peer_id();
    tracing::info!(peer_id = %peer_id, "identity ready");

    // Record arbitration + DHT wiring. The in-process source doubles as
    // this node's local record table.
    let registry = Arc::new(pk::default_registry());
    let store = RecordStore::new(registry);

    let local: Arc<dyn RecordSource> = Arc::new(MemorySource::new());
    let dht = Arc::new(DhtClient::new(
        vec![local],
        config.dht.quorum,
        config.dht.parallelism,
    ));

    let lookup_timeout = Duration::from_millis(config.dht.lookup_timeout_ms);
    let resolver = Arc::new(IdentityResolver::new(store, dht, lookup_timeout));

    // Publish our own public-key record so peers can resolve us
    resolver
        .publish(&keypair)
        .await
        .context("failed to publish own public-key record")?;
    tracing::info!(key = pk::pk_record_key(&peer_id), "public-key record published");

    let republish_task = {
        let resolver = resolver.clone();
        let keypair = keypair.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(REPUBLISH_INTERVAL);
            interval.tick().await; // initial publish already happened
            loop {
                interval.tick().await;
                match resolver.publish(&keypair).await {
                    Ok(()) => tracing::debug!("public-key record re-published"),
                    Err(e) => tracing::warn!(error = %e, "re-publish failed"),
                }
            }
        })
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
        r = republish_task          => tracing::error!("republish task exited: {:?}", r),
    }

    Ok(())
}

/// Load the Ed25519 seed from disk, or generate and persist one on first
/// run. The file holds the hex-encoded 32-byte seed.
fn load_or_generate_keypair(path: &Path) -> Result<Keypair> {
    if path.exists() {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read keypair: {}", path.display()))?;
        let bytes = hex::decode(text.trim())
            .with_context(|| format!("keypair file is not hex: {}", path.display()))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("keypair file is not a 32-byte seed: {}", path.display()))?;
        return Ok(Keypair::from_seed(seed));
    }

    let keypair = Keypair::generate();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create key dir: {}", parent.display()))?;
    }
    std::fs::write(path, hex::encode(*keypair.seed()))
        .with_context(|| format!("failed to write keypair: {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to set keypair permissions: {}", path.display()))?;
    }
    tracing::info!(path = %path.display(), "generated new identity");
    Ok(keypair)
}
