// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, recovery, shutdown.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use fs2::FileExt;
use teave_core::SystemClock;
use teave_engine::{
    Executor, PublisherListener, StoreListener, TeaventManager, TokioExecutor, UpdatePublisher,
};
use teave_storage::{JsonDirStore, StoreError, TeaventStore};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::env;
use crate::listener::{ListenCtx, Listener};
use crate::publisher::BroadcastPublisher;
use crate::runtime::Runtime;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/teave)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to the teavent document directory
    pub teavents_path: PathBuf,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        Ok(Self::under(state_dir))
    }

    /// Fixed paths under a given state directory.
    pub fn under(state_dir: PathBuf) -> Self {
        Self {
            socket_path: state_dir.join("teaved.sock"),
            lock_path: state_dir.join("teaved.pid"),
            teavents_path: state_dir.join("teavents"),
            state_dir,
        }
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("no usable state directory (set TEAVE_STATE_DIR or HOME)")]
    NoStateDir,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("another daemon holds the lock: {0}")]
    LockFailed(std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything a running daemon owns.
///
/// The lock file is held for the daemon's lifetime; dropping this state
/// releases it.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): held to maintain the exclusive PID lock
    #[allow(dead_code)]
    lock_file: File,
    pub runtime: Runtime<SystemClock>,
    pub listener: Listener,
    pub shutdown: CancellationToken,
}

/// Start the daemon: acquire the lock, open the store, recover documents,
/// and wire the engine loop to the socket listener.
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Acquire the lock before touching anything else; the files belong to
    // whichever daemon holds it.
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // A stale socket from a crashed daemon would fail the bind.
    match std::fs::remove_file(&config.socket_path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    let unix = UnixListener::bind(&config.socket_path)?;

    let store: Arc<dyn TeaventStore> =
        Arc::new(JsonDirStore::open(&config.teavents_path).await?);
    let executor: Arc<dyn Executor> = Arc::new(TokioExecutor::new());
    let updates = Arc::new(BroadcastPublisher::new(env::update_buffer()));

    let (rpc_tx, rpc_rx) = mpsc::channel(64);
    let (timer_tx, timer_rx) = mpsc::unbounded_channel();

    let mut manager = TeaventManager::new(SystemClock, Arc::clone(&executor), timer_tx);
    manager.add_listener(Arc::new(StoreListener::new(
        Arc::clone(&store),
        Arc::clone(&executor),
    )));
    let update_sink: Arc<dyn UpdatePublisher> = updates.clone();
    manager.add_listener(Arc::new(PublisherListener::new(update_sink, Arc::clone(&executor))));

    recover(&mut manager, store.as_ref()).await?;

    let shutdown = CancellationToken::new();
    let runtime = Runtime::new(manager, rpc_rx, timer_rx, shutdown.clone());
    let ctx = Arc::new(ListenCtx { rpc_tx, updates, shutdown: shutdown.clone() });
    let listener = Listener::new(unix, ctx);

    info!(socket = %config.socket_path.display(), "daemon ready");
    Ok(DaemonState { config: config.clone(), lock_file, runtime, listener, shutdown })
}

/// Re-manage every stored document. The manager's `init` re-arms the
/// right timer per state; anchors that passed during the outage fire
/// immediately. A document the manager refuses is logged and skipped —
/// fatal to that teavent, not to the daemon.
async fn recover(
    manager: &mut TeaventManager<SystemClock>,
    store: &dyn TeaventStore,
) -> Result<(), StoreError> {
    let documents = store.fetch_all().await?;
    let total = documents.len();
    let mut recovered = 0usize;
    for teavent in documents {
        let id = teavent.id.clone();
        match manager.manage_teavent(teavent) {
            Ok(_) => recovered += 1,
            Err(e) => warn!(teavent = %id, error = %e, "skipping stored teavent"),
        }
    }
    info!(recovered, total, "recovery finished");
    Ok(())
}

/// Remove the socket and PID files on clean shutdown.
pub fn cleanup(config: &Config) {
    for path in [&config.socket_path, &config.lock_path] {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "cleanup failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
