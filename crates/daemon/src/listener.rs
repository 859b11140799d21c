// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! Accepts unix-socket connections and handles each in a spawned task so
//! the engine loop is never blocked on a client. Ordinary requests are one
//! round-trip; `Subscribe` upgrades the connection to a push stream of
//! update frames.

use std::sync::Arc;

use teave_core::Teavent;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixListener;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::env::ipc_timeout;
use crate::protocol::{self, ProtocolError, Request, Response};
use crate::publisher::BroadcastPublisher;
use crate::runtime::RpcEnvelope;

/// Shared daemon context for all connection handlers.
pub struct ListenCtx {
    pub rpc_tx: mpsc::Sender<RpcEnvelope>,
    pub updates: Arc<BroadcastPublisher>,
    pub shutdown: CancellationToken,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("engine loop is gone")]
    EngineGone,
}

/// Listener task for accepting socket connections.
pub struct Listener {
    unix: UnixListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn new(unix: UnixListener, ctx: Arc<ListenCtx>) -> Self {
        Self { unix, ctx }
    }

    /// Run the accept loop until shutdown.
    pub async fn run(self) {
        loop {
            tokio::select! {
                _ = self.ctx.shutdown.cancelled() => break,
                result = self.unix.accept() => match result {
                    Ok((stream, _)) => {
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = handle_connection(reader, writer, &ctx).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!("accept error: {e}"),
                },
            }
        }
        info!("listener stopped");
    }
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Protocol(ProtocolError::ConnectionClosed) => {
            debug!("client disconnected")
        }
        ConnectionError::Protocol(ProtocolError::Timeout) => warn!("connection timeout"),
        _ => error!("connection error: {e}"),
    }
}

/// Handle a single client connection: one request, one response — except
/// `Subscribe`, which turns the connection into an update stream.
async fn handle_connection<R, W>(
    mut reader: R,
    mut writer: W,
    ctx: &ListenCtx,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let request: Request = protocol::read_message(&mut reader, ipc_timeout()).await?;
    debug!(request = ?request, "received request");

    if matches!(request, Request::Subscribe) {
        let updates = ctx.updates.subscribe();
        protocol::write_message(&mut writer, &Response::Ok, ipc_timeout()).await?;
        return stream_updates(writer, updates, &ctx.shutdown).await;
    }

    let (reply_tx, reply_rx) = oneshot::channel();
    ctx.rpc_tx
        .send(RpcEnvelope { request, reply: reply_tx })
        .await
        .map_err(|_| ConnectionError::EngineGone)?;
    let response = reply_rx.await.map_err(|_| ConnectionError::EngineGone)?;

    protocol::write_message(&mut writer, &response, ipc_timeout()).await?;
    Ok(())
}

/// Forward updates until the client goes away or the daemon shuts down.
async fn stream_updates<W>(
    mut writer: W,
    mut updates: broadcast::Receiver<Teavent>,
    shutdown: &CancellationToken,
) -> Result<(), ConnectionError>
where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            update = updates.recv() => match update {
                Ok(teavent) => {
                    let frame = Response::Update { teavent };
                    if protocol::write_message(&mut writer, &frame, ipc_timeout()).await.is_err() {
                        // Client went away; nothing to clean up.
                        return Ok(());
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "subscriber lagged, updates dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            },
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
