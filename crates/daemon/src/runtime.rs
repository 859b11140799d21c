// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine loop: the single writer.
//!
//! RPC envelopes from the listener and fired timers from the executor are
//! funneled into one task that owns the manager, so user actions and
//! scheduled triggers can never race over a flow.

use teave_core::Clock;
use teave_engine::{TeaventManager, TimerFired};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::env::PROTOCOL_VERSION;
use crate::protocol::{Request, Response};

/// One RPC round-trip through the engine loop.
pub struct RpcEnvelope {
    pub request: Request,
    pub reply: oneshot::Sender<Response>,
}

pub struct Runtime<C: Clock> {
    manager: TeaventManager<C>,
    rpc_rx: mpsc::Receiver<RpcEnvelope>,
    timer_rx: mpsc::UnboundedReceiver<TimerFired>,
    shutdown: CancellationToken,
}

impl<C: Clock> Runtime<C> {
    pub fn new(
        manager: TeaventManager<C>,
        rpc_rx: mpsc::Receiver<RpcEnvelope>,
        timer_rx: mpsc::UnboundedReceiver<TimerFired>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { manager, rpc_rx, timer_rx, shutdown }
    }

    /// Process messages until shutdown.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                envelope = self.rpc_rx.recv() => {
                    let Some(RpcEnvelope { request, reply }) = envelope else { break };
                    let response = self.handle_request(request);
                    let _ = reply.send(response);
                }
                fired = self.timer_rx.recv() => {
                    let Some(fired) = fired else { break };
                    self.handle_timer(fired);
                }
            }
        }
        tracing::info!("engine loop stopped");
    }

    fn handle_timer(&mut self, fired: TimerFired) {
        let label = format!("{}:{}", fired.teavent_id, fired.trigger);
        if let Err(e) = self.manager.handle_timer(fired) {
            tracing::error!(timer = %label, error = %e, "timer trigger failed");
        }
    }

    fn handle_request(&mut self, request: Request) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::Hello { version } => {
                tracing::debug!(client_version = %version, "hello");
                Response::Hello { version: PROTOCOL_VERSION.to_string() }
            }

            Request::ListTeavents => {
                Response::Teavents { teavents: self.manager.list_teavents() }
            }

            Request::GetTeavent { id } => match self.manager.get_teavent(&id) {
                Ok(teavent) => Response::Teavent { teavent },
                Err(e) => Response::error(e),
            },

            Request::ManageTeavent { teavent } => {
                match self.manager.manage_teavent(teavent) {
                    Ok(teavent) => Response::Teavent { teavent },
                    Err(e) => Response::error(e),
                }
            }

            Request::UserAction { action, user_id, teavent_id, force } => {
                match self.manager.handle_user_action(action, &user_id, &teavent_id, force) {
                    Ok(teavent) => Response::Teavent { teavent },
                    Err(e) => Response::error(e),
                }
            }

            Request::Tasks => Response::Tasks { tasks: self.manager.tasks(None) },

            // Connection upgrades never reach the engine loop.
            Request::Subscribe => Response::error("subscribe is handled by the listener"),

            Request::Shutdown => {
                tracing::info!("shutdown requested");
                self.shutdown.cancel();
                Response::Ok
            }
        }
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
