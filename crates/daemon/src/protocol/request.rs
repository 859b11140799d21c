// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use teave_core::Teavent;
use teave_engine::Trigger;

/// Request from a frontend to the daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    /// List every managed teavent
    ListTeavents,

    /// Fetch one teavent by id
    GetTeavent { id: String },

    /// Hand a teavent over to the manager
    ManageTeavent { teavent: Teavent },

    /// Apply a user action to a managed teavent
    UserAction {
        action: Trigger,
        user_id: String,
        teavent_id: String,
        /// Admin override for guarded transitions
        #[serde(default)]
        force: bool,
    },

    /// Pending scheduler task names, for diagnostics
    Tasks,

    /// Upgrade this connection to a stream of teavent updates
    Subscribe,

    /// Request daemon shutdown
    Shutdown,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
