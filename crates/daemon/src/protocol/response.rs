// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use teave_core::Teavent;

/// Response from the daemon to a frontend.
///
/// Engine errors of every kind cross the wire as `Error { message }`; the
/// caller gets the original message without the non-serializable payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    Pong,

    Hello { version: String },

    Ok,

    Teavent { teavent: Teavent },

    Teavents { teavents: Vec<Teavent> },

    Tasks { tasks: Vec<String> },

    /// Streamed to `Subscribe`d connections after every transition
    Update { teavent: Teavent },

    Error { message: String },
}

impl Response {
    pub fn error(e: impl std::fmt::Display) -> Self {
        Response::Error { message: e.to_string() }
    }
}
