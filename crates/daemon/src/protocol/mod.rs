// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for daemon communication.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

mod request;
mod response;
mod wire;

pub use request::Request;
pub use response::Response;
pub use wire::{decode, encode, read_message, write_message, ProtocolError};
