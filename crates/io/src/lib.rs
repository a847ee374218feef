// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! I/O handle abstraction, chunk/packet-frame framing, and transport URI
//! dispatch.

pub mod chunked;
pub mod error;
pub mod handle;
pub mod memory;
pub mod transport;
pub mod uri;

pub use error::{IoError, Result};
pub use handle::{Capabilities, IoHandle, RawIo, SeekWhence};
pub use uri::{open_read, open_write, TransportUri};
