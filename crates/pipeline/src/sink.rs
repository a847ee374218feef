// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Packet sink contract: `get` hands out a packet to fill in place
//! (reused from a free pool where the implementation keeps one), `put`
//! commits it. The same packet obtained from `get` must be the one passed
//! to `put` — callers that don't need the reuse optimisation can ignore
//! `get` and call `put_owned` directly.

use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use gavf_core::Packet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStatus {
    Ok,
    Error,
}

/// A consumer of packets. Implemented by encoders, muxers, and the
/// reorder buffer's producer side.
#[async_trait]
pub trait PacketSink: Send {
    fn lock(&self) {}
    fn unlock(&self) {}

    /// Hand out a packet for the caller to fill, reusing a pooled one where
    /// possible. Returns `None` when the sink has no reuse buffer to offer;
    /// the caller then builds its own `Packet` and calls `put` directly.
    ///
    /// # Errors
    /// Implementations may fail to allocate a reuse buffer.
    async fn get(&mut self) -> Result<Option<Packet>>;

    /// Commit a packet obtained from `get` (or built standalone).
    ///
    /// # Errors
    /// [`PipelineError::MismatchedFrame`] if `get` returned `Some` and a
    /// different packet is committed than the caller last received.
    async fn put(&mut self, packet: Packet) -> Result<SinkStatus>;

    /// Return a packet obtained from `get` to the free pool without
    /// committing it (the `put(NULL)` case in the original contract).
    fn cancel(&mut self, _packet: Packet) {}
}

/// Track the packet handed out by the last `get`, so implementations can
/// reject a mismatched `put` the way the original sink does ("called
/// `get` twice" / "`put` received a different pointer").
#[derive(Debug, Default)]
pub struct GetPutGuard {
    outstanding: bool,
}

impl GetPutGuard {
    #[must_use]
    pub const fn new() -> Self {
        Self { outstanding: false }
    }

    /// # Errors
    /// [`PipelineError::DoubleGet`] if a prior `get` was never matched by
    /// a `put`/`cancel`.
    pub fn begin_get(&mut self) -> Result<()> {
        if self.outstanding {
            return Err(PipelineError::DoubleGet);
        }
        self.outstanding = true;
        Ok(())
    }

    pub fn end(&mut self) {
        self.outstanding = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_rejects_a_second_get_before_put() {
        let mut guard = GetPutGuard::new();
        guard.begin_get().unwrap();
        assert!(guard.begin_get().is_err());
        guard.end();
        assert!(guard.begin_get().is_ok());
    }
}
