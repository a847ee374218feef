// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Packet source contract: `read` either hands back a borrowed internal
//! buffer or fills a caller-supplied one, mirroring the original "null
//! destination pointer means return the internal buffer" convention
//! through an enum instead of a nullable out-pointer.

use crate::error::Result;
use async_trait::async_trait;
use gavf_core::Packet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    Ok,
    Eof,
    /// No packet ready yet; caller should retry.
    Again,
}

/// Advertised source capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceFlags {
    /// The source allocates its own packets rather than writing into ones
    /// the caller supplies.
    pub src_alloc: bool,
    /// `Packet::data.len()` may overstate the real payload size.
    pub frame_size_is_upper_bound: bool,
    /// PTS may jump without a contiguous duration chain (e.g. after a seek).
    pub discontinuous: bool,
}

/// Outcome of a `read` call that succeeded or is pending (`Eof`/`Again` are
/// carried on [`ReadStatus`] instead, since they have no payload).
#[derive(Debug)]
pub enum SourceRead<'a> {
    /// The source owns the returned packet; valid until the next `read`.
    Borrowed(&'a Packet),
    /// The caller-supplied destination packet was filled in place.
    Copied,
}

/// A producer of packets. Implemented by decoders, demuxers, and the
/// reorder buffer's consumer side.
#[async_trait]
pub trait PacketSource: Send {
    fn flags(&self) -> SourceFlags;

    /// The format this source natively produces.
    fn source_format(&self) -> Option<&gavf_core::Value> {
        None
    }

    /// Request a destination format different from the native one; the
    /// connector is responsible for deciding whether a converter stage is
    /// required, not the source itself.
    fn set_destination_format(&mut self, _format: gavf_core::Value) {}

    /// Invoked before a frame transfer so multiple pipelines can share a
    /// thread-unsafe back-end; no-op by default.
    fn lock(&self) {}
    fn unlock(&self) {}

    /// Read one packet. Pass `None` to receive a borrowed internal buffer
    /// (only valid when `flags().src_alloc`); pass `Some(dst)` to have the
    /// source copy into `dst` instead.
    ///
    /// # Errors
    /// Backend-specific I/O or decode failures.
    async fn read<'a>(&'a mut self, dst: Option<&mut Packet>) -> Result<(ReadStatus, Option<SourceRead<'a>>)>;
}

/// Sample-accurate seek recovery for audio sources.
#[async_trait]
pub trait AudioSeek: Send {
    /// # Errors
    /// Backend-specific seek failures.
    async fn skip(&mut self, n_samples: i64) -> Result<()>;

    /// # Errors
    /// Backend-specific seek failures.
    async fn skip_to(&mut self, time: i64, scale: i32) -> Result<()>;
}
