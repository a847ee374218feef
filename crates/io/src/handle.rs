// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The I/O handle abstraction: a small async vtable (`RawIo`) plus
//! the common contract logic (unread buffer, sticky EOF/error, alignment)
//! that every transport shares, wrapped once in [`IoHandle`] rather than
//! reimplemented per transport.

use crate::error::{IoError, Result};
use async_trait::async_trait;
use gavf_core::{Dictionary, StickyFlag};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekWhence {
    Start,
    Current,
    End,
}

/// What a transport can do, mirroring the original model's capability bits
/// rather than a single "is this a file" enum: a handle can be, say,
/// seekable and a socket at once (a sub-I/O byte-range view over a TCP
/// connection's already-buffered prefix, for instance).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub can_read: bool,
    pub can_write: bool,
    pub can_seek: bool,
    pub is_pipe: bool,
    pub is_socket: bool,
    pub is_unix_socket: bool,
    pub is_regular: bool,
}

/// Well-known descriptor dictionary keys ("a descriptor dictionary —
/// URI, mimetype, size").
pub mod descriptor_keys {
    pub const URI: &str = "uri";
    pub const MIME_TYPE: &str = "mimetype";
    pub const SIZE: &str = "size";
}

/// The minimal async vtable a transport implements. `IoHandle` builds the
/// shared contract logic on top of this.
#[async_trait]
pub trait RawIo: Send {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
    async fn write(&mut self, buf: &[u8]) -> Result<usize>;
    async fn seek(&mut self, pos: i64, whence: SeekWhence) -> Result<u64>;
    async fn flush(&mut self) -> Result<()>;
    async fn close(&mut self) -> Result<()>;
    fn capabilities(&self) -> Capabilities;
}

/// A wire-facing I/O handle: a transport plus the look-ahead buffer,
/// position tracking, and sticky EOF/error flags every transport needs
/// identically.
pub struct IoHandle {
    raw: Box<dyn RawIo>,
    position: u64,
    unread: VecDeque<u8>,
    eof: StickyFlag,
    error: StickyFlag,
    descriptor: Dictionary,
}

impl IoHandle {
    #[must_use]
    pub fn new(raw: Box<dyn RawIo>, descriptor: Dictionary) -> Self {
        Self { raw, position: 0, unread: VecDeque::new(), eof: StickyFlag::new(), error: StickyFlag::new(), descriptor }
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.raw.capabilities()
    }

    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }

    #[must_use]
    pub const fn descriptor(&self) -> &Dictionary {
        &self.descriptor
    }

    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.eof.get()
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.get()
    }

    /// Satisfy `buf` from the unread buffer first, then fall through to the
    /// underlying transport. A short read of zero bytes
    /// from the transport latches EOF; a transport error latches the error
    /// flag and is also returned to the caller.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut total = 0;
        while total < buf.len() && !self.unread.is_empty() {
            buf[total] = self.unread.pop_front().expect("checked non-empty");
            total += 1;
        }
        self.position += total as u64;
        if total == buf.len() {
            return Ok(total);
        }

        match self.raw.read(&mut buf[total..]).await {
            Ok(0) => {
                self.eof.set();
                Ok(total)
            }
            Ok(n) => {
                self.position += n as u64;
                Ok(total + n)
            }
            Err(e) => {
                self.error.set();
                Err(e)
            }
        }
    }

    pub async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        match self.raw.write(buf).await {
            Ok(n) => {
                self.position += n as u64;
                Ok(n)
            }
            Err(e) => {
                self.error.set();
                Err(e)
            }
        }
    }

    /// Prepend `bytes` to the look-ahead buffer and roll the position back
    /// by the same amount.
    pub fn unread(&mut self, bytes: &[u8]) {
        for &b in bytes.iter().rev() {
            self.unread.push_front(b);
        }
        self.position = self.position.saturating_sub(bytes.len() as u64);
    }

    /// Discard `n` bytes, seeking if the transport supports it, else
    /// reading and dropping them.
    pub async fn skip(&mut self, n: u64) -> Result<()> {
        if self.capabilities().can_seek {
            self.seek(n as i64, SeekWhence::Current).await?;
            return Ok(());
        }
        let mut remaining = n;
        let mut scratch = [0u8; 4096];
        while remaining > 0 {
            let chunk = remaining.min(scratch.len() as u64) as usize;
            let got = self.read(&mut scratch[..chunk]).await?;
            if got == 0 {
                return Err(IoError::Eof);
            }
            remaining -= got as u64;
        }
        Ok(())
    }

    #[must_use]
    pub const fn padding_to_align(position: u64) -> u64 {
        (8 - (position % 8)) % 8
    }

    /// Pad the read position forward to the next 8-byte boundary.
    pub async fn align_read(&mut self) -> Result<()> {
        let pad = Self::padding_to_align(self.position);
        if pad > 0 {
            self.skip(pad).await?;
        }
        Ok(())
    }

    /// Pad the write position forward to the next 8-byte boundary with
    /// zero bytes.
    pub async fn align_write(&mut self) -> Result<()> {
        let pad = Self::padding_to_align(self.position);
        if pad > 0 {
            let zeros = vec![0u8; pad as usize];
            self.write(&zeros).await?;
        }
        Ok(())
    }

    pub async fn seek(&mut self, pos: i64, whence: SeekWhence) -> Result<u64> {
        if !self.capabilities().can_seek {
            return Err(IoError::Unsupported("seek"));
        }
        let new_pos = self.raw.seek(pos, whence).await?;
        self.position = new_pos;
        self.unread.clear();
        self.eof.clear();
        Ok(new_pos)
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.raw.flush().await
    }

    pub async fn close(&mut self) -> Result<()> {
        self.raw.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryIo;

    fn handle_over(data: Vec<u8>) -> IoHandle {
        IoHandle::new(Box::new(MemoryIo::new(data)), Dictionary::new())
    }

    #[tokio::test]
    async fn read_satisfies_from_unread_buffer_first() {
        let mut h = handle_over(vec![1, 2, 3, 4]);
        let mut buf = [0u8; 2];
        h.read(&mut buf).await.unwrap();
        assert_eq!(buf, [1, 2]);
        h.unread(&[9, 9]);
        let mut buf2 = [0u8; 3];
        let n = h.read(&mut buf2).await.unwrap();
        assert_eq!(n, 3);
        assert_eq!(buf2, [9, 9, 3]);
    }

    #[tokio::test]
    async fn short_read_of_zero_latches_eof() {
        let mut h = handle_over(vec![1]);
        let mut buf = [0u8; 4];
        let n = h.read(&mut buf).await.unwrap();
        assert_eq!(n, 1);
        assert!(!h.is_eof());
        let n2 = h.read(&mut buf).await.unwrap();
        assert_eq!(n2, 0);
        assert!(h.is_eof());
    }

    #[tokio::test]
    async fn align_read_skips_to_next_boundary() {
        let mut h = handle_over(vec![0; 16]);
        let mut buf = [0u8; 3];
        h.read(&mut buf).await.unwrap();
        assert_eq!(h.position(), 3);
        h.align_read().await.unwrap();
        assert_eq!(h.position(), 8);
    }

    #[tokio::test]
    async fn align_write_pads_with_zeros() {
        let mut h = handle_over(Vec::new());
        h.write(b"abc").await.unwrap();
        h.align_write().await.unwrap();
        assert_eq!(h.position(), 8);
    }

    #[tokio::test]
    async fn seek_clears_unread_and_eof() {
        let mut h = handle_over(vec![1, 2, 3, 4]);
        let mut buf = [0u8; 4];
        h.read(&mut buf).await.unwrap();
        h.read(&mut buf).await.unwrap();
        assert!(h.is_eof());
        h.seek(0, SeekWhence::Start).await.unwrap();
        assert!(!h.is_eof());
        assert_eq!(h.position(), 0);
    }
}
