// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! In-memory transport: used for sub-I/O byte-range views ("commit"
//! pattern) and as the test double for the handle contract logic.

use crate::error::{IoError, Result};
use crate::handle::{Capabilities, RawIo, SeekWhence};
use async_trait::async_trait;

pub struct MemoryIo {
    data: Vec<u8>,
    cursor: usize,
}

impl MemoryIo {
    #[must_use]
    pub const fn new(data: Vec<u8>) -> Self {
        Self { data, cursor: 0 }
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

#[async_trait]
impl RawIo for MemoryIo {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let available = self.data.len().saturating_sub(self.cursor);
        let n = available.min(buf.len());
        buf[..n].copy_from_slice(&self.data[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let end = self.cursor + buf.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.cursor..end].copy_from_slice(buf);
        self.cursor = end;
        Ok(buf.len())
    }

    async fn seek(&mut self, pos: i64, whence: SeekWhence) -> Result<u64> {
        let base = match whence {
            SeekWhence::Start => 0i64,
            SeekWhence::Current => self.cursor as i64,
            SeekWhence::End => self.data.len() as i64,
        };
        let new_pos = base + pos;
        if new_pos < 0 {
            return Err(IoError::Protocol(format!("seek before start: {new_pos}")));
        }
        self.cursor = new_pos as usize;
        Ok(self.cursor as u64)
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { can_read: true, can_write: true, can_seek: true, is_regular: true, ..Capabilities::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let mut io = MemoryIo::new(Vec::new());
        io.write(b"hello").await.unwrap();
        io.seek(0, SeekWhence::Start).await.unwrap();
        let mut buf = [0u8; 5];
        let n = io.read(&mut buf).await.unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf, b"hello");
    }

    #[tokio::test]
    async fn seek_from_end() {
        let mut io = MemoryIo::new(vec![1, 2, 3, 4]);
        io.seek(-2, SeekWhence::End).await.unwrap();
        let mut buf = [0u8; 2];
        io.read(&mut buf).await.unwrap();
        assert_eq!(buf, [3, 4]);
    }
}
