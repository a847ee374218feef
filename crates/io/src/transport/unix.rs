// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! UNIX-domain socket transport (`gavf-unix://`, `gavf-unixserv://`).
//! Used both directly and as the `SEPARATE_STREAMS` per-stream transport
//! after a `SELECT_TRACK` handshake.

use crate::error::{IoError, Result};
use crate::handle::{Capabilities, RawIo, SeekWhence};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};

pub struct UnixIo {
    stream: UnixStream,
}

impl UnixIo {
    #[must_use]
    pub const fn new(stream: UnixStream) -> Self {
        Self { stream }
    }

    pub async fn connect(path: &str) -> Result<Self> {
        let stream = UnixStream::connect(path).await?;
        Ok(Self::new(stream))
    }

    pub async fn accept_once(path: &str) -> Result<Self> {
        let _ = std::fs::remove_file(path);
        let listener = UnixListener::bind(path)?;
        let (stream, _addr) = listener.accept().await?;
        Ok(Self::new(stream))
    }
}

#[async_trait]
impl RawIo for UnixIo {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.stream.read(buf).await?)
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        Ok(self.stream.write(buf).await?)
    }

    async fn seek(&mut self, _pos: i64, _whence: SeekWhence) -> Result<u64> {
        Err(IoError::Unsupported("seek on a unix socket"))
    }

    async fn flush(&mut self) -> Result<()> {
        self.stream.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { can_read: true, can_write: true, is_socket: true, is_unix_socket: true, ..Capabilities::default() }
    }
}
