// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! TCP client/server transport (`gavf://`, `gavf-tcpserv://`).

use crate::error::{IoError, Result};
use crate::handle::{Capabilities, RawIo, SeekWhence};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub struct TcpIo {
    stream: TcpStream,
}

impl TcpIo {
    #[must_use]
    pub const fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        Ok(Self::new(stream))
    }

    /// Bind and accept exactly one connection, matching the container
    /// runtime's one-task-per-connection model.
    pub async fn accept_once(host: &str, port: u16) -> Result<Self> {
        let listener = TcpListener::bind((host, port)).await?;
        let (stream, _addr) = listener.accept().await?;
        Ok(Self::new(stream))
    }
}

#[async_trait]
impl RawIo for TcpIo {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.stream.read(buf).await?)
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        Ok(self.stream.write(buf).await?)
    }

    async fn seek(&mut self, _pos: i64, _whence: SeekWhence) -> Result<u64> {
        Err(IoError::Unsupported("seek on a tcp socket"))
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
        Capabilities { can_read: true, can_write: true, is_socket: true, ..Capabilities::default() }
    }
}
