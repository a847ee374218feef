// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Standard input/output transport (`-`). Writing rejects a TTY
//! destination since a container's binary framing would corrupt a
//! terminal.

use crate::error::{IoError, Result};
use crate::handle::{Capabilities, RawIo, SeekWhence};
use async_trait::async_trait;
use std::io::IsTerminal;
use tokio::io::{AsyncReadExt, AsyncWriteExt, Stdin, Stdout};

pub struct StdinIo {
    stdin: Stdin,
}

impl StdinIo {
    #[must_use]
    pub fn new() -> Self {
        Self { stdin: tokio::io::stdin() }
    }
}

impl Default for StdinIo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RawIo for StdinIo {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.stdin.read(buf).await?)
    }

    async fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(IoError::Unsupported("write on stdin"))
    }

    async fn seek(&mut self, _pos: i64, _whence: SeekWhence) -> Result<u64> {
        Err(IoError::Unsupported("seek on stdin"))
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { can_read: true, is_pipe: true, ..Capabilities::default() }
    }
}

pub struct StdoutIo {
    stdout: Stdout,
}

impl StdoutIo {
    /// Rejects a TTY destination.
    pub fn new() -> Result<Self> {
        if std::io::stdout().is_terminal() {
            return Err(IoError::Unsupported("refusing to write binary framing to a tty"));
        }
        Ok(Self { stdout: tokio::io::stdout() })
    }
}

#[async_trait]
impl RawIo for StdoutIo {
    async fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(IoError::Unsupported("read on stdout"))
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        Ok(self.stdout.write(buf).await?)
    }

    async fn seek(&mut self, _pos: i64, _whence: SeekWhence) -> Result<u64> {
        Err(IoError::Unsupported("seek on stdout"))
    }

    async fn flush(&mut self) -> Result<()> {
        self.stdout.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.stdout.flush().await?;
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { can_write: true, is_pipe: true, ..Capabilities::default() }
    }
}
