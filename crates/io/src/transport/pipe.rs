// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Spawned-process pipe transport (`|command`, `<command`). The
//! direction that writes feeds the child's stdin; the direction that reads
//! drains its stdout. Either is expected to bounce into a redirect to a
//! UNIX-socket endpoint once the child is ready ("read from pipe").

use crate::error::{IoError, Result};
use crate::handle::{Capabilities, RawIo, SeekWhence};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout};

pub struct PipeWriteIo {
    child: Child,
    stdin: ChildStdin,
}

impl PipeWriteIo {
    pub fn spawn(command: &str, args: &[&str]) -> Result<Self> {
        let mut child = tokio::process::Command::new(command)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .spawn()?;
        let stdin = child.stdin.take().ok_or(IoError::Unsupported("child stdin"))?;
        Ok(Self { child, stdin })
    }
}

#[async_trait]
impl RawIo for PipeWriteIo {
    async fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(IoError::Unsupported("read on a write-direction pipe"))
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        Ok(self.stdin.write(buf).await?)
    }

    async fn seek(&mut self, _pos: i64, _whence: SeekWhence) -> Result<u64> {
        Err(IoError::Unsupported("seek on a pipe"))
    }

    async fn flush(&mut self) -> Result<()> {
        self.stdin.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        drop(&mut self.stdin);
        self.child.wait().await?;
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { can_write: true, is_pipe: true, ..Capabilities::default() }
    }
}

pub struct PipeReadIo {
    child: Child,
    stdout: ChildStdout,
}

impl PipeReadIo {
    pub fn spawn(command: &str, args: &[&str]) -> Result<Self> {
        let mut child = tokio::process::Command::new(command)
            .args(args)
            .stdout(std::process::Stdio::piped())
            .spawn()?;
        let stdout = child.stdout.take().ok_or(IoError::Unsupported("child stdout"))?;
        Ok(Self { child, stdout })
    }
}

#[async_trait]
impl RawIo for PipeReadIo {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.stdout.read(buf).await?)
    }

    async fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(IoError::Unsupported("write on a read-direction pipe"))
    }

    async fn seek(&mut self, _pos: i64, _whence: SeekWhence) -> Result<u64> {
        Err(IoError::Unsupported("seek on a pipe"))
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.child.kill().await?;
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { can_read: true, is_pipe: true, ..Capabilities::default() }
    }
}
