// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Local file transport.

use crate::error::Result;
use crate::handle::{Capabilities, RawIo, SeekWhence};
use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

pub struct FileIo {
    file: File,
}

impl FileIo {
    #[must_use]
    pub const fn new(file: File) -> Self {
        Self { file }
    }
}

fn to_std_seek(pos: i64, whence: SeekWhence) -> std::io::SeekFrom {
    match whence {
        SeekWhence::Start => std::io::SeekFrom::Start(pos as u64),
        SeekWhence::Current => std::io::SeekFrom::Current(pos),
        SeekWhence::End => std::io::SeekFrom::End(pos),
    }
}

#[async_trait]
impl RawIo for FileIo {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.file.read(buf).await?)
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        Ok(self.file.write(buf).await?)
    }

    async fn seek(&mut self, pos: i64, whence: SeekWhence) -> Result<u64> {
        Ok(self.file.seek(to_std_seek(pos, whence)).await?)
    }

    async fn flush(&mut self) -> Result<()> {
        self.file.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.file.flush().await?;
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { can_read: true, can_write: true, can_seek: true, is_regular: true, ..Capabilities::default() }
    }
}
