// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Chunk and packet-frame I/O built on top of [`IoHandle`].
//!
//! A chunk's length has to be known before the tag+length header is
//! written, so a writer assembles the payload into a [`PendingChunk`]
//! in-memory buffer first and commits it to the real handle afterwards,
//! rather than seeking back to patch the length in place (which wouldn't
//! work for pipe/socket transports anyway).

use crate::error::{IoError, Result};
use crate::handle::IoHandle;
use gavf_codec::chunk::{self, ChunkHeader, FrameRead, TAG_LEN};

pub struct PendingChunk {
    tag: [u8; TAG_LEN],
    payload: Vec<u8>,
}

impl PendingChunk {
    #[must_use]
    pub fn new(tag: &[u8; TAG_LEN]) -> Self {
        Self { tag: *tag, payload: Vec::new() }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.payload.extend_from_slice(bytes);
    }

    #[must_use]
    pub fn payload_mut(&mut self) -> &mut Vec<u8> {
        &mut self.payload
    }

    /// Write the framed chunk (tag + BE64 length + payload + zero padding)
    /// to `out`.
    pub async fn commit(self, out: &mut IoHandle) -> Result<()> {
        let mut framed = Vec::with_capacity(self.payload.len() + 16);
        chunk::write_chunk(&mut framed, &self.tag, &self.payload);
        out.write(&framed).await?;
        Ok(())
    }
}

/// Read the 16-byte tag+length header from `handle`.
pub async fn read_chunk_header(handle: &mut IoHandle) -> Result<ChunkHeader> {
    let mut buf = [0u8; TAG_LEN + 8];
    let n = handle.read(&mut buf).await?;
    if n < buf.len() {
        return Err(IoError::Eof);
    }
    let (header, _) = chunk::read_chunk_header(&buf)?;
    Ok(header)
}

/// Read a chunk's payload (the header must already have been consumed via
/// [`read_chunk_header`]), then skip the trailing padding.
pub async fn read_chunk_payload(handle: &mut IoHandle, header: &ChunkHeader) -> Result<Vec<u8>> {
    let mut payload = vec![0u8; header.payload_len as usize];
    let n = handle.read(&mut payload).await?;
    if n < payload.len() {
        return Err(IoError::Eof);
    }
    handle.skip(header.padding()).await?;
    Ok(payload)
}

/// Verify a chunk's tag matches `expected`, per the reader contract "verify
/// the tag and read the length".
pub fn expect_tag(header: &ChunkHeader, expected: &[u8; TAG_LEN]) -> Result<()> {
    if &header.tag != expected {
        return Err(IoError::Protocol(format!(
            "expected chunk tag {:?}, found {:?}",
            std::str::from_utf8(expected).unwrap_or("?"),
            header.tag_str()
        )));
    }
    Ok(())
}

/// Write one packet-on-wire frame to `handle`.
pub async fn write_packet_frame(handle: &mut IoHandle, stream_id: i32, payload: &[u8]) -> Result<()> {
    let mut framed = Vec::with_capacity(payload.len() + 16);
    chunk::write_packet_frame(&mut framed, stream_id, payload);
    handle.write(&framed).await?;
    Ok(())
}

/// Read one packet-on-wire frame from `handle`, transparently retrying past
/// realignment markers ("a zero byte means seek to the next 8-byte
/// alignment and try again").
pub async fn read_packet_frame(handle: &mut IoHandle) -> Result<(i32, Vec<u8>)> {
    loop {
        let mut marker = [0u8; 1];
        let n = handle.read(&mut marker).await?;
        if n == 0 {
            return Err(IoError::Eof);
        }
        if marker[0] == chunk::REALIGN_MARKER {
            let pad = crate::handle::IoHandle::padding_to_align(handle.position());
            if pad > 0 {
                handle.skip(pad).await?;
            }
            continue;
        }
        if marker[0] != chunk::PACKET_MARKER {
            return Err(IoError::Protocol(format!("unexpected packet frame marker {:#x}", marker[0])));
        }

        let stream_id = read_varint_i32(handle).await?;
        let len = read_varint_u64(handle).await?;
        let mut payload = vec![0u8; len as usize];
        let got = handle.read(&mut payload).await?;
        if (got as u64) < len {
            return Err(IoError::Eof);
        }
        return Ok((stream_id, payload));
    }
}

async fn read_varint_byte(handle: &mut IoHandle) -> Result<u8> {
    let mut b = [0u8; 1];
    let n = handle.read(&mut b).await?;
    if n == 0 {
        return Err(IoError::Eof);
    }
    Ok(b[0])
}

async fn read_varint_i32(handle: &mut IoHandle) -> Result<i32> {
    let first = read_varint_byte(handle).await?;
    let len = gavf_codec::varint::length_from_first_byte(first);
    let mut bytes = vec![first];
    if len == 9 {
        for _ in 0..8 {
            bytes.push(read_varint_byte(handle).await?);
        }
    } else {
        for _ in 1..len {
            bytes.push(read_varint_byte(handle).await?);
        }
    }
    let (v, _) = gavf_codec::varint::read_int32v(&bytes)?;
    Ok(v)
}

async fn read_varint_u64(handle: &mut IoHandle) -> Result<u64> {
    let first = read_varint_byte(handle).await?;
    let len = gavf_codec::varint::length_from_first_byte(first);
    let mut bytes = vec![first];
    if len == 9 {
        for _ in 0..8 {
            bytes.push(read_varint_byte(handle).await?);
        }
    } else {
        for _ in 1..len {
            bytes.push(read_varint_byte(handle).await?);
        }
    }
    let (v, _) = gavf_codec::varint::read_uint64v(&bytes)?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryIo;
    use gavf_core::Dictionary;

    fn empty_handle() -> IoHandle {
        IoHandle::new(Box::new(MemoryIo::new(Vec::new())), Dictionary::new())
    }

    #[tokio::test]
    async fn pending_chunk_round_trips() {
        let mut out = empty_handle();
        let mut pending = PendingChunk::new(chunk::TAG_PHDR);
        pending.extend(b"hello");
        pending.commit(&mut out).await.unwrap();
        out.seek(0, crate::handle::SeekWhence::Start).await.unwrap();

        let header = read_chunk_header(&mut out).await.unwrap();
        assert_eq!(&header.tag, chunk::TAG_PHDR);
        expect_tag(&header, chunk::TAG_PHDR).unwrap();
        let payload = read_chunk_payload(&mut out, &header).await.unwrap();
        assert_eq!(payload, b"hello");
    }

    #[tokio::test]
    async fn wrong_tag_is_rejected() {
        let mut out = empty_handle();
        let mut pending = PendingChunk::new(chunk::TAG_PHDR);
        pending.extend(b"x");
        pending.commit(&mut out).await.unwrap();
        out.seek(0, crate::handle::SeekWhence::Start).await.unwrap();
        let header = read_chunk_header(&mut out).await.unwrap();
        assert!(expect_tag(&header, chunk::TAG_FOOT).is_err());
    }

    #[tokio::test]
    async fn packet_frame_round_trips_over_a_handle() {
        let mut out = empty_handle();
        write_packet_frame(&mut out, 5, b"payload").await.unwrap();
        out.seek(0, crate::handle::SeekWhence::Start).await.unwrap();
        let (stream_id, payload) = read_packet_frame(&mut out).await.unwrap();
        assert_eq!(stream_id, 5);
        assert_eq!(payload, b"payload");
    }

    #[tokio::test]
    async fn realignment_marker_is_skipped_transparently() {
        let mut out = empty_handle();
        write_packet_frame(&mut out, 1, b"a").await.unwrap();
        out.align_write().await.unwrap();
        write_packet_frame(&mut out, 2, b"bc").await.unwrap();
        out.seek(0, crate::handle::SeekWhence::Start).await.unwrap();

        let (first_id, first_payload) = read_packet_frame(&mut out).await.unwrap();
        assert_eq!(first_id, 1);
        assert_eq!(first_payload, b"a");

        let (second_id, second_payload) = read_packet_frame(&mut out).await.unwrap();
        assert_eq!(second_id, 2);
        assert_eq!(second_payload, b"bc");
    }
}
