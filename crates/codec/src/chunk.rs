// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Chunked container framing: an 8-byte ASCII tag, a big-endian 64-bit
//! length, and an 8-byte-padded payload. Also the packet-on-wire framing
//! used inside the `GAVFPKTS` chunk.

use crate::error::{CodecError, Result};
use crate::fixed;
use crate::varint;

pub const TAG_LEN: usize = 8;

pub const TAG_PHDR: &[u8; TAG_LEN] = b"GAVFPHDR";
pub const TAG_PKTS: &[u8; TAG_LEN] = b"GAVFPKTS";
pub const TAG_FOOT: &[u8; TAG_LEN] = b"GAVFFOOT";
pub const TAG_PEND: &[u8; TAG_LEN] = b"GAVFPEND";
pub const TAG_SYNC: &[u8; TAG_LEN] = b"GAVFSYNC";

/// Number of padding bytes needed to round `len` up to a multiple of 8.
#[must_use]
pub const fn padding_for(len: u64) -> u64 {
    (8 - (len % 8)) % 8
}

/// A decoded chunk header: tag, declared payload length, and the padding
/// that follows the payload on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub tag: [u8; TAG_LEN],
    pub payload_len: u64,
}

impl ChunkHeader {
    #[must_use]
    pub const fn padding(&self) -> u64 {
        padding_for(self.payload_len)
    }

    #[must_use]
    pub const fn total_on_wire(&self) -> u64 {
        TAG_LEN as u64 + 8 + self.payload_len + self.padding()
    }

    #[must_use]
    pub fn tag_str(&self) -> &str {
        std::str::from_utf8(&self.tag).unwrap_or("????????")
    }
}

/// Write a full chunk (tag + length + payload + zero padding) to `out`.
pub fn write_chunk(out: &mut Vec<u8>, tag: &[u8; TAG_LEN], payload: &[u8]) {
    out.extend_from_slice(tag);
    fixed::write_u64_be(out, payload.len() as u64);
    out.extend_from_slice(payload);
    let pad = padding_for(payload.len() as u64);
    out.extend(std::iter::repeat(0u8).take(pad as usize));
}

/// Reserve space for a chunk whose length isn't known yet (a seekable
/// sub-writer will patch it in later via [`patch_chunk_length`]); returns
/// the byte offset of the length field within `out`.
pub fn begin_chunk(out: &mut Vec<u8>, tag: &[u8; TAG_LEN]) -> usize {
    out.extend_from_slice(tag);
    let len_offset = out.len();
    fixed::write_u64_be(out, 0);
    len_offset
}

/// Patch the 8-byte length field previously reserved by [`begin_chunk`] now
/// that the payload (and its padding) have been written.
pub fn patch_chunk_length(out: &mut [u8], len_offset: usize, payload_len: u64) {
    out[len_offset..len_offset + 8].copy_from_slice(&payload_len.to_be_bytes());
}

/// Parse the 16-byte chunk header (tag + length) at the front of `buf`.
pub fn read_chunk_header(buf: &[u8]) -> Result<(ChunkHeader, usize)> {
    if buf.len() < TAG_LEN + 8 {
        return Err(CodecError::ShortRead { needed: TAG_LEN + 8, available: buf.len() });
    }
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&buf[..TAG_LEN]);
    let (payload_len, _) = fixed::read_u64_be(&buf[TAG_LEN..])?;
    Ok((ChunkHeader { tag, payload_len }, TAG_LEN + 8))
}

/// Read a full chunk (header + payload, padding skipped) from `buf`,
/// returning the header, a slice onto the payload, and the total bytes
/// consumed including padding.
pub fn read_chunk(buf: &[u8]) -> Result<(ChunkHeader, &[u8], usize)> {
    let (header, header_len) = read_chunk_header(buf)?;
    let payload_len = header.payload_len as usize;
    let rest = &buf[header_len..];
    if rest.len() < payload_len {
        return Err(CodecError::ShortRead { needed: payload_len, available: rest.len() });
    }
    let payload = &rest[..payload_len];
    let consumed = header_len + payload_len + header.padding() as usize;
    if buf.len() < consumed {
        return Err(CodecError::ShortRead { needed: consumed, available: buf.len() });
    }
    Ok((header, payload, consumed))
}

/// Marker byte that precedes every packet-on-wire frame inside `GAVFPKTS`.
/// A leading zero byte instead means "the writer padded to an 8-byte
/// boundary here; skip it and retry at the next aligned offset."
pub const PACKET_MARKER: u8 = 0x01;
pub const REALIGN_MARKER: u8 = 0x00;

/// Write one packet-on-wire frame: marker + varint(stream id) + varint(len)
/// + payload.
pub fn write_packet_frame(out: &mut Vec<u8>, stream_id: i32, payload: &[u8]) {
    out.push(PACKET_MARKER);
    varint::write_int32v(out, stream_id);
    varint::write_uint64v(out, payload.len() as u64);
    out.extend_from_slice(payload);
}

/// Outcome of reading one packet-on-wire frame.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameRead<'a> {
    Packet { stream_id: i32, payload: &'a [u8], consumed: usize },
    /// Saw a realignment marker; the caller should skip `consumed` bytes
    /// and retry reading at the next 8-byte-aligned offset.
    Realign { consumed: usize },
}

/// Read one packet-on-wire frame from `buf`, honoring the zero-byte
/// realignment rule.
pub fn read_packet_frame(buf: &[u8]) -> Result<FrameRead<'_>> {
    let &marker = buf.first().ok_or(CodecError::ShortRead { needed: 1, available: 0 })?;
    if marker == REALIGN_MARKER {
        return Ok(FrameRead::Realign { consumed: 1 });
    }
    if marker != PACKET_MARKER {
        return Err(CodecError::Protocol(format!("unexpected packet frame marker {marker:#x}")));
    }
    let (stream_id, n1) = varint::read_int32v(&buf[1..])?;
    let (len, n2) = varint::read_uint64v(&buf[1 + n1..])?;
    let len = len as usize;
    let header_len = 1 + n1 + n2;
    let rest = &buf[header_len..];
    if rest.len() < len {
        return Err(CodecError::ShortRead { needed: len, available: rest.len() });
    }
    Ok(FrameRead::Packet { stream_id, payload: &rest[..len], consumed: header_len + len })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_round_trips_with_padding() {
        let mut out = Vec::new();
        write_chunk(&mut out, TAG_PHDR, b"abc");
        assert_eq!(out.len(), 8 + 8 + 3 + 5);
        let (header, payload, consumed) = read_chunk(&out).unwrap();
        assert_eq!(&header.tag, TAG_PHDR);
        assert_eq!(header.payload_len, 3);
        assert_eq!(payload, b"abc");
        assert_eq!(consumed, out.len());
    }

    #[test]
    fn chunk_with_exact_multiple_of_eight_has_no_padding() {
        let mut out = Vec::new();
        write_chunk(&mut out, TAG_PKTS, b"12345678");
        assert_eq!(out.len(), 8 + 8 + 8);
    }

    #[test]
    fn begin_chunk_then_patch_matches_write_chunk() {
        let mut out = Vec::new();
        let len_offset = begin_chunk(&mut out, TAG_FOOT);
        out.extend_from_slice(b"xy");
        let pad = padding_for(2);
        out.extend(std::iter::repeat(0u8).take(pad as usize));
        patch_chunk_length(&mut out, len_offset, 2);

        let mut expected = Vec::new();
        write_chunk(&mut expected, TAG_FOOT, b"xy");
        assert_eq!(out, expected);
    }

    #[test]
    fn packet_frame_round_trips() {
        let mut out = Vec::new();
        write_packet_frame(&mut out, 3, b"payload");
        match read_packet_frame(&out).unwrap() {
            FrameRead::Packet { stream_id, payload, consumed } => {
                assert_eq!(stream_id, 3);
                assert_eq!(payload, b"payload");
                assert_eq!(consumed, out.len());
            }
            FrameRead::Realign { .. } => panic!("expected a packet frame"),
        }
    }

    #[test]
    fn zero_marker_signals_realignment() {
        let buf = [0x00u8, 0xFF, 0xFF];
        match read_packet_frame(&buf).unwrap() {
            FrameRead::Realign { consumed } => assert_eq!(consumed, 1),
            FrameRead::Packet { .. } => panic!("expected a realign marker"),
        }
    }
}
