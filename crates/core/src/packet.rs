// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Packet model: an owned byte buffer plus the timing/flag metadata that
//! flows through the pipeline (sources, sinks, reorder buffer, wire codec).

use serde::{Deserialize, Serialize};

/// Unset timestamp/duration sentinel, matching the "missing" state that
/// the reorder buffer's inference algorithms fill in.
pub const TIME_UNDEFINED: i64 = i64::MIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameType {
    /// Not yet inferred, or not applicable (stream has no B-frames).
    Unknown,
    I,
    P,
    B,
}

/// Boolean flags carried on a packet. Kept as discrete fields rather than a
/// bitmask: the reorder buffer reads and writes these individually and a
/// bitmask would just be a second encoding to keep in sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketFlags {
    pub keyframe: bool,
    pub field_pic: bool,
    pub last_in_stream: bool,
    pub skip: bool,
    pub has_header: bool,
}

/// A rectangle in source pixel coordinates, used for overlay packets that
/// only cover part of the destination frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
}

/// An owned media packet.
///
/// Per the packet-frame-ownership design note, a packet logically
/// carries *either* an owned byte buffer *or* a borrowed hardware-frame
/// reference; here that is `hw_frame_id`, an opaque handle into a
/// `gavf-hw` frame pool, which callers interpret instead of `data` when
/// present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub stream_id: i32,
    pub data: Vec<u8>,

    pub pts: i64,
    pub dts: i64,
    pub duration: i64,
    /// Lower-resolution timestamp carried by upstream containers (PES-PTS),
    /// used as a fallback when `pts` is undefined.
    pub pes_pts: i64,

    pub frame_type: FrameType,
    pub flags: PacketFlags,

    pub src_rect: Option<Rect>,
    pub dst_offset: Option<Offset>,

    pub hw_frame_id: Option<u64>,
}

impl Packet {
    #[must_use]
    pub fn new(stream_id: i32, data: Vec<u8>) -> Self {
        Self {
            stream_id,
            data,
            pts: TIME_UNDEFINED,
            dts: TIME_UNDEFINED,
            duration: TIME_UNDEFINED,
            pes_pts: TIME_UNDEFINED,
            frame_type: FrameType::Unknown,
            flags: PacketFlags::default(),
            src_rect: None,
            dst_offset: None,
            hw_frame_id: None,
        }
    }

    #[must_use]
    pub const fn pts_is_defined(&self) -> bool {
        self.pts != TIME_UNDEFINED
    }

    #[must_use]
    pub const fn dts_is_defined(&self) -> bool {
        self.dts != TIME_UNDEFINED
    }

    #[must_use]
    pub const fn duration_is_defined(&self) -> bool {
        self.duration != TIME_UNDEFINED
    }

    #[must_use]
    pub const fn pes_pts_is_defined(&self) -> bool {
        self.pes_pts != TIME_UNDEFINED
    }

    #[must_use]
    pub fn is_zero_length(&self) -> bool {
        self.data.is_empty() && self.hw_frame_id.is_none()
    }
}

/// Running byte/packet/PTS-range statistics for one stream, surfaced in a
/// stream descriptor's "stream stats" dictionary field.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PacketStats {
    pub num_packets: u64,
    pub num_bytes: u64,
    pub pts_start: i64,
    pub pts_end: i64,
}

impl PacketStats {
    #[must_use]
    pub const fn new() -> Self {
        Self { num_packets: 0, num_bytes: 0, pts_start: TIME_UNDEFINED, pts_end: TIME_UNDEFINED }
    }

    pub fn record(&mut self, pkt: &Packet) {
        self.num_packets += 1;
        self.num_bytes += pkt.data.len() as u64;
        if pkt.pts_is_defined() {
            if self.pts_start == TIME_UNDEFINED {
                self.pts_start = pkt.pts;
            }
            self.pts_end = pkt.pts;
        }
    }
}

/// Small LRU-free cache of the most recent PTS seen per stream, used by
/// callers that need to bootstrap timestamp inference ("bootstrap
/// from the first available PES-PTS or 0") without re-deriving it from the
/// full packet history.
#[derive(Debug, Default)]
pub struct PtsCache {
    last_pts: std::collections::HashMap<i32, i64>,
}

impl PtsCache {
    #[must_use]
    pub fn new() -> Self {
        Self { last_pts: std::collections::HashMap::new() }
    }

    pub fn record(&mut self, stream_id: i32, pts: i64) {
        self.last_pts.insert(stream_id, pts);
    }

    #[must_use]
    pub fn last(&self, stream_id: i32) -> Option<i64> {
        self.last_pts.get(&stream_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_packet_has_undefined_timing() {
        let p = Packet::new(1, vec![1, 2, 3]);
        assert!(!p.pts_is_defined());
        assert!(!p.dts_is_defined());
        assert!(!p.duration_is_defined());
    }

    #[test]
    fn stats_track_pts_range() {
        let mut stats = PacketStats::new();
        let mut p1 = Packet::new(1, vec![0; 4]);
        p1.pts = 10;
        let mut p2 = Packet::new(1, vec![0; 4]);
        p2.pts = 30;
        stats.record(&p1);
        stats.record(&p2);
        assert_eq!(stats.num_packets, 2);
        assert_eq!(stats.num_bytes, 8);
        assert_eq!(stats.pts_start, 10);
        assert_eq!(stats.pts_end, 30);
    }

    #[test]
    fn zero_length_packet_has_no_data_or_hw_frame() {
        let p = Packet::new(1, Vec::new());
        assert!(p.is_zero_length());
    }

    #[test]
    fn pts_cache_round_trips() {
        let mut cache = PtsCache::new();
        assert_eq!(cache.last(1), None);
        cache.record(1, 42);
        assert_eq!(cache.last(1), Some(42));
    }
}
