// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Packet reorder/retiming buffer — the hardest algorithmic piece of the
//! pipeline. Sits between a packet producer (sink side) and a
//! consumer (source side); owns an in-flight queue and infers missing
//! PTS/duration either via a low-delay path or, for streams with
//! B-frames, by walking the nearest I/P anchors.
//!
//! The queue is a plain growable `Vec`, not a ring buffer: packets are
//! appended at the tail and removed from the head (`Vec::remove(0)`),
//! mirroring a FIFO built over an array rather than a deque.

use crate::error::Result;
use crate::sink::{PacketSink, SinkStatus};
use crate::source::{PacketSource, ReadStatus, SourceFlags, SourceRead};
use async_trait::async_trait;
use gavf_core::{compression_flags, CompressionInfo, FrameType, Packet, StreamDescriptor, TIME_UNDEFINED};

#[derive(Debug, Clone, Copy)]
pub struct ReorderConfig {
    /// Hold back the final packet until `flush()` so it can be tagged
    /// `last_in_stream`.
    pub mark_last: bool,
    /// Require a definite duration, not just a definite PTS, before a
    /// packet is released to the consumer.
    pub calc_frame_durations: bool,
    /// Log (at debug level) when the queue depth exceeds this many packets.
    pub high_water_mark: usize,
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self { mark_last: false, calc_frame_durations: true, high_water_mark: 64 }
    }
}

/// Round `value` (in units of `from_scale` per second) to the nearest
/// integer number of `to_scale` units, rounding half away from zero. This
/// is the one rational-rescale every PES-PTS/duration-divisor computation
/// in this module goes through.
fn rescale(value: i64, from_scale: i32, to_scale: i32) -> i64 {
    if from_scale == 0 || to_scale == 0 || from_scale == to_scale {
        return value;
    }
    let num = i128::from(value) * i128::from(to_scale);
    let den = i128::from(from_scale);
    let rounded = if num >= 0 { (num + den / 2) / den } else { (num - den / 2) / den };
    rounded as i64
}

/// Assign `p.pts` from the running output PTS (bootstrapping it from
/// `p.pes_pts` on first use) and advance the running PTS by `p.duration`.
fn pts_from_duration(running_pts: &mut i64, packet_scale: i32, sample_scale: i32, p: &mut Packet) {
    if *running_pts == TIME_UNDEFINED {
        *running_pts = if p.pes_pts_is_defined() { rescale(p.pes_pts, packet_scale, sample_scale) } else { 0 };
    }
    p.pts = *running_pts;
    *running_pts += p.duration;
}

/// Assign `p.duration` from `next_pts` (or the last known duration if
/// there's no next packet yet).
fn duration_from_pts(last_duration: &mut i64, p: &mut Packet, next_pts: Option<i64>) {
    match next_pts {
        Some(next_pts) => {
            p.duration = next_pts - p.pts;
            *last_duration = p.duration;
        }
        None => p.duration = *last_duration,
    }
}

/// First index at or after `start` that isn't a B-frame.
fn next_ip_idx(queue: &[Packet], start: usize) -> Option<usize> {
    queue.get(start..)?.iter().position(|p| p.frame_type != FrameType::B).map(|i| i + start)
}

/// Smallest-PTS packet within `[start, end)` whose PTS exceeds `pts`.
fn next_by_pts(queue: &[Packet], pts: i64, start: usize, end: usize) -> Option<usize> {
    let mut ret: Option<usize> = None;
    for i in start..end {
        if queue[i].pts <= pts {
            continue;
        }
        if ret.is_none_or(|r| queue[i].pts < queue[r].pts) {
            ret = Some(i);
        }
    }
    ret
}

pub struct ReorderBuffer {
    queue: Vec<Packet>,
    /// The packet last handed to a `None`-destination `read` call, kept
    /// alive so `SourceRead::Borrowed` has somewhere to point.
    last_out: Option<Packet>,

    stream: StreamDescriptor,
    compression: CompressionInfo,
    packet_scale: i32,
    sample_scale: i32,
    duration_divisor: i32,
    non_continuous: bool,

    mark_last: bool,
    calc_frame_durations: bool,
    high_water_mark: usize,

    last_duration: i64,
    pts: i64,
    max_pts: i64,
    flush: bool,

    ip_frames_seen: u32,
    keyframes_seen: u32,
}

impl ReorderBuffer {
    /// Bind a buffer to `stream`, reading its compression flags, packet
    /// timescale, and sample timescale once at construction ("bound to
    /// exactly one stream descriptor ... at first use").
    #[must_use]
    pub fn new(stream: StreamDescriptor, config: ReorderConfig) -> Self {
        let metadata = stream.metadata();
        let packet_scale = metadata.get_int("packet_timescale").unwrap_or(0);
        let sample_scale = metadata.get_int("sample_timescale").or_else(|| stream.timescale()).unwrap_or(0);
        let duration_divisor = metadata.get_int("packet_duration_divisor").unwrap_or(0);
        let non_continuous = metadata.get_int("continuous").is_some_and(|v| v == 0);
        let compression = stream.compression();

        Self {
            queue: Vec::new(),
            last_out: None,
            stream,
            compression,
            packet_scale,
            sample_scale,
            duration_divisor,
            non_continuous,
            mark_last: config.mark_last,
            calc_frame_durations: config.calc_frame_durations,
            high_water_mark: config.high_water_mark,
            last_duration: -1,
            pts: TIME_UNDEFINED,
            max_pts: TIME_UNDEFINED,
            flush: false,
            ip_frames_seen: 0,
            keyframes_seen: 0,
        }
    }

    #[must_use]
    pub const fn stream(&self) -> &StreamDescriptor {
        &self.stream
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Mark the buffer flushing: no more input is coming, so the consumer
    /// may drain everything still queued, and the last queued packet is
    /// tagged `last_in_stream` if `mark_last` is set.
    pub fn flush(&mut self) {
        self.flush = true;
        if self.mark_last {
            if let Some(last) = self.queue.last_mut() {
                last.flags.last_in_stream = true;
            }
        }
        self.update_timestamps();
    }

    /// Return every queued packet and reset the running PTS.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.last_out = None;
        self.flush = false;
        self.last_duration = -1;
        self.pts = TIME_UNDEFINED;
        self.max_pts = TIME_UNDEFINED;
        self.ip_frames_seen = 0;
        self.keyframes_seen = 0;
    }

    /// Seed the running output PTS, typically right after a seek.
    pub fn set_out_pts(&mut self, pts: i64) {
        self.pts = pts;
    }

    fn admit(&mut self, mut p: Packet) {
        if p.is_zero_length() {
            tracing::warn!(stream_id = p.stream_id, "admitted a zero-length packet");
        }

        if p.flags.skip {
            return;
        }

        if self.compression.has_p_frames() {
            if p.flags.keyframe {
                self.keyframes_seen += 1;
            } else if self.keyframes_seen == 0 {
                if !self.compression.has_b_frames() {
                    if self.pts == TIME_UNDEFINED && p.pes_pts_is_defined() {
                        self.pts = rescale(p.pes_pts, self.packet_scale, self.sample_scale);
                    }
                    if self.pts != TIME_UNDEFINED && p.duration > 0 {
                        self.pts += p.duration;
                    }
                }
                return;
            }
        }

        if p.flags.field_pic {
            if let Some(last) = self.queue.last_mut() {
                if last.flags.field_pic {
                    last.data.extend_from_slice(&p.data);
                    last.flags.field_pic = false;
                    return;
                }
            }
        }

        if self.compression.has_p_frames() && p.frame_type == FrameType::Unknown && p.pts_is_defined() {
            if p.flags.keyframe {
                p.frame_type = FrameType::I;
                self.max_pts = p.pts;
            } else if self.max_pts == TIME_UNDEFINED || self.max_pts < p.pts {
                self.max_pts = p.pts;
                p.frame_type = FrameType::P;
            } else {
                p.frame_type = FrameType::B;
            }
        }

        if self.compression.has_b_frames() {
            if p.frame_type == FrameType::B {
                if self.ip_frames_seen < 2 {
                    return;
                }
            } else {
                self.ip_frames_seen += 1;
            }
        }

        self.queue.push(p);
        if self.queue.len() > self.high_water_mark {
            tracing::debug!(depth = self.queue.len(), high_water_mark = self.high_water_mark, "reorder buffer exceeded high-water mark");
        }

        let last = self.queue.len() - 1;
        if self.queue[last].pts_is_defined() && (!self.calc_frame_durations || self.queue[last].duration >= 0) {
            return;
        }

        self.update_timestamps();
    }

    fn update_timestamps(&mut self) {
        let len = self.queue.len();
        if len < 1 {
            return;
        }
        let last = len - 1;

        if self.queue[last].pts_is_defined() && (!self.calc_frame_durations || self.queue[last].duration > 0) {
            return;
        }

        if len > 1 {
            let prev = len - 2;
            if self.queue[prev].duration <= 0 && self.queue[prev].dts_is_defined() && self.queue[last].dts_is_defined() {
                let duration = self.queue[last].dts - self.queue[prev].dts;
                self.queue[prev].duration = duration;
                if self.flush {
                    self.queue[last].duration = duration;
                }
            }
        }

        if self.compression.has_b_frames() {
            self.update_timestamps_b_frames();
        } else {
            self.update_timestamps_low_delay();
        }
    }

    fn update_timestamps_low_delay(&mut self) {
        let len = self.queue.len();

        for i in (0..len).rev() {
            if !self.queue[i].pts_is_defined() && self.queue[i].dts_is_defined() {
                self.queue[i].pts = self.queue[i].dts;
            } else {
                break;
            }
        }

        if self.calc_frame_durations {
            for i in (0..len.saturating_sub(1)).rev() {
                let next_pts = self.queue[i + 1].pts;
                let cur = &self.queue[i];
                if cur.duration < 0 && cur.pts_is_defined() && next_pts != TIME_UNDEFINED {
                    self.queue[i].duration = next_pts - self.queue[i].pts;
                    self.last_duration = self.queue[i].duration;
                } else {
                    break;
                }
            }
            if self.flush {
                duration_from_pts(&mut self.last_duration, &mut self.queue[len - 1], None);
            }
        }

        if self.duration_divisor > 0
            && !self.queue[len - 1].pts_is_defined()
            && self.queue[len - 1].duration < 0
            && self.queue[len - 1].pes_pts_is_defined()
        {
            for i in 0..len - 1 {
                if self.queue[i].duration > 0 {
                    continue;
                }
                let approx_samples =
                    rescale(self.queue[i + 1].pes_pts - self.queue[i].pes_pts, self.packet_scale, self.sample_scale);
                let divisor = i64::from(self.duration_divisor);
                let frames_per_packet = (approx_samples + divisor / 2) / divisor;
                let duration = frames_per_packet * divisor;
                self.queue[i].duration = duration;
                self.last_duration = duration;
                if !self.queue[i].pts_is_defined() {
                    pts_from_duration(&mut self.pts, self.packet_scale, self.sample_scale, &mut self.queue[i]);
                }
            }
            if self.flush {
                let last = len - 1;
                self.queue[last].duration = self.last_duration;
                if !self.queue[last].pts_is_defined() {
                    pts_from_duration(&mut self.pts, self.packet_scale, self.sample_scale, &mut self.queue[last]);
                }
            }
        }

        if !self.queue[len - 1].pts_is_defined() && self.queue[len - 1].duration >= 0 {
            for i in 0..len {
                if self.queue[i].pts_is_defined() {
                    continue;
                }
                pts_from_duration(&mut self.pts, self.packet_scale, self.sample_scale, &mut self.queue[i]);
            }
        }
    }

    fn pts_from_duration_b_frames(&mut self) {
        let len = self.queue.len();
        let Some(mut ip1) = next_ip_idx(&self.queue, 0) else { return };

        loop {
            let ip2 = match next_ip_idx(&self.queue, ip1 + 1) {
                Some(idx) => idx,
                None => {
                    if self.flush {
                        len
                    } else {
                        break;
                    }
                }
            };

            if !self.queue[ip1].pts_is_defined() {
                for i in (ip1 + 1)..ip2 {
                    pts_from_duration(&mut self.pts, self.packet_scale, self.sample_scale, &mut self.queue[i]);
                }
                pts_from_duration(&mut self.pts, self.packet_scale, self.sample_scale, &mut self.queue[ip1]);
            }

            if ip2 == len {
                break;
            }
            ip1 = ip2;
        }
    }

    fn duration_from_pts_b_frames(&mut self) {
        let len = self.queue.len();

        if self.flush {
            let mut last_idx = 0;
            let mut duration = 0_i64;
            for i in 0..len {
                if self.queue[i].duration > 0 {
                    continue;
                }
                match next_by_pts(&self.queue, self.queue[i].pts, 0, len) {
                    None => last_idx = i,
                    Some(next_idx) => duration = self.queue[next_idx].pts - self.queue[i].pts,
                }
            }
            self.queue[last_idx].duration = duration;
            return;
        }

        let Some(mut ip1) = next_ip_idx(&self.queue, 0) else { return };
        while self.queue[ip1].duration > 0 {
            match next_ip_idx(&self.queue, ip1 + 1) {
                Some(idx) => ip1 = idx,
                None => return,
            }
        }
        let Some(ip2) = next_ip_idx(&self.queue, ip1 + 1) else { return };
        let Some(ip3) = next_ip_idx(&self.queue, ip2 + 1) else { return };

        for i in ip1..ip2 {
            if self.queue[i].duration > 0 {
                continue;
            }
            let pts = self.queue[i].pts;
            if let Some(next_idx) = next_by_pts(&self.queue, pts, ip1 + 1, ip3) {
                self.queue[i].duration = self.queue[next_idx].pts - pts;
            }
        }
    }

    fn update_timestamps_b_frames(&mut self) {
        let len = self.queue.len();
        if len == 0 {
            return;
        }
        let last = len - 1;

        if !self.queue[last].pts_is_defined() && self.queue[last].dts_is_defined() && self.queue[last].duration <= 0 {
            for i in (0..last).rev() {
                let next_dts = self.queue[i + 1].dts;
                let next_dts_defined = self.queue[i + 1].dts_is_defined();
                let cur = &self.queue[i];
                if cur.duration <= 0 && cur.dts_is_defined() && next_dts_defined {
                    self.queue[i].duration = next_dts - self.queue[i].dts;
                } else {
                    break;
                }
            }
        }

        if len >= 2 && !self.queue[last].pts_is_defined() && self.queue[len - 2].duration > 0 {
            self.pts_from_duration_b_frames();
        }

        if self.calc_frame_durations && self.queue[last].duration < 0 {
            self.duration_from_pts_b_frames();
        }
    }

    fn try_read(&mut self) -> (ReadStatus, Option<Packet>) {
        if self.queue.is_empty() {
            return if self.flush { (ReadStatus::Eof, None) } else { (ReadStatus::Again, None) };
        }

        if self.queue.len() == 1 && self.mark_last && !self.flush {
            return (ReadStatus::Again, None);
        }

        if self.queue[0].flags.field_pic {
            return (ReadStatus::Again, None);
        }

        if !self.non_continuous
            && (!self.queue[0].pts_is_defined() || (self.queue[0].duration < 0 && self.calc_frame_durations))
        {
            return (ReadStatus::Again, None);
        }

        (ReadStatus::Ok, Some(self.queue.remove(0)))
    }
}

#[async_trait]
impl PacketSink for ReorderBuffer {
    async fn get(&mut self) -> Result<Option<Packet>> {
        Ok(None)
    }

    async fn put(&mut self, packet: Packet) -> Result<SinkStatus> {
        self.admit(packet);
        Ok(SinkStatus::Ok)
    }
}

#[async_trait]
impl PacketSource for ReorderBuffer {
    fn flags(&self) -> SourceFlags {
        SourceFlags { src_alloc: true, frame_size_is_upper_bound: false, discontinuous: self.non_continuous }
    }

    async fn read<'a>(&'a mut self, dst: Option<&mut Packet>) -> Result<(ReadStatus, Option<SourceRead<'a>>)> {
        let (status, packet) = self.try_read();
        match (packet, dst) {
            (Some(p), None) => {
                let borrowed: &Packet = self.last_out.insert(p);
                Ok((status, Some(SourceRead::Borrowed(borrowed))))
            }
            (Some(p), Some(d)) => {
                *d = p;
                Ok((status, Some(SourceRead::Copied)))
            }
            (None, _) => Ok((status, None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavf_core::StreamType;

    fn stream(has_p_frames: bool, has_b_frames: bool) -> StreamDescriptor {
        let mut s = StreamDescriptor::new(StreamType::Video, 1);
        let mut flags = 0;
        if has_p_frames {
            flags |= compression_flags::HAS_P_FRAMES;
        }
        if has_b_frames {
            flags |= compression_flags::HAS_B_FRAMES;
        }
        s.set_compression(&CompressionInfo { flags, ..CompressionInfo::default() });
        s
    }

    fn packet(pts: i64, dts: i64, duration: i64) -> Packet {
        let mut p = Packet::new(1, vec![0; 4]);
        p.pts = pts;
        p.dts = dts;
        p.duration = duration;
        p
    }

    #[tokio::test]
    async fn low_delay_fills_pts_from_dts() {
        let mut buf = ReorderBuffer::new(stream(false, false), ReorderConfig::default());
        buf.put(packet(TIME_UNDEFINED, 100, 0)).await.unwrap();
        assert_eq!(buf.len(), 1);
        let (status, out) = buf.try_read();
        assert_eq!(status, ReadStatus::Ok);
        assert_eq!(out.unwrap().pts, 100);
    }

    #[tokio::test]
    async fn skip_flagged_packets_are_discarded() {
        let mut buf = ReorderBuffer::new(stream(false, false), ReorderConfig::default());
        let mut p = packet(0, 0, 10);
        p.flags.skip = true;
        buf.put(p).await.unwrap();
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn non_keyframes_are_discarded_before_the_first_keyframe() {
        let mut buf = ReorderBuffer::new(stream(true, false), ReorderConfig::default());
        let mut not_key = packet(TIME_UNDEFINED, TIME_UNDEFINED, TIME_UNDEFINED);
        not_key.flags.keyframe = false;
        buf.put(not_key).await.unwrap();
        assert!(buf.is_empty(), "non-keyframe before first keyframe must be discarded");

        let mut key = packet(0, 0, 10);
        key.flags.keyframe = true;
        buf.put(key).await.unwrap();
        assert_eq!(buf.len(), 1);
    }

    #[tokio::test]
    async fn field_pictures_merge_into_one_packet() {
        let mut buf = ReorderBuffer::new(stream(false, false), ReorderConfig::default());
        let mut first = packet(0, 0, 0);
        first.flags.field_pic = true;
        first.data = vec![1, 2];
        buf.put(first).await.unwrap();
        assert_eq!(buf.len(), 1);

        let mut second = packet(0, 0, 0);
        second.flags.field_pic = true;
        second.data = vec![3, 4];
        buf.put(second).await.unwrap();

        assert_eq!(buf.len(), 1, "the second field must merge into the first, not queue separately");
        let merged = &buf.queue[0];
        assert_eq!(merged.data, vec![1, 2, 3, 4]);
        assert!(!merged.flags.field_pic);
    }

    #[tokio::test]
    async fn mark_last_holds_back_the_final_packet_until_flush() {
        let mut buf = ReorderBuffer::new(stream(false, false), ReorderConfig { mark_last: true, ..ReorderConfig::default() });
        buf.put(packet(0, 0, 10)).await.unwrap();
        let (status, _) = buf.try_read();
        assert_eq!(status, ReadStatus::Again, "only one packet queued, must wait for a second or a flush");

        buf.flush();
        let (status, out) = buf.try_read();
        assert_eq!(status, ReadStatus::Ok);
        assert!(out.unwrap().flags.last_in_stream);
    }

    #[tokio::test]
    async fn clear_drops_queued_packets_and_resets_running_pts() {
        let mut buf = ReorderBuffer::new(stream(false, false), ReorderConfig::default());
        buf.put(packet(0, 0, 10)).await.unwrap();
        buf.put(packet(10, 10, 10)).await.unwrap();
        assert_eq!(buf.len(), 2);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.pts, TIME_UNDEFINED);
    }

    #[tokio::test]
    async fn set_out_pts_seeds_the_running_pts_after_a_seek() {
        let mut buf = ReorderBuffer::new(stream(false, false), ReorderConfig::default());
        buf.set_out_pts(5_000);
        let mut p = packet(TIME_UNDEFINED, TIME_UNDEFINED, 100);
        p.pes_pts = TIME_UNDEFINED;
        buf.put(p).await.unwrap();
        assert_eq!(buf.queue[0].pts, 5_000);
    }

    #[tokio::test]
    async fn b_frames_skip_leading_frames_before_the_second_ip_frame() {
        let mut buf = ReorderBuffer::new(stream(true, true), ReorderConfig::default());
        let mut key = packet(0, 0, 10);
        key.flags.keyframe = true;
        key.frame_type = FrameType::I;
        buf.put(key).await.unwrap();
        assert_eq!(buf.len(), 1, "the first I-frame is admitted normally");

        let mut b = packet(TIME_UNDEFINED, 5, TIME_UNDEFINED);
        b.frame_type = FrameType::B;
        buf.put(b).await.unwrap();
        assert_eq!(buf.len(), 1, "a B-frame before the second I/P frame has been seen must be dropped");
    }

    #[test]
    fn rescale_rounds_to_nearest() {
        assert_eq!(rescale(1, 1, 90_000), 90_000);
        assert_eq!(rescale(45_000, 90_000, 1), 1);
        assert_eq!(rescale(100, 48_000, 48_000), 100);
    }

    #[test]
    fn zero_timescale_passes_value_through_unchanged() {
        assert_eq!(rescale(42, 0, 90_000), 42);
    }
}
