// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Stream and track descriptors: thin, well-known-key views over
//! [`Dictionary`], matching the original model's choice to represent
//! structural metadata in the same vocabulary as everything else rather
//! than as distinct wire types.

use crate::dictionary::Dictionary;
use crate::value::Value;

pub const KEY_TYPE: &str = "type";
pub const KEY_ID: &str = "id";
pub const KEY_FORMAT: &str = "format";
pub const KEY_COMPRESSION: &str = "compression";
pub const KEY_METADATA: &str = "metadata";
pub const KEY_STATS: &str = "stats";

pub const KEY_CODEC_ID: &str = "codec_id";
pub const KEY_CODEC_FLAGS: &str = "codec_flags";
pub const KEY_CODEC_HEADER: &str = "codec_header";
pub const KEY_BITRATE: &str = "bitrate";
pub const KEY_BLOCK_ALIGN: &str = "block_align";
pub const KEY_TAG: &str = "tag";

pub const KEY_MIME_TYPE: &str = "mimetype";
pub const KEY_CODEC_LONG_NAME: &str = "codec_long_name";
pub const KEY_ENDIAN: &str = "endian";

pub const KEY_STREAMS: &str = "streams";
pub const KEY_EXTERNAL_STREAMS: &str = "external_streams";
pub const KEY_VARIANTS: &str = "variants";
pub const KEY_PARTS: &str = "parts";
pub const KEY_CHILDREN: &str = "children";
pub const KEY_MEDIA_CLASS: &str = "media_class";

/// First stream id assigned within a track; ids increase from here.
pub const FIRST_STREAM_ID: i32 = 1;
/// Reserved stream id for the in-band control message stream.
pub const MESSAGE_STREAM_ID: i32 = -2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    Audio,
    Video,
    Text,
    Overlay,
    Message,
}

impl StreamType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Text => "text",
            Self::Overlay => "overlay",
            Self::Message => "message",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "audio" => Self::Audio,
            "video" => Self::Video,
            "text" => Self::Text,
            "overlay" => Self::Overlay,
            "message" => Self::Message,
            _ => return None,
        })
    }
}

/// Compression info bundle attached to a stream descriptor.
#[derive(Debug, Clone, Default)]
pub struct CompressionInfo {
    pub codec_id: Option<String>,
    pub flags: i32,
    pub header: Option<Vec<u8>>,
    pub bitrate: Option<i64>,
    pub block_align: Option<i32>,
    pub tag: Option<String>,
}

/// Compression info flag bits relevant to the reorder buffer.
pub mod compression_flags {
    pub const HAS_B_FRAMES: i32 = 1 << 0;
    pub const LOW_DELAY: i32 = 1 << 1;
    pub const CALC_FRAME_DURATIONS: i32 = 1 << 2;
    pub const MARK_LAST: i32 = 1 << 3;
    /// Stream has inter-predicted (non-keyframe) packets at all, so the
    /// reorder buffer must gate on the first keyframe before admitting
    /// anything. Implied by `HAS_B_FRAMES`.
    pub const HAS_P_FRAMES: i32 = 1 << 4;
}

impl CompressionInfo {
    #[must_use]
    pub fn to_dictionary(&self) -> Dictionary {
        let mut d = Dictionary::new();
        if let Some(id) = &self.codec_id {
            d.set_string(KEY_CODEC_ID, id.clone());
        }
        d.set_int(KEY_CODEC_FLAGS, self.flags);
        if let Some(h) = &self.header {
            d.set(KEY_CODEC_HEADER, Value::Binary(h.clone()));
        }
        if let Some(b) = self.bitrate {
            d.set_long(KEY_BITRATE, b);
        }
        if let Some(ba) = self.block_align {
            d.set_int(KEY_BLOCK_ALIGN, ba);
        }
        if let Some(tag) = &self.tag {
            d.set_string(KEY_TAG, tag.clone());
        }
        d
    }

    #[must_use]
    pub fn from_dictionary(d: &Dictionary) -> Self {
        Self {
            codec_id: d.get_string(KEY_CODEC_ID).map(str::to_string),
            flags: d.get_int(KEY_CODEC_FLAGS).unwrap_or(0),
            header: d.get(KEY_CODEC_HEADER).and_then(Value::as_binary).map(<[u8]>::to_vec),
            bitrate: d.get_long(KEY_BITRATE),
            block_align: d.get_int(KEY_BLOCK_ALIGN),
            tag: d.get_string(KEY_TAG).map(str::to_string),
        }
    }

    #[must_use]
    pub const fn has_b_frames(&self) -> bool {
        self.flags & compression_flags::HAS_B_FRAMES != 0
    }

    #[must_use]
    pub const fn is_low_delay(&self) -> bool {
        self.flags & compression_flags::LOW_DELAY != 0
    }

    #[must_use]
    pub const fn has_p_frames(&self) -> bool {
        self.flags & (compression_flags::HAS_P_FRAMES | compression_flags::HAS_B_FRAMES) != 0
    }

    #[must_use]
    pub const fn calc_frame_durations(&self) -> bool {
        self.flags & compression_flags::CALC_FRAME_DURATIONS != 0
    }

    #[must_use]
    pub const fn mark_last(&self) -> bool {
        self.flags & compression_flags::MARK_LAST != 0
    }
}

/// A builder/accessor view over a stream descriptor dictionary.
#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    dict: Dictionary,
}

impl StreamDescriptor {
    /// `id <= 0` leaves the stream unassigned; [`TrackDescriptor::add_stream`]
    /// then assigns the next id in sequence.
    #[must_use]
    pub fn new(stream_type: StreamType, id: i32) -> Self {
        let mut dict = Dictionary::new();
        dict.set_string(KEY_TYPE, stream_type.as_str());
        if id > 0 {
            dict.set_int(KEY_ID, id);
        }
        Self { dict }
    }

    #[must_use]
    pub fn from_dictionary(dict: Dictionary) -> Self {
        Self { dict }
    }

    #[must_use]
    pub const fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    pub fn into_dictionary(self) -> Dictionary {
        self.dict
    }

    #[must_use]
    pub fn stream_type(&self) -> Option<StreamType> {
        self.dict.get_string(KEY_TYPE).and_then(StreamType::from_str)
    }

    #[must_use]
    pub fn id(&self) -> Option<i32> {
        self.dict.get_int(KEY_ID)
    }

    pub fn set_format(&mut self, format: Value) {
        self.dict.set(KEY_FORMAT, format);
    }

    #[must_use]
    pub fn format(&self) -> Option<&Value> {
        self.dict.get(KEY_FORMAT)
    }

    pub fn set_compression(&mut self, ci: &CompressionInfo) {
        self.dict.set_dictionary(KEY_COMPRESSION, ci.to_dictionary());
    }

    #[must_use]
    pub fn compression(&self) -> CompressionInfo {
        self.dict.get_dictionary(KEY_COMPRESSION).map(CompressionInfo::from_dictionary).unwrap_or_default()
    }

    #[must_use]
    pub fn metadata(&self) -> Dictionary {
        self.dict.get_dictionary(KEY_METADATA).cloned().unwrap_or_default()
    }

    pub fn set_metadata(&mut self, md: Dictionary) {
        self.dict.set_dictionary(KEY_METADATA, md);
    }

    /// Sample timescale invariant: audio uses its samplerate, video its
    /// format timescale, text/message an explicit key.
    #[must_use]
    pub fn timescale(&self) -> Option<i32> {
        match self.stream_type()? {
            StreamType::Audio => self.format()?.as_audio_format().map(crate::value::AudioFormat::timescale),
            StreamType::Video => self.format()?.as_video_format().map(crate::value::VideoFormat::timescale),
            StreamType::Text | StreamType::Overlay | StreamType::Message => {
                self.dict.get_int("timescale")
            }
        }
    }

    /// Inject implicit metadata (bitrate, mime type, codec long name,
    /// endian tag) derived from compression info, so readers can
    /// render labels without decoder tables.
    pub fn inject_implicit_metadata(&mut self, mime_type: Option<&str>, codec_long_name: Option<&str>, endian: Option<&str>) {
        let ci = self.compression();
        let mut md = self.metadata();
        if let Some(bitrate) = ci.bitrate {
            md.set_long(KEY_BITRATE, bitrate);
        }
        if let Some(m) = mime_type {
            md.set_string(KEY_MIME_TYPE, m);
        }
        if let Some(c) = codec_long_name {
            md.set_string(KEY_CODEC_LONG_NAME, c);
        }
        if let Some(e) = endian {
            md.set_string(KEY_ENDIAN, e);
        }
        self.set_metadata(md);
    }
}

/// A builder/accessor view over a track descriptor dictionary.
#[derive(Debug, Clone, Default)]
pub struct TrackDescriptor {
    dict: Dictionary,
}

impl TrackDescriptor {
    #[must_use]
    pub fn new() -> Self {
        Self { dict: Dictionary::new() }
    }

    #[must_use]
    pub fn from_dictionary(dict: Dictionary) -> Self {
        Self { dict }
    }

    #[must_use]
    pub const fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    pub fn into_dictionary(self) -> Dictionary {
        self.dict
    }

    #[must_use]
    pub fn media_class(&self) -> Option<&str> {
        self.dict.get_string(KEY_MEDIA_CLASS)
    }

    pub fn set_media_class(&mut self, class: impl Into<String>) {
        self.dict.set_string(KEY_MEDIA_CLASS, class);
    }

    #[must_use]
    pub fn metadata(&self) -> Dictionary {
        self.dict.get_dictionary(KEY_METADATA).cloned().unwrap_or_default()
    }

    pub fn set_metadata(&mut self, md: Dictionary) {
        self.dict.set_dictionary(KEY_METADATA, md);
    }

    /// Add a stream, assigning the next id in the sequence starting at
    /// [`FIRST_STREAM_ID`] ("stream ids begin at a reserved constant
    /// and increase").
    pub fn add_stream(&mut self, mut stream: StreamDescriptor) -> i32 {
        let next_id = self.streams().len() as i32 + FIRST_STREAM_ID;
        if stream.id().is_none() {
            stream.dict.set_int(KEY_ID, next_id);
        }
        let id = stream.id().unwrap_or(next_id);

        let mut arr = self.dict.get(KEY_STREAMS).and_then(Value::as_array).cloned().unwrap_or_default();
        arr.push(Value::Dictionary(stream.into_dictionary()));
        self.dict.set(KEY_STREAMS, Value::Array(arr));
        id
    }

    /// Enumerate streams in declaration order.
    #[must_use]
    pub fn streams(&self) -> Vec<StreamDescriptor> {
        self.dict
            .get(KEY_STREAMS)
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_dictionary)
                    .cloned()
                    .map(StreamDescriptor::from_dictionary)
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn streams_of_type(&self, t: StreamType) -> Vec<StreamDescriptor> {
        self.streams().into_iter().filter(|s| s.stream_type() == Some(t)).collect()
    }

    #[must_use]
    pub fn stream_by_id(&self, id: i32) -> Option<StreamDescriptor> {
        self.streams().into_iter().find(|s| s.id() == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_stream_assigns_increasing_ids() {
        let mut t = TrackDescriptor::new();
        let id1 = t.add_stream(StreamDescriptor::new(StreamType::Video, 0));
        let id2 = t.add_stream(StreamDescriptor::new(StreamType::Audio, 0));
        assert_eq!(id1, FIRST_STREAM_ID);
        assert_eq!(id2, FIRST_STREAM_ID + 1);
    }

    #[test]
    fn streams_of_type_filters() {
        let mut t = TrackDescriptor::new();
        t.add_stream(StreamDescriptor::new(StreamType::Video, 0));
        t.add_stream(StreamDescriptor::new(StreamType::Audio, 0));
        assert_eq!(t.streams_of_type(StreamType::Audio).len(), 1);
        assert_eq!(t.streams_of_type(StreamType::Video).len(), 1);
    }

    #[test]
    fn compression_info_round_trips_through_dictionary() {
        let ci = CompressionInfo {
            codec_id: Some("opus".into()),
            flags: compression_flags::HAS_B_FRAMES,
            header: Some(vec![1, 2, 3]),
            bitrate: Some(128_000),
            block_align: Some(4),
            tag: Some("Opus".into()),
        };
        let d = ci.to_dictionary();
        let back = CompressionInfo::from_dictionary(&d);
        assert_eq!(back.codec_id.as_deref(), Some("opus"));
        assert!(back.has_b_frames());
        assert_eq!(back.bitrate, Some(128_000));
    }

    #[test]
    fn has_p_frames_is_implied_by_b_frames() {
        let ci = CompressionInfo { flags: compression_flags::HAS_B_FRAMES, ..CompressionInfo::default() };
        assert!(ci.has_p_frames());
        let ci = CompressionInfo { flags: compression_flags::HAS_P_FRAMES, ..CompressionInfo::default() };
        assert!(ci.has_p_frames());
        let ci = CompressionInfo::default();
        assert!(!ci.has_p_frames());
    }
}
