// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Value/dictionary/array data model, packet model, and stream/track
//! descriptors shared across the media container runtime.
//!
//! ## Modules
//!
//! - [`value`]: the tagged-variant `Value` type and the `AudioFormat`/
//!   `VideoFormat`/color/position structs it carries.
//! - [`dictionary`]: ordered, insertion-order-preserving key/value map.
//! - [`array`]: ordered sequence of `Value`.
//! - [`packet`]: the `Packet` type, flags, per-stream stats, PTS cache.
//! - [`track`]: stream/track descriptor views over `Dictionary`.
//! - [`message`]: control-message envelopes.
//! - [`error`]: shared error taxonomy and sticky-flag helper.

pub mod array;
pub mod dictionary;
pub mod error;
pub mod message;
pub mod packet;
pub mod track;
pub mod value;

pub use array::Array;
pub use dictionary::{Dictionary, SetOutcome};
pub use error::{CoreError, ErrorKind, Result, StickyFlag};
pub use message::Message;
pub use packet::{FrameType, Packet, PacketFlags, PacketStats, PtsCache, TIME_UNDEFINED};
pub use track::{compression_flags, CompressionInfo, StreamDescriptor, StreamType, TrackDescriptor};
pub use value::{AudioFormat, ColorRgb, ColorRgba, PixelFormat, Position, SampleFormat, Value, ValueType, VideoFormat};
