// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Control messages: a namespaced, identified envelope carrying a
//! timestamp and an argument list, reusing the value model so messages can
//! travel on the same wire as packets.

use crate::packet::Packet;
use crate::value::Value;

pub const KEY_NAMESPACE: &str = "ns";
pub const KEY_ID: &str = "id";
pub const KEY_TIMESTAMP: &str = "pts";
pub const KEY_ARG_COUNT: &str = "argc";

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub namespace: String,
    pub id: String,
    pub pts: i64,
    pub args: Vec<Value>,
}

impl Message {
    #[must_use]
    pub fn new(namespace: impl Into<String>, id: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), id: id.into(), pts: 0, args: Vec::new() }
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.id)
    }
}

/// Recognised control message names.
pub mod names {
    pub const SRC_SELECT_TRACK: (&str, &str) = ("SRC", "SELECT_TRACK");
    pub const SRC_START: (&str, &str) = ("SRC", "START");
    pub const SRC_SEEK: (&str, &str) = ("SRC", "SEEK");
    pub const SRC_PAUSE: (&str, &str) = ("SRC", "PAUSE");
    pub const SRC_RESUME: (&str, &str) = ("SRC", "RESUME");

    pub const GAVF_MEDIA_INFO: (&str, &str) = ("GAVF", "MEDIA_INFO");
    pub const GAVF_SELECT_TRACK: (&str, &str) = ("GAVF", "SELECT_TRACK");
    pub const GAVF_GOT_EOF: (&str, &str) = ("GAVF", "GOT_EOF");
    pub const GAVF_START: (&str, &str) = ("GAVF", "START");
}

impl Message {
    #[must_use]
    pub fn select_track(track_index: i32) -> Self {
        Self::new(names::SRC_SELECT_TRACK.0, names::SRC_SELECT_TRACK.1)
            .with_args(vec![Value::Int(track_index)])
    }

    #[must_use]
    pub fn seek(time: i64, scale: i32) -> Self {
        Self::new(names::SRC_SEEK.0, names::SRC_SEEK.1)
            .with_args(vec![Value::Long(time), Value::Int(scale)])
    }

    #[must_use]
    pub fn media_info(info: crate::dictionary::Dictionary) -> Self {
        Self::new(names::GAVF_MEDIA_INFO.0, names::GAVF_MEDIA_INFO.1)
            .with_args(vec![Value::Dictionary(info)])
    }

    /// Serialize into a [`Packet`] on the reserved message stream id: "a
    /// message converts to a packet by serialising into the packet's byte
    /// buffer; pts is copied out of the header." The actual byte encoding
    /// lives in the codec crate; this just builds the envelope and stamps
    /// the packet metadata.
    #[must_use]
    pub fn to_packet_shell(&self) -> Packet {
        let mut pkt = Packet::new(crate::track::MESSAGE_STREAM_ID, Vec::new());
        pkt.pts = self.pts;
        pkt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_joins_namespace_and_id() {
        let m = Message::select_track(2);
        assert_eq!(m.full_name(), "SRC.SELECT_TRACK");
        assert_eq!(m.args[0], Value::Int(2));
    }

    #[test]
    fn to_packet_shell_uses_message_stream_id() {
        let m = Message::new("GAVF", "GOT_EOF");
        let pkt = m.to_packet_shell();
        assert_eq!(pkt.stream_id, crate::track::MESSAGE_STREAM_ID);
    }
}
