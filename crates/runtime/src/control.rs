// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The in-band control message stream: `Message` envelopes framed as
//! ordinary packet-on-wire frames on the reserved stream id
//! [`gavf_core::track::MESSAGE_STREAM_ID`].

use crate::error::Result;
use gavf_core::{track::MESSAGE_STREAM_ID, Message};
use gavf_io::handle::IoHandle;

/// Serialise `msg` and write it as a packet frame on the message stream.
pub async fn send_message(handle: &mut IoHandle, msg: &Message) -> Result<()> {
    let mut payload = Vec::new();
    gavf_codec::write_message(&mut payload, msg);
    gavf_io::chunked::write_packet_frame(handle, MESSAGE_STREAM_ID, &payload).await?;
    Ok(())
}

/// Read the next packet frame and decode it as a `Message`, regardless of
/// which stream id it landed on (used by readers of a single multiplexed
/// transport where media and control frames interleave).
pub async fn recv_message(handle: &mut IoHandle) -> Result<(i32, Message)> {
    let (stream_id, payload) = gavf_io::chunked::read_packet_frame(handle).await?;
    let (msg, _) = gavf_codec::read_message(&payload)?;
    Ok((stream_id, msg))
}

/// Read packet frames until one lands on the message stream, discarding
/// (returning) any media frames seen along the way — mirrors the original
/// `skip_to_msg` used while waiting for `GAVF.MEDIA_INFO`/`GAVF.SELECT_TRACK`.
pub async fn skip_to_message(handle: &mut IoHandle) -> Result<Message> {
    loop {
        let (stream_id, msg) = recv_message(handle).await?;
        if stream_id == MESSAGE_STREAM_ID {
            return Ok(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavf_core::Dictionary;
    use gavf_io::memory::MemoryIo;

    fn empty_handle() -> IoHandle {
        IoHandle::new(Box::new(MemoryIo::new(Vec::new())), Dictionary::new())
    }

    #[tokio::test]
    async fn message_round_trips_through_a_packet_frame() {
        let mut h = empty_handle();
        send_message(&mut h, &Message::select_track(3)).await.unwrap();
        h.seek(0, gavf_io::handle::SeekWhence::Start).await.unwrap();

        let (stream_id, msg) = recv_message(&mut h).await.unwrap();
        assert_eq!(stream_id, MESSAGE_STREAM_ID);
        assert_eq!(msg.full_name(), "SRC.SELECT_TRACK");
    }
}
