// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The media-info dictionary: an array of tracks, read from a `GAVFPHDR`
//! chunk on disk or from a `GAVF.MEDIA_INFO` control message on an
//! interactive transport.

use crate::error::{Result, RuntimeError};
use gavf_core::{Array, Dictionary, TrackDescriptor, Value};

pub const KEY_TRACKS: &str = "tracks";

/// An array of tracks, the top-level object a reader gets back from
/// [`crate::container::ContainerRuntime::media_info`].
#[derive(Debug, Clone, Default)]
pub struct MediaInfo {
    dict: Dictionary,
}

impl MediaInfo {
    #[must_use]
    pub fn new() -> Self {
        Self { dict: Dictionary::new() }
    }

    #[must_use]
    pub const fn from_dictionary(dict: Dictionary) -> Self {
        Self { dict }
    }

    #[must_use]
    pub const fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    pub fn into_dictionary(self) -> Dictionary {
        self.dict
    }

    pub fn add_track(&mut self, track: TrackDescriptor) -> i32 {
        let mut arr = self.dict.get(KEY_TRACKS).and_then(Value::as_array).cloned().unwrap_or_default();
        let index = arr.len() as i32;
        arr.push(Value::Dictionary(track.into_dictionary()));
        self.dict.set(KEY_TRACKS, Value::Array(arr));
        index
    }

    #[must_use]
    pub fn num_tracks(&self) -> usize {
        self.dict.get(KEY_TRACKS).and_then(Value::as_array).map_or(0, Array::len)
    }

    #[must_use]
    pub fn tracks(&self) -> Vec<TrackDescriptor> {
        self.dict
            .get(KEY_TRACKS)
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_dictionary).cloned().map(TrackDescriptor::from_dictionary).collect())
            .unwrap_or_default()
    }

    /// Fetch the track at `index`, the way [`crate::container::ContainerRuntime::select_track`]
    /// resolves a `SRC.SELECT_TRACK` request.
    pub fn track(&self, index: i32) -> Result<TrackDescriptor> {
        if index < 0 {
            return Err(RuntimeError::InvalidTrack(index));
        }
        self.tracks().into_iter().nth(index as usize).ok_or(RuntimeError::InvalidTrack(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavf_core::StreamType;

    #[test]
    fn add_track_assigns_sequential_indices() {
        let mut mi = MediaInfo::new();
        let i0 = mi.add_track(TrackDescriptor::new());
        let i1 = mi.add_track(TrackDescriptor::new());
        assert_eq!(i0, 0);
        assert_eq!(i1, 1);
        assert_eq!(mi.num_tracks(), 2);
    }

    #[test]
    fn track_rejects_out_of_range_index() {
        let mi = MediaInfo::new();
        assert!(mi.track(0).is_err());
        assert!(mi.track(-1).is_err());
    }

    #[test]
    fn tracks_round_trip_their_streams() {
        let mut mi = MediaInfo::new();
        let mut t = TrackDescriptor::new();
        t.add_stream(gavf_core::StreamDescriptor::new(StreamType::Audio, 0));
        mi.add_track(t);

        let back = mi.track(0).unwrap();
        assert_eq!(back.streams().len(), 1);
    }
}
