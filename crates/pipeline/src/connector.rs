// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Source/sink compatibility and format-negotiation connector.
//!
//! Connecting two endpoints is a two-stage check: first the type sets
//! (audio/video/text/...) must overlap at all, then (independently) a
//! requested destination format may differ from the source's native one.
//! This module never performs the conversion itself — resampling and
//! pixel-format kernels are out-of-scope external collaborators — it only
//! decides whether a converter stage is required and hands back the
//! negotiated format pair for one to consume.

use crate::error::{PipelineError, Result};
use gavf_core::{StreamType, Value};

/// Result of connecting a source to a sink.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectOutcome {
    /// Destination accepts the source's native format unchanged.
    Direct,
    /// A converter stage must be inserted between source and sink.
    ConversionRequired(NegotiatedFormat),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NegotiatedFormat {
    pub source: Value,
    pub requested: Value,
}

/// Refuse to connect two endpoints whose advertised type sets are
/// disjoint; otherwise decide whether the sink's requested format matches
/// the source's native one.
///
/// # Errors
/// [`PipelineError::IncompatibleEndpoints`] if `source_types` and
/// `sink_types` share no member.
pub fn connect(
    source_types: &[StreamType],
    sink_types: &[StreamType],
    source_format: Value,
    requested_format: Option<Value>,
) -> Result<ConnectOutcome> {
    if !source_types.iter().any(|t| sink_types.contains(t)) {
        return Err(PipelineError::IncompatibleEndpoints(format!(
            "source advertises {source_types:?}, sink accepts {sink_types:?}"
        )));
    }

    match requested_format {
        None => Ok(ConnectOutcome::Direct),
        Some(requested) if requested == source_format => Ok(ConnectOutcome::Direct),
        Some(requested) => Ok(ConnectOutcome::ConversionRequired(NegotiatedFormat { source: source_format, requested })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavf_core::{AudioFormat, SampleFormat};

    fn fmt(samplerate: i32) -> Value {
        Value::AudioFormat(AudioFormat {
            samplerate,
            num_channels: 2,
            sample_format: SampleFormat::S16,
            interleaved: true,
            hw_context_id: None,
        })
    }

    #[test]
    fn refuses_disjoint_type_sets() {
        let result = connect(&[StreamType::Video], &[StreamType::Audio], fmt(48_000), None);
        assert!(result.is_err());
    }

    #[test]
    fn matching_format_connects_directly() {
        let result = connect(&[StreamType::Audio], &[StreamType::Audio, StreamType::Video], fmt(48_000), Some(fmt(48_000))).unwrap();
        assert_eq!(result, ConnectOutcome::Direct);
    }

    #[test]
    fn mismatched_format_requires_conversion() {
        let result = connect(&[StreamType::Audio], &[StreamType::Audio], fmt(48_000), Some(fmt(44_100))).unwrap();
        match result {
            ConnectOutcome::ConversionRequired(neg) => {
                assert_eq!(neg.source, fmt(48_000));
                assert_eq!(neg.requested, fmt(44_100));
            }
            ConnectOutcome::Direct => panic!("expected a conversion requirement"),
        }
    }
}
