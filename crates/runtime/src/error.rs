// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Error taxonomy for open modes, the handshake, and track/stream discovery.

use gavf_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Io(#[from] gavf_io::IoError),

    #[error(transparent)]
    Codec(#[from] gavf_codec::CodecError),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("no track at index {0}")]
    InvalidTrack(i32),

    #[error("stream {0} not found in current track")]
    UnknownStream(i32),

    #[error("expected the first framed message to be a REDIRECT")]
    ExpectedRedirect,

    #[error("producer sent no media info before the first packet")]
    MissingMediaInfo,
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

impl RuntimeError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(e) => e.kind(),
            Self::Codec(_) => ErrorKind::Protocol,
            Self::Handshake(_) => ErrorKind::Transport,
            Self::InvalidTrack(_) | Self::UnknownStream(_) | Self::ExpectedRedirect | Self::MissingMediaInfo => {
                ErrorKind::Protocol
            }
        }
    }
}
