// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("end of stream")]
    Eof,

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("wire codec error: {0}")]
    Codec(#[from] gavf_codec::CodecError),

    #[error("unsupported transport uri: {0}")]
    UnsupportedUri(String),

    #[error("handshake rejected: status {status} ({reason})")]
    HandshakeRejected { status: u16, reason: String },

    #[error("operation timed out after {0}ms")]
    Timeout(u64),

    #[error("handle does not support this operation: {0}")]
    Unsupported(&'static str),

    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, IoError>;

impl IoError {
    #[must_use]
    pub const fn kind(&self) -> gavf_core::ErrorKind {
        use gavf_core::ErrorKind;
        match self {
            Self::Eof => ErrorKind::Eof,
            Self::Transport(_) | Self::HandshakeRejected { .. } => ErrorKind::Transport,
            Self::Codec(_) | Self::Protocol(_) => ErrorKind::Protocol,
            Self::UnsupportedUri(_) | Self::Unsupported(_) => ErrorKind::Resource,
            Self::Timeout(_) => ErrorKind::Timeout,
        }
    }
}
