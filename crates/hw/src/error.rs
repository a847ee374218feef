// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("frame pool exhausted: all {max_frames} frames in use")]
    PoolExhausted { max_frames: usize },

    #[error("timed out waiting {0}ms for a free frame")]
    Timeout(u64),

    #[error("transfer refused: {0}")]
    TransferRefused(String),

    #[error("unsupported: {0}")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, HwError>;

impl HwError {
    #[must_use]
    pub const fn kind(&self) -> gavf_core::ErrorKind {
        use gavf_core::ErrorKind;
        match self {
            Self::PoolExhausted { .. } => ErrorKind::Resource,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::TransferRefused(_) | Self::Unsupported(_) => ErrorKind::Resource,
        }
    }
}
