// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("short read: needed {needed} bytes, had {available}")]
    ShortRead { needed: usize, available: usize },

    #[error("value out of range for typed getter: {0}")]
    Overflow(String),

    #[error("malformed value tag: {0}")]
    Protocol(String),

    #[error("invalid utf-8 in string field: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
