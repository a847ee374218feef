// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Error taxonomy for sources, sinks, connectors, and the reorder buffer.

use gavf_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("hardware backend: {0}")]
    Hw(#[from] gavf_hw::HwError),

    #[error("source and sink advertise disjoint type sets: {0}")]
    IncompatibleEndpoints(String),

    #[error("sink.put called with a frame not obtained from the matching get()")]
    MismatchedFrame,

    #[error("get() called twice before put() on the same sink")]
    DoubleGet,

    #[error("backend error: {0}")]
    Backend(String),
}

impl PipelineError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Hw(_) => ErrorKind::Resource,
            Self::IncompatibleEndpoints(_) => ErrorKind::Protocol,
            Self::MismatchedFrame | Self::DoubleGet => ErrorKind::Protocol,
            Self::Backend(_) => ErrorKind::Transport,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
