// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Container runtime: media-info dictionary, track/stream discovery, open
//! modes, the HTTP-like handshake, the in-band control message stream, and
//! `SEPARATE_STREAMS` multi-socket mode.

pub mod container;
pub mod control;
pub mod error;
pub mod handshake;
pub mod media_info;

pub use container::{ContainerConfig, ContainerRuntime, StreamHandle};
pub use error::{Result, RuntimeError};
pub use handshake::{Handshake, HandshakeState};
pub use media_info::MediaInfo;
