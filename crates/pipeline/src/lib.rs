// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Packet sources, sinks, the format-negotiation connector, and the
//! reorder/retiming buffer.
//!
//! Conversion kernels (audio resampling, pixel-format conversion, video
//! scaling) are named out-of-scope external collaborators: the connector
//! in [`connector`] only decides whether one is required and hands back
//! the negotiated format pair for an external stage to consume.

pub mod connector;
pub mod error;
pub mod reorder;
pub mod sink;
pub mod source;

pub use connector::{connect, ConnectOutcome, NegotiatedFormat};
pub use error::{PipelineError, Result};
pub use reorder::{ReorderBuffer, ReorderConfig};
pub use sink::{GetPutGuard, PacketSink, SinkStatus};
pub use source::{AudioSeek, PacketSource, ReadStatus, SourceFlags, SourceRead};
