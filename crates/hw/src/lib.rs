// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Refcounted hardware buffer pool and capability negotiation.
//!
//! DMA-BUF/EGL/V4L2 specifics are named out-of-scope external
//! collaborators; this crate models the capability descriptors,
//! creator/importer classification, the refcounted pool, and the
//! import/export dispatch decision as trait seams, without talking to
//! `/dev/dri`, EGL, or V4L2 itself.

pub mod capability;
pub mod context;
pub mod error;
pub mod pool;

#[cfg(feature = "shmem")]
pub mod shmem;

pub use capability::{AudioCapability, BufferFormatDescriptor, HwCapabilities, PacketCapability, VideoCapability};
pub use context::{negotiate_transfer, ContextRole, HwContext, TransferDecision, VideoTransfer};
pub use error::{HwError, Result};
pub use pool::{FrameHandle, FrameId, FramePool, PoolConfig};
