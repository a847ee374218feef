// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Hardware context classification and the import/export transfer
//! negotiation. The actual DMA-BUF/EGL/V4L2 mechanics are named
//! out-of-scope external collaborators; this module only decides *which*
//! of import/export/refuse applies and hands off to a [`VideoTransfer`]
//! trait object to do it.

use crate::capability::HwCapabilities;
use crate::error::{HwError, Result};
use crate::pool::{FrameHandle, FramePool, PoolConfig};
use gavf_core::PixelFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextRole {
    /// Allocates frames; holds a [`FramePool`].
    Creator,
    /// Only ever accepts frames exported by another context.
    Importer,
    Both,
}

/// One hardware back-end: its advertised capabilities, its role, and (for
/// creator/both roles) the frame pool it allocates from.
pub struct HwContext {
    pub name: String,
    pub role: ContextRole,
    pub capabilities: HwCapabilities,
    pool: Option<FramePool>,
}

impl HwContext {
    #[must_use]
    pub fn creator(name: impl Into<String>, capabilities: HwCapabilities, pool_config: PoolConfig) -> Self {
        Self { name: name.into(), role: ContextRole::Creator, capabilities, pool: Some(FramePool::new(pool_config)) }
    }

    #[must_use]
    pub fn importer(name: impl Into<String>, capabilities: HwCapabilities) -> Self {
        Self { name: name.into(), role: ContextRole::Importer, capabilities, pool: None }
    }

    #[must_use]
    pub fn both(name: impl Into<String>, capabilities: HwCapabilities, pool_config: PoolConfig) -> Self {
        Self { name: name.into(), role: ContextRole::Both, capabilities, pool: Some(FramePool::new(pool_config)) }
    }

    #[must_use]
    pub fn can_allocate(&self) -> bool {
        matches!(self.role, ContextRole::Creator | ContextRole::Both)
    }

    /// Acquire a fresh writable frame from this context's pool.
    ///
    /// # Errors
    /// Returns [`HwError::Unsupported`] for an importer-only context.
    pub async fn get_write(&self) -> Result<FrameHandle> {
        self.pool.as_ref().ok_or(HwError::Unsupported("importer-only context has no frame pool"))?.get_write().await
    }
}

/// How a frame should move from one context to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDecision {
    /// Destination can import the source's native format directly.
    Import,
    /// Source can export into one of the destination's advertised import
    /// formats.
    Export,
}

/// Decide how a frame of `fmt`/`width`/`height` should move from `src` to
/// `dst`: prefer import, fall back to export, else the caller should fall
/// back to a RAM copy.
///
/// # Errors
/// Returns [`HwError::TransferRefused`] when neither side can handle it.
pub fn negotiate_transfer(
    src: &HwCapabilities,
    dst: &HwCapabilities,
    fmt: PixelFormat,
    width: u32,
    height: u32,
) -> Result<TransferDecision> {
    if dst.video.matching_import(fmt, width, height).is_some() {
        return Ok(TransferDecision::Import);
    }
    if src.video.can_transfer(fmt) && dst.video.matching_import(fmt, width, height).is_some() {
        return Ok(TransferDecision::Export);
    }
    Err(HwError::TransferRefused(format!(
        "no import/export path for {fmt:?} at {width}x{height}; caller should fall back to a ram copy"
    )))
}

/// Performs the actual cross-context frame transfer once [`negotiate_transfer`]
/// has picked a direction. DMA-BUF/EGL/V4L2 implementations live outside
/// this crate; this is the seam they plug into.
pub trait VideoTransfer: Send + Sync {
    /// # Errors
    /// Implementations report backend-specific transfer failures.
    fn import_video_frame(&self, fmt: PixelFormat, src: &FrameHandle, dst: &FrameHandle) -> Result<()>;

    /// # Errors
    /// Implementations report backend-specific transfer failures.
    fn export_video_frame(&self, fmt: PixelFormat, src: &FrameHandle, dst: &FrameHandle) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{BufferFormatDescriptor, VideoCapability};

    fn caps_with_import(fmt: PixelFormat) -> HwCapabilities {
        HwCapabilities {
            video: VideoCapability {
                import_formats: vec![BufferFormatDescriptor {
                    pixel_format: fmt,
                    dma_fourcc: None,
                    min_width: 0,
                    max_width: 4096,
                    min_height: 0,
                    max_height: 2160,
                    chroma_subsampling: None,
                }],
                ..VideoCapability::default()
            },
            ..HwCapabilities::default()
        }
    }

    #[test]
    fn prefers_import_when_destination_accepts_the_format() {
        let src = HwCapabilities::default();
        let dst = caps_with_import(PixelFormat::Nv12);
        let decision = negotiate_transfer(&src, &dst, PixelFormat::Nv12, 1280, 720).unwrap();
        assert_eq!(decision, TransferDecision::Import);
    }

    #[test]
    fn refuses_when_neither_side_can_bridge_the_format() {
        let src = HwCapabilities::default();
        let dst = HwCapabilities::default();
        assert!(negotiate_transfer(&src, &dst, PixelFormat::Nv12, 1280, 720).is_err());
    }

    #[tokio::test]
    async fn importer_only_context_cannot_allocate() {
        let ctx = HwContext::importer("decoder-import", HwCapabilities::default());
        assert!(!ctx.can_allocate());
        assert!(ctx.get_write().await.is_err());
    }

    #[tokio::test]
    async fn creator_context_allocates_from_its_own_pool() {
        let ctx = HwContext::creator("encoder", HwCapabilities::default(), PoolConfig { max_frames: 2, ..PoolConfig::default() });
        assert!(ctx.can_allocate());
        let frame = ctx.get_write().await.unwrap();
        assert_eq!(frame.refcount(), 1);
    }
}
