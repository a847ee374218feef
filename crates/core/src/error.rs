// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Shared error taxonomy for the media container runtime.
//!
//! Every crate in the workspace defines its own error enum scoped to what it
//! can fail at, but all of them fold into the same small set of kinds so a
//! caller at any layer can dispatch on `kind()` without caring which crate
//! raised the error.

use thiserror::Error;

/// The error-kind taxonomy shared across all layers of the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed header, bad chunk tag, short dictionary read.
    Protocol,
    /// Value out of range for a typed getter, or a varint/fixed-width overflow.
    Overflow,
    /// I/O returned an error or closed unexpectedly.
    Transport,
    /// End of stream. Distinct from `Transport` — not an error condition.
    Eof,
    /// Failed allocation, refused hardware transfer, pool exhausted past timeout.
    Resource,
    /// A poll/wait deadline expired. Non-fatal.
    Timeout,
}

/// Top-level error type for `gavf-core`.
///
/// Lower-level codec/IO/hw/pipeline/runtime crates define their own error
/// enums and convert into each other via `#[from]`; this type is the one
/// `core` itself can raise (mostly dictionary/value typed-accessor misuse
/// that the caller chose not to treat as "absent").
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("value overflow: {0}")]
    Overflow(String),

    #[error("resource error: {0}")]
    Resource(String),
}

impl CoreError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Overflow(_) => ErrorKind::Overflow,
            Self::Resource(_) => ErrorKind::Resource,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// A sticky latch for EOF/error flags, matching the I/O handle contract:
/// once set, a flag reads as set until explicitly cleared (e.g. on seek).
#[derive(Debug, Default)]
pub struct StickyFlag(std::sync::atomic::AtomicBool);

impl StickyFlag {
    #[must_use]
    pub const fn new() -> Self {
        Self(std::sync::atomic::AtomicBool::new(false))
    }

    pub fn set(&self) {
        self.0.store(true, std::sync::atomic::Ordering::Release);
    }

    #[must_use]
    pub fn get(&self) -> bool {
        self.0.load(std::sync::atomic::Ordering::Acquire)
    }

    pub fn clear(&self) {
        self.0.store(false, std::sync::atomic::Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sticky_flag_latches() {
        let f = StickyFlag::new();
        assert!(!f.get());
        f.set();
        assert!(f.get());
        f.set();
        assert!(f.get());
        f.clear();
        assert!(!f.get());
    }

    #[test]
    fn error_kind_maps() {
        assert_eq!(CoreError::Protocol("x".into()).kind(), ErrorKind::Protocol);
        assert_eq!(CoreError::Overflow("x".into()).kind(), ErrorKind::Overflow);
        assert_eq!(CoreError::Resource("x".into()).kind(), ErrorKind::Resource);
    }
}
