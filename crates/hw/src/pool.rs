// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Refcounted hardware frame pool: a creator context holds up to
//! `max_frames` frames; acquiring one for writing follows a four-step
//! protocol (try-wait, scan, grow, timed-wait-and-retry) so that a burst of
//! concurrent producers neither over-allocates nor deadlocks.

use crate::error::{HwError, Result};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};

pub type FrameId = u64;

struct Slot {
    id: FrameId,
    refcount: Arc<AtomicI64>,
}

/// A refcounted reference to one frame in the pool. Cloning increments the
/// refcount (acquire ordering); dropping the last clone decrements it
/// (release ordering) and, on the 1→0 transition, posts a free slot back to
/// the pool's semaphore.
pub struct FrameHandle {
    id: FrameId,
    refcount: Arc<AtomicI64>,
    free_slots: Arc<Semaphore>,
}

impl FrameHandle {
    #[must_use]
    pub const fn id(&self) -> FrameId {
        self.id
    }

    #[must_use]
    pub fn refcount(&self) -> i64 {
        self.refcount.load(Ordering::Acquire)
    }
}

impl Clone for FrameHandle {
    fn clone(&self) -> Self {
        self.refcount.fetch_add(1, Ordering::Acquire);
        Self { id: self.id, refcount: Arc::clone(&self.refcount), free_slots: Arc::clone(&self.free_slots) }
    }
}

impl Drop for FrameHandle {
    fn drop(&mut self) {
        if self.refcount.fetch_sub(1, Ordering::Release) == 1 {
            self.free_slots.add_permits(1);
        }
    }
}

/// Config knobs: explicit config structs rather than magic numbers
/// scattered through the pool logic.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_frames: usize,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { max_frames: 16, acquire_timeout: Duration::from_secs(1) }
    }
}

/// A creator-context frame pool. Importer-only contexts never allocate and
/// just hold [`FrameHandle`]s handed to them by a transfer; they don't
/// need a `FramePool` of their own.
pub struct FramePool {
    slots: Mutex<Vec<Slot>>,
    free_slots: Arc<Semaphore>,
    next_id: AtomicU64,
    config: PoolConfig,
}

impl FramePool {
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        Self {
            slots: Mutex::new(Vec::with_capacity(config.max_frames)),
            free_slots: Arc::new(Semaphore::new(config.max_frames)),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    #[must_use]
    pub const fn max_frames(&self) -> usize {
        self.config.max_frames
    }

    pub async fn num_frames(&self) -> usize {
        self.slots.lock().await.len()
    }

    /// Acquire a frame to write into, following the four-step protocol
    /// (try-wait, scan, grow, timed-wait-and-retry): a free-slot permit is
    /// reserved first — immediately if one's available, otherwise by
    /// waiting up to `acquire_timeout` — and only then is it spent on a
    /// zero-refcount slot to reuse or, failing that, a freshly allocated
    /// one. On genuine exhaustion (no permit within the timeout) this
    /// returns `PoolExhausted` rather than spinning.
    pub async fn get_write(&self) -> Result<FrameHandle> {
        let permit = match self.free_slots.try_acquire() {
            Ok(permit) => permit,
            Err(_) => match tokio::time::timeout(self.config.acquire_timeout, self.free_slots.acquire()).await {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) | Err(_) => return Err(HwError::PoolExhausted { max_frames: self.config.max_frames }),
            },
        };
        // The permit now represents this call's reserved slot; forget it so
        // the semaphore's count stays down until the resulting handle's
        // refcount drops back to zero and posts a replacement permit.
        permit.forget();

        if let Some(handle) = self.reuse_zero_refcount_frame().await {
            return Ok(handle);
        }
        let mut slots = self.slots.lock().await;
        if slots.len() < self.config.max_frames {
            return Ok(self.allocate(&mut slots));
        }

        // Invariant violation: a reserved permit always corresponds to a
        // zero-refcount slot or room to grow. Give the permit back and
        // report exhaustion rather than spin.
        drop(slots);
        self.free_slots.add_permits(1);
        Err(HwError::PoolExhausted { max_frames: self.config.max_frames })
    }

    async fn reuse_zero_refcount_frame(&self) -> Option<FrameHandle> {
        let slots = self.slots.lock().await;
        for slot in slots.iter() {
            if slot.refcount.compare_exchange(0, 1, Ordering::Acquire, Ordering::Acquire).is_ok() {
                return Some(FrameHandle {
                    id: slot.id,
                    refcount: Arc::clone(&slot.refcount),
                    free_slots: Arc::clone(&self.free_slots),
                });
            }
        }
        None
    }

    fn allocate(&self, slots: &mut Vec<Slot>) -> FrameHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let refcount = Arc::new(AtomicI64::new(1));
        slots.push(Slot { id, refcount: Arc::clone(&refcount) });
        FrameHandle { id, refcount, free_slots: Arc::clone(&self.free_slots) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_write_allocates_up_to_max_frames() {
        let pool = FramePool::new(PoolConfig { max_frames: 2, acquire_timeout: Duration::from_millis(50) });
        let a = pool.get_write().await.unwrap();
        let b = pool.get_write().await.unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(pool.num_frames().await, 2);
    }

    #[tokio::test]
    async fn dropping_a_frame_frees_its_slot_for_reuse() {
        let pool = FramePool::new(PoolConfig { max_frames: 1, acquire_timeout: Duration::from_millis(50) });
        let a = pool.get_write().await.unwrap();
        let a_id = a.id();
        drop(a);
        let b = pool.get_write().await.unwrap();
        assert_eq!(b.id(), a_id);
        assert_eq!(pool.num_frames().await, 1);
    }

    #[tokio::test]
    async fn exhausted_pool_times_out() {
        let pool = FramePool::new(PoolConfig { max_frames: 1, acquire_timeout: Duration::from_millis(30) });
        let _held = pool.get_write().await.unwrap();
        let result = tokio::time::timeout(Duration::from_secs(1), pool.get_write()).await;
        let result = result.expect("get_write itself should time out, not hang past acquire_timeout");
        assert!(matches!(result, Err(HwError::PoolExhausted { max_frames: 1 })));
    }

    #[tokio::test]
    async fn cloning_a_handle_keeps_the_slot_busy_until_every_clone_drops() {
        let pool = FramePool::new(PoolConfig { max_frames: 1, acquire_timeout: Duration::from_millis(50) });
        let a = pool.get_write().await.unwrap();
        let a2 = a.clone();
        assert_eq!(a.refcount(), 2);
        drop(a);
        drop(a2);
        let b = pool.get_write().await.unwrap();
        assert_eq!(pool.num_frames().await, 1);
        drop(b);
    }
}
