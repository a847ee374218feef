// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Cross-process shared-memory layout for the hardware frame pool: both
//! the exporting and importing process map the same segment, which
//! carries a fixed-size refcount array and a free-slot counter.
//!
//! A true blocking cross-process wait normally rides on a named POSIX
//! semaphore (`sem_open`); that's `libc`-level plumbing this workspace
//! doesn't otherwise need, so the free-slot counter here is polled with a
//! short backoff instead of a blocking wait. In-process coordination still
//! goes through `tokio::sync::Semaphore` in [`crate::pool`]; this module
//! only models the shared *layout* both processes agree on.

use crate::error::{HwError, Result};
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

const FREE_COUNT_SLOT: usize = 0;
const REFCOUNTS_START: usize = 1;

fn layout_len(capacity: usize) -> usize {
    (REFCOUNTS_START + capacity) * std::mem::size_of::<i64>()
}

/// A shared-memory segment laid out as one leading `AtomicI64` free-slot
/// counter followed by `capacity` per-frame `AtomicI64` refcounts.
pub struct SharedFrameTable {
    mmap: MmapMut,
    capacity: usize,
}

impl SharedFrameTable {
    /// Create (or truncate) the backing file at `path` and map it, zeroing
    /// the free-slot counter to `capacity`.
    pub fn create(path: &std::path::Path, capacity: usize) -> Result<Self> {
        let len = layout_len(capacity) as u64;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| HwError::TransferRefused(format!("opening shared memory file: {e}")))?;
        nix::unistd::ftruncate(file.as_raw_fd(), len as i64)
            .map_err(|e| HwError::TransferRefused(format!("ftruncate shared memory: {e}")))?;

        // SAFETY: `file` was just opened with the requested length; the
        // mapping's lifetime is tied to `mmap`, which owns the fd via the
        // memmap2 wrapper for the duration of this struct's life.
        let mut mmap = unsafe { MmapMut::map_mut(&file) }
            .map_err(|e| HwError::TransferRefused(format!("mmap shared memory: {e}")))?;
        mmap.fill(0);
        let table = Self { mmap, capacity };
        table.free_count_atomic().store(capacity as i64, Ordering::Release);
        Ok(table)
    }

    /// Map an already-created segment at `path` (the importing process'
    /// side).
    pub fn open(path: &std::path::Path, capacity: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| HwError::TransferRefused(format!("opening shared memory file: {e}")))?;

        // SAFETY: the file is expected to already be sized by `create`'s
        // ftruncate on the exporting side; memmap2 maps exactly its length.
        let mmap = unsafe { MmapMut::map_mut(&file) }
            .map_err(|e| HwError::TransferRefused(format!("mmap shared memory: {e}")))?;
        if mmap.len() != layout_len(capacity) {
            return Err(HwError::TransferRefused(format!(
                "shared memory segment is {} bytes, expected {} for capacity {capacity}",
                mmap.len(),
                layout_len(capacity)
            )));
        }
        Ok(Self { mmap, capacity })
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    fn slot_atomic(&self, index: usize) -> &AtomicI64 {
        assert!(index < REFCOUNTS_START + self.capacity, "shared frame table index out of range");
        let ptr = self.mmap.as_ptr().cast::<AtomicI64>();
        // SAFETY: `ptr` points into a mapping sized for `REFCOUNTS_START +
        // capacity` `i64` slots (checked in `create`/`open`), and `AtomicI64`
        // has the same layout as `i64`, so offsetting by `index` stays
        // in-bounds and alignment matches the file's zero-initialized bytes.
        unsafe { &*ptr.add(index) }
    }

    fn free_count_atomic(&self) -> &AtomicI64 {
        self.slot_atomic(FREE_COUNT_SLOT)
    }

    #[must_use]
    pub fn refcount(&self, frame_index: usize) -> &AtomicI64 {
        self.slot_atomic(REFCOUNTS_START + frame_index)
    }

    #[must_use]
    pub fn free_count(&self) -> i64 {
        self.free_count_atomic().load(Ordering::Acquire)
    }

    /// Claim a free slot, decrementing the shared counter; returns `false`
    /// without decrementing if none are free.
    pub fn try_claim_slot(&self) -> bool {
        self.free_count_atomic()
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n > 0).then_some(n - 1))
            .is_ok()
    }

    /// Release a slot back to the shared counter (the cross-process
    /// equivalent of the in-process ref→0 semaphore post).
    pub fn release_slot(&self) {
        self.free_count_atomic().fetch_add(1, Ordering::AcqRel);
    }

    /// Poll for a free slot with a short backoff, bounded by `timeout`.
    pub async fn wait_for_slot(&self, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.try_claim_slot() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(HwError::Timeout(timeout.as_millis() as u64));
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_open_share_the_same_counters() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("gavf-hw-shmem-test-{}", std::process::id()));
        let creator = SharedFrameTable::create(&path, 4).unwrap();
        assert_eq!(creator.free_count(), 4);
        creator.refcount(0).store(1, Ordering::Release);

        let importer = SharedFrameTable::open(&path, 4).unwrap();
        assert_eq!(importer.refcount(0).load(Ordering::Acquire), 1);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn wait_for_slot_unblocks_once_released() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("gavf-hw-shmem-wait-{}", std::process::id()));
        let table = SharedFrameTable::create(&path, 1).unwrap();
        assert!(table.try_claim_slot());
        assert!(!table.try_claim_slot());

        table.release_slot();
        table.wait_for_slot(Duration::from_millis(200)).await.unwrap();

        std::fs::remove_file(&path).ok();
    }
}
