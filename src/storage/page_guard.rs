use std::sync::Arc;

use parking_lot::{ArcRwLockReadGuard, ArcRwLockWriteGuard, RawRwLock};

use crate::buffer::buffer_pool_manager::BufferPoolManager;
use crate::common::config::{PageId, PAGE_SIZE};
use crate::storage::frame::{Frame, FrameInner};

/// RAII handle on a pinned frame.
///
/// Unpins the underlying page when dropped, so callers can't forget to
/// balance a fetch. `BasicPageGuard` does not hold the frame's data latch
/// continuously; each `data`/`data_mut` call takes it transiently. Callers
/// that need the latch held across several accesses should upgrade to a
/// [`ReadPageGuard`] or [`WritePageGuard`].
pub struct BasicPageGuard {
    bpm: Arc<BufferPoolManager>,
    frame: Frame,
    page_id: PageId,
    is_dirty: bool,
}

impl BasicPageGuard {
    pub(crate) fn new(bpm: Arc<BufferPoolManager>, frame: Frame, page_id: PageId) -> Self {
        Self {
            bpm,
            frame,
            page_id,
            is_dirty: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> parking_lot::MappedRwLockReadGuard<'_, [u8; PAGE_SIZE]> {
        self.frame.data()
    }

    pub fn data_mut(&mut self) -> parking_lot::MappedRwLockWriteGuard<'_, [u8; PAGE_SIZE]> {
        self.is_dirty = true;
        self.frame.data_mut()
    }

    /// Upgrades to a `ReadPageGuard` holding the frame's shared latch for
    /// the guard's lifetime. The page is not re-fetched or re-pinned; the
    /// pin this guard was holding transfers to the new guard.
    pub fn upgrade_read(self) -> ReadPageGuard {
        let guard = ReadPageGuard::new(Arc::clone(&self.bpm), &self.frame, self.page_id);
        std::mem::forget(self);
        guard
    }

    /// Upgrades to a `WritePageGuard` holding the frame's exclusive latch
    /// for the guard's lifetime. The pin transfers to the new guard.
    pub fn upgrade_write(self) -> WritePageGuard {
        let guard = WritePageGuard::new(Arc::clone(&self.bpm), &self.frame, self.page_id);
        std::mem::forget(self);
        guard
    }
}

impl Drop for BasicPageGuard {
    fn drop(&mut self) {
        self.bpm.unpin_page(self.page_id, self.is_dirty);
    }
}

/// Read-latched view of a pinned page. The latch is held for the entire
/// lifetime of the guard, unlike `BasicPageGuard`'s transient accessors.
pub struct ReadPageGuard {
    bpm: Arc<BufferPoolManager>,
    page_id: PageId,
    guard: Option<ArcRwLockReadGuard<RawRwLock, FrameInner>>,
}

impl ReadPageGuard {
    pub(crate) fn new(bpm: Arc<BufferPoolManager>, frame: &Frame, page_id: PageId) -> Self {
        Self {
            bpm,
            page_id,
            guard: Some(frame.read_arc()),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> &[u8; PAGE_SIZE] {
        &self.guard.as_ref().expect("latch released").data
    }
}

impl Drop for ReadPageGuard {
    fn drop(&mut self) {
        // Release the per-frame latch before touching manager state: the
        // manager never needs a frame's own latch to unpin it, and holding
        // both at once is unnecessary.
        self.guard = None;
        self.bpm.unpin_page(self.page_id, false);
    }
}

/// Write-latched view of a pinned page. Marks the page dirty on drop if
/// `data_mut` was ever called.
pub struct WritePageGuard {
    bpm: Arc<BufferPoolManager>,
    page_id: PageId,
    guard: Option<ArcRwLockWriteGuard<RawRwLock, FrameInner>>,
    dirty: bool,
}

impl WritePageGuard {
    pub(crate) fn new(bpm: Arc<BufferPoolManager>, frame: &Frame, page_id: PageId) -> Self {
        Self {
            bpm,
            page_id,
            guard: Some(frame.write_arc()),
            dirty: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> &[u8; PAGE_SIZE] {
        &self.guard.as_ref().expect("latch released").data
    }

    pub fn data_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        self.dirty = true;
        &mut self.guard.as_mut().expect("latch released").data
    }
}

impl Drop for WritePageGuard {
    fn drop(&mut self) {
        let dirty = self.dirty;
        self.guard = None;
        self.bpm.unpin_page(self.page_id, dirty);
    }
}
