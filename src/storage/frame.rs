use std::sync::Arc;

use parking_lot::{
    ArcRwLockReadGuard, ArcRwLockWriteGuard, MappedRwLockReadGuard, MappedRwLockWriteGuard,
    RawRwLock, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use crate::common::config::{PageId, INVALID_PAGE_ID, PAGE_SIZE};

/// One slot of the buffer pool's preallocated frame array.
///
/// A frame may be empty (`page_id == INVALID_PAGE_ID`) or hold the resident
/// copy of a logical page, its pin count, and its dirty bit. `Frame` is a
/// cheap, `Clone`-able handle around shared state: every clone observes the
/// same underlying buffer and metadata, guarded by a single reader/writer
/// latch.
#[derive(Debug, Clone)]
pub struct Frame(Arc<RwLock<FrameInner>>);

#[derive(Debug)]
pub(crate) struct FrameInner {
    pub(crate) data: [u8; PAGE_SIZE],
    pub(crate) page_id: PageId,
    pub(crate) pin_count: u32,
    pub(crate) is_dirty: bool,
}

impl Frame {
    /// Creates an empty frame: no resident page, unpinned, clean.
    pub fn new() -> Self {
        Frame(Arc::new(RwLock::new(FrameInner {
            data: [0; PAGE_SIZE],
            page_id: INVALID_PAGE_ID,
            pin_count: 0,
            is_dirty: false,
        })))
    }

    /// Resets the frame to the empty state, as if freshly allocated.
    pub fn reset(&self) {
        let mut inner = self.0.write();
        inner.data.fill(0);
        inner.page_id = INVALID_PAGE_ID;
        inner.pin_count = 0;
        inner.is_dirty = false;
    }

    pub fn data(&self) -> MappedRwLockReadGuard<'_, [u8; PAGE_SIZE]> {
        RwLockReadGuard::map(self.0.read(), |inner| &inner.data)
    }

    pub fn data_mut(&self) -> MappedRwLockWriteGuard<'_, [u8; PAGE_SIZE]> {
        RwLockWriteGuard::map(self.0.write(), |inner| &mut inner.data)
    }

    pub fn page_id(&self) -> PageId {
        self.0.read().page_id
    }

    pub fn set_page_id(&self, page_id: PageId) {
        self.0.write().page_id = page_id;
    }

    pub fn pin_count(&self) -> u32 {
        self.0.read().pin_count
    }

    pub fn pin(&self) {
        self.0.write().pin_count += 1;
    }

    /// Decrements the pin count and returns the count afterward, or `None`
    /// if the pin count was already zero (caller error).
    pub fn unpin(&self) -> Option<u32> {
        let mut inner = self.0.write();
        if inner.pin_count == 0 {
            return None;
        }
        inner.pin_count -= 1;
        Some(inner.pin_count)
    }

    pub fn is_dirty(&self) -> bool {
        self.0.read().is_dirty
    }

    /// Dirty is sticky: this only ever sets the flag, never clears it.
    /// Clearing happens exclusively through `clear_dirty` after a flush.
    pub fn mark_dirty(&self, dirty: bool) {
        if dirty {
            self.0.write().is_dirty = true;
        }
    }

    pub fn clear_dirty(&self) {
        self.0.write().is_dirty = false;
    }

    /// Acquires the frame's latch for shared, guard-lifetime reads of both
    /// the data buffer and the bookkeeping fields. Used by `ReadPageGuard`.
    pub(crate) fn read_arc(&self) -> ArcRwLockReadGuard<RawRwLock, FrameInner> {
        RwLock::read_arc(&self.0)
    }

    /// Acquires the frame's latch for exclusive, guard-lifetime access.
    /// Used by `WritePageGuard`.
    pub(crate) fn write_arc(&self) -> ArcRwLockWriteGuard<RawRwLock, FrameInner> {
        RwLock::write_arc(&self.0)
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}
