use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::buffer::replacer::ClockReplacer;
use crate::common::config::{FrameId, PageId, INVALID_PAGE_ID};
use crate::recovery::LogManager;
use crate::storage::disk::{DiskManager, DiskScheduler};
use crate::storage::frame::Frame;
use crate::storage::page_guard::{BasicPageGuard, ReadPageGuard, WritePageGuard};

/// Metadata mutated under the single manager-wide latch: the page table
/// and the free list. The frame array and the replacer are synchronized
/// independently (see the crate's design notes on lock ordering).
struct ManagerState {
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
}

/// Mediates between a fixed-capacity pool of in-memory frames and a
/// disk manager, satisfying fetch/new/unpin/flush/delete requests and
/// coordinating eviction through a [`ClockReplacer`].
///
/// `manager_latch` (an internal mutex over [`ManagerState`]) serializes
/// every public operation end to end, including the blocking disk I/O a
/// fetch or eviction may require. This is a known scalability limit, not
/// a correctness compromise: see the design notes for the alternative of
/// releasing the latch around I/O with frame re-validation, which this
/// implementation does not adopt.
pub struct BufferPoolManager {
    pool_size: usize,
    frames: Vec<Frame>,
    disk_scheduler: DiskScheduler,
    #[allow(dead_code)]
    log_manager: Option<Arc<LogManager>>,
    replacer: ClockReplacer,
    inner: Mutex<ManagerState>,
}

impl BufferPoolManager {
    /// Creates a buffer pool of `pool_size` frames backed by `disk_manager`.
    /// `log_manager` is accepted and stored for a future WAL integration
    /// but is never invoked by this crate.
    pub fn new(
        pool_size: usize,
        disk_manager: DiskManager,
        log_manager: Option<Arc<LogManager>>,
    ) -> Self {
        assert!(pool_size > 0, "a buffer pool must hold at least one frame");
        Self {
            pool_size,
            frames: (0..pool_size).map(|_| Frame::new()).collect(),
            disk_scheduler: DiskScheduler::new(disk_manager),
            log_manager,
            replacer: ClockReplacer::new(pool_size),
            inner: Mutex::new(ManagerState {
                page_table: HashMap::new(),
                free_list: (0..pool_size as FrameId).collect(),
            }),
        }
    }

    /// Number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// All frames in the pool, indexed by `FrameId`.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Number of frames currently tracked as evictable by the replacer.
    /// Exposed for invariant testing.
    pub fn replacer_size(&self) -> usize {
        self.replacer.size()
    }

    /// The frame currently holding `page_id`, if any, without pinning it.
    /// Intended for diagnostics and tests.
    pub fn frame_for(&self, page_id: PageId) -> Option<Frame> {
        let state = self.inner.lock();
        state
            .page_table
            .get(&page_id)
            .map(|&frame_id| self.frames[frame_id as usize].clone())
    }

    /// Fetches `page_id`, reading it from disk if it isn't already
    /// resident. Pins the returned frame; fails if every frame is pinned
    /// and the free list and replacer both have nothing to offer.
    pub fn fetch_page(&self, page_id: PageId) -> Option<Frame> {
        let mut state = self.inner.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = self.frames[frame_id as usize].clone();
            frame.pin();
            self.replacer.pin(frame_id); // no-op if the frame wasn't tracked
            return Some(frame);
        }

        let frame_id = self.acquire_frame(&mut state)?;
        let frame = self.frames[frame_id as usize].clone();
        frame.reset();
        frame.set_page_id(page_id);
        frame.pin();

        if let Err(err) = self.disk_scheduler.read(frame.clone()) {
            log::error!("fetch_page({page_id}): disk read failed: {err}");
            // Preserve the invariants: a frame that failed to materialize
            // its page must not linger in the page table or stay resident.
            frame.reset();
            state.free_list.push_back(frame_id);
            return None;
        }

        state.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
        Some(frame)
    }

    /// Allocates a brand-new, zero-initialized page and pins its frame. The
    /// frame is acquired *before* the page id is allocated, so a full pool
    /// never leaks an allocated id (see DESIGN.md).
    ///
    /// `disk_scheduler.allocate_page()` issues ids independently of what's
    /// currently resident, so it can hand back an id a caller already has
    /// pinned via `fetch_page`. Reallocating until the id is free keeps the
    /// page table's one-frame-per-page-id invariant intact; since at most
    /// `pool_size` ids can be resident at once and issuance only moves
    /// forward, this loop always terminates.
    pub fn new_page(&self) -> Option<(PageId, Frame)> {
        let mut state = self.inner.lock();
        let frame_id = self.acquire_frame(&mut state)?;

        let mut page_id = self.disk_scheduler.allocate_page();
        while state.page_table.contains_key(&page_id) {
            page_id = self.disk_scheduler.allocate_page();
        }

        let frame = self.frames[frame_id as usize].clone();
        frame.reset();
        frame.set_page_id(page_id);
        frame.pin();

        state.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
        Some((page_id, frame))
    }

    /// Decrements `page_id`'s pin count and ORs `is_dirty` into its dirty
    /// bit. Returns `true` unless the unpin was unbalanced (pin count was
    /// already zero); unpinning a page that isn't resident is a no-op that
    /// returns `true`.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let state = self.inner.lock();
        let frame_id = match state.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return true,
        };
        let frame = self.frames[frame_id as usize].clone();
        match frame.unpin() {
            None => false,
            Some(remaining) => {
                frame.mark_dirty(is_dirty);
                if remaining == 0 {
                    self.replacer.unpin(frame_id);
                }
                true
            }
        }
    }

    /// Flushes `page_id` to disk if dirty, clearing its dirty bit. Returns
    /// `false` if the page isn't resident; does not change pin state or
    /// residency either way.
    pub fn flush_page(&self, page_id: PageId) -> bool {
        let state = self.inner.lock();
        self.flush_locked(&state, page_id)
    }

    fn flush_locked(&self, state: &MutexGuard<'_, ManagerState>, page_id: PageId) -> bool {
        match state.page_table.get(&page_id) {
            Some(&frame_id) => {
                let frame = self.frames[frame_id as usize].clone();
                self.flush_frame(&frame);
                true
            }
            None => false,
        }
    }

    /// Flushes every resident dirty page. Best-effort: a page whose write
    /// fails is logged and left dirty.
    pub fn flush_all_pages(&self) {
        let state = self.inner.lock();
        for &frame_id in state.page_table.values() {
            let frame = self.frames[frame_id as usize].clone();
            self.flush_frame(&frame);
        }
    }

    /// Deallocates `page_id` on disk unconditionally, then, if the page is
    /// resident and unpinned, reclaims its frame. If the page is resident
    /// but pinned, returns `false` (the disk-level deallocation has
    /// already happened regardless; see DESIGN.md on this asymmetry).
    pub fn delete_page(&self, page_id: PageId) -> bool {
        self.disk_scheduler.deallocate_page(page_id);

        let mut state = self.inner.lock();
        let frame_id = match state.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return true,
        };
        let frame = self.frames[frame_id as usize].clone();
        if frame.pin_count() > 0 {
            return false;
        }

        state.page_table.remove(&page_id);
        self.replacer.pin(frame_id); // stop tracking, if tracked
        frame.reset();
        state.free_list.push_back(frame_id);
        true
    }

    /// PageGuard wrapper for `fetch_page`.
    pub fn fetch_page_basic(self: &Arc<Self>, page_id: PageId) -> Option<BasicPageGuard> {
        let frame = self.fetch_page(page_id)?;
        Some(BasicPageGuard::new(Arc::clone(self), frame, page_id))
    }

    /// PageGuard wrapper for `fetch_page` that returns the page already
    /// read-latched.
    pub fn fetch_page_read(self: &Arc<Self>, page_id: PageId) -> Option<ReadPageGuard> {
        let frame = self.fetch_page(page_id)?;
        Some(ReadPageGuard::new(Arc::clone(self), &frame, page_id))
    }

    /// PageGuard wrapper for `fetch_page` that returns the page already
    /// write-latched.
    pub fn fetch_page_write(self: &Arc<Self>, page_id: PageId) -> Option<WritePageGuard> {
        let frame = self.fetch_page(page_id)?;
        Some(WritePageGuard::new(Arc::clone(self), &frame, page_id))
    }

    /// PageGuard wrapper for `new_page`.
    pub fn new_page_guarded(self: &Arc<Self>) -> Option<(PageId, BasicPageGuard)> {
        let (page_id, frame) = self.new_page()?;
        Some((page_id, BasicPageGuard::new(Arc::clone(self), frame, page_id)))
    }

    /// Picks a replacement frame: the free list first, then the replacer.
    /// If the chosen frame is resident, flushes it if dirty and removes
    /// its page-table entry. Returns `None` if nothing is available.
    fn acquire_frame(&self, state: &mut ManagerState) -> Option<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Some(frame_id);
        }

        let frame_id = self.replacer.victim()?;
        let victim_frame = self.frames[frame_id as usize].clone();
        self.flush_frame(&victim_frame);
        state.page_table.remove(&victim_frame.page_id());
        Some(frame_id)
    }

    fn flush_frame(&self, frame: &Frame) {
        if frame.page_id() == INVALID_PAGE_ID || !frame.is_dirty() {
            return;
        }
        match self.disk_scheduler.write(frame.clone()) {
            Ok(()) => frame.clear_dirty(),
            Err(err) => log::error!("flush of page {} failed: {err}", frame.page_id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn manager(pool_size: usize) -> BufferPoolManager {
        let dir = tempdir().unwrap();
        let disk_manager = DiskManager::new(dir.path().join("test.db")).unwrap();
        BufferPoolManager::new(pool_size, disk_manager, None)
    }

    #[test]
    fn cold_fetch_then_hit() {
        let bpm = manager(2);
        let frame = bpm.fetch_page(42).unwrap();
        assert_eq!(frame.pin_count(), 1);
        assert!(bpm.unpin_page(42, false));
        assert_eq!(bpm.replacer.size(), 1);

        let frame = bpm.fetch_page(42).unwrap();
        assert_eq!(frame.pin_count(), 1);
        assert_eq!(bpm.replacer.size(), 0);
    }

    #[test]
    fn new_page_never_collides_with_an_already_resident_id() {
        // DiskManager::allocate_page issues ids starting at 0, independent
        // of what fetch_page has already materialized; new_page must not
        // hand out an id that's already resident in another frame.
        let bpm = manager(2);
        let fetched = bpm.fetch_page(0).unwrap();
        assert_eq!(fetched.pin_count(), 1);

        let (new_id, new_frame) = bpm.new_page().unwrap();
        assert_ne!(new_id, 0);
        assert_eq!(new_frame.page_id(), new_id);

        // The originally fetched frame must still be intact and exclusive.
        assert_eq!(bpm.frame_for(0).unwrap().pin_count(), 1);
        assert_eq!(bpm.frame_for(new_id).unwrap().pin_count(), 1);
    }

    #[test]
    fn pool_exhaustion_returns_none() {
        let bpm = manager(2);
        assert!(bpm.new_page().is_some());
        assert!(bpm.new_page().is_some());
        assert!(bpm.new_page().is_none());
        assert!(bpm.fetch_page(999).is_none());
    }

    #[test]
    fn eviction_of_clean_page_skips_disk_write() {
        let bpm = manager(2);
        let f10 = bpm.fetch_page(10).unwrap();
        f10.data_mut()[0] = 1;
        bpm.unpin_page(10, false);
        bpm.fetch_page(20).unwrap();
        bpm.unpin_page(20, false);

        // Both tracked; 10 was inserted first so it's evicted first.
        let frame30 = bpm.fetch_page(30).unwrap();
        assert_eq!(frame30.page_id(), 30);
        assert!(bpm.frame_for(10).is_none());
        assert!(bpm.frame_for(20).is_some());
    }

    #[test]
    fn eviction_of_dirty_page_flushes_first() {
        let bpm = manager(1);
        let f10 = bpm.fetch_page(10).unwrap();
        f10.data_mut()[..5].copy_from_slice(b"dirty");
        bpm.unpin_page(10, true);

        let f20 = bpm.fetch_page(20).unwrap();
        assert_eq!(f20.page_id(), 20);
        assert!(!f20.is_dirty());

        // Page 10's data must have made it to disk: fetching it back in
        // must reproduce what was written.
        bpm.unpin_page(20, false);
        let f10_again = bpm.fetch_page(10).unwrap();
        assert_eq!(&f10_again.data()[..5], b"dirty");
    }

    #[test]
    fn delete_pinned_page_fails_but_still_deallocates() {
        let bpm = manager(2);
        bpm.fetch_page(7).unwrap(); // never unpinned
        assert!(!bpm.delete_page(7));
        assert!(bpm.frame_for(7).is_some());
    }

    #[test]
    fn delete_unpinned_page_frees_the_frame() {
        let bpm = manager(2);
        bpm.fetch_page(7).unwrap();
        bpm.unpin_page(7, false);
        assert!(bpm.delete_page(7));
        assert!(bpm.frame_for(7).is_none());

        // The reclaimed frame must be usable again.
        assert!(bpm.new_page().is_some());
        assert!(bpm.new_page().is_some());
    }

    #[test]
    fn delete_of_absent_page_is_a_no_op_success() {
        let bpm = manager(2);
        assert!(bpm.delete_page(123));
    }

    #[test]
    fn unpin_is_idempotent_for_absent_pages() {
        let bpm = manager(2);
        assert!(bpm.unpin_page(55, false));
    }

    #[test]
    fn unbalanced_unpin_returns_false() {
        let bpm = manager(2);
        bpm.fetch_page(1).unwrap();
        assert!(bpm.unpin_page(1, false));
        assert!(!bpm.unpin_page(1, false));
    }

    #[test]
    fn dirty_bit_is_sticky_across_unpins() {
        let bpm = manager(2);
        bpm.fetch_page(1).unwrap();
        bpm.fetch_page(1).unwrap(); // pin again
        assert!(bpm.unpin_page(1, true));
        assert!(bpm.unpin_page(1, false));
        assert!(bpm.frame_for(1).unwrap().is_dirty());
    }

    #[test]
    fn flush_idempotence_clears_dirty_once() {
        let bpm = manager(2);
        let frame = bpm.fetch_page(1).unwrap();
        frame.mark_dirty(true);
        assert!(bpm.flush_page(1));
        assert!(!frame.is_dirty());
        // Second flush is a no-op write, still reports success.
        assert!(bpm.flush_page(1));
    }

    #[test]
    fn flush_of_absent_page_returns_false() {
        let bpm = manager(2);
        assert!(!bpm.flush_page(1));
    }

    #[test]
    fn pool_size_one_evicts_immediately() {
        let bpm = manager(1);
        bpm.fetch_page(1).unwrap();
        bpm.unpin_page(1, false);
        let frame = bpm.fetch_page(2).unwrap();
        assert_eq!(frame.page_id(), 2);
        assert!(bpm.frame_for(1).is_none());
    }

    #[test]
    fn concurrent_duplicate_fetches_share_one_frame() {
        use std::sync::Arc;
        use std::thread;

        let bpm = Arc::new(manager(4));
        let bpm1 = Arc::clone(&bpm);
        let bpm2 = Arc::clone(&bpm);

        let t1 = thread::spawn(move || bpm1.fetch_page(99));
        let t2 = thread::spawn(move || bpm2.fetch_page(99));

        let f1 = t1.join().unwrap().unwrap();
        let f2 = t2.join().unwrap().unwrap();
        assert_eq!(f1.page_id(), 99);
        assert_eq!(f2.page_id(), 99);
        assert_eq!(f1.pin_count(), 2);
    }

    #[test]
    fn flush_all_pages_clears_every_dirty_bit() {
        let bpm = manager(3);
        for page_id in [1, 2, 3] {
            let frame = bpm.fetch_page(page_id).unwrap();
            frame.mark_dirty(true);
            bpm.unpin_page(page_id, false);
        }
        bpm.flush_all_pages();
        for page_id in [1, 2, 3] {
            assert!(!bpm.frame_for(page_id).unwrap().is_dirty());
        }
    }
}
