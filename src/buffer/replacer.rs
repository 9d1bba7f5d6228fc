use parking_lot::RwLock;

use crate::common::config::FrameId;

/// Per-frame bookkeeping the clock sweep uses to approximate recency.
#[derive(Debug, Clone, Copy)]
struct Descriptor {
    reference_bit: bool,
}

struct ClockState {
    /// Indexed directly by `FrameId`: `Some` means the frame is tracked
    /// (resident, unpinned, evictable); `None` means it isn't.
    slots: Vec<Option<Descriptor>>,
    /// The clock hand, valid only while `tracked > 0`.
    hand: FrameId,
    tracked: usize,
}

/// Tracks frames eligible for eviction and nominates a victim using a
/// clock-sweep approximation of LRU (the "second-chance" algorithm).
///
/// Deals only in opaque [`FrameId`]s; knows nothing about pages, disks, or
/// the page table. Internally synchronized with its own latch, independent
/// of the buffer pool manager's latch (the manager may hold both at once,
/// but always acquires its own latch first, per the crate's design notes
/// on lock ordering).
pub struct ClockReplacer {
    state: RwLock<ClockState>,
}

impl ClockReplacer {
    /// Creates a replacer sized for `num_frames` distinct frame ids.
    pub fn new(num_frames: usize) -> Self {
        Self {
            state: RwLock::new(ClockState {
                slots: vec![None; num_frames],
                hand: 0,
                tracked: 0,
            }),
        }
    }

    /// Number of frames currently tracked as evictable. Takes a shared
    /// lock, so it never contends with other readers of `size`.
    pub fn size(&self) -> usize {
        self.state.read().tracked
    }

    /// Finds the frame with the largest backward k-distance under the
    /// clock approximation and removes it from tracking, or returns `None`
    /// if nothing is tracked.
    pub fn victim(&self) -> Option<FrameId> {
        let mut state = self.state.write();
        if state.tracked == 0 {
            return None;
        }
        loop {
            let hand = state.hand;
            let bit = state.slots[hand as usize]
                .as_ref()
                .expect("hand always points at a tracked slot")
                .reference_bit;
            if bit {
                state.slots[hand as usize].as_mut().unwrap().reference_bit = false;
                state.hand = Self::advance(&state.slots, hand);
                continue;
            }

            // The hand advances past the victim before removal, so it
            // remains valid for whatever is tracked next.
            let next = Self::advance(&state.slots, hand);
            state.slots[hand as usize] = None;
            state.tracked -= 1;
            state.hand = if state.tracked == 0 { 0 } else { next };
            return Some(hand);
        }
    }

    /// Marks `frame_id` unevictable, removing it from tracking. A no-op if
    /// the frame wasn't tracked.
    pub fn pin(&self, frame_id: FrameId) {
        let mut state = self.state.write();
        if state.slots[frame_id as usize].is_none() {
            return;
        }
        if state.hand == frame_id {
            state.hand = Self::advance(&state.slots, frame_id);
        }
        state.slots[frame_id as usize] = None;
        state.tracked -= 1;
        if state.tracked == 0 {
            state.hand = 0;
        }
    }

    /// Marks `frame_id` evictable. A no-op if it's already tracked: this
    /// does **not** refresh the reference bit on a re-unpin, matching a
    /// deliberately preserved quirk of the source algorithm (see
    /// DESIGN.md).
    pub fn unpin(&self, frame_id: FrameId) {
        let mut state = self.state.write();
        if state.slots[frame_id as usize].is_some() {
            return;
        }
        let was_empty = state.tracked == 0;
        state.slots[frame_id as usize] = Some(Descriptor { reference_bit: true });
        state.tracked += 1;
        if was_empty {
            state.hand = frame_id;
        }
    }

    /// Advances circularly from `from` to the next occupied slot.
    fn advance(slots: &[Option<Descriptor>], from: FrameId) -> FrameId {
        let len = slots.len() as FrameId;
        let mut idx = (from + 1) % len;
        loop {
            if slots[idx as usize].is_some() {
                return idx;
            }
            idx = (idx + 1) % len;
        }
    }
}
