//! A disk-backed buffer pool: the subsystem that mediates between a
//! fixed-capacity in-memory cache of fixed-size pages and a
//! byte-addressable page-oriented disk.
//!
//! [`buffer::BufferPoolManager`] owns the page table, frame allocation, and
//! pin/unpin accounting; it delegates victim selection to
//! [`buffer::ClockReplacer`], a clock-sweep approximation of LRU that
//! tracks evictable frames independently of page or disk concerns.

pub mod buffer;
pub mod common;
pub mod recovery;
pub mod storage;

pub use buffer::BufferPoolManager;
pub use common::config::{FrameId, PageId, INVALID_PAGE_ID, PAGE_SIZE};
pub use recovery::LogManager;
pub use storage::disk::DiskManager;
pub use storage::{BasicPageGuard, Frame, ReadPageGuard, WritePageGuard};
