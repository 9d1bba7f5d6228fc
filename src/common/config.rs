//! Constants and type aliases shared across the buffer pool core.

/// Size in bytes of every page and every frame's data buffer.
pub const PAGE_SIZE: usize = 4096;

/// Sentinel meaning "this frame holds no logical page".
pub const INVALID_PAGE_ID: PageId = u32::MAX;

/// Identifies a slot in the buffer pool's preallocated frame array.
/// Stable for the lifetime of the process; valid range is `[0, pool_size)`.
pub type FrameId = u32;

/// Identifies a logical page. Opaque beyond `INVALID_PAGE_ID`; issuance is
/// not required to be monotonic.
pub type PageId = u32;

/// Log sequence number, reserved for a future write-ahead-log integration.
pub type Lsn = u64;

/// Sentinel LSN meaning "never logged".
pub const INVALID_LSN: Lsn = 0;
