use std::fs::{File, OpenOptions};
use std::io;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

use log::debug;

use crate::common::config::{PageId, PAGE_SIZE};

/// Performs raw page I/O against a single database file and issues fresh
/// page identifiers.
///
/// Owned exclusively by a `DiskScheduler`'s background thread once wrapped;
/// nothing above that layer touches the file handle directly. Write-ahead
/// logging is a separate, out-of-scope collaborator (see
/// [`crate::recovery::LogManager`]).
pub struct DiskManager {
    db_file: Mutex<File>,
    next_page_id: AtomicU32,
    num_reads: AtomicU64,
    num_writes: AtomicU64,
}

impl DiskManager {
    /// Opens (creating if necessary) the database file backing this disk
    /// manager.
    pub fn new<P: AsRef<Path>>(db_path: P) -> io::Result<Self> {
        let db_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(db_path)?;
        Ok(Self {
            db_file: Mutex::new(db_file),
            next_page_id: AtomicU32::new(0),
            num_reads: AtomicU64::new(0),
            num_writes: AtomicU64::new(0),
        })
    }

    /// Writes a page's contents to its slot in the database file.
    pub fn write_page(&self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> io::Result<()> {
        let offset = page_id as u64 * PAGE_SIZE as u64;
        let mut file = self.db_file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        file.flush()?;
        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Reads a page's contents from its slot in the database file. Reading
    /// a page past the current end of file is not an error: the frame is
    /// simply zero-filled, matching a page that was allocated but never
    /// written.
    pub fn read_page(&self, page_id: PageId, data: &mut [u8; PAGE_SIZE]) -> io::Result<()> {
        let offset = page_id as u64 * PAGE_SIZE as u64;
        let mut file = self.db_file.lock().unwrap();
        let len = file.metadata()?.len();
        if offset >= len {
            debug!("page {page_id} has never been written; returning a zeroed frame");
            data.fill(0);
            return Ok(());
        }
        file.seek(SeekFrom::Start(offset))?;
        let read = file.read(data)?;
        if read < PAGE_SIZE {
            data[read..].fill(0);
        }
        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Issues a fresh page identifier. Issuance is monotonic in this
    /// implementation, though callers must not rely on that.
    pub fn allocate_page(&self) -> PageId {
        self.next_page_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Marks a page identifier as free. There is no on-disk space
    /// reclamation yet, so this is bookkeeping only.
    pub fn deallocate_page(&self, page_id: PageId) {
        debug!("page {page_id} deallocated (no space reclamation)");
    }

    pub fn num_reads(&self) -> u64 {
        self.num_reads.load(Ordering::Relaxed)
    }

    pub fn num_writes(&self) -> u64 {
        self.num_writes.load(Ordering::Relaxed)
    }
}
