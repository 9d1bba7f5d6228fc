use std::io;
use std::thread;

use crossbeam::channel::{self, Sender};
use tokio::sync::oneshot;

use crate::common::config::PageId;
use crate::storage::disk::DiskManager;
use crate::storage::frame::Frame;

/// A request for the background disk thread to execute.
enum DiskRequest {
    Read {
        frame: Frame,
        callback: oneshot::Sender<io::Result<()>>,
    },
    Write {
        frame: Frame,
        callback: oneshot::Sender<io::Result<()>>,
    },
    Allocate {
        callback: oneshot::Sender<PageId>,
    },
    Deallocate {
        page_id: PageId,
        callback: oneshot::Sender<()>,
    },
}

/// Schedules disk reads, writes, and page-id allocation onto a single
/// background worker thread that owns the `DiskManager`.
///
/// Every public method blocks the calling thread until the request
/// completes: the buffer pool manager holds `manager_latch` across these
/// calls (see the crate's design notes), so there is no benefit to
/// decoupling submission from completion here.
pub struct DiskScheduler {
    request_queue: Sender<Option<DiskRequest>>,
    background_thread: Option<thread::JoinHandle<()>>,
}

impl DiskScheduler {
    pub fn new(disk_manager: DiskManager) -> Self {
        let (tx, rx) = channel::unbounded();
        let background_thread = thread::Builder::new()
            .name("disk-scheduler".into())
            .spawn(move || Self::run(rx, disk_manager))
            .expect("failed to spawn disk scheduler thread");
        Self {
            request_queue: tx,
            background_thread: Some(background_thread),
        }
    }

    fn schedule(&self, request: DiskRequest) {
        self.request_queue
            .send(Some(request))
            .expect("disk scheduler worker has terminated");
    }

    pub fn read(&self, frame: Frame) -> io::Result<()> {
        let (tx, rx) = oneshot::channel();
        self.schedule(DiskRequest::Read { frame, callback: tx });
        rx.blocking_recv()
            .expect("disk scheduler dropped read callback")
    }

    pub fn write(&self, frame: Frame) -> io::Result<()> {
        let (tx, rx) = oneshot::channel();
        self.schedule(DiskRequest::Write { frame, callback: tx });
        rx.blocking_recv()
            .expect("disk scheduler dropped write callback")
    }

    pub fn allocate_page(&self) -> PageId {
        let (tx, rx) = oneshot::channel();
        self.schedule(DiskRequest::Allocate { callback: tx });
        rx.blocking_recv()
            .expect("disk scheduler dropped allocate callback")
    }

    pub fn deallocate_page(&self, page_id: PageId) {
        let (tx, rx) = oneshot::channel();
        self.schedule(DiskRequest::Deallocate {
            page_id,
            callback: tx,
        });
        rx.blocking_recv()
            .expect("disk scheduler dropped deallocate callback");
    }

    fn run(rx: channel::Receiver<Option<DiskRequest>>, disk_manager: DiskManager) {
        while let Ok(Some(request)) = rx.recv() {
            match request {
                DiskRequest::Read { frame, callback } => {
                    let page_id = frame.page_id();
                    let result = disk_manager.read_page(page_id, &mut frame.data_mut());
                    let _ = callback.send(result);
                }
                DiskRequest::Write { frame, callback } => {
                    let page_id = frame.page_id();
                    let result = disk_manager.write_page(page_id, &frame.data());
                    let _ = callback.send(result);
                }
                DiskRequest::Allocate { callback } => {
                    let _ = callback.send(disk_manager.allocate_page());
                }
                DiskRequest::Deallocate { page_id, callback } => {
                    disk_manager.deallocate_page(page_id);
                    let _ = callback.send(());
                }
            }
        }
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        // A `None` tells the worker to stop; join it so the thread never
        // outlives the scheduler.
        let _ = self.request_queue.send(None);
        if let Some(handle) = self.background_thread.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::common::config::PAGE_SIZE;

    #[test]
    fn read_after_write_round_trips_through_the_worker_thread() {
        let dir = tempdir().unwrap();
        let disk_manager = DiskManager::new(dir.path().join("test.db")).unwrap();
        let scheduler = DiskScheduler::new(disk_manager);

        let frame = Frame::new();
        frame.set_page_id(0);
        frame.data_mut()[..5].copy_from_slice(b"hello");
        scheduler.write(frame.clone()).unwrap();

        let other = Frame::new();
        other.set_page_id(0);
        scheduler.read(other.clone()).unwrap();
        assert_eq!(&other.data()[..5], b"hello");
    }

    #[test]
    fn allocate_page_hands_out_distinct_ids() {
        let dir = tempdir().unwrap();
        let disk_manager = DiskManager::new(dir.path().join("test.db")).unwrap();
        let scheduler = DiskScheduler::new(disk_manager);
        let a = scheduler.allocate_page();
        let b = scheduler.allocate_page();
        assert_ne!(a, b);
        let _ = PAGE_SIZE;
    }
}
