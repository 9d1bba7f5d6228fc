pub mod disk;
pub mod frame;
pub mod page_guard;

pub use frame::Frame;
pub use page_guard::{BasicPageGuard, ReadPageGuard, WritePageGuard};
