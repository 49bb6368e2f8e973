mod shortener;

pub use shortener::{Shortener, StorageStats};
