pub mod cache;
pub mod cancel;
pub mod format;
pub mod logging;
pub mod persist;
