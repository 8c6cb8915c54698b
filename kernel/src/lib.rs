// Tracklog Kernel
//
// Versioned change-tracking logs for database tables: version
// lifecycle, log filtering and ordering, entry deletion and export.

pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod lifecycle;
pub mod log;
pub mod mutation;
pub mod report;
pub mod state;

pub use error::{MessageKey, Notice, TrackingError, TrackingResult};
