pub mod config;
pub mod errors;
pub mod files;
pub mod scan;
pub mod view;

pub use config::{EncodingMode, ScanConfig};
pub use errors::{ScanError, ScanResult};
pub use files::resolve_files;
pub use scan::{scan, start, Event, FileStatus, ScanControl, ScanHandle, ScanOptions};
pub use view::ScanView;
