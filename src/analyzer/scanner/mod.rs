pub mod file_scanner;

pub use file_scanner::{FileSource, RepoScanner, ScanFilter, ScannedFile, ensure_readable_root};
