pub mod file_scanner;
pub mod gitignore;

pub use file_scanner::{DEFAULT_BASENAMES, DEFAULT_EXTENSIONS, FileScanner, ScannedFile};
pub use gitignore::{DEFAULT_IGNORE_PATTERNS, IgnoreRules};
