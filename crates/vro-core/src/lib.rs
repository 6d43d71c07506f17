//! vro core library
//!
//! Source trees, file classification and process configuration shared by
//! the batch generator and the live server.

pub mod config;
pub mod content;
pub mod error;
pub mod memory;
pub mod source;

pub use config::{Config, ErrorPolicy};
pub use content::{FileKind, classify};
pub use error::{ConfigError, SourceError};
pub use memory::MemoryTree;
pub use source::{DirTree, Entry, EntryKind, FileStat, SourceTree, SubTree};
