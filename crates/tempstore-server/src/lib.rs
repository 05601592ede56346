//! Tempstore server - HTTP staging area for temporary files.
//!
//! Accepts uploads under a size ceiling, streams them to a flat directory,
//! serves them back with content-type aware disposition, and evicts entries
//! older than a retention window.

pub mod api;
pub mod config;
pub mod content_type;
pub mod evictor;
pub mod name;
pub mod service;
pub mod storage;

pub use api::router;
pub use config::Config;
pub use content_type::Disposition;
pub use evictor::Evictor;
pub use name::FileName;
pub use service::{FileInfo, StoreService};
pub use storage::{ByteReader, ByteStream, FsStore, MemStore, Store, StoreError, StoredFile, SweepReport};
