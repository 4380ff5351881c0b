//! Object storage client and ZIP archive codec for Saturn.
//!
//! Submissions, compiled binaries, and match replays all move through a
//! blob store addressed by `(bucket, name)`. Source and binary blobs are
//! ZIP archives; replays are uploaded as raw bytes.

pub mod archive;
pub mod client;
pub mod error;

pub use archive::{get_archive, put_archive, ArchiveOutcome};
pub use client::{LocalFsStorage, ObjectStoreClient, StorageClient};
pub use error::StorageError;
