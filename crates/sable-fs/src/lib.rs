//! Filesystem abstraction for Sable.
//!
//! Extraction is read-only: the engine needs existence checks, UTF-8 reads,
//! and deterministic file discovery. Everything goes through the
//! [`FileSystem`] trait so cancellation checkpoints sit at a single seam and
//! tests can point the engine at temp directories.
//!
//! # Example
//!
//! ```no_run
//! use sable_fs::{FileSystem, NativeFileSystem};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> std::io::Result<()> {
//! let fs = Arc::new(NativeFileSystem::new(".")?);
//! let manifest = fs.read_to_string(Path::new("package.json")).await?;
//! println!("{}", manifest);
//! # Ok(())
//! # }
//! ```

mod file_system;
pub use file_system::{DiscoveryOptions, FileSystem};

pub mod native;
pub use native::NativeFileSystem;
