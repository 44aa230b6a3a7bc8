//! Filesystem persistence for Scriptorium documents.
//!
//! Stories, outlines and idea proposals are written as UTF-8 text files under
//! an output directory, named from a sanitised title plus a timestamp.
//!
//! # Example
//!
//! ```rust
//! use scriptorium_interface::Persistence;
//! use scriptorium_storage::{FileSystemPersistence, artifact_name};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = std::env::temp_dir().join("scriptorium-doc");
//! let name = artifact_name("story", "The Salt Archive");
//! let path = FileSystemPersistence.persist("# The Salt Archive\n", &name, &dir)?;
//! assert!(path.exists());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod filesystem;
mod naming;

pub use filesystem::FileSystemPersistence;
pub use naming::{artifact_name, artifact_name_at, safe_filename};
