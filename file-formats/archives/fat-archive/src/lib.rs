//! # fat_archive - FAT-style Game Archive Engine
//!
//! Many game data archives are a table of (offset, size, name) rows followed
//! by the file data packed back to back. This crate implements the part all
//! of those formats share: deciding where bytes go when files are inserted,
//! removed or resized, moving every later file to match, and keeping open
//! sub-file streams pointed at the right bytes throughout.
//!
//! Format specifics live behind the [`FatAdapter`] trait. The [`formats`]
//! module has adapters for Build engine `.GRP` and Galactix `.GLB` files.
//!
//! ## Features
//!
//! - Insert before any file or at the end, remove, resize and rename
//! - Open streams that follow their file as other files move
//! - Growable file handles over a shared archive
//! - Zlib and XOR transforms for compressed or encrypted files
//! - In-memory editing with a single commit to disk
//!
//! ## Examples
//!
//! ```no_run
//! use fat_archive::formats::grp;
//! use fat_archive::{EntryAttributes, FILETYPE_GENERIC};
//! use std::io::Write;
//!
//! # fn main() -> Result<(), fat_archive::Error> {
//! let mut archive = grp::open_path("DUKE3D.GRP")?;
//!
//! for file in archive.files() {
//!     println!("{}", *file.read());
//! }
//!
//! // Add a file in front of the first one
//! let first = archive.file_at(0);
//! let entry = archive.insert(
//!     first.as_ref(),
//!     "README.TXT",
//!     5,
//!     FILETYPE_GENERIC,
//!     EntryAttributes::empty(),
//! )?;
//! archive.open(&entry)?.write_all(b"hello")?;
//!
//! archive.flush()?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod adapter;
pub mod archfile;
pub mod archive;
pub mod entry;
pub mod error;
pub mod formats;
pub mod registry;
pub mod storage;
pub mod substream;
pub mod table;
pub mod transform;

// Re-export commonly used types
pub use adapter::FatAdapter;
pub use archfile::{ArchiveFile, RealSizeFn, SharedArchive, Truncate, share};
pub use archive::{FatArchive, InsertOptions, parsed_entry};
pub use entry::{EntryAttributes, EntryRef, FILETYPE_GENERIC, FatEntry};
pub use error::{Error, Result};
pub use registry::{OpenFileRegistry, Window};
pub use storage::{BufferedStorage, ByteStorage, SharedStorage, TruncateFn, shared};
pub use substream::SubStream;
pub use table::FatTable;
pub use transform::{FilteredReader, FilteredWriter, StreamTransform, XorTransform, ZlibTransform};
