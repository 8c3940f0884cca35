//! Streams that can grow their file inside a shared archive
//!
//! A plain [`SubStream`](crate::SubStream) cannot change the container
//! layout. [`ArchiveFile`] pairs one with the archive that owns it, so
//! truncating or writing past the end resizes the file through
//! [`FatArchive::resize`]. It keeps the archive alive, and commits it on
//! flush once it is the last owner.
//!
//! The archive is locked for every resize. Do not hold the archive lock
//! while writing to an `ArchiveFile`.

use crate::adapter::FatAdapter;
use crate::archive::FatArchive;
use crate::entry::EntryRef;
use crate::error::{Error, Result};
use crate::substream::SubStream;
use parking_lot::Mutex;
use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Weak};

/// Archive shared between its owner and open files
pub type SharedArchive<A> = Arc<Mutex<FatArchive<A>>>;

/// Callback reporting a file's decoded size, see
/// [`ArchiveFile::real_size_callback`]
pub type RealSizeFn = Box<dyn FnMut(u64) -> Result<()> + Send>;

/// Wrap an archive for sharing with [`ArchiveFile`]s
pub fn share<A: FatAdapter>(archive: FatArchive<A>) -> SharedArchive<A> {
    Arc::new(Mutex::new(archive))
}

/// Streams whose length can be set
pub trait Truncate {
    /// Set the length to `size`, zero-filling when growing
    ///
    /// On success the position is at `size`.
    fn truncate(&mut self, size: u64) -> Result<()>;
}

impl Truncate for Cursor<Vec<u8>> {
    fn truncate(&mut self, size: u64) -> Result<()> {
        let len = usize::try_from(size)
            .map_err(|_| Error::capacity(format!("{size} bytes do not fit in memory")))?;
        self.get_mut().resize(len, 0);
        self.set_position(size);
        Ok(())
    }
}

impl Truncate for File {
    fn truncate(&mut self, size: u64) -> Result<()> {
        self.set_len(size)?;
        self.seek(SeekFrom::Start(size))?;
        Ok(())
    }
}

/// A file inside a shared archive
pub struct ArchiveFile<A: FatAdapter> {
    archive: SharedArchive<A>,
    stream: SubStream<A::Extra>,
}

impl<A: FatAdapter> ArchiveFile<A> {
    /// Open `entry` in `archive`
    pub fn open(archive: &SharedArchive<A>, entry: &EntryRef<A::Extra>) -> Result<Self> {
        let stream = archive.lock().open(entry)?;
        Ok(Self {
            archive: Arc::clone(archive),
            stream,
        })
    }

    /// The entry this file belongs to
    pub fn entry(&self) -> &EntryRef<A::Extra> {
        self.stream.entry()
    }

    /// Current stored length
    pub fn len(&self) -> io::Result<u64> {
        self.stream.len()
    }

    /// Whether the file is currently empty
    pub fn is_empty(&self) -> io::Result<bool> {
        self.stream.is_empty()
    }

    /// Record the decoded size of a transformed file
    ///
    /// The stored size stays as it is.
    pub fn set_real_size(&mut self, real_size: u64) -> Result<()> {
        let entry = self.stream.entry().clone();
        let stored = entry.stored_size();
        self.archive.lock().resize(&entry, stored, real_size)
    }

    fn grow_to(&mut self, size: u64) -> io::Result<()> {
        let pos = self.stream.position();
        self.truncate(size).map_err(Error::into_io)?;
        self.stream.seek(SeekFrom::Start(pos))?;
        Ok(())
    }
}

impl<A: FatAdapter + 'static> ArchiveFile<A> {
    /// Callback for a [`FilteredWriter`](crate::transform::FilteredWriter)
    /// to report the plaintext size
    ///
    /// It holds the archive weakly, and fails once the archive is gone.
    pub fn real_size_callback(&self) -> RealSizeFn {
        let archive: Weak<Mutex<FatArchive<A>>> = Arc::downgrade(&self.archive);
        let entry = self.stream.entry().clone();
        Box::new(move |real_size| {
            let archive = archive.upgrade().ok_or_else(|| {
                Error::invalid_handle(format!("archive holding {} was closed", entry.name()))
            })?;
            let stored = entry.stored_size();
            archive.lock().resize(&entry, stored, real_size)
        })
    }
}

impl<A: FatAdapter> Truncate for ArchiveFile<A> {
    fn truncate(&mut self, size: u64) -> Result<()> {
        let entry = self.stream.entry().clone();
        // A transformed file's decoded size is not tied to its stored size
        let real_size = if entry.attributes().is_transformed() {
            entry.real_size()
        } else {
            size
        };
        self.archive.lock().resize(&entry, size, real_size)?;

        self.stream.seek(SeekFrom::Start(size))?;
        let actual = self.stream.len()?;
        if actual != size {
            return Err(Error::ResizeNotApplied {
                expected: size,
                actual,
            });
        }
        Ok(())
    }
}

impl<A: FatAdapter> Read for ArchiveFile<A> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl<A: FatAdapter> Write for ArchiveFile<A> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let end = self.stream.position() + buf.len() as u64;
        if end > self.stream.len()? {
            self.grow_to(end)?;
        }
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        if Arc::strong_count(&self.archive) == 1 {
            self.archive.lock().flush().map_err(Error::into_io)?;
        }
        Ok(())
    }
}

impl<A: FatAdapter> Seek for ArchiveFile<A> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.stream.seek(pos)
    }
}

impl<A: FatAdapter> fmt::Debug for ArchiveFile<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveFile")
            .field("stream", &self.stream)
            .field("owners", &Arc::strong_count(&self.archive))
            .finish()
    }
}
