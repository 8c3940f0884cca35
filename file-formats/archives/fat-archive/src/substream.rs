//! Window streams onto a single sub-file
//!
//! A [`SubStream`] reads and writes the bytes of one entry inside the shared
//! container. Its window is owned jointly with the archive's registry, so it
//! follows the entry when other files move it. The stream can never change
//! the container's layout; growing a file goes through the archive.

use crate::entry::EntryRef;
use crate::error::Error;
use crate::registry::{SharedWindow, Window};
use crate::storage::SharedStorage;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Read/write window bound to one entry
pub struct SubStream<X> {
    storage: SharedStorage,
    entry: EntryRef<X>,
    window: SharedWindow,
    pos: u64,
}

impl<X> SubStream<X> {
    pub(crate) fn new(storage: SharedStorage, entry: EntryRef<X>, window: SharedWindow) -> Self {
        Self {
            storage,
            entry,
            window,
            pos: 0,
        }
    }

    /// The entry this stream belongs to
    pub fn entry(&self) -> &EntryRef<X> {
        &self.entry
    }

    /// Current window, failing once the entry has been removed
    pub fn window(&self) -> io::Result<Window> {
        if !self.entry.is_valid() {
            let name = self.entry.name();
            return Err(Error::invalid_handle(format!(
                "attempt to access closed or deleted file {name}"
            ))
            .into_io());
        }
        Ok(*self.window.lock())
    }

    /// Absolute offset of the first byte in the container
    pub fn offset(&self) -> io::Result<u64> {
        Ok(self.window()?.start)
    }

    /// Number of bytes visible through the stream
    pub fn len(&self) -> io::Result<u64> {
        Ok(self.window()?.len)
    }

    /// Whether the stream currently has no bytes
    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Current position relative to the start of the sub-file
    pub fn position(&self) -> u64 {
        self.pos
    }
}

impl<X> Read for SubStream<X> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let window = self.window()?;
        if self.pos >= window.len || buf.is_empty() {
            return Ok(0);
        }
        let avail = window.len - self.pos;
        let n = buf.len().min(usize::try_from(avail).unwrap_or(usize::MAX));

        let mut storage = self.storage.lock();
        storage.seek(SeekFrom::Start(window.start + self.pos))?;
        storage.read_exact(&mut buf[..n])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<X> Write for SubStream<X> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let window = self.window()?;
        if self.pos >= window.len || buf.is_empty() {
            // write_all turns this into WriteZero
            return Ok(0);
        }
        let room = window.len - self.pos;
        let n = buf.len().min(usize::try_from(room).unwrap_or(usize::MAX));

        let mut storage = self.storage.lock();
        storage.seek(SeekFrom::Start(window.start + self.pos))?;
        storage.write_all(&buf[..n])?;
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        // Shared with the archive, which owns committing
        Ok(())
    }
}

impl<X> Seek for SubStream<X> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, delta) = match pos {
            SeekFrom::Start(p) => {
                self.pos = p;
                return Ok(p);
            }
            SeekFrom::End(d) => (self.len()?, d),
            SeekFrom::Current(d) => (self.pos, d),
        };
        self.pos = base.checked_add_signed(delta).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )
        })?;
        Ok(self.pos)
    }
}

impl<X> fmt::Debug for SubStream<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubStream")
            .field("window", &*self.window.lock())
            .field("pos", &self.pos)
            .field("valid", &self.entry.is_valid())
            .finish()
    }
}
