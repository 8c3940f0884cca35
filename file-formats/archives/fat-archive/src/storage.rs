//! Byte storage abstractions for FAT archives
//!
//! The engine edits the container structurally: it opens gaps for new or
//! enlarged files and closes them again when files shrink or disappear.
//! [`ByteStorage`] is the seam for that, and [`BufferedStorage`] is an
//! implementation that keeps an in-memory image of any `Read + Write + Seek`
//! backing and writes it out on [`ByteStorage::commit`].

use parking_lot::Mutex;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

/// Callback used to set the final length of the backing store on commit
pub type TruncateFn = Box<dyn FnMut(u64) -> io::Result<()> + Send>;

/// Storage shared between an archive and the streams it hands out
pub type SharedStorage = Arc<Mutex<Box<dyn ByteStorage>>>;

/// Mutable byte sequence supporting positional insert and delete
pub trait ByteStorage: Read + Write + Seek + Send + fmt::Debug {
    /// Current length in bytes
    fn len(&self) -> u64;

    /// Whether the storage holds no bytes
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Open a zero-filled gap of `len` bytes at the current position
    ///
    /// Everything from the current position onwards moves forward by `len`.
    /// The position is left at the start of the gap.
    fn insert_bytes(&mut self, len: u64) -> io::Result<()>;

    /// Delete `len` bytes at the current position
    ///
    /// Everything after the deleted range moves back by `len`. The position
    /// is left where the range started.
    fn remove_bytes(&mut self, len: u64) -> io::Result<()>;

    /// Whether there are edits not yet committed
    fn is_modified(&self) -> bool;

    /// Write all pending edits to the durable backing store
    ///
    /// `truncate` is called with the final length when it differs from the
    /// length of the backing store.
    fn commit(&mut self, truncate: &mut dyn FnMut(u64) -> io::Result<()>) -> io::Result<()>;
}

/// Wrap a storage implementation for sharing with open streams
pub fn shared<S: ByteStorage + 'static>(storage: S) -> SharedStorage {
    Arc::new(Mutex::new(Box::new(storage)))
}

/// In-memory image of a backing stream
#[derive(Debug)]
pub struct BufferedStorage<S> {
    inner: S,
    data: Vec<u8>,
    pos: u64,
    modified: bool,
    backing_len: u64,
}

impl<S: Read + Write + Seek> BufferedStorage<S> {
    /// Load the whole backing stream into memory
    pub fn new(mut inner: S) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(0))?;
        let mut data = Vec::new();
        inner.read_to_end(&mut data)?;
        let backing_len = data.len() as u64;
        Ok(Self {
            inner,
            data,
            pos: 0,
            modified: false,
            backing_len,
        })
    }

    /// The current image, including uncommitted edits
    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    /// Borrow the backing stream
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Consume the storage, discarding uncommitted edits
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn position(&self) -> io::Result<usize> {
        usize::try_from(self.pos)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "position out of range"))
    }
}

impl BufferedStorage<File> {
    /// Truncate callback that sets the length of the backing file
    pub fn truncate_callback(&self) -> io::Result<TruncateFn> {
        let file = self.inner.try_clone()?;
        Ok(Box::new(move |len| file.set_len(len)))
    }
}

impl<S: Read + Write + Seek> Read for BufferedStorage<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let pos = self.position()?;
        if pos >= self.data.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.data.len() - pos);
        buf[..n].copy_from_slice(&self.data[pos..pos + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl<S: Read + Write + Seek> Write for BufferedStorage<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let pos = self.position()?;
        let end = pos + buf.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[pos..end].copy_from_slice(buf);
        self.pos = end as u64;
        self.modified = true;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Nothing reaches the backing store until commit
        Ok(())
    }
}

impl<S: Read + Write + Seek> Seek for BufferedStorage<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, delta) = match pos {
            SeekFrom::Start(p) => {
                self.pos = p;
                return Ok(p);
            }
            SeekFrom::End(d) => (self.data.len() as u64, d),
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

impl<S: Read + Write + Seek + Send + fmt::Debug> ByteStorage for BufferedStorage<S> {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn insert_bytes(&mut self, len: u64) -> io::Result<()> {
        let pos = self.position()?;
        if pos > self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "cannot insert at {pos}, storage is only {} bytes",
                    self.data.len()
                ),
            ));
        }
        if len == 0 {
            return Ok(());
        }
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "insert too large"))?;
        self.data
            .splice(pos..pos, std::iter::repeat_n(0u8, len));
        self.modified = true;
        Ok(())
    }

    fn remove_bytes(&mut self, len: u64) -> io::Result<()> {
        let pos = self.position()?;
        let end = usize::try_from(len)
            .ok()
            .and_then(|len| pos.checked_add(len))
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "cannot remove {len} bytes at {pos}, storage is only {} bytes",
                        self.data.len()
                    ),
                )
            })?;
        if end > pos {
            self.data.drain(pos..end);
            self.modified = true;
        }
        Ok(())
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn commit(&mut self, truncate: &mut dyn FnMut(u64) -> io::Result<()>) -> io::Result<()> {
        if !self.modified {
            return Ok(());
        }
        let len = self.data.len() as u64;
        if len > self.backing_len {
            // Grow first so the write never runs off a fixed-size backing
            truncate(len)?;
        }
        self.inner.seek(SeekFrom::Start(0))?;
        self.inner.write_all(&self.data)?;
        self.inner.flush()?;
        if len < self.backing_len {
            truncate(len)?;
        }
        log::debug!("Committed {len} bytes (was {})", self.backing_len);
        self.backing_len = len;
        self.modified = false;
        Ok(())
    }
}
