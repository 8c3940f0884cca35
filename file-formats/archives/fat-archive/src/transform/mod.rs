//! Whole-stream transforms for compressed or encrypted files
//!
//! Files flagged [`COMPRESSED`](crate::EntryAttributes::COMPRESSED) or
//! [`ENCRYPTED`](crate::EntryAttributes::ENCRYPTED) are stored encoded. A
//! [`FilteredReader`] decodes a stored file for reading. A [`FilteredWriter`]
//! collects plaintext and on flush writes the encoded form, resizes the
//! underlying stream to fit, and reports the plaintext length so the entry's
//! real size can be updated.

mod xor;
mod zlib;

pub use xor::XorTransform;
pub use zlib::ZlibTransform;

use crate::archfile::{RealSizeFn, Truncate};
use crate::error::{Error, Result};
use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

/// Reversible byte transform applied to a whole file
pub trait StreamTransform: Send {
    /// Turn plaintext into the stored form
    fn encode(&self, plain: &[u8]) -> Result<Vec<u8>>;

    /// Turn the stored form back into plaintext
    fn decode(&self, stored: &[u8]) -> Result<Vec<u8>>;
}

/// Decoded view of a stored file
#[derive(Debug)]
pub struct FilteredReader {
    plain: Cursor<Vec<u8>>,
}

impl FilteredReader {
    /// Read and decode all of `inner`
    pub fn new<R: Read, T: StreamTransform + ?Sized>(mut inner: R, transform: &T) -> Result<Self> {
        let mut stored = Vec::new();
        inner.read_to_end(&mut stored)?;
        let plain = transform.decode(&stored)?;
        log::trace!("Decoded {} stored bytes into {}", stored.len(), plain.len());
        Ok(Self {
            plain: Cursor::new(plain),
        })
    }

    /// Length of the decoded data
    pub fn len(&self) -> u64 {
        self.plain.get_ref().len() as u64
    }

    /// Whether the decoded data is empty
    pub fn is_empty(&self) -> bool {
        self.plain.get_ref().is_empty()
    }

    /// Consume the reader, returning the decoded data
    pub fn into_inner(self) -> Vec<u8> {
        self.plain.into_inner()
    }
}

impl Read for FilteredReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.plain.read(buf)
    }
}

impl Seek for FilteredReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.plain.seek(pos)
    }
}

/// Plaintext writer that stores its encoded form on flush
pub struct FilteredWriter<W, T> {
    inner: W,
    transform: T,
    plain: Cursor<Vec<u8>>,
    on_real_size: Option<RealSizeFn>,
    dirty: bool,
}

impl<W, T> FilteredWriter<W, T>
where
    W: Read + Write + Seek + Truncate,
    T: StreamTransform,
{
    /// Start with empty plaintext, replacing whatever `inner` holds on flush
    pub fn new(inner: W, transform: T) -> Self {
        Self {
            inner,
            transform,
            plain: Cursor::new(Vec::new()),
            on_real_size: None,
            dirty: true,
        }
    }

    /// Start from the decoded current content of `inner`
    pub fn open(mut inner: W, transform: T) -> Result<Self> {
        inner.seek(SeekFrom::Start(0))?;
        let plain = FilteredReader::new(&mut inner, &transform)?.into_inner();
        Ok(Self {
            inner,
            transform,
            plain: Cursor::new(plain),
            on_real_size: None,
            dirty: false,
        })
    }

    /// Report the plaintext length to `callback` after each flush
    pub fn with_real_size_callback(mut self, callback: RealSizeFn) -> Self {
        self.on_real_size = Some(callback);
        self
    }

    /// Plaintext written so far
    pub fn plaintext(&self) -> &[u8] {
        self.plain.get_ref()
    }

    /// Flush and return the underlying stream
    pub fn finish(mut self) -> Result<W> {
        self.commit()?;
        Ok(self.inner)
    }

    fn commit(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let plain = self.plain.get_ref();
        let stored = self.transform.encode(plain)?;
        let plain_len = plain.len() as u64;

        self.inner.truncate(stored.len() as u64)?;
        self.inner.seek(SeekFrom::Start(0))?;
        self.inner.write_all(&stored)?;
        if let Some(callback) = self.on_real_size.as_mut() {
            callback(plain_len)?;
        }
        self.inner.flush()?;

        log::debug!("Stored {plain_len} plaintext bytes as {}", stored.len());
        self.dirty = false;
        Ok(())
    }
}

impl<W, T> Write for FilteredWriter<W, T>
where
    W: Read + Write + Seek + Truncate,
    T: StreamTransform,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.dirty = true;
        self.plain.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit().map_err(Error::into_io)
    }
}

impl<W, T> Seek for FilteredWriter<W, T> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.plain.seek(pos)
    }
}

impl<W: fmt::Debug, T> fmt::Debug for FilteredWriter<W, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredWriter")
            .field("inner", &self.inner)
            .field("plain_len", &self.plain.get_ref().len())
            .field("dirty", &self.dirty)
            .finish()
    }
}
