//! Concrete archive layouts
//!
//! Each format provides a [`FatAdapter`](crate::FatAdapter) plus functions
//! to detect, open and create archives in that layout.

pub mod glb_galactix;
pub mod grp;

use std::io::{self, Read, Write};

/// How sure a format is that some data is in its layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Certainty {
    /// The data cannot be in this format
    DefinitelyNo,
    /// Nothing in the data says either way
    Unsure,
    /// The data is consistent with this format
    PossiblyYes,
    /// A signature or checksum matched
    DefinitelyYes,
}

/// Read a fixed-width, NUL padded filename
pub(crate) fn read_name<R: Read + ?Sized>(reader: &mut R, width: usize) -> io::Result<String> {
    let mut buf = vec![0u8; width];
    reader.read_exact(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(width);
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

/// Write a filename into a fixed-width, NUL padded field
///
/// The caller has already checked that the name fits.
pub(crate) fn write_name<W: Write + ?Sized>(writer: &mut W, name: &str, width: usize) -> io::Result<()> {
    let mut buf = vec![0u8; width];
    let bytes = name.as_bytes();
    let n = bytes.len().min(width);
    buf[..n].copy_from_slice(&bytes[..n]);
    writer.write_all(&buf)
}
