//! Galactix `.GLB` archives
//!
//! ```text
//! header  file count                u32
//!         "GLIB FILE", NUL padded   22 bytes
//!         reserved                  u16
//! row     offset                    u32
//!         name, NUL terminated      22 bytes
//!         size                      u16
//! ```
//!
//! The table is kept in cleartext. Every row stores an absolute offset, so
//! any file that moves needs its row rewritten.

use super::{Certainty, read_name, write_name};
use crate::adapter::FatAdapter;
use crate::archive::{FatArchive, parsed_entry};
use crate::entry::{EntryRef, FatEntry};
use crate::error::{Error, Result};
use crate::storage::{BufferedStorage, ByteStorage, SharedStorage, shared};
use crate::table::FatTable;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Signature following the file count
pub const SIGNATURE: &[u8; 9] = b"GLIB FILE";
/// Length of the fixed header
pub const HEADER_LEN: u64 = 28;
/// Length of one table row
pub const ROW_LEN: u64 = 28;
/// Width of the filename field
pub const NAME_FIELD_LEN: usize = 22;
/// Longest filename, leaving room for the terminator
pub const MAX_NAME_LEN: usize = NAME_FIELD_LEN - 1;
/// Largest file the 16-bit size field can describe
pub const MAX_FILE_SIZE: u64 = u16::MAX as u64;

const SIZE_FIELD: u64 = 4 + NAME_FIELD_LEN as u64;

fn row_offset(index: usize) -> u64 {
    HEADER_LEN + index as u64 * ROW_LEN
}

/// A table row that has been added or deleted but whose neighbours still
/// carry their old indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingRow {
    Inserted(usize),
    Removed(usize),
}

/// Table hooks for Galactix GLB archives
#[derive(Debug, Default)]
pub struct GalactixAdapter {
    pending: Option<PendingRow>,
}

impl GalactixAdapter {
    /// Physical row of `index` while a row change is in flight
    ///
    /// `None` for the row being deleted.
    fn row_for(&self, index: usize) -> Option<u64> {
        let index = match self.pending {
            Some(PendingRow::Inserted(at)) if index >= at => index + 1,
            Some(PendingRow::Removed(at)) if index == at => return None,
            Some(PendingRow::Removed(at)) if index > at => index - 1,
            _ => index,
        };
        Some(row_offset(index))
    }

    fn write_count(storage: &mut dyn ByteStorage, count: usize) -> Result<()> {
        let count = u32::try_from(count)
            .map_err(|_| Error::capacity(format!("{count} files do not fit a GLB table")))?;
        storage.seek(SeekFrom::Start(0))?;
        storage.write_u32::<LittleEndian>(count)?;
        Ok(())
    }

    /// Shift every file for a table row change, with `pending` in effect
    fn shift_for_row(
        &mut self,
        table: &mut FatTable<()>,
        pending: PendingRow,
        row: u64,
        delta: i64,
    ) -> Result<()> {
        self.pending = Some(pending);
        let result = table.shift_files(self, None, row, delta, 0);
        self.pending = None;
        result
    }
}

fn offset_field(offset: u64) -> Result<u32> {
    u32::try_from(offset)
        .map_err(|_| Error::capacity(format!("offset {offset} is beyond the 4 GiB GLB limit")))
}

fn size_field(size: u64) -> Result<u16> {
    u16::try_from(size).map_err(|_| {
        Error::capacity(format!(
            "{size} bytes is too large, GLB files hold at most {MAX_FILE_SIZE}"
        ))
    })
}

impl FatAdapter for GalactixAdapter {
    type Extra = ();

    fn max_name_len(&self) -> Option<usize> {
        Some(MAX_NAME_LEN)
    }

    fn validate_size(&self, _entry: &FatEntry, stored_size: u64, _real_size: u64) -> Result<()> {
        size_field(stored_size).map(drop)
    }

    fn update_file_offset(
        &mut self,
        storage: &mut dyn ByteStorage,
        entry: &FatEntry,
        _delta: i64,
    ) -> Result<()> {
        let Some(row) = self.row_for(entry.index) else {
            return Ok(());
        };
        storage.seek(SeekFrom::Start(row))?;
        storage.write_u32::<LittleEndian>(offset_field(entry.offset)?)?;
        Ok(())
    }

    fn update_file_size(
        &mut self,
        storage: &mut dyn ByteStorage,
        entry: &FatEntry,
        _delta: i64,
    ) -> Result<()> {
        storage.seek(SeekFrom::Start(row_offset(entry.index) + SIZE_FIELD))?;
        storage.write_u16::<LittleEndian>(size_field(entry.stored_size)?)?;
        Ok(())
    }

    fn update_file_name(
        &mut self,
        storage: &mut dyn ByteStorage,
        entry: &FatEntry,
        new_name: &str,
    ) -> Result<()> {
        storage.seek(SeekFrom::Start(row_offset(entry.index) + 4))?;
        write_name(storage, new_name, NAME_FIELD_LEN)?;
        Ok(())
    }

    fn pre_insert_file(
        &mut self,
        table: &mut FatTable<()>,
        _before: Option<&EntryRef>,
        mut entry: FatEntry,
    ) -> Result<FatEntry> {
        let size = size_field(entry.stored_size)?;
        let offset = offset_field(entry.offset + ROW_LEN)?;
        let count = table.len() + 1;
        let row = row_offset(entry.index);

        {
            let mut storage = table.storage();
            storage.seek(SeekFrom::Start(row))?;
            storage.insert_bytes(ROW_LEN)?;
            Self::write_count(&mut **storage, count)?;
        }
        self.shift_for_row(table, PendingRow::Inserted(entry.index), row, ROW_LEN as i64)?;
        entry.offset += ROW_LEN;

        // Written last so no shifted neighbour lands on it
        let mut storage = table.storage();
        storage.seek(SeekFrom::Start(row))?;
        storage.write_u32::<LittleEndian>(offset)?;
        write_name(&mut **storage, &entry.name, NAME_FIELD_LEN)?;
        storage.write_u16::<LittleEndian>(size)?;
        Ok(entry)
    }

    fn pre_remove_file(&mut self, table: &mut FatTable<()>, entry: &EntryRef) -> Result<()> {
        let index = entry.index();
        let row = row_offset(index);
        let count = table.len() - 1;
        {
            let mut storage = table.storage();
            storage.seek(SeekFrom::Start(row))?;
            storage.remove_bytes(ROW_LEN)?;
            Self::write_count(&mut **storage, count)?;
        }
        self.shift_for_row(table, PendingRow::Removed(index), row, -(ROW_LEN as i64))
    }
}

fn read_header<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<(u32, bool)> {
    let count = reader.read_u32::<LittleEndian>()?;
    let mut sig = [0u8; NAME_FIELD_LEN];
    reader.read_exact(&mut sig)?;
    reader.read_u16::<LittleEndian>()?;
    Ok((count, sig.starts_with(SIGNATURE)))
}

/// Check whether `reader` holds a Galactix GLB archive
pub fn detect<R: Read + Seek>(reader: &mut R) -> Result<Certainty> {
    let len = reader.seek(SeekFrom::End(0))?;
    if len < HEADER_LEN {
        return Ok(Certainty::DefinitelyNo);
    }
    reader.seek(SeekFrom::Start(0))?;
    let (count, signed) = read_header(reader)?;
    if !signed || row_offset(count as usize) > len {
        return Ok(Certainty::DefinitelyNo);
    }
    Ok(Certainty::DefinitelyYes)
}

/// Open a Galactix GLB archive held in `storage`
pub fn open(storage: SharedStorage) -> Result<FatArchive<GalactixAdapter>> {
    let mut archive = FatArchive::new(storage, GalactixAdapter::default(), HEADER_LEN);
    let mut rows = Vec::new();
    let len = {
        let mut s = archive.table().storage();
        let len = s.len();
        if len < HEADER_LEN {
            return Err(Error::corrupted_table("file too short for a GLB header"));
        }
        s.seek(SeekFrom::Start(0))?;
        let (count, signed) = read_header(&mut **s)?;
        if !signed {
            return Err(Error::corrupted_table("missing GLIB FILE signature"));
        }
        if row_offset(count as usize) > len {
            return Err(Error::corrupted_table(format!(
                "table of {count} files runs past the end of the archive"
            )));
        }
        for _ in 0..count {
            let offset = u64::from(s.read_u32::<LittleEndian>()?);
            let name = read_name(&mut **s, NAME_FIELD_LEN)?;
            let size = u64::from(s.read_u16::<LittleEndian>()?);
            rows.push((offset, name, size));
        }
        len
    };

    for (index, (offset, name, size)) in rows.iter().enumerate() {
        if offset + size > len {
            return Err(Error::corrupted_table(format!(
                "{name} ends at {} but the archive is {len} bytes",
                offset + size
            )));
        }
        archive
            .table_mut()
            .push_entry(parsed_entry(index, *offset, *size, name));
    }
    log::debug!("Opened GLB archive with {} files", rows.len());
    Ok(archive)
}

/// Write an empty GLB header into empty `storage` and open it
pub fn create(storage: SharedStorage) -> Result<FatArchive<GalactixAdapter>> {
    {
        let mut s = storage.lock();
        s.seek(SeekFrom::Start(0))?;
        s.write_u32::<LittleEndian>(0)?;
        write_name(&mut **s, "GLIB FILE", NAME_FIELD_LEN)?;
        s.write_u16::<LittleEndian>(0)?;
    }
    open(storage)
}

/// Open a GLB file on disk, committing back to it on flush
pub fn open_path<P: AsRef<Path>>(path: P) -> Result<FatArchive<GalactixAdapter>> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    let storage = BufferedStorage::new(file)?;
    let truncate = storage.truncate_callback()?;
    Ok(open(shared(storage))?.with_truncate_callback(truncate))
}
