//! Duke Nukem 3D / Build engine `.GRP` archives
//!
//! ```text
//! header  "KenSilverman"           12 bytes
//!         file count               u32
//! row     name, NUL padded         12 bytes
//!         size                     u32
//! data    files back to back in row order
//! ```
//!
//! Offsets are implied by the sizes, so moving a file needs no table
//! update.

use super::{Certainty, read_name, write_name};
use crate::adapter::FatAdapter;
use crate::archive::{FatArchive, parsed_entry};
use crate::entry::{EntryRef, FatEntry};
use crate::error::{Error, Result};
use crate::storage::{BufferedStorage, ByteStorage, SharedStorage, shared};
use crate::table::FatTable;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Signature at the start of every GRP file
pub const SIGNATURE: &[u8; 12] = b"KenSilverman";
/// Length of the fixed header
pub const HEADER_LEN: u64 = 16;
/// Length of one table row
pub const ROW_LEN: u64 = 16;
/// Width of the filename field
pub const NAME_LEN: usize = 12;

const COUNT_OFFSET: u64 = 12;

fn row_offset(index: usize) -> u64 {
    HEADER_LEN + index as u64 * ROW_LEN
}

/// Table hooks for GRP archives
#[derive(Debug, Default)]
pub struct GrpAdapter;

impl GrpAdapter {
    fn write_count(storage: &mut dyn ByteStorage, count: usize) -> Result<()> {
        let count = u32::try_from(count)
            .map_err(|_| Error::capacity(format!("{count} files do not fit a GRP table")))?;
        storage.seek(SeekFrom::Start(COUNT_OFFSET))?;
        storage.write_u32::<LittleEndian>(count)?;
        Ok(())
    }
}

fn size_field(size: u64) -> Result<u32> {
    u32::try_from(size).map_err(|_| Error::capacity(format!("{size} bytes is too large for GRP")))
}

impl FatAdapter for GrpAdapter {
    type Extra = ();

    fn max_name_len(&self) -> Option<usize> {
        Some(NAME_LEN)
    }

    fn validate_size(&self, _entry: &FatEntry, stored_size: u64, _real_size: u64) -> Result<()> {
        size_field(stored_size).map(drop)
    }

    fn update_file_offset(&mut self, _: &mut dyn ByteStorage, _: &FatEntry, _: i64) -> Result<()> {
        Ok(())
    }

    fn update_file_size(
        &mut self,
        storage: &mut dyn ByteStorage,
        entry: &FatEntry,
        _delta: i64,
    ) -> Result<()> {
        storage.seek(SeekFrom::Start(row_offset(entry.index) + NAME_LEN as u64))?;
        storage.write_u32::<LittleEndian>(size_field(entry.stored_size)?)?;
        Ok(())
    }

    fn update_file_name(
        &mut self,
        storage: &mut dyn ByteStorage,
        entry: &FatEntry,
        new_name: &str,
    ) -> Result<()> {
        storage.seek(SeekFrom::Start(row_offset(entry.index)))?;
        write_name(storage, new_name, NAME_LEN)?;
        Ok(())
    }

    fn pre_insert_file(
        &mut self,
        table: &mut FatTable<()>,
        _before: Option<&EntryRef>,
        mut entry: FatEntry,
    ) -> Result<FatEntry> {
        let size = size_field(entry.stored_size)?;
        let count = table.len() + 1;
        let row = row_offset(entry.index);
        {
            let mut storage = table.storage();
            storage.seek(SeekFrom::Start(row))?;
            storage.insert_bytes(ROW_LEN)?;
            write_name(&mut **storage, &entry.name, NAME_LEN)?;
            storage.write_u32::<LittleEndian>(size)?;
            Self::write_count(&mut **storage, count)?;
        }

        // Every file moves back by one row, the new one included
        table.shift_files(self, None, row, ROW_LEN as i64, 0)?;
        entry.offset += ROW_LEN;
        Ok(entry)
    }

    fn pre_remove_file(&mut self, table: &mut FatTable<()>, entry: &EntryRef) -> Result<()> {
        let row = row_offset(entry.index());
        let count = table.len() - 1;
        {
            let mut storage = table.storage();
            storage.seek(SeekFrom::Start(row))?;
            storage.remove_bytes(ROW_LEN)?;
            Self::write_count(&mut **storage, count)?;
        }
        table.shift_files(self, None, row, -(ROW_LEN as i64), 0)?;
        Ok(())
    }
}

/// Check whether `reader` holds a GRP archive
pub fn detect<R: Read + Seek>(reader: &mut R) -> Result<Certainty> {
    let len = reader.seek(SeekFrom::End(0))?;
    if len < HEADER_LEN {
        return Ok(Certainty::DefinitelyNo);
    }
    reader.seek(SeekFrom::Start(0))?;
    let mut sig = [0u8; 12];
    reader.read_exact(&mut sig)?;
    if &sig != SIGNATURE {
        return Ok(Certainty::DefinitelyNo);
    }
    let count = u64::from(reader.read_u32::<LittleEndian>()?);
    if HEADER_LEN + count * ROW_LEN > len {
        return Ok(Certainty::DefinitelyNo);
    }
    Ok(Certainty::DefinitelyYes)
}

/// Open a GRP archive held in `storage`
pub fn open(storage: SharedStorage) -> Result<FatArchive<GrpAdapter>> {
    let mut archive = FatArchive::new(storage, GrpAdapter, HEADER_LEN);
    let mut rows = Vec::new();
    let len = {
        let mut s = archive.table().storage();
        let len = s.len();
        if len < HEADER_LEN {
            return Err(Error::corrupted_table("file too short for a GRP header"));
        }
        s.seek(SeekFrom::Start(0))?;
        let mut sig = [0u8; 12];
        s.read_exact(&mut sig)?;
        if &sig != SIGNATURE {
            return Err(Error::corrupted_table("missing KenSilverman signature"));
        }
        let count = s.read_u32::<LittleEndian>()?;
        if row_offset(count as usize) > len {
            return Err(Error::corrupted_table(format!(
                "table of {count} files runs past the end of the archive"
            )));
        }
        for _ in 0..count {
            let name = read_name(&mut **s, NAME_LEN)?;
            let size = s.read_u32::<LittleEndian>()?;
            rows.push((name, u64::from(size)));
        }
        len
    };

    let mut offset = row_offset(rows.len());
    for (index, (name, size)) in rows.iter().enumerate() {
        if offset + size > len {
            return Err(Error::corrupted_table(format!(
                "{name} ends at {} but the archive is {len} bytes",
                offset + size
            )));
        }
        archive
            .table_mut()
            .push_entry(parsed_entry(index, offset, *size, name));
        offset += size;
    }
    log::debug!("Opened GRP archive with {} files", rows.len());
    Ok(archive)
}

/// Write an empty GRP header into empty `storage` and open it
pub fn create(storage: SharedStorage) -> Result<FatArchive<GrpAdapter>> {
    {
        let mut s = storage.lock();
        s.seek(SeekFrom::Start(0))?;
        s.write_all(SIGNATURE)?;
        s.write_u32::<LittleEndian>(0)?;
    }
    open(storage)
}

/// Open a GRP file on disk, committing back to it on flush
pub fn open_path<P: AsRef<Path>>(path: P) -> Result<FatArchive<GrpAdapter>> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    let storage = BufferedStorage::new(file)?;
    let truncate = storage.truncate_callback()?;
    Ok(open(shared(storage))?.with_truncate_callback(truncate))
}
