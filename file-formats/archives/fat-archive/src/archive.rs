//! Allocation operations on a FAT-style archive
//!
//! [`FatArchive`] combines a [`FatTable`] with the [`FatAdapter`] for its
//! layout. Every public operation here decides where bytes go, edits the
//! storage, moves the entries and open streams behind the change, and calls
//! the adapter hooks so the on-disk table stays in step.

use crate::adapter::FatAdapter;
use crate::entry::{EntryAttributes, EntryRef, FILETYPE_GENERIC, FatEntry};
use crate::error::{Error, Result};
use crate::registry::Window;
use crate::storage::{SharedStorage, TruncateFn};
use crate::substream::SubStream;
use crate::table::FatTable;
use parking_lot::Mutex;
use std::fmt;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;

/// Options for inserting a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOptions {
    /// MIME-like type, `unknown/generic` unless told otherwise
    pub file_type: String,
    /// Attribute flags for the new entry
    pub attributes: EntryAttributes,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            file_type: FILETYPE_GENERIC.to_string(),
            attributes: EntryAttributes::empty(),
        }
    }
}

impl InsertOptions {
    /// Create new default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file type
    pub fn file_type<S: Into<String>>(mut self, file_type: S) -> Self {
        self.file_type = file_type.into();
        self
    }

    /// Set the attribute flags
    pub fn attributes(mut self, attributes: EntryAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Mark the file as compressed
    pub fn compressed(mut self) -> Self {
        self.attributes |= EntryAttributes::COMPRESSED;
        self
    }
}

/// A FAT-style archive over shared storage
pub struct FatArchive<A: FatAdapter> {
    table: FatTable<A::Extra>,
    adapter: A,
    truncate: Option<TruncateFn>,
}

impl<A: FatAdapter> FatArchive<A> {
    /// Create an archive with no entries loaded
    ///
    /// Formats populate the table through [`table_mut`](Self::table_mut)
    /// while parsing.
    pub fn new(storage: SharedStorage, adapter: A, first_file_offset: u64) -> Self {
        Self {
            table: FatTable::new(storage, first_file_offset),
            adapter,
            truncate: None,
        }
    }

    /// Set the callback used to resize the backing store on flush
    pub fn with_truncate_callback(mut self, truncate: TruncateFn) -> Self {
        self.truncate = Some(truncate);
        self
    }

    /// Replace the truncate callback
    pub fn set_truncate_callback(&mut self, truncate: TruncateFn) {
        self.truncate = Some(truncate);
    }

    /// The allocation table
    pub fn table(&self) -> &FatTable<A::Extra> {
        &self.table
    }

    /// Mutable access to the allocation table
    pub fn table_mut(&mut self) -> &mut FatTable<A::Extra> {
        &mut self.table
    }

    /// The format adapter
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Mutable access to the format adapter
    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// All files in table order
    pub fn files(&self) -> Vec<EntryRef<A::Extra>> {
        let mut files: Vec<_> = self
            .table
            .entries()
            .iter()
            .filter(|e| e.is_valid())
            .cloned()
            .collect();
        files.sort_by_key(|e| e.index());
        files
    }

    /// The file at a table index
    pub fn file_at(&self, index: usize) -> Option<EntryRef<A::Extra>> {
        self.table.file_at(index)
    }

    /// Find a file by name, ignoring ASCII case
    ///
    /// With duplicate names the one earliest in the table wins.
    pub fn find(&self, name: &str) -> Option<EntryRef<A::Extra>> {
        self.files()
            .into_iter()
            .find(|e| e.read().name.eq_ignore_ascii_case(name))
    }

    /// Whether `entry` is a live file of this archive
    pub fn is_valid(&self, entry: &EntryRef<A::Extra>) -> bool {
        entry.is_valid() && self.table.position_of(entry).is_some()
    }

    fn check_valid(&self, entry: &EntryRef<A::Extra>) -> Result<()> {
        if self.is_valid(entry) {
            Ok(())
        } else {
            Err(Error::invalid_handle(format!(
                "{} is not a file in this archive",
                entry.name()
            )))
        }
    }

    /// Open a stream over a file's data
    ///
    /// The stream follows the file when other files move it, and sees the
    /// new length after [`resize`](Self::resize).
    pub fn open(&mut self, entry: &EntryRef<A::Extra>) -> Result<SubStream<A::Extra>> {
        self.check_valid(entry)?;
        let (start, len) = {
            let e = entry.read();
            (e.data_offset(), e.stored_size)
        };
        let window = Arc::new(Mutex::new(Window { start, len }));
        self.table.open_files_mut().register(entry, &window);
        log::trace!("Opened {} at {start} ({len} bytes)", entry.name());
        Ok(SubStream::new(
            Arc::clone(self.table.shared_storage()),
            entry.clone(),
            window,
        ))
    }

    /// Read a file's stored bytes
    pub fn read_file(&self, entry: &EntryRef<A::Extra>) -> Result<Vec<u8>> {
        self.check_valid(entry)?;
        let (start, len) = {
            let e = entry.read();
            (e.data_offset(), e.stored_size)
        };
        let len = usize::try_from(len)
            .map_err(|_| Error::capacity(format!("{len} bytes do not fit in memory")))?;
        let mut data = vec![0u8; len];
        let mut storage = self.table.storage();
        storage.seek(SeekFrom::Start(start))?;
        storage.read_exact(&mut data)?;
        Ok(data)
    }

    /// Insert a new zero-filled file
    ///
    /// The file goes in front of `before` when that is a valid entry,
    /// otherwise after the last file. Write its content through
    /// [`open`](Self::open).
    pub fn insert(
        &mut self,
        before: Option<&EntryRef<A::Extra>>,
        name: &str,
        stored_size: u64,
        file_type: &str,
        attributes: EntryAttributes,
    ) -> Result<EntryRef<A::Extra>> {
        self.adapter.validate_name(name)?;
        let delta = signed(stored_size)?;
        let before = before.filter(|b| self.is_valid(b));

        let mut entry = self.adapter.create_new_entry();
        entry.name = name.to_string();
        entry.stored_size = stored_size;
        entry.real_size = stored_size;
        entry.file_type = file_type.to_string();
        entry.attributes = attributes;
        entry.header_len = 0;
        entry.valid = false;

        match before {
            Some(b) => {
                let b = b.read();
                entry.offset = b.offset;
                entry.index = b.index;
            }
            None => match self.table.last_entry() {
                Some(last) => {
                    let last = last.read();
                    entry.offset = last.end_offset();
                    entry.index = last.index + 1;
                }
                None => {
                    entry.offset = self.table.first_file_offset();
                    entry.index = 0;
                }
            },
        }
        self.adapter.validate_size(&entry, stored_size, stored_size)?;

        // The adapter writes the table, so every check has to come first
        let Self { table, adapter, .. } = self;
        let mut entry = adapter.pre_insert_file(table, before, entry)?;
        entry.valid = true;

        let data_offset = entry.data_offset();
        let size = stored_size;
        let entry = EntryRef::new(entry);

        match before {
            Some(b) => {
                table.shift_files(adapter, Some(&entry), data_offset, delta, 1)?;
                let pos = table.position_of(b).ok_or_else(|| {
                    Error::corrupted_table(format!("{} vanished during insert", b.name()))
                })?;
                table.entries_mut().insert(pos, entry.clone());
            }
            None => table.entries_mut().push(entry.clone()),
        }

        {
            let mut storage = table.storage();
            storage.seek(SeekFrom::Start(data_offset))?;
            storage.insert_bytes(size)?;
        }

        adapter.post_insert_file(table, &entry)?;
        log::debug!("Inserted {name} at {data_offset} ({size} bytes)");
        Ok(entry)
    }

    /// Insert a new file with options
    pub fn insert_with(
        &mut self,
        before: Option<&EntryRef<A::Extra>>,
        name: &str,
        stored_size: u64,
        options: &InsertOptions,
    ) -> Result<EntryRef<A::Extra>> {
        self.insert(
            before,
            name,
            stored_size,
            &options.file_type,
            options.attributes,
        )
    }

    /// Remove a file and its data
    ///
    /// Open streams on the file fail from then on.
    pub fn remove(&mut self, entry: &EntryRef<A::Extra>) -> Result<()> {
        self.check_valid(entry)?;
        let span = {
            let e = entry.read();
            e.header_len + e.stored_size
        };
        let delta = -signed(span)?;

        let Self { table, adapter, .. } = self;
        adapter.pre_remove_file(table, entry)?;

        let pos = table.position_of(entry).ok_or_else(|| {
            Error::corrupted_table(format!("{} vanished during remove", entry.name()))
        })?;
        table.entries_mut().remove(pos);

        // Read after the hook, which may have moved the file
        let offset = entry.offset();
        table.shift_files(adapter, Some(entry), offset, delta, -1)?;

        {
            let mut storage = table.storage();
            storage.seek(SeekFrom::Start(offset))?;
            storage.remove_bytes(span)?;
        }
        entry.write().valid = false;

        adapter.post_remove_file(table, entry)?;
        log::debug!("Removed {} ({span} bytes at {offset})", entry.name());
        Ok(())
    }

    /// Change a file's stored and real sizes
    ///
    /// Growing appends zero bytes to the file's data, shrinking drops bytes
    /// off its end. Files behind it move accordingly and open streams on it
    /// see the new length.
    pub fn resize(
        &mut self,
        entry: &EntryRef<A::Extra>,
        new_stored_size: u64,
        new_real_size: u64,
    ) -> Result<()> {
        self.check_valid(entry)?;
        let (data_offset, old_stored, old_real) = {
            let e = entry.read();
            (e.data_offset(), e.stored_size, e.real_size)
        };
        if new_stored_size == old_stored && new_real_size == old_real {
            return Ok(());
        }
        self.adapter
            .validate_size(&entry.read(), new_stored_size, new_real_size)?;

        let Self { table, adapter, .. } = self;
        let delta = signed(new_stored_size)? - signed(old_stored)?;
        let start = if delta > 0 {
            data_offset + old_stored
        } else {
            data_offset + new_stored_size
        };

        if delta != 0 {
            let mut storage = table.storage();
            storage.seek(SeekFrom::Start(start))?;
            if delta > 0 {
                storage.insert_bytes(delta.unsigned_abs())?;
            } else {
                storage.remove_bytes(delta.unsigned_abs())?;
            }
        }

        {
            let mut e = entry.write();
            e.stored_size = new_stored_size;
            e.real_size = new_real_size;
        }
        {
            let mut storage = table.storage();
            adapter.update_file_size(&mut **storage, &entry.read(), delta)?;
        }

        if delta != 0 {
            table.shift_files(adapter, Some(entry), start, delta, 0)?;
            table.open_files_mut().resize(entry, new_stored_size);
        }
        log::debug!(
            "Resized {} from {old_stored} to {new_stored_size} bytes (real {new_real_size})",
            entry.name()
        );
        Ok(())
    }

    /// Rename a file
    pub fn rename(&mut self, entry: &EntryRef<A::Extra>, new_name: &str) -> Result<()> {
        self.check_valid(entry)?;
        self.adapter.validate_name(new_name)?;
        {
            let mut storage = self.table.storage();
            self.adapter
                .update_file_name(&mut **storage, &entry.read(), new_name)?;
        }
        let old = std::mem::replace(&mut entry.write().name, new_name.to_string());
        log::debug!("Renamed {old} to {new_name}");
        Ok(())
    }

    /// Move a file in front of `before`, or to the end
    ///
    /// Returns the entry of the file at its new position; `entry` is
    /// invalid afterwards.
    pub fn move_entry(
        &mut self,
        before: Option<&EntryRef<A::Extra>>,
        entry: &EntryRef<A::Extra>,
    ) -> Result<EntryRef<A::Extra>> {
        self.check_valid(entry)?;
        let orig = entry.snapshot();
        let data = self.read_file(entry)?;

        let moved = self.insert(
            before,
            &orig.name,
            orig.stored_size,
            &orig.file_type,
            orig.attributes,
        )?;
        if orig.real_size != orig.stored_size {
            self.resize(&moved, orig.stored_size, orig.real_size)?;
        }
        {
            let mut storage = self.table.storage();
            storage.seek(SeekFrom::Start(moved.read().data_offset()))?;
            storage.write_all(&data)?;
        }
        self.remove(entry)?;
        Ok(moved)
    }

    /// Commit pending edits to the backing store
    pub fn flush(&mut self) -> Result<()> {
        let mut storage = self.table.storage();
        if !storage.is_modified() {
            return Ok(());
        }
        let truncate = self
            .truncate
            .as_mut()
            .ok_or(Error::MissingTruncateCallback)?;
        storage.commit(&mut **truncate)?;
        Ok(())
    }

    /// Find the entry whose data an open stream currently covers
    ///
    /// A stream opened on this archive belongs to the entry it was opened
    /// on. Otherwise the file holding the stream's first byte is returned;
    /// zero-length files hold no bytes and never match.
    pub fn locate_entry_for(&self, stream: &SubStream<A::Extra>) -> Option<EntryRef<A::Extra>> {
        if self.is_valid(stream.entry()) {
            return Some(stream.entry().clone());
        }
        let start = stream.offset().ok()?;
        self.files().into_iter().find(|e| {
            let e = e.read();
            start >= e.data_offset() && start < e.end_offset()
        })
    }
}

fn signed(len: u64) -> Result<i64> {
    i64::try_from(len).map_err(|_| Error::capacity(format!("{len} bytes is too large to shift")))
}

impl<A: FatAdapter + fmt::Debug> fmt::Debug for FatArchive<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FatArchive")
            .field("table", &self.table)
            .field("adapter", &self.adapter)
            .field("has_truncate", &self.truncate.is_some())
            .finish()
    }
}

/// Build an entry as formats do when parsing a table
pub fn parsed_entry<X: Default>(index: usize, offset: u64, size: u64, name: &str) -> FatEntry<X> {
    FatEntry {
        index,
        offset,
        stored_size: size,
        real_size: size,
        name: name.to_string(),
        file_type: FILETYPE_GENERIC.to_string(),
        ..FatEntry::default()
    }
}
