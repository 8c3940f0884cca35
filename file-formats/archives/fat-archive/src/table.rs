//! In-memory allocation table and the shift engine
//!
//! [`FatTable`] owns the container storage, the list of entries and the
//! registry of open streams. It is also what adapter hooks receive, so an
//! adapter whose table grows or shrinks can move every file behind it with
//! [`FatTable::shift_files`].

use crate::adapter::FatAdapter;
use crate::entry::{EntryRef, FatEntry};
use crate::error::{Error, Result};
use crate::registry::OpenFileRegistry;
use crate::storage::{ByteStorage, SharedStorage};
use parking_lot::MutexGuard;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Entries, storage and open streams of one archive
pub struct FatTable<X> {
    storage: SharedStorage,
    entries: Vec<EntryRef<X>>,
    open_files: OpenFileRegistry<X>,
    first_file_offset: u64,
}

impl<X> FatTable<X> {
    /// Create an empty table over `storage`
    ///
    /// `first_file_offset` is where the first file goes when the archive
    /// holds none.
    pub fn new(storage: SharedStorage, first_file_offset: u64) -> Self {
        Self {
            storage,
            entries: Vec::new(),
            open_files: OpenFileRegistry::new(),
            first_file_offset,
        }
    }

    /// Lock the container storage
    pub fn storage(&self) -> MutexGuard<'_, Box<dyn ByteStorage>> {
        self.storage.lock()
    }

    /// The shared storage handle
    pub fn shared_storage(&self) -> &SharedStorage {
        &self.storage
    }

    /// Entries in the order they were added to memory
    ///
    /// This is not necessarily table order; sort by `index` for that.
    pub fn entries(&self) -> &[EntryRef<X>] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<EntryRef<X>> {
        &mut self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Where the first file goes in an empty archive
    pub fn first_file_offset(&self) -> u64 {
        self.first_file_offset
    }

    /// Registry of open streams
    pub fn open_files(&self) -> &OpenFileRegistry<X> {
        &self.open_files
    }

    pub(crate) fn open_files_mut(&mut self) -> &mut OpenFileRegistry<X> {
        &mut self.open_files
    }

    /// Add an entry read from an existing table
    ///
    /// Used by formats while parsing; the entry is marked valid.
    pub fn push_entry(&mut self, mut entry: FatEntry<X>) -> EntryRef<X> {
        entry.valid = true;
        let entry = EntryRef::new(entry);
        self.entries.push(entry.clone());
        entry
    }

    /// Find the entry at a given table index
    pub fn file_at(&self, index: usize) -> Option<EntryRef<X>> {
        self.entries
            .iter()
            .find(|e| {
                let e = e.read();
                e.valid && e.index == index
            })
            .cloned()
    }

    /// The valid entry with the highest table index
    pub fn last_entry(&self) -> Option<EntryRef<X>> {
        self.entries
            .iter()
            .filter(|e| e.is_valid())
            .max_by_key(|e| e.index())
            .cloned()
    }

    /// Position of `entry` in the in-memory list
    pub(crate) fn position_of(&self, entry: &EntryRef<X>) -> Option<usize> {
        self.entries.iter().position(|e| e.ptr_eq(entry))
    }

    /// Shift every file starting at or after `from` by `delta` bytes and
    /// `delta_index` table slots
    ///
    /// `skip` is the entry that caused the shift. It is never moved itself,
    /// and zero-length entries sharing its offset but preceding it in table
    /// order stay put too. An invalid `skip` disables both exclusions, which
    /// is how adapters shift during an insert before the new entry exists.
    ///
    /// The adapter is told about each moved entry so it can rewrite the
    /// on-disk offset, then every open stream on a moved entry is relocated.
    pub fn shift_files<A>(
        &mut self,
        adapter: &mut A,
        skip: Option<&EntryRef<X>>,
        from: u64,
        delta: i64,
        delta_index: isize,
    ) -> Result<()>
    where
        A: FatAdapter<Extra = X> + ?Sized,
    {
        let skip = skip.and_then(|s| {
            let e = s.read();
            e.valid.then(|| SkipPoint {
                entry: s.clone(),
                offset: e.offset,
                index: e.index,
            })
        });

        let mut moved = HashSet::new();
        {
            let mut storage = self.storage.lock();
            for entry in &self.entries {
                if skip.as_ref().is_some_and(|s| s.entry.ptr_eq(entry)) {
                    continue;
                }
                let mut e = entry.write();
                if !in_range(&e, from, skip.as_ref()) {
                    continue;
                }

                e.offset = e.offset.checked_add_signed(delta).ok_or_else(|| {
                    Error::corrupted_table(format!(
                        "shifting {} by {delta} moves it outside the container",
                        e.name
                    ))
                })?;
                e.index = e.index.checked_add_signed(delta_index).ok_or_else(|| {
                    Error::corrupted_table(format!(
                        "shifting {} by {delta_index} slots gives a negative index",
                        e.name
                    ))
                })?;

                adapter.update_file_offset(&mut **storage, &e, delta)?;
                moved.insert(entry.clone());
            }
        }

        log::trace!(
            "Shifted {} file(s) at or after {from} by {delta} bytes, {delta_index} slots",
            moved.len()
        );

        self.open_files.relocate_all(&moved, delta);
        Ok(())
    }
}

struct SkipPoint<X> {
    entry: EntryRef<X>,
    offset: u64,
    index: usize,
}

/// Should `entry` move when shifting from `from`?
fn in_range<X>(entry: &FatEntry<X>, from: u64, skip: Option<&SkipPoint<X>>) -> bool {
    if !entry.valid || entry.offset < from {
        return false;
    }
    if let Some(skip) = skip {
        // A zero-length file at the same spot but earlier in the table
        // logically sits before the insertion point
        if entry.stored_size == 0 && entry.offset == skip.offset && entry.index < skip.index {
            return false;
        }
    }
    true
}

impl<X> fmt::Debug for FatTable<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FatTable")
            .field("entries", &self.entries.len())
            .field("open_files", &self.open_files)
            .field("first_file_offset", &self.first_file_offset)
            .field("storage_len", &self.storage.lock().len())
            .finish()
    }
}
