//! Format adapter interface
//!
//! Each concrete table layout implements [`FatAdapter`]. The engine decides
//! where bytes go and keeps entries and open streams consistent; the adapter
//! only keeps its on-disk table in step with what the engine did.

use crate::entry::{EntryRef, FatEntry};
use crate::error::{Error, Result};
use crate::storage::ByteStorage;
use crate::table::FatTable;
use std::fmt;

/// Hooks a concrete table layout provides to the allocation engine
///
/// # Hook contract
///
/// - `update_*` hooks receive an entry that already carries the new value.
///   The delta is supplied for context only and must not be applied again.
/// - [`pre_insert_file`](Self::pre_insert_file) writes the new table row and
///   returns the entry of record. If the table grows, the adapter shifts
///   existing files itself with [`FatTable::shift_files`], and adjusts the
///   new entry's `offset` by the same amount since it is not yet in the
///   table. Formats with inline headers insert and shift for the header too,
///   so that on return the entry's data region starts at
///   `offset + header_len`. It must validate before touching anything so a
///   failure leaves the archive unchanged.
/// - [`pre_remove_file`](Self::pre_remove_file) deletes the table row and
///   accounts for the table shrinking. The entry is still valid and still
///   listed while it runs.
///
/// Entry guards must not be held across a call to
/// [`FatTable::shift_files`], which needs write access to move entries.
pub trait FatAdapter: Send {
    /// Format specific payload carried by every entry
    type Extra: Default + Clone + fmt::Debug + Send + Sync + 'static;

    /// Longest filename the table can hold, `None` when unlimited
    fn max_name_len(&self) -> Option<usize> {
        None
    }

    /// Reject names the table cannot store
    fn validate_name(&self, name: &str) -> Result<()> {
        if let Some(max) = self.max_name_len() {
            if name.len() > max {
                return Err(Error::name_rejected(
                    name,
                    format!("longer than {max} characters"),
                ));
            }
        }
        if name.contains('\0') {
            return Err(Error::name_rejected(name, "contains a NUL byte"));
        }
        Ok(())
    }

    /// Reject sizes the table cannot store
    ///
    /// Called by insert and resize before anything is written.
    fn validate_size(
        &self,
        _entry: &FatEntry<Self::Extra>,
        _stored_size: u64,
        _real_size: u64,
    ) -> Result<()> {
        Ok(())
    }

    /// Persist an entry's new offset
    fn update_file_offset(
        &mut self,
        storage: &mut dyn ByteStorage,
        entry: &FatEntry<Self::Extra>,
        delta: i64,
    ) -> Result<()>;

    /// Persist an entry's new stored and real sizes
    fn update_file_size(
        &mut self,
        storage: &mut dyn ByteStorage,
        entry: &FatEntry<Self::Extra>,
        delta: i64,
    ) -> Result<()>;

    /// Persist a rename, the entry still carries the old name
    fn update_file_name(
        &mut self,
        storage: &mut dyn ByteStorage,
        entry: &FatEntry<Self::Extra>,
        new_name: &str,
    ) -> Result<()>;

    /// Write the table row for a new entry and return the entry of record
    fn pre_insert_file(
        &mut self,
        table: &mut FatTable<Self::Extra>,
        before: Option<&EntryRef<Self::Extra>>,
        entry: FatEntry<Self::Extra>,
    ) -> Result<FatEntry<Self::Extra>>;

    /// Follow-up once the new file's data space exists
    fn post_insert_file(
        &mut self,
        _table: &mut FatTable<Self::Extra>,
        _entry: &EntryRef<Self::Extra>,
    ) -> Result<()> {
        Ok(())
    }

    /// Delete the table row for an entry about to be removed
    fn pre_remove_file(
        &mut self,
        table: &mut FatTable<Self::Extra>,
        entry: &EntryRef<Self::Extra>,
    ) -> Result<()>;

    /// Follow-up once the entry's data is gone, the entry is already invalid
    fn post_remove_file(
        &mut self,
        _table: &mut FatTable<Self::Extra>,
        _entry: &EntryRef<Self::Extra>,
    ) -> Result<()> {
        Ok(())
    }

    /// Allocate a blank entry
    fn create_new_entry(&self) -> FatEntry<Self::Extra> {
        FatEntry::default()
    }
}
