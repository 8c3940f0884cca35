//! Entry model for packed sub-files
//!
//! A [`FatEntry`] describes one sub-file: where its header and data start in
//! the container, how many bytes it occupies there, and how large it is once
//! any transform has been undone. Entries are shared through [`EntryRef`] so
//! that the archive, its adapter and every open stream observe the same
//! record as files around it move.

use bitflags::bitflags;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// File type reported for files whose content type is unknown
pub const FILETYPE_GENERIC: &str = "unknown/generic";

bitflags! {
    /// Attribute flags attached to an entry
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EntryAttributes: u32 {
        /// Slot is allocated in the table but holds no file
        const VACANT     = 0x0001;
        /// File is hidden from normal listings
        const HIDDEN     = 0x0002;
        /// Stored data passes through a compression transform
        const COMPRESSED = 0x0004;
        /// Stored data passes through an encryption transform
        const ENCRYPTED  = 0x0008;
        /// Entry is a folder holding another archive
        const FOLDER     = 0x0080;
    }
}

impl EntryAttributes {
    /// Whether the stored bytes differ from the logical bytes
    pub fn is_transformed(self) -> bool {
        self.intersects(Self::COMPRESSED | Self::ENCRYPTED)
    }
}

/// One packed sub-file
///
/// `X` is the adapter-owned payload for format specific fields. The engine
/// never looks inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FatEntry<X = ()> {
    /// Position of the entry in the on-disk table (0-based, dense)
    pub index: usize,
    /// Absolute offset of the entry's header and data in the container
    pub offset: u64,
    /// Bytes of inline per-entry metadata stored before the data
    pub header_len: u64,
    /// Bytes the data occupies in the container
    pub stored_size: u64,
    /// Logical size after any transform is undone
    pub real_size: u64,
    /// Filename
    pub name: String,
    /// MIME-like content type, [`FILETYPE_GENERIC`] when unknown
    pub file_type: String,
    /// Attribute flags
    pub attributes: EntryAttributes,
    /// Whether the entry is live in the archive
    pub valid: bool,
    /// Format specific payload
    pub extra: X,
}

impl<X> FatEntry<X> {
    /// Offset of the first data byte, after the inline header
    pub fn data_offset(&self) -> u64 {
        self.offset + self.header_len
    }

    /// Offset one past the last data byte
    pub fn end_offset(&self) -> u64 {
        self.offset + self.header_len + self.stored_size
    }

    /// Whether the entry is flagged as a folder
    pub fn is_folder(&self) -> bool {
        self.attributes.contains(EntryAttributes::FOLDER)
    }
}

impl<X> fmt::Display for FatEntry<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name={};type={};attr={:#06x};fatindex={};offset={};header={};stored={};real={}",
            self.name,
            self.file_type,
            self.attributes.bits(),
            self.index,
            self.offset,
            self.header_len,
            self.stored_size,
            self.real_size
        )
    }
}

/// Shared reference to an entry
///
/// Equality and hashing use identity, not field values, so two distinct
/// entries with identical fields are still different keys.
pub struct EntryRef<X = ()>(Arc<RwLock<FatEntry<X>>>);

impl<X> EntryRef<X> {
    pub(crate) fn new(entry: FatEntry<X>) -> Self {
        Self(Arc::new(RwLock::new(entry)))
    }

    /// Lock the entry for reading
    ///
    /// Do not hold the guard across a call back into the archive; the engine
    /// needs write access to move entries around.
    pub fn read(&self) -> RwLockReadGuard<'_, FatEntry<X>> {
        self.0.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, FatEntry<X>> {
        self.0.write()
    }

    /// Whether the entry is still live in its archive
    pub fn is_valid(&self) -> bool {
        self.0.read().valid
    }

    /// Current table index
    pub fn index(&self) -> usize {
        self.0.read().index
    }

    /// Current offset of the entry's header
    pub fn offset(&self) -> u64 {
        self.0.read().offset
    }

    /// Current stored size
    pub fn stored_size(&self) -> u64 {
        self.0.read().stored_size
    }

    /// Current real size
    pub fn real_size(&self) -> u64 {
        self.0.read().real_size
    }

    /// Current filename
    pub fn name(&self) -> String {
        self.0.read().name.clone()
    }

    /// Current attributes
    pub fn attributes(&self) -> EntryAttributes {
        self.0.read().attributes
    }

    /// Whether `self` and `other` are the same entry
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<X: Clone> EntryRef<X> {
    /// Copy of the entry's current fields
    pub fn snapshot(&self) -> FatEntry<X> {
        self.0.read().clone()
    }
}

impl<X> Clone for EntryRef<X> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<X> PartialEq for EntryRef<X> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<X> Eq for EntryRef<X> {}

impl<X> Hash for EntryRef<X> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl<X: fmt::Debug> fmt::Debug for EntryRef<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntryRef").field(&*self.0.read()).finish()
    }
}
