//! Registry of open sub-file windows
//!
//! Every stream handed out by an archive is a window onto the container.
//! When other files are inserted, removed or resized the window has to move
//! with its entry, so the archive keeps a weak reference to each one here.
//! Dropping the stream is enough to close it; stale records are pruned the
//! next time the registry is walked.

use crate::entry::EntryRef;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

/// Byte range of the container visible through one open stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Absolute offset of the first visible byte
    pub start: u64,
    /// Number of visible bytes
    pub len: u64,
}

/// Window shared between a stream and the registry
pub(crate) type SharedWindow = Arc<Mutex<Window>>;

/// Weakly held windows keyed by the entry they belong to
pub struct OpenFileRegistry<X> {
    open: Vec<(EntryRef<X>, Weak<Mutex<Window>>)>,
}

impl<X> Default for OpenFileRegistry<X> {
    fn default() -> Self {
        Self { open: Vec::new() }
    }
}

impl<X> OpenFileRegistry<X> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a window derived from `entry`
    ///
    /// The same entry may be registered any number of times.
    pub(crate) fn register(&mut self, entry: &EntryRef<X>, window: &SharedWindow) {
        self.open.push((entry.clone(), Arc::downgrade(window)));
    }

    /// Apply `f` to every window whose stream is still open and whose entry
    /// is still valid
    ///
    /// Records for dropped streams or removed entries are discarded.
    pub fn for_each_live<F>(&mut self, mut f: F)
    where
        F: FnMut(&EntryRef<X>, &mut Window),
    {
        let before = self.open.len();
        self.open.retain(|(entry, weak)| {
            if !entry.is_valid() {
                return false;
            }
            match weak.upgrade() {
                Some(window) => {
                    f(entry, &mut window.lock());
                    true
                }
                None => false,
            }
        });
        let pruned = before - self.open.len();
        if pruned > 0 {
            log::trace!("Pruned {pruned} closed stream(s) from the registry");
        }
    }

    /// Move every open window on `entry` by `delta` bytes
    pub fn relocate(&mut self, entry: &EntryRef<X>, delta: i64) {
        self.relocate_matching(delta, |owner| owner.ptr_eq(entry));
    }

    /// Move every open window on any of `entries` by `delta` bytes
    ///
    /// Walks the registry once however many entries moved.
    pub fn relocate_all(&mut self, entries: &HashSet<EntryRef<X>>, delta: i64) {
        if !entries.is_empty() {
            self.relocate_matching(delta, |owner| entries.contains(owner));
        }
    }

    fn relocate_matching<P>(&mut self, delta: i64, is_moved: P)
    where
        P: Fn(&EntryRef<X>) -> bool,
    {
        self.for_each_live(|owner, window| {
            if is_moved(owner) {
                window.start = window.start.saturating_add_signed(delta);
            }
        });
    }

    /// Set the length of every open window on `entry`
    pub fn resize(&mut self, entry: &EntryRef<X>, new_len: u64) {
        self.for_each_live(|owner, window| {
            if owner.ptr_eq(entry) {
                window.len = new_len;
            }
        });
    }

    /// Number of records currently held, including ones not yet pruned
    pub fn len(&self) -> usize {
        self.open.len()
    }

    /// Whether the registry holds no records
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

impl<X> fmt::Debug for OpenFileRegistry<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenFileRegistry")
            .field("records", &self.open.len())
            .finish()
    }
}
