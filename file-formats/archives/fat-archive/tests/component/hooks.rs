//! Order and content of adapter hook calls

use crate::common::image;
use crate::common::recording::{Hook, Tag, recording_archive};
use fat_archive::{EntryAttributes, Error, FILETYPE_GENERIC};
use pretty_assertions::assert_eq;

#[test]
fn test_insert_hooks_see_invalid_then_valid_entry() {
    let mut archive = recording_archive(&[("A", b"aaaa")]);
    archive
        .insert(None, "B", 2, FILETYPE_GENERIC, EntryAttributes::empty())
        .unwrap();

    assert_eq!(
        archive.adapter_mut().take_calls(),
        vec![
            Hook::PreInsert {
                name: "B".into(),
                valid: false
            },
            Hook::PostInsert {
                name: "B".into(),
                valid: true
            },
        ]
    );
}

#[test]
fn test_adapter_payload_survives_insert() {
    let mut archive = recording_archive(&[]);
    let a = archive
        .insert(None, "A", 1, FILETYPE_GENERIC, EntryAttributes::empty())
        .unwrap();
    let b = archive
        .insert(None, "B", 1, FILETYPE_GENERIC, EntryAttributes::empty())
        .unwrap();
    assert_eq!(a.read().extra, Tag(1));
    assert_eq!(b.read().extra, Tag(2));
}

#[test]
fn test_insert_before_reports_shifted_offsets() {
    let mut archive = recording_archive(&[("A", b"aaaa"), ("B", b"bb")]);
    let b = archive.find("b").unwrap();
    archive.adapter_mut().take_calls();

    archive
        .insert(Some(&b), "NEW", 3, FILETYPE_GENERIC, EntryAttributes::empty())
        .unwrap();

    let calls = archive.adapter_mut().take_calls();
    // The hook sees the entry after the move, with the delta for reference
    assert!(calls.contains(&Hook::Offset {
        name: "B".into(),
        offset: 7,
        delta: 3
    }));
    assert_eq!(b.index(), 2);
    assert_eq!(image(&archive), b"aaaa\0\0\0bb".to_vec());
}

#[test]
fn test_remove_hooks_see_valid_then_invalid_entry() {
    let mut archive = recording_archive(&[("A", b"aaaa"), ("B", b"bb")]);
    let a = archive.file_at(0).unwrap();
    archive.remove(&a).unwrap();

    assert_eq!(
        archive.adapter_mut().take_calls(),
        vec![
            Hook::PreRemove {
                name: "A".into(),
                valid: true
            },
            Hook::Offset {
                name: "B".into(),
                offset: 0,
                delta: -4
            },
            Hook::PostRemove {
                name: "A".into(),
                valid: false
            },
        ]
    );
}

#[test]
fn test_resize_reports_size_then_offsets() {
    let mut archive = recording_archive(&[("A", b"aaaa"), ("B", b"bb")]);
    let a = archive.file_at(0).unwrap();
    archive.resize(&a, 6, 10).unwrap();

    assert_eq!(
        archive.adapter_mut().take_calls(),
        vec![
            Hook::Size {
                name: "A".into(),
                stored: 6,
                real: 10,
                delta: 2
            },
            Hook::Offset {
                name: "B".into(),
                offset: 6,
                delta: 2
            },
        ]
    );
}

#[test]
fn test_resize_real_size_only_reports_zero_delta() {
    let mut archive = recording_archive(&[("A", b"aaaa"), ("B", b"bb")]);
    let a = archive.file_at(0).unwrap();
    archive.resize(&a, 4, 100).unwrap();

    assert_eq!(
        archive.adapter_mut().take_calls(),
        vec![Hook::Size {
            name: "A".into(),
            stored: 4,
            real: 100,
            delta: 0
        }]
    );
}

#[test]
fn test_resize_to_same_sizes_is_silent() {
    let mut archive = recording_archive(&[("A", b"aaaa")]);
    let a = archive.file_at(0).unwrap();
    archive.resize(&a, 4, 4).unwrap();
    assert!(archive.adapter().calls.is_empty());
}

#[test]
fn test_rename_hook_sees_old_name() {
    let mut archive = recording_archive(&[("A", b"aaaa")]);
    let a = archive.file_at(0).unwrap();
    archive.rename(&a, "Z").unwrap();

    assert_eq!(
        archive.adapter_mut().take_calls(),
        vec![Hook::Name {
            old: "A".into(),
            new: "Z".into()
        }]
    );
    assert_eq!(a.name(), "Z");
}

#[test]
fn test_rejected_rename_keeps_name() {
    let mut archive = recording_archive(&[("A", b"aaaa")]);
    let a = archive.file_at(0).unwrap();
    let err = archive.rename(&a, "FAR_TOO_LONG_NAME").unwrap_err();

    assert!(matches!(err, Error::NameRejected { .. }));
    assert!(err.is_recoverable());
    assert_eq!(a.name(), "A");
    assert!(archive.adapter().calls.is_empty());
}

#[test]
fn test_failed_pre_insert_leaves_archive_unchanged() {
    let mut archive = recording_archive(&[("A", b"aaaa"), ("B", b"bb")]);
    let b = archive.file_at(1).unwrap();
    archive.adapter_mut().reject_next_insert = true;

    let err = archive
        .insert(Some(&b), "NEW", 3, FILETYPE_GENERIC, EntryAttributes::empty())
        .unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded(_)));
    assert_eq!(archive.files().len(), 2);
    assert_eq!((b.offset(), b.index()), (4, 1));
    assert_eq!(image(&archive), b"aaaabb".to_vec());
}
