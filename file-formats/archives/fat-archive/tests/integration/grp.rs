//! Build engine GRP edits, in memory and on disk

use crate::common::*;
use fat_archive::formats::grp;
use fat_archive::{EntryAttributes, FILETYPE_GENERIC, InsertOptions};
use pretty_assertions::assert_eq;
use std::io::Write;

fn content_12() -> Vec<u8> {
    grp_image(&[("ONE.DAT", ONE), ("TWO.DAT", TWO)])
}

#[test]
fn test_fixture_matches_raw_bytes() {
    let raw: &[u8] = b"KenSilverman\x02\0\0\0\
ONE.DAT\0\0\0\0\0\x0f\0\0\0\
TWO.DAT\0\0\0\0\0\x0f\0\0\0\
This is one.datThis is two.dat";
    assert_eq!(content_12(), raw.to_vec());
}

#[test]
fn test_insert_end() {
    let mut archive = open_grp(&content_12());
    let three = archive
        .insert(None, "THREE.DAT", 17, FILETYPE_GENERIC, EntryAttributes::empty())
        .unwrap();
    archive.open(&three).unwrap().write_all(THREE.as_bytes()).unwrap();

    assert_eq!(
        image(&archive),
        grp_image(&[("ONE.DAT", ONE), ("TWO.DAT", TWO), ("THREE.DAT", THREE)])
    );
}

#[test]
fn test_insert_mid() {
    let mut archive = open_grp(&content_12());
    let two = archive.find("TWO.DAT").unwrap();
    let three = archive
        .insert_with(Some(&two), "THREE.DAT", 17, &InsertOptions::new())
        .unwrap();
    archive.open(&three).unwrap().write_all(THREE.as_bytes()).unwrap();

    assert_eq!(
        image(&archive),
        grp_image(&[("ONE.DAT", ONE), ("THREE.DAT", THREE), ("TWO.DAT", TWO)])
    );
    assert_eq!(two.offset(), 16 + 3 * 16 + 15 + 17);
}

#[test]
fn test_remove_first() {
    let mut archive = open_grp(&content_12());
    let one = archive.find("ONE.DAT").unwrap();
    archive.remove(&one).unwrap();
    assert_eq!(image(&archive), grp_image(&[("TWO.DAT", TWO)]));
}

#[test]
fn test_resize_and_rename() {
    let mut archive = open_grp(&content_12());
    let one = archive.find("ONE.DAT").unwrap();
    archive.resize(&one, 10, 10).unwrap();
    archive.rename(&one, "UNO.DAT").unwrap();
    assert_eq!(
        image(&archive),
        grp_image(&[("UNO.DAT", "This is on"), ("TWO.DAT", TWO)])
    );
}

#[test]
fn test_name_longer_than_twelve_rejected() {
    let mut archive = open_grp(&content_12());
    assert!(
        archive
            .insert(None, "THIRTEEN.DATA", 1, FILETYPE_GENERIC, EntryAttributes::empty())
            .is_err()
    );
    assert!(
        archive
            .insert(None, "TWELVE12.DAT", 1, FILETYPE_GENERIC, EntryAttributes::empty())
            .is_ok()
    );
}

#[test]
fn test_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("TEST.GRP");
    std::fs::write(&path, content_12()).unwrap();

    {
        let mut archive = grp::open_path(&path).unwrap();
        let two = archive.find("TWO.DAT").unwrap();
        let three = archive
            .insert(Some(&two), "THREE.DAT", 17, FILETYPE_GENERIC, EntryAttributes::empty())
            .unwrap();
        archive.open(&three).unwrap().write_all(THREE.as_bytes()).unwrap();
        archive.flush().unwrap();
    }
    assert_eq!(
        std::fs::read(&path).unwrap(),
        grp_image(&[("ONE.DAT", ONE), ("THREE.DAT", THREE), ("TWO.DAT", TWO)])
    );

    // Shrinking must truncate the file on disk
    {
        let mut archive = grp::open_path(&path).unwrap();
        for name in ["THREE.DAT", "ONE.DAT"] {
            let entry = archive.find(name).unwrap();
            archive.remove(&entry).unwrap();
        }
        archive.flush().unwrap();
    }
    assert_eq!(std::fs::read(&path).unwrap(), grp_image(&[("TWO.DAT", TWO)]));
}

#[test]
fn test_reopen_gives_identical_listing() {
    let bytes = grp_image(&[("A.DAT", "a"), ("EMPTY.DAT", ""), ("B.DAT", "bb")]);
    let archive = open_grp(&bytes);
    let listing: Vec<_> = archive
        .files()
        .iter()
        .map(|e| (e.name(), e.offset(), e.stored_size()))
        .collect();
    assert_eq!(
        listing,
        vec![
            ("A.DAT".to_string(), 64, 1),
            ("EMPTY.DAT".to_string(), 65, 0),
            ("B.DAT".to_string(), 65, 2),
        ]
    );
    assert_eq!(image(&archive), bytes);
}
