//! Galactix GLB edits compared byte for byte

use crate::common::*;
use fat_archive::formats::{Certainty, glb_galactix};
use fat_archive::{ArchiveFile, EntryAttributes, Error, FILETYPE_GENERIC, share};
use pretty_assertions::assert_eq;
use std::io::{Cursor, Write};

const RAW_CONTENT_12: &[u8] = b"\x02\x00\x00\x00GLIB FILE\x00\x00\x00\
\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\
\x54\x00\x00\x00ONE.DAT\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x0f\x00\
\x63\x00\x00\x00TWO.DAT\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x0f\x00\
This is one.datThis is two.dat";

fn insert(
    archive: &mut fat_archive::FatArchive<glb_galactix::GalactixAdapter>,
    before: Option<&str>,
    name: &str,
    content: &str,
) {
    let before = before.map(|b| archive.find(b).unwrap());
    let entry = archive
        .insert(
            before.as_ref(),
            name,
            content.len() as u64,
            FILETYPE_GENERIC,
            EntryAttributes::empty(),
        )
        .unwrap();
    archive
        .open(&entry)
        .unwrap()
        .write_all(content.as_bytes())
        .unwrap();
}

#[test]
fn test_fixture_matches_raw_bytes() {
    assert_eq!(glb_content_12(), RAW_CONTENT_12.to_vec());
    assert_eq!(
        glb_galactix::detect(&mut Cursor::new(RAW_CONTENT_12)).unwrap(),
        Certainty::DefinitelyYes
    );
}

#[test]
fn test_open_reads_offsets_and_sizes() {
    let archive = open_glb(&glb_content_12());
    let files = archive.files();
    assert_eq!(files.len(), 2);
    assert_eq!((files[0].offset(), files[0].stored_size()), (0x54, 15));
    assert_eq!(files[1].name(), "TWO.DAT");
    assert_eq!(archive.read_file(&files[1]).unwrap(), TWO.as_bytes());
}

#[test]
fn test_insert_end() {
    let mut archive = open_glb(&glb_content_12());
    insert(&mut archive, None, "THREE.DAT", THREE);
    assert_eq!(image(&archive), glb_content_123());
}

#[test]
fn test_insert_mid() {
    let mut archive = open_glb(&glb_content_12());
    insert(&mut archive, Some("TWO.DAT"), "THREE.DAT", THREE);
    assert_eq!(image(&archive), glb_content_132());
}

#[test]
fn test_insert_two_mid() {
    let mut archive = open_glb(&glb_content_12());
    insert(&mut archive, Some("TWO.DAT"), "THREE.DAT", THREE);
    insert(&mut archive, Some("TWO.DAT"), "FOUR.DAT", FOUR);
    assert_eq!(image(&archive), glb_content_1342());
}

#[test]
fn test_remove() {
    let mut archive = open_glb(&glb_content_12());
    let one = archive.find("ONE.DAT").unwrap();
    archive.remove(&one).unwrap();
    assert_eq!(image(&archive), glb_content_2());
}

#[test]
fn test_remove_all() {
    let mut archive = open_glb(&glb_content_12());
    let one = archive.find("ONE.DAT").unwrap();
    let two = archive.find("TWO.DAT").unwrap();
    archive.remove(&one).unwrap();
    archive.remove(&two).unwrap();
    assert_eq!(image(&archive), glb_content_0());
}

#[test]
fn test_remove_last_file() {
    let mut archive = open_glb(&glb_content_12());
    let two = archive.find("TWO.DAT").unwrap();
    archive.remove(&two).unwrap();
    assert_eq!(
        image(&archive),
        glb_image(&[(0x38, "ONE.DAT", 15)], &[ONE])
    );
}

#[test]
fn test_remove_then_insert() {
    let mut archive = open_glb(&glb_content_12());
    let one = archive.find("ONE.DAT").unwrap();
    archive.remove(&one).unwrap();
    insert(&mut archive, Some("TWO.DAT"), "THREE.DAT", THREE);
    assert_eq!(image(&archive), glb_content_32());
}

#[test]
fn test_insert_then_remove_restores_bytes() {
    let mut archive = open_glb(&glb_content_12());
    insert(&mut archive, Some("TWO.DAT"), "THREE.DAT", THREE);
    let three = archive.find("THREE.DAT").unwrap();
    archive.remove(&three).unwrap();
    assert_eq!(image(&archive), glb_content_12());
}

#[test]
fn test_insert_into_empty_archive() {
    let mut archive = open_glb(&glb_content_0());
    insert(&mut archive, None, "TWO.DAT", TWO);
    assert_eq!(image(&archive), glb_content_2());
}

#[test]
fn test_create_then_insert() {
    let mut archive = glb_galactix::create(memory_storage(&[])).unwrap();
    insert(&mut archive, None, "TWO.DAT", TWO);
    assert_eq!(image(&archive), glb_content_2());
}

#[test]
fn test_rename() {
    let mut archive = open_glb(&glb_content_12());
    let one = archive.find("ONE.DAT").unwrap();
    archive.rename(&one, "THREE.DAT").unwrap();
    assert_eq!(image(&archive), glb_content_1r2());
}

#[test]
fn test_rename_too_long() {
    let mut archive = open_glb(&glb_content_12());
    let one = archive.find("ONE.DAT").unwrap();
    let err = archive.rename(&one, "ABCDEFGHIJKLMNOPQRSTUV").unwrap_err();
    assert!(matches!(err, Error::NameRejected { .. }));
    assert_eq!(image(&archive), glb_content_12());

    // Exactly the longest allowed name
    archive.rename(&one, "ABCDEFGHIJKLMNOPQRSTU").unwrap();
}

#[test]
fn test_insert_long_name_rejected() {
    let mut archive = open_glb(&glb_content_12());
    let err = archive
        .insert(
            None,
            "ABCDEFGHIJKLMNOPQRSTUV",
            1,
            FILETYPE_GENERIC,
            EntryAttributes::empty(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::NameRejected { .. }));
    assert_eq!(image(&archive), glb_content_12());
}

#[test]
fn test_resize_larger() {
    let mut archive = open_glb(&glb_content_12());
    let one = archive.find("ONE.DAT").unwrap();
    archive.resize(&one, 20, 20).unwrap();
    assert_eq!(image(&archive), glb_content_1l2());
}

#[test]
fn test_resize_smaller() {
    let mut archive = open_glb(&glb_content_12());
    let one = archive.find("ONE.DAT").unwrap();
    archive.resize(&one, 10, 10).unwrap();
    assert_eq!(image(&archive), glb_content_1s2());
}

#[test]
fn test_resize_over_64k_rejected() {
    let mut archive = open_glb(&glb_content_12());
    let one = archive.find("ONE.DAT").unwrap();
    let err = archive.resize(&one, 65536, 65536).unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded(_)));
    assert_eq!(one.stored_size(), 15);
    assert_eq!(image(&archive), glb_content_12());
}

#[test]
fn test_write_past_end_through_archive_file() {
    let archive = share(open_glb(&glb_content_12()));
    let one = archive.lock().find("ONE.DAT").unwrap();
    let mut file = ArchiveFile::open(&archive, &one).unwrap();
    file.write_all(b"Now resized to 23 chars").unwrap();

    assert_eq!(image(&*archive.lock()), glb_content_1w2());
}

#[test]
fn test_move_to_end() {
    let mut archive = open_glb(&glb_content_12());
    let one = archive.find("ONE.DAT").unwrap();
    archive.move_entry(None, &one).unwrap();
    assert_eq!(image(&archive), glb_content_21());
}

#[test]
fn test_open_rejects_bad_offsets() {
    let mut bytes = glb_content_12();
    // TWO.DAT claims to start past the end
    bytes[56] = 0xff;
    assert!(glb_galactix::open(memory_storage(&bytes)).unwrap_err().is_corruption());
}
