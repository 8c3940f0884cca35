//! Files carrying an inline header in front of their data

use crate::common::image;
use crate::common::recording::headered_archive;
use fat_archive::{EntryAttributes, FILETYPE_GENERIC};
use pretty_assertions::assert_eq;
use std::io::{Read, Write};

fn read_all<R: Read>(stream: &mut R) -> String {
    let mut out = String::new();
    stream.read_to_string(&mut out).unwrap();
    out
}

#[test]
fn test_stream_window_starts_after_header() {
    let mut archive = headered_archive(3, &[("A", b"alpha"), ("B", b"bravo")]);
    assert_eq!(image(&archive), b"###alpha###bravo".to_vec());

    let b = archive.file_at(1).unwrap();
    assert_eq!((b.offset(), b.read().header_len), (8, 3));

    let mut sb = archive.open(&b).unwrap();
    assert_eq!(sb.offset().unwrap(), 11);
    assert_eq!(read_all(&mut sb), "bravo");
}

#[test]
fn test_insert_before_moves_past_both_header_and_data() {
    let mut archive = headered_archive(3, &[("A", b"alpha"), ("B", b"bravo")]);
    let b = archive.file_at(1).unwrap();
    let mut sb = archive.open(&b).unwrap();

    let c = archive
        .insert(Some(&b), "C", 2, FILETYPE_GENERIC, EntryAttributes::empty())
        .unwrap();
    archive.open(&c).unwrap().write_all(b"cc").unwrap();

    assert_eq!((c.offset(), c.index()), (8, 1));
    assert_eq!((b.offset(), b.index()), (13, 2));
    assert_eq!(image(&archive), b"###alpha###cc###bravo".to_vec());
    assert_eq!(sb.offset().unwrap(), 16);
    assert_eq!(read_all(&mut sb), "bravo");
}

#[test]
fn test_remove_deletes_header_with_data() {
    let mut archive = headered_archive(3, &[("A", b"alpha"), ("B", b"bravo")]);
    let a = archive.file_at(0).unwrap();
    let b = archive.file_at(1).unwrap();
    let mut sb = archive.open(&b).unwrap();

    archive.remove(&a).unwrap();

    assert_eq!(image(&archive), b"###bravo".to_vec());
    assert_eq!((b.offset(), b.index()), (0, 0));
    assert_eq!(sb.offset().unwrap(), 3);
    assert_eq!(read_all(&mut sb), "bravo");
}

#[test]
fn test_resize_edits_after_header() {
    let mut archive = headered_archive(3, &[("A", b"alpha"), ("B", b"bravo")]);
    let a = archive.file_at(0).unwrap();
    let b = archive.file_at(1).unwrap();
    let sb = archive.open(&b).unwrap();

    archive.resize(&a, 7, 7).unwrap();
    assert_eq!(image(&archive), b"###alpha\0\0###bravo".to_vec());
    assert_eq!(b.offset(), 10);
    assert_eq!(sb.offset().unwrap(), 13);

    archive.resize(&a, 2, 2).unwrap();
    assert_eq!(image(&archive), b"###al###bravo".to_vec());
    assert_eq!(b.offset(), 5);
    assert_eq!(sb.offset().unwrap(), 8);
    assert_eq!(archive.read_file(&a).unwrap(), b"al".to_vec());
}
