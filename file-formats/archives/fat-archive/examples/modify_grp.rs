//! Example editing a Build engine GRP file in place
//!
//! Lists the archive, then applies an optional edit and commits it.
//! Run with `RUST_LOG=debug` to see every structural change.

use fat_archive::formats::grp;
use fat_archive::{EntryAttributes, FILETYPE_GENERIC};
use std::env;
use std::io::Write;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <grp_file> [command]", args[0]);
        eprintln!("\nCommands:");
        eprintln!("  add <name> <source> [before]   Insert a file from disk");
        eprintln!("  rm <name>                      Remove a file");
        eprintln!("  mv <old> <new>                 Rename a file");
        eprintln!("  resize <name> <bytes>          Change a file's size");
        return Ok(());
    }

    let mut archive = grp::open_path(&args[1])?;
    let command: Vec<&str> = args[2..].iter().map(|s| s.as_str()).collect();

    match command.as_slice() {
        [] => {}
        ["add", name, source, rest @ ..] => {
            let data = std::fs::read(source)?;
            let before = match rest.first() {
                Some(b) => Some(archive.find(b).ok_or_else(|| format!("{b} not found"))?),
                None => None,
            };
            let entry = archive.insert(
                before.as_ref(),
                name,
                data.len() as u64,
                FILETYPE_GENERIC,
                EntryAttributes::empty(),
            )?;
            archive.open(&entry)?.write_all(&data)?;
        }
        ["rm", name] => {
            let entry = archive.find(name).ok_or_else(|| format!("{name} not found"))?;
            archive.remove(&entry)?;
        }
        ["mv", old, new] => {
            let entry = archive.find(old).ok_or_else(|| format!("{old} not found"))?;
            archive.rename(&entry, new)?;
        }
        ["resize", name, bytes] => {
            let entry = archive.find(name).ok_or_else(|| format!("{name} not found"))?;
            let size: u64 = bytes.parse()?;
            archive.resize(&entry, size, size)?;
        }
        _ => return Err(format!("unknown command {:?}", command).into()),
    }

    println!("{:<12} {:>10} {:>10}", "Name", "Offset", "Size");
    for file in archive.files() {
        let e = file.read();
        println!("{:<12} {:>10} {:>10}", e.name, e.offset, e.stored_size);
    }

    archive.flush()?;
    Ok(())
}
