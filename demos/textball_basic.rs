//! Example of creating, listing and unpacking a textball

use std::fs;

use tempfile::TempDir;
use textball::{
    create_textball, unpack_textball, Content, CreateOptions, TextballIter, UnpackOptions,
};

fn main() -> anyhow::Result<()> {
    println!("=== Textball Example ===\n");

    // Build a small tree with a text file and a binary file
    let src = TempDir::new()?;
    fs::create_dir_all(src.path().join("assets"))?;
    fs::write(src.path().join("README.md"), "# Example\n\nSome text.\n")?;
    fs::write(src.path().join("assets/logo.bin"), [0xFFu8, 0xD8, 0x00, 0x00, 0x00, 0x00])?;

    let doc = create_textball(src.path(), &CreateOptions::default())?;
    println!("Encoded textball:");
    println!("---");
    println!("{}", doc);
    println!("---");

    println!("\nEntries:");
    for vfile in TextballIter::new(&doc)? {
        let vfile = vfile?;
        let kind = match vfile.content() {
            Some(Content::Binary(_)) => "binary",
            _ => "text",
        };
        let size = vfile.content().map_or(0, Content::len);
        println!("  - {} ({} bytes, {})", vfile.path().display(), size, kind);
    }

    let out = TempDir::new()?;
    let n = unpack_textball(&doc, out.path(), &UnpackOptions::default())?;
    println!("\nUnpacked {} files into {}", n, out.path().display());

    let readme = fs::read_to_string(out.path().join("README.md"))?;
    assert_eq!(readme, "# Example\n\nSome text.\n");
    println!("Round-trip verification passed!");
    Ok(())
}
