use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use textball::{
    create_textball, create_textball_file, unpack_textball, unpack_textball_file, Content,
    CreateOptions, TextballError, TextballIter, UnpackOptions, VirtualFile,
};

fn write(root: &Path, rel: &str, data: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, data).unwrap();
}

/// (relative path, bytes) of every file below `root`, sorted
fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files = Vec::new();
    for entry in list_files(root) {
        let rel = entry.strip_prefix(root).unwrap().to_path_buf();
        files.push((rel, fs::read(&entry).unwrap()));
    }
    files.sort();
    files
}

fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            out.extend(list_files(&path));
        } else {
            out.push(path);
        }
    }
    out
}

#[test]
fn test_concrete_two_file_tree() {
    let src = TempDir::new().unwrap();
    write(src.path(), "a.txt", b"hello\n");
    write(src.path(), "sub/b.bin", &[0x00, 0x01, 0xFF]);

    let doc = create_textball(src.path(), &CreateOptions::default()).unwrap();
    let entries: Vec<VirtualFile> = TextballIter::new(&doc)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].path(), Path::new("a.txt"));
    assert_eq!(entries[0].content(), Some(&Content::Text("hello\n".to_string())));
    assert!(!entries[0].executable());
    assert_eq!(entries[1].path(), Path::new("sub/b.bin"));
    assert_eq!(entries[1].content(), Some(&Content::Binary(vec![0x00, 0x01, 0xFF])));
    assert!(!entries[1].executable());
}

#[test]
fn test_roundtrip_reproduces_tree() {
    let src = TempDir::new().unwrap();
    write(src.path(), "README.md", b"# Title\n\nSome text.\n");
    write(src.path(), "dos.txt", b"line1\r\nline2\nline3\r\n");
    write(src.path(), "no_newline.txt", b"last line");
    write(src.path(), "blank_lines.txt", b"\n\n\nx\n\n\n");
    write(src.path(), "empty.txt", b"");
    write(src.path(), "unicode/\u{00e6}\u{00f8}\u{00e5}.txt", "bl\u{00e5}b\u{00e6}r\n".as_bytes());
    let blob: Vec<u8> = (0..5000u32).map(|i| (i * 31 % 251) as u8).collect();
    write(src.path(), "data/blob.bin", &blob);
    write(src.path(), "data/zeros.bin", &[0u8; 13]);
    write(src.path(), "data/partial.bin", &[0xFE]);
    write(src.path(), "deep/a/b/c/d.txt", b"deep\n");

    let doc = create_textball(src.path(), &CreateOptions::default()).unwrap();
    let out = TempDir::new().unwrap();
    let n = unpack_textball(&doc, out.path(), &UnpackOptions::default()).unwrap();

    assert_eq!(n, 10);
    assert_eq!(snapshot(src.path()), snapshot(out.path()));
}

#[test]
fn test_roundtrip_through_file() {
    let src = TempDir::new().unwrap();
    write(src.path(), "a.txt", b"a\r\n");
    write(src.path(), "b.bin", &[0x80, 0x81]);

    let work = TempDir::new().unwrap();
    let ball = work.path().join("tree.textball");
    let doc = create_textball_file(src.path(), &ball, &CreateOptions::default()).unwrap();
    assert_eq!(fs::read(&ball).unwrap(), doc.as_bytes());

    let out = work.path().join("out");
    unpack_textball_file(&ball, &out, &UnpackOptions::default()).unwrap();
    assert_eq!(snapshot(src.path()), snapshot(&out));
}

#[test]
fn test_text_and_binary_sections() {
    let src = TempDir::new().unwrap();
    write(src.path(), "text.txt", b"plain\n");
    write(src.path(), "latin1.txt", b"caf\xe9\n");

    let doc = create_textball(src.path(), &CreateOptions::default()).unwrap();
    assert!(doc.contains("#~~~binaryfile~~~>>> latin1.txt\n\n"));
    assert!(doc.contains("#~~~textfile~~~>>> text.txt\n\nplain\n"));

    let entries = textball::decode(&doc).unwrap();
    assert_eq!(entries[0].content(), Some(&Content::Binary(b"caf\xe9\n".to_vec())));
}

#[test]
fn test_empty_directories_not_stored() {
    let src = TempDir::new().unwrap();
    fs::create_dir_all(src.path().join("empty/nested")).unwrap();
    write(src.path(), "f.txt", b"f");

    for include in [true, false] {
        let options = CreateOptions::default().with_include_empty_dirs(include);
        let doc = create_textball(src.path(), &options).unwrap();
        let entries = textball::decode(&doc).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.iter().all(|e| !e.is_dir()));
    }
}

#[test]
fn test_magic_collision_produces_no_output() {
    let src = TempDir::new().unwrap();
    write(src.path(), "a.txt", b"harmless\n");
    write(
        src.path(),
        "docs.txt",
        b"the marker looks like\n\n#~~~textfile~~~>>> this\n",
    );

    let work = TempDir::new().unwrap();
    let ball = work.path().join("out.textball");
    let err = create_textball_file(src.path(), &ball, &CreateOptions::default()).unwrap_err();
    match err {
        TextballError::MagicCollision { path, .. } => assert_eq!(path, PathBuf::from("docs.txt")),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!ball.exists());
}

#[test]
fn test_unpack_guard_leaves_target_untouched() {
    let src = TempDir::new().unwrap();
    write(src.path(), "a.txt", b"a");
    let doc = create_textball(src.path(), &CreateOptions::default()).unwrap();

    let out = TempDir::new().unwrap();
    write(out.path(), "existing.txt", b"keep");
    let before = snapshot(out.path());

    let result = unpack_textball(&doc, out.path(), &UnpackOptions::default());
    assert!(matches!(result, Err(TextballError::DirectoryState { .. })));
    assert_eq!(snapshot(out.path()), before);
}

#[test]
fn test_iterator_restart_needs_new_iterator() {
    let src = TempDir::new().unwrap();
    write(src.path(), "a.txt", b"a");
    write(src.path(), "b.txt", b"b");
    let doc = create_textball(src.path(), &CreateOptions::default()).unwrap();

    let mut iter = TextballIter::new(&doc).unwrap();
    assert!(iter.next().is_some());
    assert!(iter.next().is_some());
    assert!(iter.next().is_none());
    assert!(iter.next().is_none());
    assert_eq!(TextballIter::new(&doc).unwrap().count(), 2);
}

#[cfg(unix)]
#[test]
fn test_executable_bit_roundtrip() {
    use std::os::unix::fs::PermissionsExt;

    let src = TempDir::new().unwrap();
    write(src.path(), "bin/run.sh", b"#!/bin/sh\necho hi\n");
    write(src.path(), "bin/tool", &[0x7F, b'E', b'L', b'F', 0xFF]);
    write(src.path(), "notes.txt", b"not executable\n");
    for exe in ["bin/run.sh", "bin/tool"] {
        fs::set_permissions(src.path().join(exe), fs::Permissions::from_mode(0o755)).unwrap();
    }
    fs::set_permissions(src.path().join("notes.txt"), fs::Permissions::from_mode(0o644)).unwrap();

    let doc = create_textball(src.path(), &CreateOptions::default()).unwrap();
    let out = TempDir::new().unwrap();
    unpack_textball(&doc, out.path(), &UnpackOptions::default()).unwrap();

    let user_exec = |rel: &str| {
        fs::metadata(out.path().join(rel)).unwrap().permissions().mode() & 0o100 != 0
    };
    assert!(user_exec("bin/run.sh"));
    assert!(user_exec("bin/tool"));
    assert!(!user_exec("notes.txt"));
}
