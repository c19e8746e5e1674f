//! Relocation through the full `bottle::install` pipeline: extract, then rewrite
//! placeholder tokens in plain-text files. Mach-O relocation itself needs `otool`/
//! `install_name_tool`/`codesign`, so it's covered only on macOS by `bottle::macho`
//! shelling out directly; these tests exercise the parts that are portable.


use std::io::Write;
use test_helpers::TestEnvironment;

fn build_archive(path: &std::path::Path, entries: &[(&str, &[u8], u32)]) {
    let file = std::fs::File::create(path).unwrap();
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, data, mode) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(*mode);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// A bin/ script with `@@HOMEBREW_PREFIX@@`/`@@HOMEBREW_CELLAR@@` in its shebang and body
/// must come out clean after `bottle::install`, and must still be executable.
#[test]
fn install_rewrites_script_placeholders() {
    let env = TestEnvironment::new();
    let pkg = env.store.package("huggingface-cli");
    let version = pkg.version("1.0.1");
    std::fs::create_dir_all(version.path()).unwrap();

    let archive_path = env.root().join("huggingface-cli.tar.gz");
    let script = b"#!@@HOMEBREW_PREFIX@@/opt/python@3.12/bin/python3\nprint('hi')\n".to_vec();
    build_archive(&archive_path, &[("bin/hf", &script, 0o755)]);

    kegctl::bottle::install(&archive_path, &version).unwrap();

    let installed = std::fs::read_to_string(version.path().join("bin/hf")).unwrap();
    assert!(!installed.contains("@@HOMEBREW_PREFIX@@"));
    assert!(!installed.contains("@@HOMEBREW_CELLAR@@"));
    assert!(installed.contains("/opt/python@3.12/bin/python3"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(version.path().join("bin/hf")).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}

/// A symlink created by the archive should survive extraction and still resolve.
#[test]
fn install_preserves_symlinks() {
    let env = TestEnvironment::new();
    let pkg = env.store.package("vercel-cli");
    let version = pkg.version("1.0.0");
    std::fs::create_dir_all(version.path()).unwrap();

    let archive_path = env.root().join("vercel-cli.tar.gz");
    let file = std::fs::File::create(&archive_path).unwrap();
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let target = b"#!/bin/sh\necho vercel\n".to_vec();
    let mut header = tar::Header::new_gnu();
    header.set_size(target.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder.append_data(&mut header, "libexec/bin/vercel", &target[..]).unwrap();

    let mut link_header = tar::Header::new_gnu();
    link_header.set_entry_type(tar::EntryType::Symlink);
    link_header.set_size(0);
    link_header.set_mode(0o755);
    link_header.set_link_name("../libexec/bin/vercel").unwrap();
    link_header.set_cksum();
    builder.append_link(&mut link_header, "bin/vercel", "../libexec/bin/vercel").unwrap();

    builder.into_inner().unwrap().finish().unwrap();

    kegctl::bottle::install(&archive_path, &version).unwrap();

    let link_path = version.path().join("bin/vercel");
    let metadata = std::fs::symlink_metadata(&link_path).unwrap();
    assert!(metadata.file_type().is_symlink());
    assert!(link_path.exists());
}
