//! Compression and archive helpers used by the export phase: gzip/xz
//! byte-stream compression, icon tarball assembly, and the hardlink-copy
//! used by the immutable-suites feature (grounded on
//! `original_source/src/engine.cpp` `compressAndSave`/`Utils::copyDir`, and
//! on the flate2/xz2/tar/walkdir stack as used in
//! `AOSC-Dev-p-vector-rs`'s `Cargo.toml`).

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Write};
use std::path::Path;
use xz2::write::XzEncoder;

pub fn compress_gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

pub fn compress_xz(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = XzEncoder::new(Vec::new(), 6);
    encoder.write_all(data)?;
    encoder.finish()
}

/// Writes `data` compressed as both `<path>.gz` and `<path>.xz` (spec.md
/// §4.7 step 4: metadata and hints both ship in both variants).
pub fn save_gz_and_xz(base_path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = base_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let gz = compress_gzip(data)?;
    std::fs::write(with_suffix(base_path, "gz"), gz)?;
    let xz = compress_xz(data)?;
    std::fs::write(with_suffix(base_path, "xz"), xz)?;
    Ok(())
}

/// Writes `data` compressed only as `<path>.gz` (the `CID-Index` file ships
/// gzip-only per spec.md §4.7 step 4).
pub fn save_gz_only(base_path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = base_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let gz = compress_gzip(data)?;
    std::fs::write(with_suffix(base_path, "gz"), gz)
}

fn with_suffix(path: &Path, suffix: &str) -> std::path::PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".");
    os.push(suffix);
    std::path::PathBuf::from(os)
}

/// Writes a gzip-compressed tar archive at `out_path` containing each
/// `(archive_path, source_file)` pair, sorted by archive path for
/// reproducible output (spec.md §4.7 `exportIconTarballs`: "sort paths").
pub fn write_icon_tarball(
    out_path: &Path,
    mut entries: Vec<(String, std::path::PathBuf)>,
) -> io::Result<()> {
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(out_path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (archive_path, source) in entries {
        builder.append_path_with_name(&source, &archive_path)?;
    }
    let encoder = builder.into_inner()?;
    encoder.finish()?;
    Ok(())
}

/// Recursively hardlinks every regular file from `src` into `dst`, creating
/// directories as needed. Used to materialize per-suite media views from
/// the shared content-addressed pool without recopying bytes (spec.md §4.7
/// step 2, GLOSSARY "Immutable suites feature").
pub fn hardlink_copy_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in walkdir::WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(src).expect("walked entry is under src");
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            if !target.exists() {
                std::fs::hard_link(entry.path(), &target)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn gzip_round_trips() {
        let data = b"hello world".to_vec();
        let compressed = compress_gzip(&data).unwrap();
        let mut decoder = flate2::read::GzDecoder::new(&compressed[..]);
        let mut out = Vec::new();
        std::io::Read::read_to_end(&mut decoder, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn xz_round_trips() {
        let data = b"hello world".to_vec();
        let compressed = compress_xz(&data).unwrap();
        let mut decoder = xz2::read::XzDecoder::new(&compressed[..]);
        let mut out = Vec::new();
        std::io::Read::read_to_end(&mut decoder, &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn save_gz_and_xz_writes_both_variants() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("Components-amd64.xml");
        save_gz_and_xz(&base, b"<components/>").unwrap();
        assert!(dir.path().join("Components-amd64.xml.gz").exists());
        assert!(dir.path().join("Components-amd64.xml.xz").exists());
    }

    #[test]
    fn hardlink_copy_dir_mirrors_tree_and_shares_inode() {
        let src = tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("icons/64x64")).unwrap();
        std::fs::write(src.path().join("icons/64x64/foo.png"), b"PNGDATA").unwrap();

        let dst = tempdir().unwrap();
        let target = dst.path().join("gcid-dir");
        hardlink_copy_dir(src.path(), &target).unwrap();

        let copied = target.join("icons/64x64/foo.png");
        assert!(copied.exists());
        assert_eq!(std::fs::read(&copied).unwrap(), b"PNGDATA");

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            let src_meta = std::fs::metadata(src.path().join("icons/64x64/foo.png")).unwrap();
            let dst_meta = std::fs::metadata(&copied).unwrap();
            assert_eq!(src_meta.ino(), dst_meta.ino());
        }
    }
}
