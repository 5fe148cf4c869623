//! File staging and relocation.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Component, Path};
use tracing::debug;

const BUFFER_SIZE: usize = 64 * 1024;

/// Copy `source` to `dest` and return the SHA-256 of the bytes, reading the
/// source exactly once.
pub fn stage_and_hash(source: &Path, dest: &Path) -> io::Result<String> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut reader = BufReader::with_capacity(BUFFER_SIZE, File::open(source)?);
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, File::create(dest)?);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        writer.write_all(&buffer[..read])?;
    }
    writer.flush()?;

    Ok(hex::encode(hasher.finalize()))
}

/// Move a file, falling back to copy + delete when a rename is not possible
/// (e.g. across filesystems). Parent directories of `to` are created.
pub fn relocate(from: &Path, to: &Path) -> io::Result<()> {
    if from == to {
        return Ok(());
    }
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!("Rename {} failed ({}), copying instead", from.display(), e);
            std::fs::copy(from, to)?;
            std::fs::remove_file(from)
        }
    }
}

/// A relative path joined with `/` regardless of platform.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stage_and_hash() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("deck.pptx");
        std::fs::write(&source, b"hello world").unwrap();

        let staged = dir.path().join("scratch/nested/deck.pptx");
        let checksum = stage_and_hash(&source, &staged).unwrap();

        assert_eq!(
            checksum,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(std::fs::read(&staged).unwrap(), b"hello world");
    }

    #[test]
    fn test_stage_large_file() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("big.pptx");
        let data: Vec<u8> = (0..(BUFFER_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&source, &data).unwrap();

        let staged = dir.path().join("big.copy");
        let checksum = stage_and_hash(&source, &staged).unwrap();
        assert_eq!(checksum, hex::encode(Sha256::digest(&data)));
        assert_eq!(std::fs::read(&staged).unwrap(), data);
    }

    #[test]
    fn test_relocate_creates_parents() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("stage/deck.pptx");
        std::fs::create_dir_all(from.parent().unwrap()).unwrap();
        std::fs::write(&from, b"x").unwrap();

        let to = dir.path().join("template/sales/2024/deck.pptx");
        relocate(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"x");
        relocate(&to, &to).unwrap();
        assert!(to.exists());
    }

    #[test]
    fn test_slash_path() {
        assert_eq!(slash_path(Path::new("sales/2024/q3.pptx")), "sales/2024/q3.pptx");
        assert_eq!(slash_path(Path::new("./a/b")), "a/b");
    }
}
