//! Classpath scanning
//!
//! [`ClasspathScanner`] turns one input unit into an ordered entry stream.
//! A unit is either a directory tree (every regular file below it) or a
//! zip/jar archive (entries in archive order). Directory walks are sorted by
//! file name so repeated runs see an identical stream.

use crate::entry::{Entry, EntrySource, EntryVisitor};
use crate::error::{Result, SplitError};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::ZipArchive;

/// Entry backed by a file on disk, opened only when committed.
struct FileEntry {
    abs_path: PathBuf,
    relative_path: String,
    size: u64,
}

impl Entry for FileEntry {
    fn relative_path(&self) -> &str {
        &self.relative_path
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn copy_to(&mut self, out: &mut dyn Write) -> Result<u64> {
        let mut file = File::open(&self.abs_path)?;
        Ok(io::copy(&mut file, out)?)
    }
}

/// Entry backed by an open archive reader.
struct StreamedEntry<R: Read> {
    relative_path: String,
    size: u64,
    reader: R,
}

impl<R: Read> Entry for StreamedEntry<R> {
    fn relative_path(&self) -> &str {
        &self.relative_path
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn copy_to(&mut self, out: &mut dyn Write) -> Result<u64> {
        Ok(io::copy(&mut self.reader, out)?)
    }
}

/// Scans directories and zip/jar archives into entry streams.
#[derive(Debug, Default)]
pub struct ClasspathScanner;

impl ClasspathScanner {
    pub fn new() -> Self {
        ClasspathScanner
    }

    fn walk_directory(&self, unit: &Path, visit: &mut EntryVisitor<'_>) -> Result<()> {
        for dir_entry in WalkDir::new(unit).sort_by_file_name() {
            let dir_entry = dir_entry.map_err(io::Error::from)?;
            if !dir_entry.file_type().is_file() {
                continue;
            }
            let relative_path = relative_slash_path(unit, dir_entry.path());
            let size = dir_entry.metadata().map_err(io::Error::from)?.len();
            debug!(path = %relative_path, size, "visiting file entry");

            let mut entry = FileEntry {
                abs_path: dir_entry.path().to_path_buf(),
                relative_path,
                size,
            };
            visit(&mut entry)?;
        }
        Ok(())
    }

    fn walk_archive(&self, unit: &Path, visit: &mut EntryVisitor<'_>) -> Result<()> {
        let mut archive = ZipArchive::new(File::open(unit)?)?;
        for index in 0..archive.len() {
            let file = archive.by_index(index)?;
            let relative_path = file.name().to_string();
            let size = if file.is_dir() { 0 } else { file.size() };
            debug!(path = %relative_path, size, "visiting archive entry");

            let mut entry = StreamedEntry {
                relative_path,
                size,
                reader: file,
            };
            visit(&mut entry)?;
        }
        Ok(())
    }
}

impl EntrySource for ClasspathScanner {
    fn for_each_entry(&self, unit: &Path, visit: &mut EntryVisitor<'_>) -> Result<()> {
        if unit.is_dir() {
            self.walk_directory(unit, visit)
        } else if unit.is_file() {
            self.walk_archive(unit, visit)
        } else {
            Err(SplitError::UnsupportedUnit(unit.display().to_string()))
        }
    }
}

/// Relative path below `root`, joined with forward slashes.
fn relative_slash_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write as _;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn collect(unit: &Path) -> Vec<(String, u64)> {
        let scanner = ClasspathScanner::new();
        let mut seen = Vec::new();
        scanner
            .for_each_entry(unit, &mut |entry| {
                seen.push((entry.relative_path().to_string(), entry.size()));
                Ok(())
            })
            .unwrap();
        seen
    }

    #[test]
    fn directory_walk_is_deterministic() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.class"), vec![0u8; 20]).unwrap();
        fs::write(dir.path().join("a.class"), vec![0u8; 10]).unwrap();
        fs::write(dir.path().join("sub/c.class"), vec![0u8; 30]).unwrap();

        let first = collect(dir.path());
        let second = collect(dir.path());

        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert!(first.contains(&("a.class".to_string(), 10)));
        assert!(first.contains(&("sub/c.class".to_string(), 30)));
    }

    #[test]
    fn archive_walk_yields_entries_in_archive_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let jar = dir.path().join("input.jar");

        let mut writer = ZipWriter::new(File::create(&jar).unwrap());
        let options =
            FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("first.class", options).unwrap();
        writer.write_all(&[1u8; 12]).unwrap();
        writer.add_directory("META-INF/", options).unwrap();
        writer.start_file("META-INF/second.class", options).unwrap();
        writer.write_all(&[2u8; 7]).unwrap();
        writer.finish().unwrap();

        let seen = collect(&jar);
        assert_eq!(
            seen,
            vec![
                ("first.class".to_string(), 12),
                ("META-INF/".to_string(), 0),
                ("META-INF/second.class".to_string(), 7),
            ]
        );
    }

    #[test]
    fn archive_entries_stream_content() {
        let dir = tempfile::TempDir::new().unwrap();
        let jar = dir.path().join("input.jar");

        let mut writer = ZipWriter::new(File::create(&jar).unwrap());
        let options =
            FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("payload.bin", options).unwrap();
        writer.write_all(b"payload-bytes").unwrap();
        writer.finish().unwrap();

        let scanner = ClasspathScanner::new();
        let mut content = Vec::new();
        scanner
            .for_each_entry(&jar, &mut |entry| {
                entry.copy_to(&mut content).map(|_| ())
            })
            .unwrap();
        assert_eq!(content, b"payload-bytes");
    }

    #[test]
    fn missing_unit_is_rejected() {
        let err = ClasspathScanner::new()
            .for_each_entry(Path::new("/no/such/unit"), &mut |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, SplitError::UnsupportedUnit(_)));
    }
}
