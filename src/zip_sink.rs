//! Zip-backed output sink
//!
//! Entries are written stored (uncompressed) so the committed-size ledger is
//! exact. The fit check accounts for zip container overhead: a 30-byte local
//! header and a 46-byte central directory record per entry (each carrying the
//! entry name), plus the 22-byte end-of-central-directory record once per
//! archive. The classifier's own arithmetic never models this overhead; only
//! the sink does.

use crate::entry::Entry;
use crate::error::{Result, SplitError};
use crate::report::{ArchiveManifest, ManifestEntry};
use crate::sink::OutputSink;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const LOCAL_HEADER_LEN: u64 = 30;
const CENTRAL_RECORD_LEN: u64 = 46;
const END_OF_CENTRAL_DIR_LEN: u64 = 22;

/// Overhead one stored entry adds beyond its content bytes.
fn entry_overhead(relative_path: &str) -> u64 {
    LOCAL_HEADER_LEN + CENTRAL_RECORD_LEN + 2 * relative_path.len() as u64
}

/// Size-capped zip archive writer.
pub struct ZipSink {
    path: PathBuf,
    writer: Option<ZipWriter<BufWriter<File>>>,
    hard_limit: u64,
    current_size: u64,
    rows: Vec<ManifestEntry>,
    report_dir: Option<PathBuf>,
}

impl ZipSink {
    /// Create the archive file and an empty sink for it.
    pub fn create(path: &Path, hard_limit: u64, report_dir: Option<PathBuf>) -> Result<Self> {
        debug!(path = %path.display(), hard_limit, "opening zip sink");
        let writer = ZipWriter::new(BufWriter::new(File::create(path)?));
        Ok(ZipSink {
            path: path.to_path_buf(),
            writer: Some(writer),
            hard_limit,
            current_size: END_OF_CENTRAL_DIR_LEN,
            rows: Vec::new(),
            report_dir,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputSink for ZipSink {
    fn current_size(&self) -> u64 {
        self.current_size
    }

    fn can_put(&self, relative_path: &str, size: u64) -> bool {
        self.current_size + size + entry_overhead(relative_path) <= self.hard_limit
    }

    fn put(&mut self, entry: &mut dyn Entry) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            SplitError::Io(io::Error::new(
                io::ErrorKind::Other,
                "zip sink already closed",
            ))
        })?;

        let relative_path = entry.relative_path().to_string();
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        writer.start_file(relative_path.as_str(), options)?;
        entry.copy_to(writer)?;

        self.current_size += entry.size() + entry_overhead(&relative_path);
        self.rows.push(ManifestEntry {
            path: relative_path,
            size: entry.size(),
        });
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer.finish()?;
        info!(
            path = %self.path.display(),
            size = self.current_size,
            entries = self.rows.len(),
            "finalized archive"
        );

        if let Some(report_dir) = &self.report_dir {
            let manifest =
                ArchiveManifest::new(&self.path, self.current_size, std::mem::take(&mut self.rows));
            manifest.write_to(report_dir, &self.path)?;
        }
        Ok(())
    }
}
