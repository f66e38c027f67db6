//! Per-archive report manifests
//!
//! When a report directory is configured, every closed archive leaves behind
//! a small JSON manifest describing what went into it. The manifests are a
//! write-only byproduct for the surrounding build orchestration; nothing in
//! the splitter reads them back.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

/// One committed entry as recorded in a manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestEntry {
    pub path: String,
    pub size: u64,
}

/// Manifest for one finalized archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveManifest {
    /// Absolute or configured path of the archive this manifest describes.
    pub archive: String,

    /// Committed size in bytes, including container overhead.
    pub total_size: u64,

    pub entry_count: usize,

    /// Creation timestamp (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    pub entries: Vec<ManifestEntry>,
}

impl ArchiveManifest {
    pub fn new(archive: &Path, total_size: u64, entries: Vec<ManifestEntry>) -> Self {
        ArchiveManifest {
            archive: archive.display().to_string(),
            total_size,
            entry_count: entries.len(),
            created: Some(chrono::Utc::now().to_rfc3339()),
            entries,
        }
    }

    /// Write this manifest as `<archive-file-name>.meta.json` under
    /// `report_dir`, creating the directory if needed.
    pub fn write_to(&self, report_dir: &Path, archive: &Path) -> Result<()> {
        fs::create_dir_all(report_dir)?;
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "archive".to_string());
        let manifest_path = report_dir.join(format!("{file_name}.meta.json"));
        debug!(path = %manifest_path.display(), "writing archive manifest");

        let writer = BufWriter::new(File::create(&manifest_path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
