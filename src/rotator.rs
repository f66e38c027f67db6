//! Secondary archive rotation
//!
//! The rotator owns the ordered sequence of secondary sinks. It opens a sink
//! the first time one is needed, rolls over to a fresh one when the current
//! sink cannot accept an entry under the hard limit, and performs soft-limit
//! rotation when the driver asks for it at input-unit boundaries. Every
//! finalized archive optionally receives a canary entry before closing.

use crate::config::{CanaryStrategy, SplitConfig};
use crate::entry::{Entry, MemEntry};
use crate::error::Result;
use crate::sink::{OutputSink, SinkFactory};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

struct OpenSecondary {
    sink: Box<dyn OutputSink>,
    path: PathBuf,
    name: String,
}

/// Manages the lifetime of secondary output sinks.
pub struct SecondaryRotator {
    secondary_dir: PathBuf,
    pattern: String,
    canary: CanaryStrategy,
    next_index: u32,
    current: Option<OpenSecondary>,
    finalized: Vec<PathBuf>,
}

impl SecondaryRotator {
    pub fn new(config: &SplitConfig) -> Self {
        SecondaryRotator {
            secondary_dir: config.secondary_dir.clone(),
            pattern: config.secondary_pattern.clone(),
            canary: config.canary,
            next_index: 1,
            current: None,
            finalized: Vec::new(),
        }
    }

    /// The sink the next secondary entry should be written to.
    ///
    /// Opens a sink on demand; if the current sink cannot accept the entry
    /// within the hard limit, it is finalized first and a fresh one opened.
    /// The returned sink is not re-checked against the entry: a fresh sink
    /// accepts any entry that passed the oversize gate.
    pub fn sink_for_entry(
        &mut self,
        factory: &mut SinkFactory,
        relative_path: &str,
        size: u64,
    ) -> Result<&mut Box<dyn OutputSink>> {
        let needs_rotation = self
            .current
            .as_ref()
            .is_some_and(|open| !open.sink.can_put(relative_path, size));
        if needs_rotation {
            debug!(
                entry = relative_path,
                size, "entry does not fit current secondary, rotating"
            );
            self.finalize_current()?;
        }
        if self.current.is_none() {
            self.open_next(factory)?;
        }
        let open = self.current.as_mut().expect("secondary sink opened above");
        Ok(&mut open.sink)
    }

    /// Soft-limit rotation, called by the driver after each input unit.
    pub fn rotate_if_past_soft_limit(&mut self, soft_limit: u64) -> Result<()> {
        let past_soft_limit = self
            .current
            .as_ref()
            .is_some_and(|open| open.sink.current_size() >= soft_limit);
        if past_soft_limit {
            info!(soft_limit, "soft limit reached, rotating secondary archive");
            self.finalize_current()?;
        }
        Ok(())
    }

    /// Finalize the in-progress sink, if any. Safe to call repeatedly.
    pub fn close(&mut self) -> Result<()> {
        self.finalize_current()
    }

    /// Ordered paths of every finalized secondary archive.
    pub fn into_finalized(self) -> Vec<PathBuf> {
        self.finalized
    }

    fn open_next(&mut self, factory: &mut SinkFactory) -> Result<()> {
        let name = self.pattern.replacen("{}", &self.next_index.to_string(), 1);
        let path = self.secondary_dir.join(&name);
        info!(path = %path.display(), "opening secondary archive");

        let sink = factory(&path)?;
        self.next_index += 1;
        self.current = Some(OpenSecondary { sink, path, name });
        Ok(())
    }

    fn finalize_current(&mut self) -> Result<()> {
        let Some(mut open) = self.current.take() else {
            return Ok(());
        };
        if self.canary == CanaryStrategy::Include {
            let mut canary = canary_entry(&open.name);
            // A sink rotated at the hard limit may have no room left; it
            // already holds at least one real entry, so non-emptiness holds.
            if open.sink.can_put(canary.relative_path(), canary.size()) {
                debug!(canary = canary.relative_path(), archive = %open.path.display(), "injecting canary");
                open.sink.put(&mut canary)?;
            }
        }
        open.sink.close()?;
        self.finalized.push(open.path);
        Ok(())
    }
}

/// Synthetic placeholder entry, derived only from the archive name so
/// repeated runs produce identical canaries.
fn canary_entry(archive_name: &str) -> MemEntry {
    let stem = Path::new(archive_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive_name.to_string());
    MemEntry::new(
        format!("{stem}/Canary.marker"),
        format!("{stem}\n").into_bytes(),
    )
}
