//! Entry model and entry-stream capability
//!
//! An [`Entry`] is one compiled-code blob headed for an archive: a relative
//! path, a size knowable up front, and content that is only streamed when the
//! entry is committed. An [`EntrySource`] enumerates the entries of one input
//! unit in a deterministic order and can be re-walked, so the survey pass and
//! the commit pass observe the same membership.

use crate::error::Result;
use std::io::Write;
use std::path::Path;

/// One archive entry, content obtained lazily.
///
/// `size` must be available without consuming the content; `copy_to` streams
/// the content exactly once.
pub trait Entry {
    /// Path of the entry relative to its input unit, `/`-separated.
    fn relative_path(&self) -> &str;

    /// Uncompressed size in bytes. Zero for directory markers.
    fn size(&self) -> u64;

    /// Stream the entry content into `out`, returning the bytes copied.
    fn copy_to(&mut self, out: &mut dyn Write) -> Result<u64>;
}

/// An owned in-memory entry.
///
/// Used for synthetic entries (canaries) and as a test fixture.
#[derive(Debug, Clone)]
pub struct MemEntry {
    path: String,
    bytes: Vec<u8>,
}

impl MemEntry {
    pub fn new(path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        MemEntry {
            path: path.into(),
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Entry for MemEntry {
    fn relative_path(&self) -> &str {
        &self.path
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn copy_to(&mut self, out: &mut dyn Write) -> Result<u64> {
        out.write_all(&self.bytes)?;
        Ok(self.bytes.len() as u64)
    }
}

/// Visitor invoked once per entry, in stream order.
pub type EntryVisitor<'a> = dyn FnMut(&mut dyn Entry) -> Result<()> + 'a;

/// Produces the ordered entry stream of one input unit.
///
/// A source must yield the same entries, in the same order, every time it is
/// walked for a given unit; the splitter walks each unit once to survey sizes
/// and once to commit.
pub trait EntrySource {
    fn for_each_entry(&self, unit: &Path, visit: &mut EntryVisitor<'_>) -> Result<()>;
}
