//! Output sink capability
//!
//! The splitter core never touches archive bytes directly; it drives an
//! [`OutputSink`] with exactly four operations. Concrete archive formats add
//! per-entry container overhead the core's own arithmetic does not model, so
//! the fit check belongs to the sink, not the classifier.

use crate::entry::Entry;
use crate::error::Result;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Append-only archive handle owned by exactly one writer slot at a time.
pub trait OutputSink {
    /// Bytes committed so far, including any container overhead the sink
    /// accounts for.
    fn current_size(&self) -> u64;

    /// Whether an entry of this path and size still fits under the sink's
    /// hard limit. May be stricter than `current_size() + size <= limit`.
    fn can_put(&self, relative_path: &str, size: u64) -> bool;

    /// Append one whole entry.
    fn put(&mut self, entry: &mut dyn Entry) -> Result<()>;

    /// Finalize the archive. Idempotent; further `put` calls are a bug.
    fn close(&mut self) -> Result<()>;
}

/// Creates a sink for a given output path.
pub type SinkFactory = Box<dyn FnMut(&Path) -> Result<Box<dyn OutputSink>>>;

/// Placements observed by [`MemSink`]s, shared across a run.
pub type SinkLedger = Rc<RefCell<Vec<SinkRecord>>>;

/// Final state of one closed in-memory sink.
#[derive(Debug, Clone)]
pub struct SinkRecord {
    pub path: PathBuf,
    pub entries: Vec<(String, u64)>,
    pub total_size: u64,
}

/// In-memory sink with raw size arithmetic and no container overhead.
///
/// Records what was placed where into a shared ledger on close, which keeps
/// the core testable without touching the filesystem.
pub struct MemSink {
    path: PathBuf,
    hard_limit: u64,
    current_size: u64,
    entries: Vec<(String, u64)>,
    ledger: SinkLedger,
    closed: bool,
}

impl MemSink {
    pub fn new(path: &Path, hard_limit: u64, ledger: SinkLedger) -> Self {
        MemSink {
            path: path.to_path_buf(),
            hard_limit,
            current_size: 0,
            entries: Vec::new(),
            ledger,
            closed: false,
        }
    }

    /// A [`SinkFactory`] producing `MemSink`s that report into `ledger`.
    pub fn factory(hard_limit: u64, ledger: SinkLedger) -> SinkFactory {
        Box::new(move |path| Ok(Box::new(MemSink::new(path, hard_limit, Rc::clone(&ledger)))))
    }
}

impl OutputSink for MemSink {
    fn current_size(&self) -> u64 {
        self.current_size
    }

    fn can_put(&self, _relative_path: &str, size: u64) -> bool {
        self.current_size + size <= self.hard_limit
    }

    fn put(&mut self, entry: &mut dyn Entry) -> Result<()> {
        let mut content = Vec::new();
        let copied = entry.copy_to(&mut content)?;
        self.entries
            .push((entry.relative_path().to_string(), entry.size()));
        self.current_size += entry.size();
        debug_assert_eq!(copied, entry.size());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.ledger.borrow_mut().push(SinkRecord {
            path: self.path.clone(),
            entries: std::mem::take(&mut self.entries),
            total_size: self.current_size,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::MemEntry;

    fn ledger() -> SinkLedger {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn tracks_committed_size() {
        let mut sink = MemSink::new(Path::new("out.jar"), 100, ledger());
        let mut entry = MemEntry::new("a.class", vec![0u8; 40]);
        sink.put(&mut entry).unwrap();
        assert_eq!(sink.current_size(), 40);
        assert!(sink.can_put("b.class", 60));
        assert!(!sink.can_put("c.class", 61));
    }

    #[test]
    fn close_reports_to_ledger_once() {
        let ledger = ledger();
        let mut sink = MemSink::new(Path::new("out.jar"), 100, Rc::clone(&ledger));
        sink.put(&mut MemEntry::new("a.class", vec![0u8; 10]))
            .unwrap();
        sink.close().unwrap();
        sink.close().unwrap();

        let records = ledger.borrow();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_size, 10);
        assert_eq!(records[0].entries, vec![("a.class".to_string(), 10)]);
    }
}
