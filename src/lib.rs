//! # Zipshard - Deterministic Size-Capped Archive Splitter
//!
//! `zipshard-rs` partitions a large collection of compiled-code entries into
//! one mandatory primary archive and zero or more secondary archives, for
//! target runtimes that cap how much a single archive may hold:
//!
//! - **Hard limit enforcement**: no produced archive ever exceeds the cap
//! - **Required-in-primary predicate**: entry-point classes always land in
//!   the primary archive or the run fails
//! - **Deterministic packing**: identical inputs produce identical archives
//! - **Canary entries**: every secondary archive can be made non-empty and
//!   individually identifiable
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use zipshard_rs::{CanaryStrategy, SplitConfig, Splitter};
//!
//! # fn main() -> zipshard_rs::Result<()> {
//! let config = SplitConfig::builder()
//!     .input("build/classes")
//!     .input("build/libs/deps.jar")
//!     .primary_out("out/primary.jar")
//!     .secondary_dir("out/secondary")
//!     .soft_limit(50 * 1024 * 1024)
//!     .hard_limit(64 * 1024 * 1024)
//!     .canary(CanaryStrategy::Include)
//!     .build()?;
//!
//! let mut splitter = Splitter::new(
//!     config,
//!     Box::new(|path| path.starts_with("com/app/boot/")),
//! );
//! let secondaries = splitter.execute()?;
//! for path in &secondaries {
//!     println!("secondary archive: {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The split is greedy and online: once everything still unprocessed is
//! guaranteed to fit in the primary archive, every following entry is routed
//! there. Decisions are irrevocable; there is no re-balancing after an
//! archive is finalized.

pub mod config;
pub mod entry;
pub mod error;
pub mod report;
pub mod rotator;
pub mod scan;
pub mod sink;
pub mod splitter;
pub mod zip_sink;

pub use crate::config::{CanaryStrategy, SplitConfig, SplitConfigBuilder, SplitStrategy};
pub use crate::entry::{Entry, EntrySource, EntryVisitor, MemEntry};
pub use crate::error::{Result, SplitError};
pub use crate::report::{ArchiveManifest, ManifestEntry};
pub use crate::rotator::SecondaryRotator;
pub use crate::scan::ClasspathScanner;
pub use crate::sink::{MemSink, OutputSink, SinkFactory, SinkLedger, SinkRecord};
pub use crate::splitter::{PrimaryPredicate, Splitter};
pub use crate::zip_sink::ZipSink;
