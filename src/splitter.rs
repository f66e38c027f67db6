//! Splitting driver
//!
//! Two passes over the same entry streams: a survey pass sums the sizes of
//! all non-empty entries, then the commit pass classifies each entry as
//! primary or secondary and appends it to the resolved sink. Decisions are
//! irrevocable; once an entry is written there is no backtracking, so the
//! classifier must never let a sink breach the hard limit.

use crate::config::{SplitConfig, SplitStrategy};
use crate::entry::{Entry, EntrySource};
use crate::error::{Result, SplitError};
use crate::rotator::SecondaryRotator;
use crate::scan::ClasspathScanner;
use crate::sink::{OutputSink, SinkFactory};
use crate::zip_sink::ZipSink;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Caller-supplied rule forcing entries into the primary archive.
pub type PrimaryPredicate = Box<dyn Fn(&str) -> bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    NotStarted,
    Running,
    Finished,
}

/// Where one entry is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    Primary,
    Secondary,
}

/// The per-entry placement decision.
///
/// An entry goes to the primary archive if the caller's predicate requires
/// it there, or if everything still unprocessed is guaranteed to fit in the
/// primary under the hard limit and the strategy is greedy. The greedy
/// branch front-loads early entries into secondaries and routes the tail
/// into the primary; that ordering is what makes the output deterministic.
pub(crate) fn classify(
    required: bool,
    strategy: SplitStrategy,
    remaining_total: u64,
    primary_size: u64,
    hard_limit: u64,
) -> Target {
    let can_fit_all_remaining = remaining_total + primary_size <= hard_limit;
    if (can_fit_all_remaining && strategy == SplitStrategy::MaximizePrimary) || required {
        Target::Primary
    } else {
        Target::Secondary
    }
}

/// Single-use splitter over one [`SplitConfig`].
///
/// Owns the entry source and the sink factory; `execute` consumes the
/// instance logically — a second call is a usage error, not a re-run.
pub struct Splitter {
    config: SplitConfig,
    required_in_primary: PrimaryPredicate,
    source: Box<dyn EntrySource>,
    new_sink: SinkFactory,
    state: RunState,
}

impl Splitter {
    /// Splitter writing real zip archives via [`ZipSink`], scanning inputs
    /// with [`ClasspathScanner`].
    pub fn new(config: SplitConfig, required_in_primary: PrimaryPredicate) -> Self {
        let hard_limit = config.hard_limit;
        let report_dir = config.report_dir.clone();
        let new_sink: SinkFactory = Box::new(move |path: &Path| {
            let sink = ZipSink::create(path, hard_limit, report_dir.clone())?;
            Ok(Box::new(sink) as Box<dyn OutputSink>)
        });
        Self::with_parts(
            config,
            required_in_primary,
            Box::new(ClasspathScanner::new()),
            new_sink,
        )
    }

    /// Splitter with a custom entry source and sink factory.
    pub fn with_parts(
        config: SplitConfig,
        required_in_primary: PrimaryPredicate,
        source: Box<dyn EntrySource>,
        new_sink: SinkFactory,
    ) -> Self {
        Splitter {
            config,
            required_in_primary,
            source,
            new_sink,
            state: RunState::NotStarted,
        }
    }

    /// Run the split and return the ordered secondary archive paths.
    ///
    /// Sinks are closed on every exit path; partially written archives are
    /// not rolled back on failure.
    ///
    /// # Errors
    ///
    /// `AlreadyExecuted` when called twice, `EntryTooLarge` for entries no
    /// archive can hold, `PrimaryOverflow` when a required entry cannot be
    /// placed, plus any underlying I/O or archive error.
    pub fn execute(&mut self) -> Result<Vec<PathBuf>> {
        if self.state != RunState::NotStarted {
            return Err(SplitError::AlreadyExecuted);
        }
        self.state = RunState::Running;
        let outcome = self.run();
        self.state = RunState::Finished;
        outcome
    }

    fn run(&mut self) -> Result<Vec<PathBuf>> {
        let mut remaining_total = self.survey()?;
        info!(total_bytes = remaining_total, "size survey complete");

        if let Some(parent) = self.config.primary_out.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::create_dir_all(&self.config.secondary_dir)?;

        let mut primary = (self.new_sink)(&self.config.primary_out)?;
        let mut rotator = SecondaryRotator::new(&self.config);

        let outcome = self.process_inputs(&mut primary, &mut rotator, &mut remaining_total);

        // Sinks close on the failure path too, before the error surfaces.
        let primary_closed = primary.close();
        let rotator_closed = rotator.close();
        outcome?;
        primary_closed?;
        rotator_closed?;

        let secondaries = rotator.into_finalized();
        info!(
            primary = %self.config.primary_out.display(),
            secondaries = secondaries.len(),
            "split complete"
        );
        Ok(secondaries)
    }

    /// Survey pass: sum of all positive entry sizes across every unit.
    fn survey(&self) -> Result<u64> {
        debug!("traversing inputs (survey pass)");
        let mut total: u64 = 0;
        for unit in &self.config.inputs {
            self.source.for_each_entry(unit, &mut |entry| {
                let size = entry.size();
                if size > 0 {
                    total += size;
                }
                Ok(())
            })?;
        }
        Ok(total)
    }

    fn process_inputs(
        &mut self,
        primary: &mut Box<dyn OutputSink>,
        rotator: &mut SecondaryRotator,
        remaining_total: &mut u64,
    ) -> Result<()> {
        let Splitter {
            config,
            required_in_primary,
            source,
            new_sink,
            ..
        } = self;

        for unit in &config.inputs {
            debug!(unit = %unit.display(), "traversing input unit");
            source.for_each_entry(unit, &mut |entry| {
                process_entry(
                    entry,
                    config,
                    required_in_primary.as_ref(),
                    new_sink,
                    primary.as_mut(),
                    rotator,
                    remaining_total,
                )
            })?;
            // Soft-limit rotation happens only between units, never inside
            // one, so entries from the same compilation unit stay together.
            rotator.rotate_if_past_soft_limit(config.soft_limit)?;
        }
        Ok(())
    }
}

fn process_entry(
    entry: &mut dyn Entry,
    config: &SplitConfig,
    required_in_primary: &dyn Fn(&str) -> bool,
    new_sink: &mut SinkFactory,
    primary: &mut dyn OutputSink,
    rotator: &mut SecondaryRotator,
    remaining_total: &mut u64,
) -> Result<()> {
    let size = entry.size();
    if size == 0 {
        // Empty markers skip classification and the counters entirely; they
        // are copied through to the primary archive in stream order.
        return primary.put(entry);
    }
    if size > config.hard_limit {
        return Err(SplitError::EntryTooLarge {
            path: entry.relative_path().to_string(),
            size,
            hard_limit: config.hard_limit,
        });
    }

    let relative_path = entry.relative_path().to_string();
    let required = required_in_primary(&relative_path);
    let target = classify(
        required,
        config.strategy,
        *remaining_total,
        primary.current_size(),
        config.hard_limit,
    );

    match target {
        Target::Primary => {
            if !primary.can_put(&relative_path, size) {
                return Err(SplitError::PrimaryOverflow {
                    path: relative_path,
                });
            }
            debug!(path = %relative_path, size, "committing to primary");
            primary.put(entry)?;
        }
        Target::Secondary => {
            debug!(path = %relative_path, size, "committing to secondary");
            let sink = rotator.sink_for_entry(new_sink, &relative_path, size)?;
            sink.put(entry)?;
        }
    }

    *remaining_total = remaining_total
        .checked_sub(size)
        .ok_or_else(|| SplitError::SizeAccounting {
            path: relative_path,
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CanaryStrategy;
    use crate::entry::MemEntry;
    use crate::sink::{MemSink, SinkLedger, SinkRecord};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Entry source backed by in-memory units.
    struct VecSource {
        units: Vec<(PathBuf, Vec<MemEntry>)>,
    }

    impl EntrySource for VecSource {
        fn for_each_entry(
            &self,
            unit: &Path,
            visit: &mut crate::entry::EntryVisitor<'_>,
        ) -> Result<()> {
            let (_, entries) = self
                .units
                .iter()
                .find(|(path, _)| path == unit)
                .ok_or_else(|| SplitError::UnsupportedUnit(unit.display().to_string()))?;
            for entry in entries {
                let mut entry = entry.clone();
                visit(&mut entry)?;
            }
            Ok(())
        }
    }

    struct Fixture {
        splitter: Splitter,
        ledger: SinkLedger,
    }

    fn fixture(
        config: SplitConfig,
        required: PrimaryPredicate,
        units: Vec<(&str, Vec<MemEntry>)>,
    ) -> Fixture {
        let ledger: SinkLedger = Rc::new(RefCell::new(Vec::new()));
        let hard_limit = config.hard_limit;
        let source = VecSource {
            units: units
                .into_iter()
                .map(|(unit, entries)| (PathBuf::from(unit), entries))
                .collect(),
        };
        let splitter = Splitter::with_parts(
            config,
            required,
            Box::new(source),
            MemSink::factory(hard_limit, Rc::clone(&ledger)),
        );
        Fixture { splitter, ledger }
    }

    fn base_config() -> SplitConfig {
        SplitConfig::builder()
            .input("unit-a")
            .primary_out("out/primary.jar")
            .secondary_dir("out")
            .soft_limit(800)
            .hard_limit(1000)
            .build()
            .unwrap()
    }

    fn entries_of(record: &SinkRecord) -> Vec<&str> {
        record.entries.iter().map(|(path, _)| path.as_str()).collect()
    }

    fn never_required() -> PrimaryPredicate {
        Box::new(|_| false)
    }

    #[test]
    fn classify_greedy_branch_requires_maximize_strategy() {
        assert_eq!(
            classify(false, SplitStrategy::MaximizePrimary, 900, 0, 1000),
            Target::Primary
        );
        assert_eq!(
            classify(false, SplitStrategy::MinimizePrimary, 900, 0, 1000),
            Target::Secondary
        );
        assert_eq!(
            classify(false, SplitStrategy::MaximizePrimary, 1200, 0, 1000),
            Target::Secondary
        );
    }

    #[test]
    fn classify_required_overrides_everything() {
        assert_eq!(
            classify(true, SplitStrategy::MinimizePrimary, 10_000, 999, 1000),
            Target::Primary
        );
    }

    #[test]
    fn worked_example_trace() {
        // hard=1000, soft=800, MAXIMIZE_PRIMARY, five 300-byte entries:
        // E1 and E2 spill to the first secondary, E3..E5 land in primary.
        let entries = (1..=5)
            .map(|i| MemEntry::new(format!("E{i}.class"), vec![0u8; 300]))
            .collect();
        let mut fx = fixture(base_config(), never_required(), vec![("unit-a", entries)]);

        let secondaries = fx.splitter.execute().unwrap();
        assert_eq!(secondaries.len(), 1);
        assert_eq!(secondaries[0], PathBuf::from("out/secondary-1.jar"));

        let records = fx.ledger.borrow();
        let primary = &records[0];
        assert_eq!(primary.path, PathBuf::from("out/primary.jar"));
        assert_eq!(
            entries_of(primary),
            vec!["E3.class", "E4.class", "E5.class"]
        );
        assert_eq!(primary.total_size, 900);

        let secondary = &records[1];
        assert_eq!(entries_of(secondary), vec!["E1.class", "E2.class"]);
        assert_eq!(secondary.total_size, 600);
    }

    #[test]
    fn repeated_runs_classify_identically() {
        let entries: Vec<MemEntry> = (0..12)
            .map(|i| MemEntry::new(format!("c/{i}.class"), vec![0u8; 140 + (i * 37) % 200]))
            .collect();

        let run = || {
            let mut fx = fixture(
                base_config(),
                never_required(),
                vec![("unit-a", entries.clone())],
            );
            fx.splitter.execute().unwrap();
            let records = fx.ledger.borrow();
            records
                .iter()
                .map(|r| (r.path.clone(), r.entries.clone()))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn minimize_primary_routes_everything_to_secondaries() {
        let config = SplitConfig::builder()
            .input("unit-a")
            .primary_out("out/primary.jar")
            .secondary_dir("out")
            .soft_limit(800)
            .hard_limit(1000)
            .strategy(SplitStrategy::MinimizePrimary)
            .build()
            .unwrap();
        let entries = (1..=5)
            .map(|i| MemEntry::new(format!("E{i}.class"), vec![0u8; 300]))
            .collect();
        let mut fx = fixture(config, never_required(), vec![("unit-a", entries)]);

        let secondaries = fx.splitter.execute().unwrap();
        assert_eq!(secondaries.len(), 2);

        let records = fx.ledger.borrow();
        assert_eq!(records[0].total_size, 0, "primary stays empty");
        assert_eq!(records[1].total_size, 900);
        assert_eq!(records[2].total_size, 600);
    }

    #[test]
    fn required_entries_force_primary_under_minimize() {
        let config = SplitConfig::builder()
            .input("unit-a")
            .primary_out("out/primary.jar")
            .secondary_dir("out")
            .soft_limit(800)
            .hard_limit(1000)
            .strategy(SplitStrategy::MinimizePrimary)
            .build()
            .unwrap();
        let entries = vec![
            MemEntry::new("app/Main.class", vec![0u8; 200]),
            MemEntry::new("lib/Util.class", vec![0u8; 200]),
        ];
        let required: PrimaryPredicate = Box::new(|path| path.starts_with("app/"));
        let mut fx = fixture(config, required, vec![("unit-a", entries)]);

        fx.splitter.execute().unwrap();
        let records = fx.ledger.borrow();
        assert_eq!(entries_of(&records[0]), vec!["app/Main.class"]);
        assert_eq!(entries_of(&records[1]), vec!["lib/Util.class"]);
    }

    #[test]
    fn unfittable_required_entry_fails_the_run() {
        let entries = (1..=5)
            .map(|i| MemEntry::new(format!("E{i}.class"), vec![0u8; 300]))
            .collect();
        let required: PrimaryPredicate = Box::new(|_| true);
        let mut fx = fixture(base_config(), required, vec![("unit-a", entries)]);

        let err = fx.splitter.execute().unwrap_err();
        assert!(matches!(err, SplitError::PrimaryOverflow { .. }));
        // Cleanup still ran: the primary sink was closed and reported.
        assert!(!fx.ledger.borrow().is_empty());
    }

    #[test]
    fn oversized_entry_fails_regardless_of_strategy() {
        let entries = vec![MemEntry::new("huge.class", vec![0u8; 1500])];
        let mut fx = fixture(base_config(), never_required(), vec![("unit-a", entries)]);

        let err = fx.splitter.execute().unwrap_err();
        assert!(matches!(
            err,
            SplitError::EntryTooLarge { size: 1500, .. }
        ));
    }

    #[test]
    fn second_execute_is_a_usage_error() {
        let entries = vec![MemEntry::new("a.class", vec![0u8; 10])];
        let mut fx = fixture(base_config(), never_required(), vec![("unit-a", entries)]);

        fx.splitter.execute().unwrap();
        let err = fx.splitter.execute().unwrap_err();
        assert!(matches!(err, SplitError::AlreadyExecuted));
    }

    #[test]
    fn execute_after_failure_is_still_consumed() {
        let entries = vec![MemEntry::new("huge.class", vec![0u8; 1500])];
        let mut fx = fixture(base_config(), never_required(), vec![("unit-a", entries)]);

        assert!(fx.splitter.execute().is_err());
        let err = fx.splitter.execute().unwrap_err();
        assert!(matches!(err, SplitError::AlreadyExecuted));
    }

    #[test]
    fn zero_size_entries_bypass_classification() {
        // Same totals as the worked example, but a directory marker leads
        // the stream: it lands in primary even while E1 spills.
        let mut entries = vec![MemEntry::new("META-INF/", Vec::new())];
        entries.extend((1..=5).map(|i| MemEntry::new(format!("E{i}.class"), vec![0u8; 300])));
        let mut fx = fixture(base_config(), never_required(), vec![("unit-a", entries)]);

        fx.splitter.execute().unwrap();
        let records = fx.ledger.borrow();
        let primary = &records[0];
        assert_eq!(
            entries_of(primary),
            vec!["META-INF/", "E3.class", "E4.class", "E5.class"]
        );
        assert_eq!(primary.total_size, 900, "marker does not count");
    }

    #[test]
    fn soft_limit_rotates_between_units_only() {
        let config = SplitConfig::builder()
            .input("unit-a")
            .input("unit-b")
            .primary_out("out/primary.jar")
            .secondary_dir("out")
            .soft_limit(500)
            .hard_limit(1000)
            .strategy(SplitStrategy::MinimizePrimary)
            .build()
            .unwrap();
        let unit_a = vec![
            MemEntry::new("a1.class", vec![0u8; 300]),
            MemEntry::new("a2.class", vec![0u8; 300]),
        ];
        let unit_b = vec![MemEntry::new("b1.class", vec![0u8; 100])];
        let mut fx = fixture(
            config,
            never_required(),
            vec![("unit-a", unit_a), ("unit-b", unit_b)],
        );

        let secondaries = fx.splitter.execute().unwrap();
        assert_eq!(secondaries.len(), 2);

        let records = fx.ledger.borrow();
        // unit-a stayed whole in secondary-1 (600 > soft limit, under hard),
        // rotation happened at the unit boundary.
        assert_eq!(entries_of(&records[1]), vec!["a1.class", "a2.class"]);
        assert_eq!(entries_of(&records[2]), vec!["b1.class"]);
    }

    #[test]
    fn canary_strategy_flows_through_the_driver() {
        let config = SplitConfig::builder()
            .input("unit-a")
            .primary_out("out/primary.jar")
            .secondary_dir("out")
            .soft_limit(800)
            .hard_limit(1000)
            .strategy(SplitStrategy::MinimizePrimary)
            .canary(CanaryStrategy::Include)
            .build()
            .unwrap();
        let entries = vec![MemEntry::new("a.class", vec![0u8; 100])];
        let mut fx = fixture(config, never_required(), vec![("unit-a", entries)]);

        fx.splitter.execute().unwrap();
        let records = fx.ledger.borrow();
        assert!(entries_of(&records[1]).contains(&"secondary-1/Canary.marker"));
    }
}
