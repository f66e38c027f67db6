//! Split configuration
//!
//! A [`SplitConfig`] is built once per invocation, validated, and read-only
//! for the duration of the run.

use crate::error::{Result, SplitError};
use std::path::PathBuf;

/// Policy governing how aggressively the primary archive is filled before
/// spilling into secondaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Greedily route entries to the primary archive as soon as everything
    /// still unprocessed is guaranteed to fit there.
    MaximizePrimary,
    /// Only entries matching the required-in-primary predicate go to the
    /// primary archive.
    MinimizePrimary,
}

/// Whether finalized secondary archives receive a synthetic canary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanaryStrategy {
    None,
    /// Inject one deterministic placeholder entry into every secondary
    /// archive before it is closed, so each is non-empty and identifiable.
    Include,
}

/// Immutable configuration for one splitter run.
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Input units (directories or zip/jar archives), processed in order.
    pub inputs: Vec<PathBuf>,
    /// Path of the mandatory primary archive.
    pub primary_out: PathBuf,
    /// Directory receiving secondary archives.
    pub secondary_dir: PathBuf,
    /// Secondary archive file name pattern with one `{}` index placeholder,
    /// e.g. `secondary-{}.jar`.
    pub secondary_pattern: String,
    /// Size threshold that triggers rotation of the current secondary
    /// archive at the next input-unit boundary.
    pub soft_limit: u64,
    /// Absolute maximum committed size of any single archive.
    pub hard_limit: u64,
    pub strategy: SplitStrategy,
    pub canary: CanaryStrategy,
    /// Optional directory for per-archive manifests; write-only.
    pub report_dir: Option<PathBuf>,
}

impl SplitConfig {
    pub fn builder() -> SplitConfigBuilder {
        SplitConfigBuilder::new()
    }

    /// File name of the secondary archive with the given index.
    pub fn secondary_name(&self, index: u32) -> String {
        self.secondary_pattern.replacen("{}", &index.to_string(), 1)
    }

    fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(SplitError::InvalidConfig(
                "at least one input unit is required".to_string(),
            ));
        }
        if self.hard_limit == 0 {
            return Err(SplitError::InvalidConfig(
                "hard limit must be positive".to_string(),
            ));
        }
        if self.soft_limit == 0 {
            return Err(SplitError::InvalidConfig(
                "soft limit must be positive".to_string(),
            ));
        }
        if self.soft_limit > self.hard_limit {
            return Err(SplitError::InvalidConfig(format!(
                "soft limit {} exceeds hard limit {}",
                self.soft_limit, self.hard_limit
            )));
        }
        if self.secondary_pattern.matches("{}").count() != 1 {
            return Err(SplitError::InvalidPattern(self.secondary_pattern.clone()));
        }
        Ok(())
    }
}

/// Fluent builder for [`SplitConfig`].
///
/// # Examples
///
/// ```
/// use zipshard_rs::SplitConfig;
///
/// let config = SplitConfig::builder()
///     .input("build/classes")
///     .primary_out("out/primary.jar")
///     .secondary_dir("out/secondary")
///     .soft_limit(50 * 1024 * 1024)
///     .hard_limit(64 * 1024 * 1024)
///     .build()
///     .unwrap();
/// assert_eq!(config.secondary_name(1), "secondary-1.jar");
/// ```
pub struct SplitConfigBuilder {
    inputs: Vec<PathBuf>,
    primary_out: Option<PathBuf>,
    secondary_dir: Option<PathBuf>,
    secondary_pattern: String,
    soft_limit: u64,
    hard_limit: u64,
    strategy: SplitStrategy,
    canary: CanaryStrategy,
    report_dir: Option<PathBuf>,
}

impl SplitConfigBuilder {
    pub fn new() -> Self {
        SplitConfigBuilder {
            inputs: Vec::new(),
            primary_out: None,
            secondary_dir: None,
            secondary_pattern: "secondary-{}.jar".to_string(),
            soft_limit: 0,
            hard_limit: 0,
            strategy: SplitStrategy::MaximizePrimary,
            canary: CanaryStrategy::None,
            report_dir: None,
        }
    }

    /// Append one input unit; units are processed in the order given.
    pub fn input<P: Into<PathBuf>>(mut self, unit: P) -> Self {
        self.inputs.push(unit.into());
        self
    }

    /// Append several input units at once.
    pub fn inputs<I, P>(mut self, units: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.inputs.extend(units.into_iter().map(Into::into));
        self
    }

    pub fn primary_out<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.primary_out = Some(path.into());
        self
    }

    pub fn secondary_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.secondary_dir = Some(dir.into());
        self
    }

    pub fn secondary_pattern<S: Into<String>>(mut self, pattern: S) -> Self {
        self.secondary_pattern = pattern.into();
        self
    }

    pub fn soft_limit(mut self, bytes: u64) -> Self {
        self.soft_limit = bytes;
        self
    }

    pub fn hard_limit(mut self, bytes: u64) -> Self {
        self.hard_limit = bytes;
        self
    }

    pub fn strategy(mut self, strategy: SplitStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn canary(mut self, canary: CanaryStrategy) -> Self {
        self.canary = canary;
        self
    }

    pub fn report_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.report_dir = Some(dir.into());
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when required fields are missing, limits are
    /// zero or misordered, and `InvalidPattern` when the secondary pattern
    /// does not contain exactly one `{}` placeholder.
    pub fn build(self) -> Result<SplitConfig> {
        let primary_out = self.primary_out.ok_or_else(|| {
            SplitError::InvalidConfig("primary output path must be set".to_string())
        })?;
        let secondary_dir = self.secondary_dir.ok_or_else(|| {
            SplitError::InvalidConfig("secondary output directory must be set".to_string())
        })?;

        let config = SplitConfig {
            inputs: self.inputs,
            primary_out,
            secondary_dir,
            secondary_pattern: self.secondary_pattern,
            soft_limit: self.soft_limit,
            hard_limit: self.hard_limit,
            strategy: self.strategy,
            canary: self.canary,
            report_dir: self.report_dir,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for SplitConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
