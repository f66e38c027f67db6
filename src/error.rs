use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("Single entry larger than the hard limit: {path} ({size} > {hard_limit} bytes)")]
    EntryTooLarge {
        path: String,
        size: u64,
        hard_limit: u64,
    },

    #[error("Unable to fit all required files in the primary archive: {path}")]
    PrimaryOverflow { path: String },

    #[error("Splitter instance already executed; create a new one per run")]
    AlreadyExecuted,

    #[error("Invalid split configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid secondary name pattern: {0} (must contain exactly one {{}} placeholder)")]
    InvalidPattern(String),

    #[error("Size accounting underflow while committing {path}")]
    SizeAccounting { path: String },

    #[error("Input unit is neither a directory nor a zip archive: {0}")]
    UnsupportedUnit(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SplitError>;
