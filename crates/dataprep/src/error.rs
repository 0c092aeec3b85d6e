pub type DataprepResult<T> = Result<T, DataprepError>;

macro_rules! bail {
    ($($arg:tt)*) => {{
        return Err($crate::error::DataprepError::Other(format!($($arg)*)));
    }};
}

pub(crate) use bail;

#[derive(Debug, thiserror::Error)]
pub enum DataprepError {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    /// A field that must be present for every document is missing.
    #[error("missing field `{field}` (line {line})")]
    MissingField { field: String, line: usize },

    /// The field set handed to a record constructor doesn't match the
    /// record's schema.
    #[error("schema violation: {0}")]
    Schema(String),

    #[error("index {index} out of range for axis of length {len}")]
    InvalidIndex { index: usize, len: usize },

    #[error("duplicate index {0}")]
    DuplicateIndex(usize),

    #[error("unknown target field `{0}`")]
    UnknownTarget(String),

    /// Parallel fields disagree on their length.
    #[error("misaligned fields: {0}")]
    Misaligned(String),

    #[error("`{child}` has more than one parent (`{first}`, `{second}`)")]
    ParentConflict {
        child: String,
        first: String,
        second: String,
    },

    #[error("{0}")]
    Other(String),
}

impl DataprepError {
    #[inline]
    pub fn other<T: ToString>(s: T) -> Self {
        Self::Other(s.to_string())
    }

    #[inline]
    pub(crate) fn misaligned<T: ToString>(s: T) -> Self {
        Self::Misaligned(s.to_string())
    }
}
