use thiserror::Error;

/// Coarse classification shared by every error the pipeline can return.
///
/// The route layer only looks at the kind when picking a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad month, year or name supplied by the caller.
    Validation,
    /// No semester folder, no matching file, or the file vanished.
    NotFound,
    /// A file exists but doesn't have the expected sheet/columns.
    Malformed,
    /// The blob store could not be reached.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required parameter `{0}`")]
    Missing(&'static str),
    #[error("month must be an integer between 1 and 12, got `{0}`")]
    InvalidMonth(String),
    #[error("year must be an integer between 2000 and 2100, got `{0}`")]
    InvalidYear(String),
    #[error("name must not be blank")]
    BlankName,
    #[error("unsupported export format `{0}`")]
    InvalidFormat(String),
}

/// Errors surfaced by a [`crate::store::BlobStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Unavailable(_) => ErrorKind::Unavailable,
        }
    }
}

/// A workbook that can't be read as an attendance workbook.
///
/// Every variant is the "malformed workbook" class: the file is skipped and
/// the next candidate tried. A day with no data is never an error.
#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("failed to read workbook: {0}")]
    Unreadable(#[from] calamine::Error),
    #[error("no sheet for month {month}")]
    MissingSheet { month: u32 },
    #[error("sheet `{sheet}` has no header row")]
    MissingHeader { sheet: String },
    #[error("sheet `{sheet}` is missing columns: {}", .columns.join(", "))]
    MissingColumns {
        sheet: String,
        columns: Vec<&'static str>,
    },
}

/// Why a single candidate file was skipped.
#[derive(Debug, Error)]
pub enum CandidateError {
    #[error("`{path}`: {source}")]
    Fetch {
        path: String,
        #[source]
        source: StoreError,
    },
    #[error("`{path}`: {source}")]
    Workbook {
        path: String,
        #[source]
        source: WorkbookError,
    },
}

impl CandidateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CandidateError::Fetch { source, .. } => source.kind(),
            CandidateError::Workbook { .. } => ErrorKind::Malformed,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no workbook for `{user}` under `{folder}`")]
    NotFound { user: String, folder: String },
    #[error("none of {tried} candidate workbook(s) could be used, last error: {last}")]
    Exhausted {
        tried: usize,
        #[source]
        last: CandidateError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::NotFound { .. } => ErrorKind::NotFound,
            PipelineError::Exhausted { last, .. } => last.kind(),
            PipelineError::Store(err) => err.kind(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[error("failed to read holiday file `{path}`: {source}")]
    HolidayFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse holiday file `{path}`: {source}")]
    HolidayParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_kind_follows_last_error() {
        let malformed = PipelineError::Exhausted {
            tried: 2,
            last: CandidateError::Workbook {
                path: "a.xlsx".to_string(),
                source: WorkbookError::MissingSheet { month: 3 },
            },
        };
        assert_eq!(malformed.kind(), ErrorKind::Malformed);

        let vanished = PipelineError::Exhausted {
            tried: 1,
            last: CandidateError::Fetch {
                path: "a.xlsx".to_string(),
                source: StoreError::NotFound("a.xlsx".to_string()),
            },
        };
        assert_eq!(vanished.kind(), ErrorKind::NotFound);

        let down = PipelineError::Exhausted {
            tried: 1,
            last: CandidateError::Fetch {
                path: "a.xlsx".to_string(),
                source: StoreError::Unavailable("timeout".to_string()),
            },
        };
        assert_eq!(down.kind(), ErrorKind::Unavailable);
    }

    #[test]
    fn test_missing_columns_message_lists_columns() {
        let err = WorkbookError::MissingColumns {
            sheet: "7월".to_string(),
            columns: vec!["조식금액", "석식결제자"],
        };
        assert_eq!(
            err.to_string(),
            "sheet `7월` is missing columns: 조식금액, 석식결제자"
        );
    }
}
