//! Semester → candidate files → bytes → processed workbook.

use std::sync::Arc;

use crate::attendance::MealRecord;
use crate::calculation::{AllowancePolicy, CalculationResult};
use crate::error::{CandidateError, PipelineError, WorkbookError};
use crate::fetcher::fetch;
use crate::holidays::Holiday;
use crate::locator::{FileDescriptor, locate};
use crate::semester::{Month, SemesterInfo, resolve};
use crate::store::BlobStore;
use crate::workbook::{
    Period, ProcessMode, ProcessOutput, process, read_calculation, read_meals,
};

/// Resolves and processes users' workbooks from one blob store.
///
/// Holds no per-request state; one instance is shared by every request.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn BlobStore>,
    root: String,
}

/// A successfully processed workbook and the file it came from.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub semester: SemesterInfo,
    pub file: FileDescriptor,
    pub output: T,
}

impl Pipeline {
    /// `root` is the folder the semester folders live under; empty for the
    /// store's top level.
    pub fn new(store: Arc<dyn BlobStore>, root: impl Into<String>) -> Self {
        Self {
            store,
            root: root.into(),
        }
    }

    /// Resolve the semester folder and list the user's candidate workbooks.
    pub async fn find_files(
        &self,
        user: &str,
        month: Month,
        year: Option<i32>,
    ) -> Result<(SemesterInfo, Vec<FileDescriptor>), PipelineError> {
        let semester = resolve(month, year);
        let folder = semester.folder_path(&self.root);
        let files = locate(self.store.as_ref(), &folder, user).await?;
        Ok((semester, files))
    }

    /// Run the whole pipeline for one user and month.
    pub async fn run(
        &self,
        user: &str,
        month: Month,
        year: Option<i32>,
        mode: ProcessMode<'_>,
    ) -> Result<Resolved<ProcessOutput>, PipelineError> {
        self.resolve_with(user, month, year, |buffer, period| {
            process(buffer, period, mode)
        })
        .await
    }

    pub async fn meals(
        &self,
        user: &str,
        month: Month,
        year: Option<i32>,
    ) -> Result<Resolved<Vec<MealRecord>>, PipelineError> {
        self.resolve_with(user, month, year, read_meals).await
    }

    pub async fn calculation(
        &self,
        user: &str,
        month: Month,
        year: Option<i32>,
        holidays: &[Holiday],
        allowance: &dyn AllowancePolicy,
    ) -> Result<Resolved<CalculationResult>, PipelineError> {
        self.resolve_with(user, month, year, |buffer, period| {
            read_calculation(buffer, period, holidays, allowance)
        })
        .await
    }

    /// Candidates are tried one at a time in listing order. A candidate that
    /// can't be fetched or processed is skipped and its error kept; the first
    /// that processes wins.
    async fn resolve_with<T, F>(
        &self,
        user: &str,
        month: Month,
        year: Option<i32>,
        processor: F,
    ) -> Result<Resolved<T>, PipelineError>
    where
        F: Fn(&[u8], Period) -> Result<T, WorkbookError>,
    {
        // Resolve the folder and list the user's files
        let (semester, candidates) = self.find_files(user, month, year).await?;
        let folder = semester.folder_path(&self.root);
        let period = Period::new(semester.current_year, month);
        let tried = candidates.len();

        // Try each candidate in listing order
        let mut last_error = None;
        for file in candidates {
            match self.try_candidate(&file, period, &processor).await {
                Ok(output) => {
                    return Ok(Resolved {
                        semester,
                        file,
                        output,
                    });
                }
                Err(err) => {
                    log::debug!("skipping candidate for `{}`: {}", user, err);
                    last_error = Some(err);
                }
            }
        }

        // Nothing listed is "not found"; otherwise report the last failure
        Err(match last_error {
            Some(last) => PipelineError::Exhausted { tried, last },
            None => PipelineError::NotFound {
                user: user.to_string(),
                folder,
            },
        })
    }

    async fn try_candidate<T, F>(
        &self,
        file: &FileDescriptor,
        period: Period,
        processor: &F,
    ) -> Result<T, CandidateError>
    where
        F: Fn(&[u8], Period) -> Result<T, WorkbookError>,
    {
        let buffer = fetch(self.store.as_ref(), &file.full_path)
            .await
            .map_err(|source| CandidateError::Fetch {
                path: file.full_path.clone(),
                source,
            })?;

        processor(&buffer, period).map_err(|source| CandidateError::Workbook {
            path: file.full_path.clone(),
            source,
        })
    }
}
