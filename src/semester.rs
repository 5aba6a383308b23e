use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// A calendar month in `1..=12`.
///
/// Raw input goes through [`Month::new`] (or `parse`), so every function
/// taking a `Month` can rely on the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Month(u32);

impl Month {
    pub fn new(month: u32) -> Result<Self, ValidationError> {
        if (1..=12).contains(&month) {
            Ok(Month(month))
        } else {
            Err(ValidationError::InvalidMonth(month.to_string()))
        }
    }

    /// Parse a month from a query string or command line argument.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        let month = trimmed
            .parse::<u32>()
            .map_err(|_| ValidationError::InvalidMonth(trimmed.to_string()))?;
        Self::new(month)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Half-year storage partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Semester {
    #[serde(rename = "상반기")]
    FirstHalf,
    #[serde(rename = "하반기")]
    SecondHalf,
}

impl Semester {
    pub fn from_month(month: Month) -> Self {
        if month.get() <= 6 {
            Semester::FirstHalf
        } else {
            Semester::SecondHalf
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Semester::FirstHalf => "상반기",
            Semester::SecondHalf => "하반기",
        }
    }
}

/// Where a user's workbook for a given month lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterInfo {
    pub semester: Semester,
    pub folder_name: String,
    pub current_year: i32,
}

impl SemesterInfo {
    /// Listing prefix for this semester's folder inside the blob store.
    ///
    /// # Arguments
    /// * `root` - Optional folder the semester folders live under (may be empty)
    ///
    /// # Returns
    /// * `String` - `"{root}/{folder_name}/"`, or `"{folder_name}/"` without a root
    pub fn folder_path(&self, root: &str) -> String {
        let root = root.trim_matches('/');
        if root.is_empty() {
            format!("{}/", self.folder_name)
        } else {
            format!("{}/{}/", root, self.folder_name)
        }
    }
}

/// Resolve the semester folder for a month
///
/// Months 1–6 fall into the first half ("상반기") and 7–12 into the second
/// half ("하반기"). The folder is named `"{year} {semester}"`.
///
/// # Arguments
/// * `month` - Calendar month
/// * `year` - Calendar year, defaults to the current local year
///
/// # Returns
/// * `SemesterInfo` - The semester, folder name and year used
///
/// # Examples
/// ```
/// use mealbook::semester::{resolve, Month, Semester};
///
/// let info = resolve(Month::new(7).unwrap(), Some(2024));
/// assert_eq!(info.semester, Semester::SecondHalf);
/// assert_eq!(info.folder_name, "2024 하반기");
/// ```
pub fn resolve(month: Month, year: Option<i32>) -> SemesterInfo {
    let current_year = year.unwrap_or_else(|| Local::now().year());
    let semester = Semester::from_month(month);

    SemesterInfo {
        semester,
        folder_name: format!("{} {}", current_year, semester.label()),
        current_year,
    }
}
