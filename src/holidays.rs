use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::semester::Month;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub name: String,
    pub date: NaiveDate,
}

/// Source of official holidays used by the calculation.
#[async_trait]
pub trait HolidaySource: Send + Sync {
    /// Holidays falling in the given month, ordered by date.
    async fn holidays(&self, year: i32, month: Month) -> Vec<Holiday>;
}

pub struct NoHolidays;

#[async_trait]
impl HolidaySource for NoHolidays {
    async fn holidays(&self, _year: i32, _month: Month) -> Vec<Holiday> {
        Vec::new()
    }
}

/// Fixed holiday list, typically loaded once from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct StaticHolidays {
    holidays: Vec<Holiday>,
}

impl StaticHolidays {
    pub fn new(mut holidays: Vec<Holiday>) -> Self {
        holidays.sort_by_key(|h| h.date);
        Self { holidays }
    }

    /// Load a JSON array of `{ "name": ..., "date": "YYYY-MM-DD" }`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::HolidayFile {
            path: display.clone(),
            source,
        })?;
        let holidays: Vec<Holiday> = serde_json::from_str(&data)
            .map_err(|source| ConfigError::HolidayParse {
                path: display,
                source,
            })?;
        Ok(Self::new(holidays))
    }

    pub fn len(&self) -> usize {
        self.holidays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holidays.is_empty()
    }
}

#[async_trait]
impl HolidaySource for StaticHolidays {
    async fn holidays(&self, year: i32, month: Month) -> Vec<Holiday> {
        self.holidays
            .iter()
            .filter(|h| h.date.year() == year && h.date.month() == month.get())
            .cloned()
            .collect()
    }
}
