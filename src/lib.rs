/*!
# Mealbook

Back end for the meal/expense books: finds a user's attendance workbook for a
month and turns it into a meal listing or a monthly allowance calculation.

## Overview

Each user keeps one workbook per half-year. Workbooks live in a blob store
under folders named after the semester, e.g. `2024 하반기/홍길동.xlsx`, and
hold one sheet per month with a row per day: the attendance marker and the
breakfast, lunch and dinner entries (store, amount, payer).

## Pipeline

1. **Semester resolver** - month and year to the `"{year} {상반기|하반기}"` folder
2. **File locator** - lists the folder and keeps the user's `.xlsx`/`.xls` files
3. **Buffer fetcher** - downloads one candidate into memory
4. **Workbook processor** - reads the month's sheet into meals or a calculation

Candidates are tried in listing order; the first one that processes wins and
files that can't be fetched or parsed are skipped.

## Modules

- **semester**: `Month`, `Semester`, `resolve`
- **store**: `BlobStore` trait with local-directory and in-memory backends
- **locator**: user/file-name matching and `locate`
- **fetcher**: `fetch`
- **attendance**: attendance labels and meal records
- **workbook**: sheet/header lookup and row parsing
- **calculation**: monthly aggregation and allowance policies
- **holidays**: holiday sources
- **pipeline**: the end-to-end resolution
- **export**: CSV/XLSX export of meal listings
- **config**: environment-driven settings
- **app**: HTTP routes (feature `web`)

## REST API Endpoints

- `/api/semester?month=&year=` - Semester folder for a month
- `/api/files?name=&month=&year=` - Candidate workbooks for a user
- `/api/meals?name=&month=&year=` - Days with meals
- `/api/calculation?name=&month=&year=` - Monthly calculation
- `/api/meals/export?name=&month=&year=&format=csv|xlsx` - Download the listing
*/

pub mod attendance;
pub mod calculation;
pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod holidays;
pub mod locator;
pub mod pipeline;
pub mod semester;
pub mod store;
pub mod workbook;

#[cfg(feature = "web")]
pub mod app;

/// Re-export everything from these modules to make it easier to use
pub use attendance::*;
pub use calculation::*;
pub use config::*;
pub use error::*;
pub use export::*;
pub use fetcher::*;
pub use holidays::*;
pub use locator::*;
pub use pipeline::*;
pub use semester::*;
pub use store::*;
pub use workbook::*;
