use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};
use chrono::{Datelike, Days, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::io::Cursor;

use crate::attendance::{AttendanceStatus, MealEntry, MealRecord};
use crate::calculation::{AllowancePolicy, CalculationResult, calculate};
use crate::error::WorkbookError;
use crate::holidays::Holiday;
use crate::semester::Month;

lazy_static! {
    static ref NUMBER_REGEX: Regex = Regex::new(r"[0-9]+").unwrap();
    static ref AMOUNT_REGEX: Regex = Regex::new(r"-?[0-9][0-9,]*").unwrap();
}

/// The header row must appear within this many rows from the top.
const HEADER_SCAN_ROWS: usize = 10;

static EMPTY_CELL: Data = Data::Empty;

const DATE_HEADERS: &[&str] = &["날짜", "일자"];
const ATTENDANCE_HEADERS: &[&str] = &["근태", "근무형태", "출근여부"];

struct MealHeaders {
    store: &'static [&'static str],
    amount: &'static [&'static str],
    payer: &'static [&'static str],
}

const BREAKFAST_HEADERS: MealHeaders = MealHeaders {
    store: &["조식식당", "조식상호"],
    amount: &["조식금액"],
    payer: &["조식결제자"],
};
const LUNCH_HEADERS: MealHeaders = MealHeaders {
    store: &["중식식당", "중식상호"],
    amount: &["중식금액"],
    payer: &["중식결제자"],
};
const DINNER_HEADERS: MealHeaders = MealHeaders {
    store: &["석식식당", "석식상호"],
    amount: &["석식금액"],
    payer: &["석식결제자"],
};

/// Year and month a workbook is read for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub year: i32,
    pub month: Month,
}

impl Period {
    pub fn new(year: i32, month: Month) -> Self {
        Self { year, month }
    }
}

#[derive(Clone, Copy)]
pub enum ProcessMode<'a> {
    Meals,
    Calculation {
        holidays: &'a [Holiday],
        allowance: &'a dyn AllowancePolicy,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProcessOutput {
    Meals(Vec<MealRecord>),
    Calculation(CalculationResult),
}

/// Process an attendance workbook
///
/// Reads the month's sheet and either lists the days with meals or
/// aggregates the month into a [`CalculationResult`].
///
/// # Arguments
/// * `buffer` - Raw `.xlsx` or `.xls` bytes
/// * `period` - Year and month to read
/// * `mode` - What to produce from the rows
///
/// # Returns
/// * `Result<ProcessOutput, WorkbookError>` - The listing/calculation, or why
///   the workbook could not be used
pub fn process(
    buffer: &[u8],
    period: Period,
    mode: ProcessMode<'_>,
) -> Result<ProcessOutput, WorkbookError> {
    Ok(match mode {
        ProcessMode::Meals => ProcessOutput::Meals(read_meals(buffer, period)?),
        ProcessMode::Calculation {
            holidays,
            allowance,
        } => ProcessOutput::Calculation(read_calculation(buffer, period, holidays, allowance)?),
    })
}

/// Days of the month with a recognized attendance label and at least one meal.
pub fn read_meals(buffer: &[u8], period: Period) -> Result<Vec<MealRecord>, WorkbookError> {
    let days = read_attendance(buffer, period)?;
    Ok(days.into_iter().filter(MealRecord::has_meals).collect())
}

pub fn read_calculation(
    buffer: &[u8],
    period: Period,
    holidays: &[Holiday],
    allowance: &dyn AllowancePolicy,
) -> Result<CalculationResult, WorkbookError> {
    let days = read_attendance(buffer, period)?;
    Ok(calculate(&days, holidays, allowance))
}

/// Read every day of the month that has a recognized attendance label
///
/// Rows with a blank or unknown label, or a date outside the month, are
/// skipped rather than treated as errors.
///
/// # Arguments
/// * `buffer` - Raw `.xlsx` or `.xls` bytes
/// * `period` - Year and month to read
///
/// # Returns
/// * `Result<Vec<MealRecord>, WorkbookError>` - Days in sheet order
pub fn read_attendance(buffer: &[u8], period: Period) -> Result<Vec<MealRecord>, WorkbookError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(buffer))?;

    let sheet_name = find_month_sheet(&workbook.sheet_names(), period.month).ok_or(
        WorkbookError::MissingSheet {
            month: period.month.get(),
        },
    )?;
    let range = workbook.worksheet_range(&sheet_name)?;

    read_sheet(&sheet_name, &range, period)
}

/// First sheet named after the month, e.g. `7월`, `07월` or `7월 근태`.
fn find_month_sheet(names: &[String], month: Month) -> Option<String> {
    let short = format!("{}월", month.get());
    let padded = format!("{:02}월", month.get());

    names
        .iter()
        .find(|name| {
            let name = strip_whitespace(name);
            name.starts_with(&short) || name.starts_with(&padded)
        })
        .cloned()
}

fn read_sheet(
    sheet_name: &str,
    range: &Range<Data>,
    period: Period,
) -> Result<Vec<MealRecord>, WorkbookError> {
    let mut rows = range.rows();

    let mut columns = None;
    for row in rows.by_ref().take(HEADER_SCAN_ROWS) {
        let headers: Vec<String> = row.iter().map(|c| strip_whitespace(&cell_text(c))).collect();
        if find_column(&headers, DATE_HEADERS).is_some() {
            columns = Some(ColumnMap::from_headers(sheet_name, &headers)?);
            break;
        }
    }
    let columns = columns.ok_or_else(|| WorkbookError::MissingHeader {
        sheet: sheet_name.to_string(),
    })?;

    Ok(rows.filter_map(|row| columns.read_row(row, period)).collect())
}

#[derive(Debug, Clone, Copy)]
struct MealColumns {
    store: usize,
    amount: usize,
    payer: usize,
}

impl MealColumns {
    fn read(&self, row: &[Data]) -> Option<MealEntry> {
        let store = cell_text(cell(row, self.store));
        let amount = cell_amount(cell(row, self.amount));
        let payer = cell_text(cell(row, self.payer));

        if store.is_empty() && payer.is_empty() && amount == 0 {
            return None;
        }
        Some(MealEntry {
            store,
            amount,
            payer,
        })
    }
}

/// Column positions validated once against the header row.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    date: usize,
    attendance: usize,
    breakfast: MealColumns,
    lunch: MealColumns,
    dinner: MealColumns,
}

impl ColumnMap {
    fn from_headers(sheet_name: &str, headers: &[String]) -> Result<Self, WorkbookError> {
        let mut missing = Vec::new();
        let mut require = |aliases: &'static [&'static str]| {
            find_column(headers, aliases).unwrap_or_else(|| {
                missing.push(aliases[0]);
                0
            })
        };

        let date = require(DATE_HEADERS);
        let attendance = require(ATTENDANCE_HEADERS);
        let mut meal = |meal_headers: &MealHeaders| MealColumns {
            store: require(meal_headers.store),
            amount: require(meal_headers.amount),
            payer: require(meal_headers.payer),
        };
        let breakfast = meal(&BREAKFAST_HEADERS);
        let lunch = meal(&LUNCH_HEADERS);
        let dinner = meal(&DINNER_HEADERS);

        if !missing.is_empty() {
            return Err(WorkbookError::MissingColumns {
                sheet: sheet_name.to_string(),
                columns: missing,
            });
        }

        Ok(ColumnMap {
            date,
            attendance,
            breakfast,
            lunch,
            dinner,
        })
    }

    fn read_row(&self, row: &[Data], period: Period) -> Option<MealRecord> {
        let date = parse_date(cell(row, self.date), period)?;
        let attendance = AttendanceStatus::from_label(&cell_text(cell(row, self.attendance)))?;

        Some(MealRecord {
            date,
            attendance,
            breakfast: self.breakfast.read(row),
            lunch: self.lunch.read(row),
            dinner: self.dinner.read(row),
        })
    }
}

fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| aliases.iter().any(|alias| h == alias))
}

fn cell(row: &[Data], index: usize) -> &Data {
    row.get(index).unwrap_or(&EMPTY_CELL)
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

/// Whole won in a cell; blank or unparseable cells count as 0.
fn cell_amount(cell: &Data) -> i64 {
    match cell {
        Data::Int(i) => *i,
        Data::Float(f) => f.round() as i64,
        Data::String(s) => AMOUNT_REGEX
            .find(s)
            .and_then(|m| m.as_str().replace(',', "").parse().ok())
            .unwrap_or(0),
        _ => 0,
    }
}

/// Date parts read from a cell. Year and month are absent when the cell
/// only gives a day of the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DateParts {
    year: Option<i32>,
    month: Option<u32>,
    day: u32,
}

impl DateParts {
    fn day(day: u32) -> Self {
        Self {
            year: None,
            month: None,
            day,
        }
    }
}

fn parse_date(cell: &Data, period: Period) -> Option<NaiveDate> {
    let parts = match cell {
        Data::DateTime(dt) => serial_date(dt.as_f64())?,
        Data::Int(i) => number_date(*i as f64)?,
        Data::Float(f) => number_date(*f)?,
        Data::String(s) | Data::DateTimeIso(s) => text_date(s)?,
        _ => return None,
    };

    // rows dated in another month or year are skipped, not moved
    if parts.month.is_some_and(|m| m != period.month.get()) {
        return None;
    }
    if parts.year.is_some_and(|y| y != period.year) {
        return None;
    }
    NaiveDate::from_ymd_opt(period.year, period.month.get(), parts.day)
}

/// Small whole numbers are days of the month; anything else is an Excel serial.
fn number_date(n: f64) -> Option<DateParts> {
    if n.fract() == 0.0 && (1.0..=31.0).contains(&n) {
        Some(DateParts::day(n as u32))
    } else {
        serial_date(n)
    }
}

fn serial_date(serial: f64) -> Option<DateParts> {
    if !(serial >= 1.0) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = epoch.checked_add_days(Days::new(serial.floor() as u64))?;
    Some(DateParts {
        year: Some(date.year()),
        month: Some(date.month()),
        day: date.day(),
    })
}

/// `2024-07-15`, `2024.07.15`, `7/15`, `7월 15일`, `15일`, `15`, `20240715`.
fn text_date(text: &str) -> Option<DateParts> {
    let groups: Vec<&str> = NUMBER_REGEX.find_iter(text).map(|m| m.as_str()).collect();

    match groups.as_slice() {
        [] => None,
        [single] if single.len() == 8 => Some(DateParts {
            year: Some(parse_num(single.get(0..4)?)? as i32),
            month: Some(parse_num(single.get(4..6)?)?),
            day: parse_num(single.get(6..8)?)?,
        }),
        [single] => Some(DateParts::day(parse_num(single)?)),
        [year, month, day, ..] if year.len() == 4 => Some(DateParts {
            year: Some(parse_num(year)? as i32),
            month: Some(parse_num(month)?),
            day: parse_num(day)?,
        }),
        [month, day, ..] => Some(DateParts {
            year: None,
            month: Some(parse_num(month)?),
            day: parse_num(day)?,
        }),
    }
}

fn parse_num(digits: &str) -> Option<u32> {
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    const HEADERS: [&str; 11] = [
        "날짜",
        "근태",
        "조식 식당",
        "조식 금액",
        "조식 결제자",
        "중식 식당",
        "중식 금액",
        "중식 결제자",
        "석식 식당",
        "석식 금액",
        "석식 결제자",
    ];

    fn july() -> Period {
        Period::new(2024, Month::new(7).unwrap())
    }

    fn build(sheet: &str, headers: &[&str], rows: &[Vec<&str>]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet).unwrap();
        worksheet.write_string(0, 0, "2024년 7월 식대").unwrap();
        for (c, h) in headers.iter().enumerate() {
            worksheet.write_string(2, c as u16, *h).unwrap();
        }
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let r = (r + 3) as u32;
                if let Ok(n) = value.parse::<f64>() {
                    worksheet.write_number(r, c as u16, n).unwrap();
                } else if !value.is_empty() {
                    worksheet.write_string(r, c as u16, *value).unwrap();
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_meals_mode_skips_days_without_attendance_or_meals() {
        let buffer = build(
            "7월",
            &HEADERS,
            &[
                vec!["1", "근무", "", "", "", "김밥천국", "8000", "홍길동", "", "", ""],
                vec!["2", "", "", "", "", "한솥", "7500", "홍길동", "", "", ""],
                vec!["3", "출장", "", "", "", "한솥", "7500", "홍길동", "", "", ""],
                vec!["4", "연차/휴무", "", "", "", "", "", "", "", "", ""],
                vec!["5", "재택", "", "", "", "", "", "", "국밥집", "9,000원", "법인카드"],
            ],
        );

        let output = process(&buffer, july(), ProcessMode::Meals).unwrap();
        let ProcessOutput::Meals(meals) = output else {
            panic!("expected meals output");
        };
        let days: Vec<_> = meals.iter().map(|m| m.date.day()).collect();
        assert_eq!(days, vec![1, 5]);
        assert_eq!(meals[0].lunch.as_ref().unwrap().amount, 8000);
        assert_eq!(meals[1].attendance, AttendanceStatus::HomeOffice);
        assert_eq!(
            meals[1].dinner,
            Some(MealEntry {
                store: "국밥집".to_string(),
                amount: 9000,
                payer: "법인카드".to_string(),
            })
        );
    }

    #[test]
    fn test_full_day_leave_counts_as_vacation() {
        let buffer = build(
            "7월",
            &HEADERS,
            &[
                vec!["14", "근무", "", "", "", "", "", "", "", "", ""],
                vec!["15", "연차/휴무", "", "", "", "", "", "", "", "", ""],
            ],
        );
        let allowance = |days: u32| i64::from(days) * 10_000;
        let output = process(
            &buffer,
            july(),
            ProcessMode::Calculation {
                holidays: &[],
                allowance: &allowance,
            },
        )
        .unwrap();
        let ProcessOutput::Calculation(result) = output else {
            panic!("expected calculation output");
        };
        assert_eq!(result.vacation_days(), 1.0);
        assert_eq!(result.work_days(), 1);
        assert_eq!(result.available_amount(), 10_000);
    }

    #[test]
    fn test_missing_columns_is_malformed() {
        let buffer = build("7월", &HEADERS[..5], &[]);
        let err = read_attendance(&buffer, july()).unwrap_err();
        match err {
            WorkbookError::MissingColumns { sheet, columns } => {
                assert_eq!(sheet, "7월");
                assert_eq!(columns.len(), 6);
                assert_eq!(columns[0], "중식식당");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_sheet_and_header() {
        let buffer = build("8월", &HEADERS, &[]);
        assert!(matches!(
            read_attendance(&buffer, july()),
            Err(WorkbookError::MissingSheet { month: 7 })
        ));

        let buffer = build("7월", &["이름", "근태"], &[]);
        assert!(matches!(
            read_attendance(&buffer, july()),
            Err(WorkbookError::MissingHeader { .. })
        ));
    }

    #[test]
    fn test_garbage_bytes_are_unreadable() {
        let err = read_attendance(b"not a workbook", july()).unwrap_err();
        assert!(matches!(err, WorkbookError::Unreadable(_)));
    }

    #[test]
    fn test_find_month_sheet() {
        let names = vec![
            "11월".to_string(),
            "01월".to_string(),
            " 7월 근태".to_string(),
        ];
        assert_eq!(
            find_month_sheet(&names, Month::new(1).unwrap()),
            Some("01월".to_string())
        );
        assert_eq!(
            find_month_sheet(&names, Month::new(7).unwrap()),
            Some(" 7월 근태".to_string())
        );
        assert_eq!(find_month_sheet(&names, Month::new(2).unwrap()), None);
    }

    #[test]
    fn test_date_cells() {
        let period = july();
        let expected = NaiveDate::from_ymd_opt(2024, 7, 15);

        assert_eq!(parse_date(&Data::Int(15), period), expected);
        assert_eq!(parse_date(&Data::Float(45488.0), period), expected);
        assert_eq!(parse_date(&Data::String("2024-07-15".into()), period), expected);
        assert_eq!(parse_date(&Data::String("2024.07.15".into()), period), expected);
        assert_eq!(parse_date(&Data::String("7/15".into()), period), expected);
        assert_eq!(parse_date(&Data::String("7월 15일 (월)".into()), period), expected);
        assert_eq!(parse_date(&Data::String("15일".into()), period), expected);
        assert_eq!(parse_date(&Data::String("20240715".into()), period), expected);

        assert_eq!(parse_date(&Data::String("8/15".into()), period), None);
        assert_eq!(parse_date(&Data::Int(32), period), None);
        assert_eq!(parse_date(&Data::String("합계".into()), period), None);
        assert_eq!(parse_date(&Data::Empty, period), None);

        let june = Period::new(2024, Month::new(6).unwrap());
        assert_eq!(parse_date(&Data::Int(31), june), None);
    }

    #[test]
    fn test_dates_from_another_year_are_skipped() {
        let period = july();

        assert_eq!(parse_date(&Data::String("2023-07-15".into()), period), None);
        assert_eq!(parse_date(&Data::String("20230715".into()), period), None);
        // 2023-07-15 as an Excel serial
        assert_eq!(parse_date(&Data::Float(45122.0), period), None);

        let buffer = build(
            "7월",
            &HEADERS,
            &[
                vec!["2023-07-16", "근무", "", "", "", "한솥", "7000", "홍길동", "", "", ""],
                vec!["2024-07-17", "근무", "", "", "", "한솥", "7500", "홍길동", "", "", ""],
            ],
        );
        let days = read_attendance(&buffer, period).unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 7, 17).unwrap());
    }

    #[test]
    fn test_mixed_width_digits_do_not_panic() {
        let period = july();

        assert_eq!(parse_date(&Data::String("12３456".into()), period), None);
        assert_eq!(parse_date(&Data::String("2024０715".into()), period), None);
        assert_eq!(parse_date(&Data::String("１５".into()), period), None);
        assert_eq!(
            parse_date(&Data::String("2024-07-15 (１５일)".into()), period),
            NaiveDate::from_ymd_opt(2024, 7, 15)
        );
        assert_eq!(cell_amount(&Data::String("８,０００원".into())), 0);
    }

    #[test]
    fn test_amount_cells() {
        assert_eq!(cell_amount(&Data::Int(8000)), 8000);
        assert_eq!(cell_amount(&Data::Float(7499.6)), 7500);
        assert_eq!(cell_amount(&Data::String("12,000원".into())), 12_000);
        assert_eq!(cell_amount(&Data::String("없음".into())), 0);
        assert_eq!(cell_amount(&Data::Empty), 0);
    }
}
