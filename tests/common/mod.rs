#![allow(dead_code)]

use rust_xlsxwriter::Workbook;

pub const HEADERS: [&str; 11] = [
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

/// One day row: day of month, attendance label, optional lunch `(store, amount, payer)`.
pub struct Day<'a> {
    pub day: u32,
    pub attendance: &'a str,
    pub lunch: Option<(&'a str, i64, &'a str)>,
}

pub fn day<'a>(day: u32, attendance: &'a str, lunch: Option<(&'a str, i64, &'a str)>) -> Day<'a> {
    Day {
        day,
        attendance,
        lunch,
    }
}

/// A workbook with a single `{month}월` sheet: a title row, a blank row,
/// the header row and then one row per day.
pub fn workbook(month: u32, days: &[Day<'_>]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(format!("{}월", month).as_str()).unwrap();
    worksheet
        .write_string(0, 0, format!("{}월 식대 내역", month).as_str())
        .unwrap();

    for (c, header) in HEADERS.iter().enumerate() {
        worksheet.write_string(2, c as u16, *header).unwrap();
    }

    for (i, d) in days.iter().enumerate() {
        let row = (i + 3) as u32;
        worksheet.write_number(row, 0, d.day as f64).unwrap();
        if !d.attendance.is_empty() {
            worksheet.write_string(row, 1, d.attendance).unwrap();
        }
        if let Some((store, amount, payer)) = d.lunch {
            worksheet.write_string(row, 5, store).unwrap();
            worksheet.write_number(row, 6, amount as f64).unwrap();
            worksheet.write_string(row, 7, payer).unwrap();
        }
    }

    workbook.save_to_buffer().unwrap()
}
