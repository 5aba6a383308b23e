use rust_xlsxwriter::{Workbook, XlsxError};

use crate::attendance::{MealEntry, MealRecord};

const EXPORT_HEADERS: [&str; 11] = [
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

/// Convert a meal listing to CSV format
///
/// One line per record after a header line. Fields containing commas,
/// quotes or newlines are quoted, with quotes doubled.
///
/// # Arguments
/// * `meals` - Records to export, in the order they should appear
///
/// # Returns
/// * `String` - CSV content
///
/// # Examples
/// ```
/// use mealbook::export::meals_to_csv;
///
/// let csv = meals_to_csv(&[]);
/// assert!(csv.starts_with("날짜,근태,"));
/// ```
pub fn meals_to_csv(meals: &[MealRecord]) -> String {
    let mut csv_content = EXPORT_HEADERS.join(",");
    csv_content.push('\n');

    for record in meals {
        let fields = record_fields(record);
        let line: Vec<String> = fields.iter().map(|f| escape_csv(f)).collect();
        csv_content.push_str(&line.join(","));
        csv_content.push('\n');
    }

    csv_content
}

/// Convert a meal listing to XLSX format
///
/// Writes a single worksheet named "식대" with the same columns as the CSV
/// export. Amounts are written as numbers.
///
/// # Arguments
/// * `meals` - Records to export
///
/// # Returns
/// * `Result<Vec<u8>, XlsxError>` - XLSX file content as bytes or an error
pub fn meals_to_xlsx(meals: &[MealRecord]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("식대")?;

    for (c, header) in EXPORT_HEADERS.iter().enumerate() {
        worksheet.write_string(0, c as u16, *header)?;
    }

    for (r, record) in meals.iter().enumerate() {
        let row = (r + 1) as u32;
        worksheet.write_string(row, 0, record.date.format("%Y-%m-%d").to_string())?;
        worksheet.write_string(row, 1, record.attendance.label())?;

        let meals = [&record.breakfast, &record.lunch, &record.dinner];
        for (i, entry) in meals.iter().enumerate() {
            let Some(entry) = entry else {
                continue;
            };
            let col = (2 + i * 3) as u16;
            worksheet.write_string(row, col, entry.store.as_str())?;
            worksheet.write_number(row, col + 1, entry.amount as f64)?;
            worksheet.write_string(row, col + 2, entry.payer.as_str())?;
        }
    }

    workbook.save_to_buffer()
}

fn record_fields(record: &MealRecord) -> Vec<String> {
    let mut fields = vec![
        record.date.format("%Y-%m-%d").to_string(),
        record.attendance.label().to_string(),
    ];
    for entry in [&record.breakfast, &record.lunch, &record.dinner] {
        fields.extend(entry_fields(entry.as_ref()));
    }
    fields
}

fn entry_fields(entry: Option<&MealEntry>) -> [String; 3] {
    match entry {
        Some(e) => [e.store.clone(), e.amount.to_string(), e.payer.clone()],
        None => [String::new(), String::new(), String::new()],
    }
}

fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
