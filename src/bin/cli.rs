#![cfg(not(tarpaulin_include))]

use mealbook::calculation::DailyAllowance;
use mealbook::config::AppConfig;
use mealbook::holidays::{HolidaySource, NoHolidays, StaticHolidays};
use mealbook::semester::{Month, resolve};
use mealbook::workbook::{Period, ProcessMode, process};
use std::env;
use std::process::ExitCode;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Meals,
    Calculation,
}

#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    workbook: String,
    month: Month,
    mode: Mode,
    year: Option<i32>,
}

/// Parse `<workbook> <month> [meals|calculation] [year]`
///
/// # Arguments
/// * `args` - Arguments after the program name
///
/// # Returns
/// * `Result<CliArgs, String>` - Parsed arguments or a message for stderr
fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let (workbook, month) = match args {
        [workbook, month, ..] if args.len() <= 4 => (workbook, month),
        _ => return Err("expected <workbook> <month> [meals|calculation] [year]".to_string()),
    };

    let month = Month::parse(month).map_err(|e| e.to_string())?;
    let mode = match args.get(2).map(|m| m.trim()) {
        None | Some("meals") => Mode::Meals,
        Some("calculation") => Mode::Calculation,
        Some(other) => return Err(format!("unknown mode `{}`", other)),
    };
    let year = match args.get(3) {
        Some(year) => Some(
            year.trim()
                .parse::<i32>()
                .map_err(|_| format!("invalid year `{}`", year))?,
        ),
        None => None,
    };

    Ok(CliArgs {
        workbook: workbook.clone(),
        month,
        mode,
        year,
    })
}

/// Reads one attendance workbook from disk and prints the result as JSON.
#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("mealbook-cli");

    // Bad arguments exit with 2, processing failures with 1
    let cli = match parse_args(args.get(1..).unwrap_or_default()) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("Error: {}", message);
            eprintln!(
                "Usage: {} <workbook> <month> [meals|calculation] [year]",
                program
            );
            return ExitCode::from(2);
        }
    };

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let config = AppConfig::from_env()?;
    let semester = resolve(cli.month, cli.year);
    let period = Period::new(semester.current_year, cli.month);
    let buffer = std::fs::read(&cli.workbook)?;

    let output = match cli.mode {
        Mode::Meals => process(&buffer, period, ProcessMode::Meals)?,
        Mode::Calculation => {
            // Holidays and allowance come from the same settings as the server
            let source: Box<dyn HolidaySource> = match &config.holidays_file {
                Some(path) => Box::new(StaticHolidays::from_json_file(path)?),
                None => Box::new(NoHolidays),
            };
            let holidays = source.holidays(period.year, cli.month).await;
            let allowance = DailyAllowance::new(config.daily_allowance);
            process(
                &buffer,
                period,
                ProcessMode::Calculation {
                    holidays: &holidays,
                    allowance: &allowance,
                },
            )?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    log::info!(
        "processed {} for {} in {:.3}s",
        cli.workbook,
        semester.folder_name,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_defaults_to_meals() {
        let cli = parse_args(&args(&["홍길동.xlsx", "7"])).unwrap();
        assert_eq!(cli.workbook, "홍길동.xlsx");
        assert_eq!(cli.month.get(), 7);
        assert_eq!(cli.mode, Mode::Meals);
        assert_eq!(cli.year, None);
    }

    #[test]
    fn test_parse_calculation_with_year() {
        let cli = parse_args(&args(&["a.xlsx", "12", "calculation", "2024"])).unwrap();
        assert_eq!(cli.mode, Mode::Calculation);
        assert_eq!(cli.year, Some(2024));
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        assert!(parse_args(&args(&["a.xlsx"])).is_err());
        assert!(parse_args(&args(&["a.xlsx", "7", "meals", "2024", "extra"])).is_err());
        assert!(parse_args(&args(&["a.xlsx", "13"])).is_err());
        assert!(parse_args(&args(&["a.xlsx", "7", "meals", "abc"])).is_err());
        assert_eq!(
            parse_args(&args(&["a.xlsx", "7", "summary"])),
            Err("unknown mode `summary`".to_string())
        );
    }
}
