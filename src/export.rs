//! Excel export functionality.

use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet};
use std::path::Path;

use crate::calendar::weekday_name;
use crate::error::Result;
use crate::models::{EmployeeMonthlyDetail, MonthlyPresenceRecord, YearMonth};

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x4472C4))
        .set_font_color(Color::White)
        .set_border(FormatBorder::Thin)
}

fn write_headers(worksheet: &mut Worksheet, headers: &[&str]) -> Result<()> {
    let format = header_format();
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &format)?;
    }
    Ok(())
}

fn local_time(value: Option<DateTime<Utc>>, tz: &Tz) -> String {
    value
        .map(|dt| dt.with_timezone(tz).format("%H:%M").to_string())
        .unwrap_or_default()
}

/// Export the monthly summary of all employees.
pub fn export_monthly_summary_to_excel(
    data: &[MonthlyPresenceRecord],
    month: YearMonth,
    path: &Path,
) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    worksheet.set_name(format!("Summary {month}"))?;

    let hours_format = Format::new().set_num_format("0.00");

    write_headers(
        worksheet,
        &["Employee ID", "Employee", "Total Hours", "Days Present", "Avg Hours/Day"],
    )?;

    worksheet.set_column_width(0, 12)?;
    worksheet.set_column_width(1, 30)?;
    worksheet.set_column_width(2, 12)?;
    worksheet.set_column_width(3, 13)?;
    worksheet.set_column_width(4, 14)?;

    for (idx, record) in data.iter().enumerate() {
        let row = (idx + 1) as u32;

        worksheet.write_number(row, 0, record.employee_id)?;
        worksheet.write_string(row, 1, &record.employee_name)?;
        worksheet.write_number_with_format(row, 2, record.total_hours, &hours_format)?;
        worksheet.write_number(row, 3, record.days_present)?;
        worksheet.write_number_with_format(row, 4, record.avg_hours_per_day, &hours_format)?;
    }

    if !data.is_empty() {
        let last_row = data.len() as u32;
        worksheet.autofilter(0, 0, last_row, 4)?;
    }

    // Freeze top row
    worksheet.set_freeze_panes(1, 0)?;

    workbook.save(path)?;
    Ok(())
}

/// Export one employee's monthly detail, times shown in `tz`.
pub fn export_employee_detail_to_excel(detail: &EmployeeMonthlyDetail, tz: &Tz, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    worksheet.set_name(format!("{}-{:02}", detail.year, detail.month))?;

    let hours_format = Format::new().set_num_format("0.00");
    let bold = Format::new().set_bold();

    write_headers(
        worksheet,
        &["Date", "Day", "First Seen", "Last Seen", "Hours", "Status"],
    )?;

    worksheet.set_column_width(0, 12)?;
    worksheet.set_column_width(1, 12)?;
    worksheet.set_column_width(2, 10)?;
    worksheet.set_column_width(3, 10)?;
    worksheet.set_column_width(4, 8)?;
    worksheet.set_column_width(5, 10)?;

    for (idx, day) in detail.daily_records.iter().enumerate() {
        let row = (idx + 1) as u32;

        worksheet.write_string(row, 0, day.date.to_string())?;
        worksheet.write_string(row, 1, weekday_name(day.day_of_week))?;
        worksheet.write_string(row, 2, local_time(day.first_seen, tz))?;
        worksheet.write_string(row, 3, local_time(day.last_seen, tz))?;
        worksheet.write_number_with_format(row, 4, day.hours, &hours_format)?;
        worksheet.write_string(row, 5, day.status.name())?;
    }

    // Totals below the table
    let totals_row = (detail.daily_records.len() + 2) as u32;
    worksheet.write_string_with_format(totals_row, 0, &detail.employee_name, &bold)?;
    worksheet.write_string(totals_row, 3, "Total")?;
    worksheet.write_number_with_format(totals_row, 4, detail.total_hours, &hours_format)?;
    worksheet.write_string(totals_row + 1, 3, "Days present")?;
    worksheet.write_number(totals_row + 1, 4, detail.days_present)?;

    // Freeze top row
    worksheet.set_freeze_panes(1, 0)?;

    workbook.save(path)?;
    Ok(())
}

/// Generate default filename for export.
pub fn generate_export_filename(prefix: &str) -> String {
    let now = Local::now();
    format!("{prefix}_{ts}.xlsx", ts = now.format("%Y%m%d_%H%M%S"))
}
