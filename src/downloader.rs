use chrono::NaiveDate;
use std::collections::HashSet;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use crate::aggregator::{AggregatorConfig, BucketSummary, SummaryTable, Totals};
use crate::error::Result;

/// Suggested file name for the workbook download
pub const XLSX_FILE_NAME: &str = "Daily_Report_With_Summary.xlsx";

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Excel refuses longer sheet names
const MAX_SHEET_NAME: usize = 31;

const SUMMARY_SHEET: &str = "Summary";

/// Column captions, derived from the category names
///
/// With `Bot` as primary and `Supervisor` as secondary the captions are
/// `Bot Working Case`, `Supervisor Working Case` and `% Bot Working`.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportLabels {
    pub primary: String,
    pub secondary: String,
}

impl ExportLabels {
    pub fn from_config(config: &AggregatorConfig) -> Self {
        ExportLabels {
            primary: config.primary_category.clone(),
            secondary: config
                .secondary_category
                .clone()
                .unwrap_or_else(|| "Other".to_string()),
        }
    }

    fn count_headers(&self) -> [String; 4] {
        [
            "Total Case".to_string(),
            format!("{} Working Case", self.primary),
            format!("{} Working Case", self.secondary),
            format!("% {} Working", self.primary),
        ]
    }
}

/// Date as shown in sheets and sheet names, e.g. `13-Dec-24`
pub fn sheet_date(date: NaiveDate) -> String {
    date.format("%d-%b-%y").to_string()
}

/// Convert a summary table to an XLSX workbook
///
/// The first sheet, `Summary`, holds one row per date. Each date then gets
/// its own sheet with one row per bucket. Every sheet ends with a `Total`
/// row whose percentage is recomputed from the summed counts.
///
/// # Examples
/// ```
/// use botmonitor::{aggregate, AggregatorConfig, BucketWidth};
/// use botmonitor::downloader::{ExportLabels, to_xlsx};
/// use chrono::NaiveDate;
///
/// let day = NaiveDate::from_ymd_opt(2024, 12, 13).unwrap();
/// let config = AggregatorConfig::new(BucketWidth::Thirty, "Bot").with_secondary("Supervisor");
/// let table = aggregate(&[], day, day, &config).unwrap();
///
/// let bytes = to_xlsx(&table, &ExportLabels::from_config(&config)).unwrap();
/// assert!(bytes.starts_with(b"PK"));
/// ```
pub fn to_xlsx(table: &SummaryTable, labels: &ExportLabels) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let styles = SheetStyles::new();

    let summary = workbook.add_worksheet();
    summary.set_name(SUMMARY_SHEET)?;
    write_summary_sheet(summary, table, labels, &styles)?;

    let mut used = HashSet::from([SUMMARY_SHEET.to_lowercase()]);
    for date in table.dates() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(date, &mut used))?;
        write_date_sheet(worksheet, table, date, labels, &styles)?;
    }

    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}

/// Convert a summary table to CSV, one line per bucket
pub fn to_csv(table: &SummaryTable, labels: &ExportLabels) -> String {
    let mut csv_content = String::new();

    let mut header = vec![
        "Date".to_string(),
        table.bucket_width().interval_caption(),
    ];
    header.extend(labels.count_headers());
    csv_content.push_str(
        &header
            .iter()
            .map(|h| escape_csv(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    csv_content.push('\n');

    for row in table.rows() {
        csv_content.push_str(&format!(
            "{},{},{},{},{},{:.2}\n",
            sheet_date(row.date),
            row.bucket.label(),
            row.totals.total_count,
            row.totals.primary_count,
            row.totals.secondary_count,
            row.totals.percentage
        ));
    }

    csv_content
}

struct SheetStyles {
    header: Format,
    summary_cell: Format,
    summary_total: Format,
    date_cell: Format,
    date_total: Format,
}

impl SheetStyles {
    fn new() -> Self {
        let centered = Format::new()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin);

        SheetStyles {
            header: centered
                .clone()
                .set_bold()
                .set_background_color(Color::RGB(0x8064A1))
                .set_font_color(Color::White),
            summary_cell: centered.clone(),
            summary_total: centered
                .clone()
                .set_bold()
                .set_background_color(Color::RGB(0xF4B084)),
            date_cell: centered.clone().set_background_color(Color::RGB(0xE3DFED)),
            date_total: centered
                .set_bold()
                .set_background_color(Color::RGB(0x3B3838))
                .set_font_color(Color::White),
        }
    }
}

fn write_summary_sheet(
    worksheet: &mut Worksheet,
    table: &SummaryTable,
    labels: &ExportLabels,
    styles: &SheetStyles,
) -> Result<()> {
    let mut headers = vec!["Date".to_string()];
    headers.extend(labels.count_headers());
    write_header(worksheet, &headers, &styles.header)?;

    let daily = table.daily();
    let mut row = 1;
    for day in &daily {
        worksheet.write_string_with_format(row, 0, sheet_date(day.date), &styles.summary_cell)?;
        write_totals(worksheet, row, 1, &day.totals, &styles.summary_cell)?;
        row += 1;
    }

    let total = Totals::roll_up(daily.iter().map(|d| &d.totals));
    worksheet.write_string_with_format(row, 0, "Total", &styles.summary_total)?;
    write_totals(worksheet, row, 1, &total, &styles.summary_total)?;

    worksheet.set_column_width(0, 12)?;
    for col in 1..headers.len() as u16 {
        worksheet.set_column_width(col, 24)?;
    }
    Ok(())
}

fn write_date_sheet(
    worksheet: &mut Worksheet,
    table: &SummaryTable,
    date: NaiveDate,
    labels: &ExportLabels,
    styles: &SheetStyles,
) -> Result<()> {
    let mut headers = vec!["Date".to_string(), table.bucket_width().interval_caption()];
    headers.extend(labels.count_headers());
    write_header(worksheet, &headers, &styles.header)?;

    let rows: &[BucketSummary] = table.rows_for(date);
    let label = sheet_date(date);
    let mut row = 1;
    for summary in rows {
        worksheet.write_string_with_format(row, 0, &label, &styles.date_cell)?;
        worksheet.write_string_with_format(row, 1, summary.bucket.label(), &styles.date_cell)?;
        write_totals(worksheet, row, 2, &summary.totals, &styles.date_cell)?;
        row += 1;
    }

    let total = Totals::roll_up(rows.iter().map(|r| &r.totals));
    worksheet.write_string_with_format(row, 0, "Total", &styles.date_total)?;
    worksheet.write_string_with_format(row, 1, "", &styles.date_total)?;
    write_totals(worksheet, row, 2, &total, &styles.date_total)?;

    worksheet.set_column_width(0, 12)?;
    worksheet.set_column_width(1, 20)?;
    for col in 2..headers.len() as u16 {
        worksheet.set_column_width(col, 24)?;
    }
    Ok(())
}

fn write_header(worksheet: &mut Worksheet, headers: &[String], format: &Format) -> Result<()> {
    for (col, caption) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, caption, format)?;
    }
    Ok(())
}

// Writes total, primary, secondary and percentage starting at `first_col`
fn write_totals(
    worksheet: &mut Worksheet,
    row: u32,
    first_col: u16,
    totals: &Totals,
    format: &Format,
) -> Result<()> {
    worksheet.write_number_with_format(row, first_col, totals.total_count as f64, format)?;
    worksheet.write_number_with_format(row, first_col + 1, totals.primary_count as f64, format)?;
    worksheet.write_number_with_format(row, first_col + 2, totals.secondary_count as f64, format)?;
    worksheet.write_number_with_format(row, first_col + 3, totals.percentage, format)?;
    Ok(())
}

// `DD-Mon-YY`, or `DD-Mon-YYYY` when the short form is already taken by a
// date a century away. Excel compares sheet names case-insensitively.
fn sheet_name(date: NaiveDate, used: &mut HashSet<String>) -> String {
    let short: String = sheet_date(date).chars().take(MAX_SHEET_NAME).collect();
    let name = if used.contains(&short.to_lowercase()) {
        date.format("%d-%b-%Y").to_string().chars().take(MAX_SHEET_NAME).collect()
    } else {
        short
    };
    used.insert(name.to_lowercase());
    name
}

fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use crate::bucket::BucketWidth;
    use crate::event::RawEvent;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, d).unwrap()
    }

    fn config() -> AggregatorConfig {
        AggregatorConfig::new(BucketWidth::Thirty, "Bot").with_secondary("Supervisor")
    }

    #[test]
    fn labels_follow_the_categories() {
        let labels = ExportLabels::from_config(&config());
        assert_eq!(
            labels.count_headers(),
            [
                "Total Case".to_string(),
                "Bot Working Case".to_string(),
                "Supervisor Working Case".to_string(),
                "% Bot Working".to_string(),
            ]
        );
        let labels = ExportLabels::from_config(&AggregatorConfig::new(BucketWidth::Thirty, "Bot"));
        assert_eq!(labels.secondary, "Other");
    }

    #[test]
    fn sheet_dates_use_short_month_names() {
        assert_eq!(sheet_date(day(13)), "13-Dec-24");
        assert_eq!(sheet_name(day(1), &mut HashSet::new()), "01-Dec-24");
    }

    #[test]
    fn century_apart_dates_get_distinct_sheet_names() {
        let mut used = HashSet::new();
        let old = NaiveDate::from_ymd_opt(1924, 12, 13).unwrap();

        assert_eq!(sheet_name(old, &mut used), "13-Dec-24");
        assert_eq!(sheet_name(day(13), &mut used), "13-Dec-2024");
        assert_eq!(sheet_name(day(14), &mut used), "14-Dec-24");
    }

    #[test]
    fn csv_has_one_line_per_bucket() {
        let events = vec![
            RawEvent::new(1, "13/12/2024 09:07:00", "Bot"),
            RawEvent::new(2, "13/12/2024 09:40:00", "Supervisor"),
        ];
        let table = aggregate(&events, day(13), day(14), &config()).unwrap();
        let csv = to_csv(&table, &ExportLabels::from_config(&config()));
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 1 + 2 * 48);
        assert_eq!(
            lines[0],
            "Date,30_Minute_Interval,Total Case,Bot Working Case,Supervisor Working Case,% Bot Working"
        );
        assert_eq!(lines[1 + 18], "13-Dec-24,09:00,1,1,0,100.00");
        assert_eq!(lines[1 + 19], "13-Dec-24,09:30,1,0,1,0.00");
        assert_eq!(lines[1 + 48], "14-Dec-24,00:00,0,0,0,0.00");
    }

    #[test]
    fn escapes_captions_with_commas() {
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("plain"), "plain");
    }

    #[test]
    fn workbook_is_a_zip_archive() {
        let table = aggregate(&[], day(1), day(3), &config()).unwrap();
        let bytes = to_xlsx(&table, &ExportLabels::from_config(&config())).unwrap();
        assert!(bytes.len() > 1000);
        assert_eq!(&bytes[..2], b"PK");
    }
}
