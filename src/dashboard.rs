use chrono::{Days, NaiveDate};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::aggregator::{DailySummary, SummaryTable, TimestampPolicy, Totals, aggregate};
use crate::bucket::BucketWidth;
use crate::config::ReportConfig;
use crate::error::Result;
use crate::event::RawEvent;
use crate::source::LogSource;

/// Days shown by default, ending yesterday
pub const DEFAULT_RANGE_DAYS: u64 = 7;

/// Per-request choices made by whoever asked for the report
///
/// Nothing here outlives the request; two concurrent viewers never see
/// each other's range or width.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Overrides the configured width
    pub width: Option<BucketWidth>,
    /// Reject malformed timestamps instead of skipping them
    #[serde(default)]
    pub strict: bool,
}

/// Headline figures shown above the charts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Cards {
    pub total: u64,
    pub primary: u64,
    /// Everything not handled by the primary category
    pub non_primary: u64,
}

impl Cards {
    pub fn from_totals(totals: &Totals) -> Self {
        Cards {
            total: totals.total_count,
            primary: totals.primary_count,
            non_primary: totals.total_count - totals.primary_count,
        }
    }
}

/// A rendered report: the dense table plus its roll-ups
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub cards: Cards,
    pub summary: Totals,
    pub daily: Vec<DailySummary>,
    pub table: SummaryTable,
}

impl Report {
    pub fn from_table(table: SummaryTable) -> Self {
        let summary = table.range_summary();
        Report {
            cards: Cards::from_totals(&summary),
            summary,
            daily: table.daily(),
            table,
        }
    }
}

/// Distinct dates present in the log, ascending; unparseable rows ignored
pub fn available_dates(events: &[RawEvent]) -> Vec<NaiveDate> {
    events
        .iter()
        .filter_map(|raw| raw.parse().ok())
        .map(|event| event.at.date())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The week ending yesterday, clamped into the dates the log covers
pub fn default_range(today: NaiveDate, available: &[NaiveDate]) -> (NaiveDate, NaiveDate) {
    let end = today.pred_opt().unwrap_or(today);
    let start = end.checked_sub_days(Days::new(DEFAULT_RANGE_DAYS)).unwrap_or(end);

    match (available.first(), available.last()) {
        (Some(&min), Some(&max)) => (start.clamp(min, max), end.clamp(min, max)),
        _ => (start, end),
    }
}

/// Fill whichever end of the range the request left open
///
/// A lone `end` gets the week before it, a lone `start` the week after it,
/// each clamped into the log but never past the bound that was given.
/// With neither, [`default_range`] applies.
pub fn resolve_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
    available: &[NaiveDate],
) -> (NaiveDate, NaiveDate) {
    let window = Days::new(DEFAULT_RANGE_DAYS);
    match (start, end) {
        (Some(start), Some(end)) => (start, end),
        (None, Some(end)) => {
            let start = end.checked_sub_days(window).unwrap_or(end);
            match available.first() {
                Some(&min) => (start.max(min).min(end), end),
                None => (start, end),
            }
        }
        (Some(start), None) => {
            let end = start.checked_add_days(window).unwrap_or(start);
            match available.last() {
                Some(&max) => (start, end.min(max).max(start)),
                None => (start, end),
            }
        }
        (None, None) => default_range(today, available),
    }
}

/// Fetch the log, resolve the request against the config and aggregate
///
/// Source failures are returned as-is; nothing is aggregated from a
/// partially read log.
///
/// # Arguments
/// * `source` - Where the events table is read from
/// * `config` - Table names, categories and the configured defaults
/// * `request` - This viewer's range, width and strictness; open ends are
///   filled by [`resolve_range`]
/// * `today` - Reference date for the default range
///
/// # Returns
/// * `Result<Report>` - Cards, range and daily roll-ups, and the dense table
///
/// # Errors
/// * Source errors from [`LogSource::fetch`]
/// * `Validation` or `RangeTooLarge` for an unusable range
/// * `MalformedTimestamp` when the request or config is strict
pub fn render(
    source: &dyn LogSource,
    config: &ReportConfig,
    request: &ReportRequest,
    today: NaiveDate,
) -> Result<Report> {
    let events = source.fetch(&config.events_table)?;

    let (start, end) = resolve_range(request.start, request.end, today, &available_dates(&events));

    let mut aggregator = config.aggregator();
    if let Some(width) = request.width {
        aggregator.bucket_width = width;
    }
    if request.strict {
        aggregator.on_bad_timestamp = TimestampPolicy::Reject;
    }

    info!(
        "rendering {} from {} to {} in {} minute buckets",
        config.events_table,
        start,
        end,
        aggregator.bucket_width.minutes()
    );

    let table = aggregate(&events, start, end, &aggregator)?;
    Ok(Report::from_table(table))
}

/// Latest text of the notification table, for the monitor page
pub fn latest_notification(source: &dyn LogSource, config: &ReportConfig) -> Result<Option<String>> {
    source.latest_value(&config.notification_table, &config.notification_column)
}
