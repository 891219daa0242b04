use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::bucket::{BucketWidth, TimeBucket};
use crate::error::{ReportError, Result};
use crate::event::RawEvent;

/// Longest range aggregated unless configured otherwise
pub const DEFAULT_MAX_RANGE_DAYS: u32 = 366;

fn default_max_range_days() -> u32 {
    DEFAULT_MAX_RANGE_DAYS
}

/// What to do with a row whose timestamp cannot be parsed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampPolicy {
    /// Drop the row, log it, keep the dashboard alive
    #[default]
    Skip,
    /// Fail the whole aggregation (data-quality audits)
    Reject,
}

/// Parameters of one aggregation run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    pub bucket_width: BucketWidth,
    /// Outcome whose share is the headline percentage, e.g. `Bot`
    pub primary_category: String,
    /// Known "other" outcome counted in its own column, e.g. `Supervisor`
    pub secondary_category: Option<String>,
    pub on_bad_timestamp: TimestampPolicy,
    /// Ranges spanning more days than this are refused before any row is built
    #[serde(default = "default_max_range_days")]
    pub max_range_days: u32,
}

impl AggregatorConfig {
    pub fn new(bucket_width: BucketWidth, primary_category: impl Into<String>) -> Self {
        AggregatorConfig {
            bucket_width,
            primary_category: primary_category.into(),
            secondary_category: None,
            on_bad_timestamp: TimestampPolicy::Skip,
            max_range_days: DEFAULT_MAX_RANGE_DAYS,
        }
    }

    pub fn with_secondary(mut self, secondary_category: impl Into<String>) -> Self {
        self.secondary_category = Some(secondary_category.into());
        self
    }

    pub fn with_policy(mut self, policy: TimestampPolicy) -> Self {
        self.on_bad_timestamp = policy;
        self
    }

    pub fn with_max_range_days(mut self, max_range_days: u32) -> Self {
        self.max_range_days = max_range_days;
        self
    }
}

/// Counts plus the derived share of the primary outcome
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Totals {
    pub total_count: u64,
    pub primary_count: u64,
    pub secondary_count: u64,
    pub percentage: f64,
}

impl Totals {
    fn from_counts(counts: Counts) -> Self {
        Totals {
            total_count: counts.total,
            primary_count: counts.primary,
            secondary_count: counts.secondary,
            percentage: percentage(counts.primary, counts.total),
        }
    }

    /// Re-sum the counts of several rows and recompute the share
    pub fn roll_up<'a>(rows: impl IntoIterator<Item = &'a Totals>) -> Self {
        let counts = rows.into_iter().fold(Counts::default(), |acc, row| Counts {
            total: acc.total + row.total_count,
            primary: acc.primary + row.primary_count,
            secondary: acc.secondary + row.secondary_count,
        });
        Totals::from_counts(counts)
    }
}

/// One cell of the dense table
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BucketSummary {
    pub date: NaiveDate,
    pub bucket: TimeBucket,
    #[serde(flatten)]
    pub totals: Totals,
}

/// Re-summed counts of one calendar date
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: Totals,
}

/// Dense per-interval table: every date in range times every bucket of a day
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SummaryTable {
    start: NaiveDate,
    end: NaiveDate,
    bucket_width: BucketWidth,
    rows: Vec<BucketSummary>,
    skipped_rows: usize,
}

impl SummaryTable {
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn bucket_width(&self) -> BucketWidth {
        self.bucket_width
    }

    /// Date-major, buckets in time order within each date
    pub fn rows(&self) -> &[BucketSummary] {
        &self.rows
    }

    /// Rows dropped under [`TimestampPolicy::Skip`]
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }

    pub fn day_count(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    /// The rows of one date, empty if the date is out of range
    pub fn rows_for(&self, date: NaiveDate) -> &[BucketSummary] {
        if date < self.start || date > self.end {
            return &[];
        }
        let per_day = self.bucket_width.buckets_per_day();
        let offset = (date - self.start).num_days() as usize * per_day;
        self.rows.get(offset..offset + per_day).unwrap_or(&[])
    }

    pub fn daily(&self) -> Vec<DailySummary> {
        self.dates()
            .map(|date| DailySummary {
                date,
                totals: Totals::roll_up(self.rows_for(date).iter().map(|row| &row.totals)),
            })
            .collect()
    }

    /// Range-level roll-up, recomputed from summed counts
    pub fn range_summary(&self) -> Totals {
        Totals::roll_up(self.rows.iter().map(|row| &row.totals))
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Counts {
    total: u64,
    primary: u64,
    secondary: u64,
}

/// `primary / total * 100` rounded to two decimals, 0 when nothing happened
pub fn percentage(primary: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = primary as f64 / total as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

/// Aggregate raw log rows into a gap-filled summary table
///
/// Rows outside `[start, end]` are ignored. Outcomes matching neither the
/// primary nor the secondary category still count toward the total.
///
/// # Arguments
/// * `events` - Raw log rows, timestamps still unparsed
/// * `start` - First date of the table (inclusive)
/// * `end` - Last date of the table (inclusive)
/// * `config` - Bucket width, categories, bad-timestamp policy and range cap
///
/// # Returns
/// * `Result<SummaryTable>` - `days × 1440 / width` rows, zero-filled
///
/// # Errors
/// * `Validation` if `start > end`
/// * `RangeTooLarge` if the range spans more than `config.max_range_days`
/// * `MalformedTimestamp` for the first bad row under [`TimestampPolicy::Reject`]
///
/// # Examples
/// ```
/// use botmonitor::{aggregate, AggregatorConfig, BucketWidth, RawEvent};
/// use chrono::NaiveDate;
///
/// let day = NaiveDate::from_ymd_opt(2024, 12, 13).unwrap();
/// let events = vec![RawEvent::new(1, "13/12/2024 09:07:00", "Bot")];
/// let config = AggregatorConfig::new(BucketWidth::Thirty, "Bot");
///
/// let table = aggregate(&events, day, day, &config).unwrap();
/// assert_eq!(table.rows().len(), 48);
/// assert_eq!(table.range_summary().percentage, 100.0);
/// ```
pub fn aggregate(
    events: &[RawEvent],
    start: NaiveDate,
    end: NaiveDate,
    config: &AggregatorConfig,
) -> Result<SummaryTable> {
    if start > end {
        return Err(ReportError::Validation { start, end });
    }
    let days = (end - start).num_days() + 1;
    if days > i64::from(config.max_range_days) {
        return Err(ReportError::RangeTooLarge {
            days,
            max: config.max_range_days,
        });
    }
    let days = days as usize;

    let width = config.bucket_width;
    let primary = config.primary_category.as_str();
    let secondary = config.secondary_category.as_deref();

    let mut grouped: HashMap<(NaiveDate, TimeBucket), Counts> = HashMap::new();
    let mut skipped_rows = 0;

    for raw in events {
        let event = match raw.parse() {
            Ok(event) => event,
            Err(err) => match config.on_bad_timestamp {
                TimestampPolicy::Reject => return Err(err),
                TimestampPolicy::Skip => {
                    warn!("skipping row {}: {}", raw.row, err);
                    skipped_rows += 1;
                    continue;
                }
            },
        };

        let date = event.at.date();
        if date < start || date > end {
            continue;
        }

        let counts = grouped
            .entry((date, width.floor(event.at.time())))
            .or_default();
        counts.total += 1;
        if event.outcome == primary {
            counts.primary += 1;
        } else if Some(event.outcome.as_str()) == secondary {
            counts.secondary += 1;
        }
    }

    let per_day = width.buckets_per_day();
    let mut rows = Vec::with_capacity(days * per_day);

    for date in start.iter_days().take(days) {
        for bucket in width.day_buckets() {
            let counts = grouped.get(&(date, bucket)).copied().unwrap_or_default();
            rows.push(BucketSummary {
                date,
                bucket,
                totals: Totals::from_counts(counts),
            });
        }
    }

    debug!(
        "aggregated {} events into {} rows ({} days x {} buckets), {} skipped",
        events.len(),
        rows.len(),
        days,
        per_day,
        skipped_rows
    );

    Ok(SummaryTable {
        start,
        end,
        bucket_width: width,
        rows,
        skipped_rows,
    })
}
