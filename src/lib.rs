/*!
# Bot Monitor

Case-handling reports for a support desk where each case is handled either
by the bot or by a supervisor.

## Overview

The case log is a table with one row per case: a `Created` timestamp
(`DD/MM/YYYY HH:MM:SS`) and a `Response` naming who handled it. This crate
reads that log, groups the cases into fixed time-of-day buckets, and
reports how much of the volume the bot handled, per bucket, per day and
over the whole range.

## Architecture

### Core
- **Bucketed Aggregator** - turns raw rows into a dense table with one row
  per (date, bucket) for every date in the requested range, zero-filling
  buckets nobody touched so charts never miss an x-axis tick
- **Roll-ups** - per-date and range totals, always recomputed from the
  summed counts rather than averaged percentages

### Collaborators
- **Log source** - anything that can hand back the rows of a named table;
  a CSV export directory and an in-memory source are provided
- **Report sink** - XLSX workbook (a summary sheet plus one sheet per date,
  each closed by a Total row) or CSV

### Surfaces
- `report` - command line report and export
- `website` - JSON/CSV/XLSX HTTP API (`web` feature)

## Key Rules

- Row count is always `days × (1440 / width)`, even with no events
- Percentage is `primary / total × 100` rounded to 2 decimals, or 0 when
  a bucket is empty
- A reversed date range is an error, never silently swapped
- Malformed timestamps are skipped or rejected per configuration
- Unknown outcomes count toward the total, never toward a named category

## Modules

- **aggregator**: bucketing, gap filling and roll-ups
- **bucket**: bucket widths and time-of-day buckets
- **event**: raw and parsed log rows
- **source**: log sources
- **dashboard**: request handling, default ranges, headline cards
- **downloader**: XLSX and CSV export
- **config**: JSON configuration
- **error**: error type
- **app**: HTTP routes (`web` feature)
*/

pub mod aggregator;
#[cfg(feature = "web")]
pub mod app;
pub mod bucket;
pub mod config;
pub mod dashboard;
pub mod downloader;
pub mod error;
pub mod event;
pub mod source;

/// Re-export the aggregation entry point and the types it speaks
pub use aggregator::{
    AggregatorConfig, BucketSummary, DailySummary, SummaryTable, TimestampPolicy, Totals,
    aggregate,
};
pub use bucket::{BucketWidth, TimeBucket};
pub use error::ReportError;
pub use event::{Event, RawEvent};
pub use source::LogSource;
