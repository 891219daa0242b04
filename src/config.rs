use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::aggregator::{AggregatorConfig, DEFAULT_MAX_RANGE_DAYS, TimestampPolicy};
use crate::bucket::BucketWidth;
use crate::error::{ReportError, Result};
use crate::source::ColumnMap;

/// Everything a report run needs besides the date range
///
/// Loaded from a JSON file; every field has a default matching the
/// case log the dashboards were built for, so `{}` is a valid file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Directory holding `<table>.csv` exports of the log
    pub log_dir: PathBuf,
    pub events_table: String,
    pub notification_table: String,
    pub notification_column: String,
    pub timestamp_column: String,
    pub outcome_column: String,
    pub primary_category: String,
    pub secondary_category: Option<String>,
    pub bucket_width: BucketWidth,
    pub on_bad_timestamp: TimestampPolicy,
    /// Longest date range a single report may cover
    pub max_range_days: u32,
    /// Address the web server binds to
    pub listen: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            log_dir: PathBuf::from("data"),
            events_table: "Daily".to_string(),
            notification_table: "Notification".to_string(),
            notification_column: "Notification".to_string(),
            timestamp_column: "Created".to_string(),
            outcome_column: "Response".to_string(),
            primary_category: "Bot".to_string(),
            secondary_category: Some("Supervisor".to_string()),
            bucket_width: BucketWidth::Fifteen,
            on_bad_timestamp: TimestampPolicy::Skip,
            max_range_days: DEFAULT_MAX_RANGE_DAYS,
            listen: "127.0.0.1:3000".to_string(),
        }
    }
}

impl ReportConfig {
    /// Read a JSON config file
    ///
    /// # Arguments
    /// * `path` - JSON file; missing fields take their defaults
    ///
    /// # Returns
    /// * `Result<Self>` - The parsed configuration, or `Config` naming the
    ///   file when it cannot be read or parsed (including unsupported
    ///   bucket widths)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReportError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| ReportError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Read `path` if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn aggregator(&self) -> AggregatorConfig {
        AggregatorConfig {
            bucket_width: self.bucket_width,
            primary_category: self.primary_category.clone(),
            secondary_category: self.secondary_category.clone(),
            on_bad_timestamp: self.on_bad_timestamp,
            max_range_days: self.max_range_days,
        }
    }

    pub fn columns(&self) -> ColumnMap {
        ColumnMap {
            timestamp: self.timestamp_column.clone(),
            outcome: self.outcome_column.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config: ReportConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ReportConfig::default());
        assert_eq!(config.aggregator().primary_category, "Bot");
        assert_eq!(config.aggregator().max_range_days, 366);
    }

    #[test]
    fn loads_overrides_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(
            &path,
            r#"{"bucket_width": 30, "on_bad_timestamp": "reject", "events_table": "Logdata", "max_range_days": 31}"#,
        )
        .unwrap();

        let config = ReportConfig::load(&path).unwrap();
        assert_eq!(config.bucket_width, BucketWidth::Thirty);
        assert_eq!(config.on_bad_timestamp, TimestampPolicy::Reject);
        assert_eq!(config.events_table, "Logdata");
        assert_eq!(config.aggregator().max_range_days, 31);
        assert_eq!(config.timestamp_column, "Created");
    }

    #[test]
    fn rejects_unsupported_width() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(&path, r#"{"bucket_width": 10}"#).unwrap();
        assert!(matches!(ReportConfig::load(&path), Err(ReportError::Config(_))));
        assert!(ReportConfig::load(dir.path().join("missing.json")).is_err());
    }
}
