use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while fetching, aggregating or exporting a report
#[derive(Debug, Error)]
pub enum ReportError {
    /// The requested date range is unusable (e.g. start after end)
    #[error("invalid date range: start {start} is after end {end}")]
    Validation { start: NaiveDate, end: NaiveDate },

    /// The requested date range spans more days than one report may hold
    #[error("date range of {days} days exceeds the limit of {max} days")]
    RangeTooLarge { days: i64, max: u32 },

    /// A row's timestamp did not match `DD/MM/YYYY HH:MM:SS`
    #[error("malformed timestamp {value:?} on row {row}")]
    MalformedTimestamp { row: usize, value: String },

    /// The log source could not be reached or read
    #[error("log source unavailable: {0}")]
    SourceUnavailable(String),

    /// The log source rejected our credentials
    #[error("log source rejected credentials: {0}")]
    AuthenticationFailed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl ReportError {
    /// Source failures end the render; nothing partial is aggregated
    pub fn is_source_failure(&self) -> bool {
        matches!(
            self,
            ReportError::SourceUnavailable(_) | ReportError::AuthenticationFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let err = ReportError::MalformedTimestamp {
            row: 7,
            value: "31/02/2024".to_string(),
        };
        assert_eq!(err.to_string(), "malformed timestamp \"31/02/2024\" on row 7");

        let start = NaiveDate::from_ymd_opt(2024, 12, 14).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 13).unwrap();
        let err = ReportError::Validation { start, end };
        assert!(err.to_string().contains("2024-12-14"));

        let err = ReportError::RangeTooLarge { days: 400, max: 366 };
        assert_eq!(err.to_string(), "date range of 400 days exceeds the limit of 366 days");
    }

    #[test]
    fn only_source_errors_are_source_failures() {
        assert!(ReportError::SourceUnavailable("timeout".into()).is_source_failure());
        assert!(ReportError::AuthenticationFailed("401".into()).is_source_failure());
        assert!(!ReportError::Config("bad".into()).is_source_failure());
    }
}
