use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// Timestamp layout used by the case log (`13/12/2024 09:07:00`)
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// One row as read from the log, timestamp still unparsed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// 1-based data row in the source (header excluded)
    pub row: usize,
    pub created: String,
    pub response: String,
}

impl RawEvent {
    pub fn new(row: usize, created: impl Into<String>, response: impl Into<String>) -> Self {
        RawEvent {
            row,
            created: created.into(),
            response: response.into(),
        }
    }

    /// Parse the `Created` field into an [`Event`]
    ///
    /// Empty or malformed timestamps are reported with the source row so
    /// the caller can decide between skipping and rejecting.
    pub fn parse(&self) -> Result<Event> {
        let created = self.created.trim();
        let at = NaiveDateTime::parse_from_str(created, TIMESTAMP_FORMAT).map_err(|_| {
            ReportError::MalformedTimestamp {
                row: self.row,
                value: self.created.clone(),
            }
        })?;

        Ok(Event {
            at,
            outcome: self.response.trim().to_string(),
        })
    }
}

/// A parsed case: when it was created and who handled it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub at: NaiveDateTime,
    pub outcome: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn parses_day_first_timestamps() {
        let event = RawEvent::new(1, "13/12/2024 09:07:00", " Bot ").parse().unwrap();
        assert_eq!(event.at.date(), NaiveDate::from_ymd_opt(2024, 12, 13).unwrap());
        assert_eq!((event.at.hour(), event.at.minute()), (9, 7));
        assert_eq!(event.outcome, "Bot");
    }

    #[test]
    fn rejects_empty_and_malformed_timestamps() {
        for bad in ["", "   ", "2024-12-13 09:07:00", "13/12/2024", "32/12/2024 09:00:00"] {
            match RawEvent::new(4, bad, "Bot").parse() {
                Err(ReportError::MalformedTimestamp { row, value }) => {
                    assert_eq!(row, 4);
                    assert_eq!(value, bad);
                }
                other => panic!("expected malformed timestamp for {bad:?}, got {other:?}"),
            }
        }
    }
}
