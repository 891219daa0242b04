use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::error::ReportError;

const MINUTES_PER_DAY: u16 = 24 * 60;

/// Width of a time-of-day bucket
///
/// Only the two widths the reports chart by are accepted, so
/// `1440 / width` is always a whole number of buckets per day.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum BucketWidth {
    #[default]
    Fifteen,
    Thirty,
}

impl BucketWidth {
    pub fn minutes(self) -> u16 {
        match self {
            BucketWidth::Fifteen => 15,
            BucketWidth::Thirty => 30,
        }
    }

    pub fn buckets_per_day(self) -> usize {
        (MINUTES_PER_DAY / self.minutes()) as usize
    }

    /// Floor a time of day to the start of its bucket
    ///
    /// Always toward earlier time: with a 15 minute width both 09:07 and
    /// 09:14:59 land in 09:00, 09:15:00 lands in 09:15.
    pub fn floor(self, time: NaiveTime) -> TimeBucket {
        let minute_of_day = (time.hour() * 60 + time.minute()) as u16;
        let width = self.minutes();
        TimeBucket {
            start_minute: minute_of_day - minute_of_day % width,
        }
    }

    /// Every bucket of a day in order, 00:00 up to the one before 24:00
    pub fn day_buckets(self) -> impl Iterator<Item = TimeBucket> {
        let width = self.minutes();
        (0..MINUTES_PER_DAY)
            .step_by(width as usize)
            .map(|start_minute| TimeBucket { start_minute })
    }

    /// Column caption used by the exported sheets, e.g. `15_Minute_Interval`
    pub fn interval_caption(self) -> String {
        format!("{}_Minute_Interval", self.minutes())
    }
}

impl TryFrom<u16> for BucketWidth {
    type Error = ReportError;

    fn try_from(minutes: u16) -> Result<Self, Self::Error> {
        match minutes {
            15 => Ok(BucketWidth::Fifteen),
            30 => Ok(BucketWidth::Thirty),
            other => Err(ReportError::Config(format!(
                "bucket width must be 15 or 30 minutes, got {}",
                other
            ))),
        }
    }
}

impl From<BucketWidth> for u16 {
    fn from(width: BucketWidth) -> u16 {
        width.minutes()
    }
}

/// Start of a time-of-day bucket, in minutes after midnight
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeBucket {
    start_minute: u16,
}

impl TimeBucket {
    pub fn start_minute(self) -> u16 {
        self.start_minute
    }

    pub fn start_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(
            (self.start_minute / 60) as u32,
            (self.start_minute % 60) as u32,
            0,
        )
        .unwrap_or(NaiveTime::MIN)
    }

    /// `HH:MM` label
    pub fn label(self) -> String {
        format!("{:02}:{:02}", self.start_minute / 60, self.start_minute % 60)
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for TimeBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn floor_never_rounds_up() {
        let w = BucketWidth::Fifteen;
        assert_eq!(w.floor(t(9, 7, 0)).label(), "09:00");
        assert_eq!(w.floor(t(9, 14, 59)).label(), "09:00");
        assert_eq!(w.floor(t(9, 15, 0)).label(), "09:15");
        assert_eq!(w.floor(t(23, 59, 59)).label(), "23:45");

        let w = BucketWidth::Thirty;
        assert_eq!(w.floor(t(9, 40, 0)).label(), "09:30");
        assert_eq!(w.floor(t(0, 0, 0)).label(), "00:00");
    }

    #[test]
    fn day_buckets_cover_the_whole_day() {
        let buckets: Vec<_> = BucketWidth::Thirty.day_buckets().collect();
        assert_eq!(buckets.len(), 48);
        assert_eq!(buckets.first().unwrap().label(), "00:00");
        assert_eq!(buckets.last().unwrap().label(), "23:30");

        let buckets: Vec<_> = BucketWidth::Fifteen.day_buckets().collect();
        assert_eq!(buckets.len(), BucketWidth::Fifteen.buckets_per_day());
        assert_eq!(buckets.last().unwrap().label(), "23:45");
        assert_eq!(buckets[37].start_time(), t(9, 15, 0));
    }

    #[test]
    fn width_accepts_only_fifteen_or_thirty() {
        assert_eq!(BucketWidth::try_from(15u16).unwrap(), BucketWidth::Fifteen);
        assert_eq!(BucketWidth::try_from(30u16).unwrap(), BucketWidth::Thirty);
        assert!(BucketWidth::try_from(20u16).is_err());

        let parsed: BucketWidth = serde_json::from_str("30").unwrap();
        assert_eq!(parsed, BucketWidth::Thirty);
        assert!(serde_json::from_str::<BucketWidth>("45").is_err());
        assert_eq!(BucketWidth::Fifteen.interval_caption(), "15_Minute_Interval");
    }
}
