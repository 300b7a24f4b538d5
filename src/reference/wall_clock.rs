use std::{fmt, str::FromStr};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Days, Local, NaiveTime, TimeZone, Utc};

/// Time read off a watch dial, 24-hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchFaceTime {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl WatchFaceTime {
    pub fn new(hour: u32, minute: u32, second: u32) -> Result<Self> {
        if hour > 23 || minute > 59 || second > 59 {
            bail!("{hour:02}:{minute:02}:{second:02} is not a valid time of day");
        }
        Ok(Self {
            hour,
            minute,
            second,
        })
    }

    /// Instant nearest to `reference` whose local wall-clock reading matches
    /// the dial. Readings are taken a few seconds apart, so the previous or
    /// next day wins when the dial sits across midnight from the reference.
    pub fn resolve_against(&self, reference: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.resolve_in(reference, &Local)
    }

    pub fn resolve_in<Tz: TimeZone>(&self, reference: DateTime<Utc>, tz: &Tz) -> Result<DateTime<Utc>> {
        let dial = NaiveTime::from_hms_opt(self.hour, self.minute, self.second)
            .ok_or_else(|| anyhow!("invalid dial time {}", self))?;
        let today = reference.with_timezone(tz).date_naive();

        [today.checked_sub_days(Days::new(1)), Some(today), today.checked_add_days(Days::new(1))]
            .into_iter()
            .flatten()
            // Skipped local times (DST gaps) have no instant and drop out.
            .filter_map(|date| tz.from_local_datetime(&date.and_time(dial)).earliest())
            .map(|candidate| candidate.with_timezone(&Utc))
            .min_by_key(|candidate| (*candidate - reference).abs())
            .with_context(|| format!("no local instant matches dial time {}", self))
    }
}

impl FromStr for WatchFaceTime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if !(2..=3).contains(&parts.len()) {
            bail!("expected HH:MM or HH:MM:SS, got {s:?}");
        }

        let field = |index: usize, name: &str| -> Result<u32> {
            match parts.get(index) {
                Some(part) => part
                    .parse()
                    .with_context(|| format!("invalid {name} {part:?} in {s:?}")),
                None => Ok(0),
            }
        };

        Self::new(field(0, "hour")?, field(1, "minute")?, field(2, "second")?)
    }
}

impl fmt::Display for WatchFaceTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// `HH:MM:SS.mmm` in local time.
pub fn format_time(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&Local).format("%H:%M:%S%.3f").to_string()
}

/// `HH:MM:SS` in local time.
pub fn format_time_short(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&Local).format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn parses_dial_readings() {
        assert_eq!("09:41".parse::<WatchFaceTime>().unwrap(), WatchFaceTime::new(9, 41, 0).unwrap());
        assert_eq!(" 23:59:58 ".parse::<WatchFaceTime>().unwrap(), WatchFaceTime::new(23, 59, 58).unwrap());
        assert_eq!(WatchFaceTime::new(7, 5, 3).unwrap().to_string(), "07:05:03");

        for bad in ["24:00", "12:60", "12:00:60", "12", "1:2:3:4", "ab:cd", ""] {
            assert!(bad.parse::<WatchFaceTime>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn resolves_on_the_reference_day() {
        let reference = utc("2024-03-10T14:30:05Z");
        let dial = WatchFaceTime::new(14, 30, 2).unwrap();
        assert_eq!(dial.resolve_in(reference, &Utc).unwrap(), utc("2024-03-10T14:30:02Z"));
    }

    #[test]
    fn resolves_across_midnight() {
        let dial = WatchFaceTime::new(23, 59, 58).unwrap();
        let reference = utc("2024-03-11T00:00:03Z");
        assert_eq!(dial.resolve_in(reference, &Utc).unwrap(), utc("2024-03-10T23:59:58Z"));

        let dial = WatchFaceTime::new(0, 0, 4).unwrap();
        let reference = utc("2024-03-10T23:59:59Z");
        assert_eq!(dial.resolve_in(reference, &Utc).unwrap(), utc("2024-03-11T00:00:04Z"));
    }

    #[test]
    fn formats_with_millis() {
        let instant = Utc::now();
        let full = format_time(instant);
        assert_eq!(full.len(), "HH:MM:SS.mmm".len());
        assert!(full.starts_with(&format_time_short(instant)));
    }
}
