// --- File: crates/meetsync_scheduler/src/working_hours.rs ---
//! Weekly working-hour rules and the pure candidate interval generator.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use meetsync_common::models::Interval;
use meetsync_config::WorkingHoursConfig;
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RulesError {
    #[error("Unknown time zone: {0}")]
    UnknownTimeZone(String),
    #[error("Unknown weekday: {0}")]
    UnknownWeekday(String),
    #[error("Invalid open hours range '{0}', expected HH:MM-HH:MM")]
    InvalidRange(String),
    #[error("Invalid blackout date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Slot duration must be positive, got {0} minutes")]
    InvalidDuration(i64),
}

/// One contiguous opening on a weekday, in local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl FromStr for OpenRange {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RulesError::InvalidRange(s.to_string());
        let (start, end) = s.split_once('-').ok_or_else(invalid)?;
        let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").map_err(|_| invalid())?;
        let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").map_err(|_| invalid())?;
        if end <= start {
            return Err(invalid());
        }
        Ok(Self { start, end })
    }
}

#[derive(Debug, Clone)]
pub struct WorkingHoursRules {
    pub time_zone: Tz,
    pub open_hours: HashMap<Weekday, Vec<OpenRange>>,
    pub slot_duration: Duration,
    pub buffer: Duration,
    pub blackout_dates: BTreeSet<NaiveDate>,
    /// No interval may start before `now + min_lead_time`.
    pub min_lead_time: Duration,
}

impl WorkingHoursRules {
    pub fn from_config(config: &WorkingHoursConfig) -> Result<Self, RulesError> {
        let time_zone = Tz::from_str(&config.time_zone)
            .map_err(|_| RulesError::UnknownTimeZone(config.time_zone.clone()))?;

        let mut open_hours = HashMap::new();
        for (day, ranges) in &config.open_hours {
            let weekday = day
                .parse::<Weekday>()
                .map_err(|_| RulesError::UnknownWeekday(day.clone()))?;
            let mut parsed = ranges
                .iter()
                .map(|r| r.parse::<OpenRange>())
                .collect::<Result<Vec<_>, _>>()?;
            parsed.sort_by_key(|r| r.start);
            open_hours.insert(weekday, parsed);
        }

        if config.slot_duration_minutes <= 0 {
            return Err(RulesError::InvalidDuration(config.slot_duration_minutes));
        }

        let blackout_dates = config
            .blackout_dates
            .iter()
            .map(|d| {
                NaiveDate::parse_from_str(d, "%Y-%m-%d")
                    .map_err(|_| RulesError::InvalidDate(d.clone()))
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(Self {
            time_zone,
            open_hours,
            slot_duration: Duration::minutes(config.slot_duration_minutes),
            buffer: Duration::minutes(config.buffer_minutes.max(0)),
            blackout_dates,
            min_lead_time: Duration::minutes(config.min_lead_time_minutes.max(0)),
        })
    }
}

/// Bookable intervals inside `[window_start, window_end)` before any
/// free/busy filtering.
///
/// The result is sorted and non-overlapping. Local times that do not exist
/// (DST gaps) are skipped and ambiguous ones resolve to the earlier
/// instant. A window shorter than one interval yields an empty vector.
pub fn generate_candidate_intervals(
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    rules: &WorkingHoursRules,
    now: DateTime<Utc>,
) -> Vec<Interval> {
    if window_end <= window_start || rules.slot_duration <= Duration::zero() {
        return Vec::new();
    }

    let tz = rules.time_zone;
    let earliest_start = now + rules.min_lead_time;
    let first_day = window_start.with_timezone(&tz).date_naive();
    let last_day = window_end.with_timezone(&tz).date_naive();

    let mut intervals = Vec::new();
    for day in first_day.iter_days().take_while(|d| *d <= last_day) {
        if rules.blackout_dates.contains(&day) {
            continue;
        }
        let Some(ranges) = rules.open_hours.get(&day.weekday()) else {
            continue;
        };

        for range in ranges {
            let range_end = day.and_time(range.end);
            let mut cursor = day.and_time(range.start);
            while cursor + rules.slot_duration <= range_end {
                let next_end = cursor + rules.slot_duration;
                if let Some(interval) = to_utc_interval(&tz, cursor, rules.slot_duration) {
                    if interval.start >= window_start
                        && interval.end <= window_end
                        && interval.start >= earliest_start
                    {
                        intervals.push(interval);
                    }
                }
                cursor = next_end + rules.buffer;
            }
        }
    }

    intervals.sort();
    // Overlapping configured ranges must not produce overlapping slots.
    let mut result: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        if result.last().map_or(true, |prev| interval.start >= prev.end) {
            result.push(interval);
        }
    }
    result
}

/// The end is derived from the UTC start so an interval spanning a DST
/// change keeps its real duration.
fn to_utc_interval(tz: &Tz, start: NaiveDateTime, duration: Duration) -> Option<Interval> {
    let start = tz.from_local_datetime(&start).earliest()?.with_timezone(&Utc);
    Interval::new(start, start + duration)
}
