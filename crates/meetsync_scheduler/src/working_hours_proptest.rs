// --- File: crates/meetsync_scheduler/src/working_hours_proptest.rs ---
#[cfg(test)]
mod tests {
    use crate::working_hours::{generate_candidate_intervals, OpenRange, WorkingHoursRules};
    use chrono::{Datelike, Duration, NaiveTime, TimeZone, Utc, Weekday};
    use chrono_tz::Tz;
    use proptest::prelude::*;
    use std::collections::{BTreeSet, HashMap};

    fn rules(
        time_zone: Tz,
        open_hour: u32,
        close_hour: u32,
        duration_minutes: i64,
        buffer_minutes: i64,
        lead_minutes: i64,
    ) -> WorkingHoursRules {
        let range = OpenRange {
            start: NaiveTime::from_hms_opt(open_hour, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(close_hour, 0, 0).unwrap(),
        };
        let open_hours: HashMap<Weekday, Vec<OpenRange>> =
            [Weekday::Mon, Weekday::Wed, Weekday::Fri]
                .into_iter()
                .map(|d| (d, vec![range]))
                .collect();
        WorkingHoursRules {
            time_zone,
            open_hours,
            slot_duration: Duration::minutes(duration_minutes),
            buffer: Duration::minutes(buffer_minutes),
            blackout_dates: BTreeSet::new(),
            min_lead_time: Duration::minutes(lead_minutes),
        }
    }

    fn zone(index: usize) -> Tz {
        [Tz::UTC, Tz::Asia__Seoul, Tz::Europe__Zurich, Tz::America__New_York][index]
    }

    proptest! {
        #[test]
        fn intervals_are_sorted_disjoint_and_inside_the_window(
            zone_index in 0..4usize,
            start_offset_hours in 0..24 * 60i64,
            window_hours in 0..24 * 10i64,
            open_hour in 0..12u32,
            close_hour in 13..24u32,
            duration_minutes in 15..120i64,
            buffer_minutes in 0..30i64,
            lead_minutes in 0..600i64,
            now_offset_hours in -48..48i64,
        ) {
            let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
            let window_start = base + Duration::hours(start_offset_hours);
            let window_end = window_start + Duration::hours(window_hours);
            let now = window_start + Duration::hours(now_offset_hours);
            let rules = rules(zone(zone_index), open_hour, close_hour, duration_minutes, buffer_minutes, lead_minutes);

            let intervals = generate_candidate_intervals(window_start, window_end, &rules, now);

            for pair in intervals.windows(2) {
                prop_assert!(pair[0].end <= pair[1].start, "overlap: {:?}", pair);
            }
            for interval in &intervals {
                prop_assert!(interval.start < interval.end);
                prop_assert!(interval.start >= window_start);
                prop_assert!(interval.end <= window_end);
                prop_assert!(interval.start >= now + rules.min_lead_time);
                prop_assert_eq!(interval.duration(), rules.slot_duration);

                let local = interval.start.with_timezone(&rules.time_zone);
                prop_assert!(rules.open_hours.contains_key(&local.weekday()));
                prop_assert!(local.time() >= NaiveTime::from_hms_opt(open_hour, 0, 0).unwrap());
            }
        }

        #[test]
        fn generation_is_deterministic(
            start_offset_hours in 0..24 * 30i64,
            window_hours in 1..24 * 7i64,
        ) {
            let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
            let window_start = base + Duration::hours(start_offset_hours);
            let window_end = window_start + Duration::hours(window_hours);
            let rules = rules(Tz::Asia__Seoul, 9, 18, 60, 0, 0);

            let first = generate_candidate_intervals(window_start, window_end, &rules, base);
            let second = generate_candidate_intervals(window_start, window_end, &rules, base);
            prop_assert_eq!(first, second);
        }
    }
}
