//! Opening-hours formatting
//!
//! Pure functions over a week of `LocationHours`: grouping days that share
//! the same hours ("Mon – Fri 9 am – 5 pm") and the time formats used in
//! status messages and structured data.

use chrono::{Datelike, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use stacks_common::db::{weekday_from_number, LocationHours};
use stacks_common::i18n;

const NDASH: &str = "\u{2013}";

/// One row of the grouped hours display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDayGrouping {
    pub days: String,
    pub time: String,
}

/// Hours for one day as shown to visitors, with open/closed state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationHoursResult {
    pub day_of_week: i64,
    pub open: bool,
    pub open_time: Option<NaiveTime>,
    pub close_time: Option<NaiveTime>,
    pub is_override: bool,
    pub is_currently_open: bool,
    pub is_special_hours: bool,
    pub status_message: Option<String>,
    pub next_status_change: Option<chrono::NaiveDateTime>,
    pub next_open_date_time: Option<chrono::NaiveDateTime>,
}

pub fn day_abbreviation(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// Two-letter day code used by opening-hours structured data
pub fn day_code(day: Weekday) -> &'static str {
    &day_abbreviation(day)[..2]
}

/// Time as used in status messages: "9:00 AM"
pub fn format_status_time(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

/// Compact display time: "9 am", "5:30 pm"
pub fn format_display_time(time: NaiveTime) -> String {
    let (is_pm, hour) = time.hour12();
    let suffix = if is_pm { "pm" } else { "am" };
    if time.minute() == 0 {
        format!("{} {}", hour, suffix)
    } else {
        format!("{}:{:02} {}", hour, time.minute(), suffix)
    }
}

/// Structured data time: "09:00", "17:30"
pub fn format_structured_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

fn day_label(day: Weekday, structured: bool) -> &'static str {
    if structured {
        day_code(day)
    } else {
        day_abbreviation(day)
    }
}

/// Label for a set of days, given in Monday-first order
pub fn format_day_groupings(days: &[Weekday], structured: bool) -> String {
    let (Some(first), Some(last)) = (days.first(), days.last()) else {
        return String::new();
    };

    if days.len() == 1 {
        return day_label(*first, structured).to_string();
    }

    let span = (last.num_days_from_monday() as usize)
        .checked_sub(first.num_days_from_monday() as usize)
        .map(|d| d + 1);

    if days.len() == 2 || span == Some(days.len()) {
        let (first_label, last_label) = (day_label(*first, structured), day_label(*last, structured));
        return if structured {
            format!("{}{}{}", first_label, NDASH, last_label)
        } else if days.len() == 2 {
            format!("{} & {}", first_label, last_label)
        } else {
            format!("{} {} {}", first_label, NDASH, last_label)
        };
    }

    let separator = if structured { "," } else { ", " };
    days.iter()
        .map(|day| day_label(*day, structured))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Group a week of hours into display rows
///
/// Days are visited Monday first. An open day joins the most recent group
/// when its times match, otherwise it starts a new one. Closed days are
/// listed as a final "Closed" row, except in structured data.
pub fn compute_weekly_hours(weekly_hours: &[LocationHours], structured: bool) -> Vec<LocationDayGrouping> {
    let mut ordered: Vec<&LocationHours> = weekly_hours.iter().collect();
    ordered.sort_by_key(|h| weekday_from_number(h.day_of_week).num_days_from_monday());

    let mut groupings: Vec<(Vec<Weekday>, Option<NaiveTime>, Option<NaiveTime>)> = Vec::new();
    let mut closed_days = Vec::new();

    for day in ordered {
        let weekday = weekday_from_number(day.day_of_week);
        if !day.open {
            closed_days.push(weekday);
            continue;
        }

        match groupings.last_mut() {
            Some((days, open, close)) if *open == day.open_time && *close == day.close_time => {
                days.push(weekday);
            }
            _ => groupings.push((vec![weekday], day.open_time, day.close_time)),
        };
    }

    let format_time = |time: NaiveTime| {
        if structured {
            format_structured_time(time)
        } else {
            format_display_time(time)
        }
    };

    let mut formatted: Vec<LocationDayGrouping> = groupings
        .into_iter()
        .map(|(days, open, close)| {
            let time = match (open, close) {
                (Some(open), Some(close)) => {
                    format!("{} {} {}", format_time(open), NDASH, format_time(close))
                }
                _ => i18n::LOCATION_OPEN.to_string(),
            };
            LocationDayGrouping {
                days: format_day_groupings(&days, structured),
                time,
            }
        })
        .collect();

    if !closed_days.is_empty() && !structured {
        formatted.push(LocationDayGrouping {
            days: format_day_groupings(&closed_days, false),
            time: i18n::LOCATION_CLOSED.to_string(),
        });
    }

    formatted
}

/// Days from `from` until `to`, 0 to 6
pub fn days_until(from: Weekday, to: Weekday) -> i64 {
    (i64::from(to.num_days_from_sunday()) - i64::from(from.num_days_from_sunday())).rem_euclid(7)
}

/// Label for the next opening day relative to today
pub fn next_day_label(today: Weekday, next: Weekday) -> String {
    if today.succ() == next {
        i18n::LOCATION_TOMORROW.to_string()
    } else {
        day_abbreviation(next).to_string()
    }
}

/// Sunday on or before `date`
pub fn start_of_week(date: chrono::NaiveDate) -> chrono::NaiveDate {
    date - chrono::Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day(dow: i64, open: Option<(NaiveTime, NaiveTime)>) -> LocationHours {
        LocationHours {
            id: dow + 1,
            location_id: 1,
            day_of_week: dow,
            open: open.is_some(),
            open_time: open.map(|(o, _)| o),
            close_time: open.map(|(_, c)| c),
        }
    }

    fn standard_week() -> Vec<LocationHours> {
        vec![
            day(0, None),
            day(1, Some((t(9, 0), t(17, 0)))),
            day(2, Some((t(9, 0), t(17, 0)))),
            day(3, Some((t(9, 0), t(17, 0)))),
            day(4, Some((t(9, 0), t(17, 0)))),
            day(5, Some((t(9, 0), t(17, 0)))),
            day(6, Some((t(10, 0), t(14, 30)))),
        ]
    }

    #[test]
    fn test_display_time_format() {
        assert_eq!(format_display_time(t(9, 0)), "9 am");
        assert_eq!(format_display_time(t(17, 30)), "5:30 pm");
        assert_eq!(format_display_time(t(12, 0)), "12 pm");
        assert_eq!(format_display_time(t(0, 5)), "12:05 am");
    }

    #[test]
    fn test_structured_and_status_time_format() {
        assert_eq!(format_structured_time(t(9, 0)), "09:00");
        assert_eq!(format_structured_time(t(17, 30)), "17:30");
        assert_eq!(format_status_time(t(9, 0)), "9:00 AM");
        assert_eq!(format_status_time(t(20, 15)), "8:15 PM");
    }

    #[test]
    fn test_standard_week_groups() {
        let groups = compute_weekly_hours(&standard_week(), false);
        assert_eq!(
            groups,
            vec![
                LocationDayGrouping {
                    days: "Mon \u{2013} Fri".into(),
                    time: "9 am \u{2013} 5 pm".into()
                },
                LocationDayGrouping {
                    days: "Sat".into(),
                    time: "10 am \u{2013} 2:30 pm".into()
                },
                LocationDayGrouping {
                    days: "Sun".into(),
                    time: "Closed".into()
                },
            ]
        );
    }

    #[test]
    fn test_structured_week_omits_closed() {
        let groups = compute_weekly_hours(&standard_week(), true);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].days, "Mo\u{2013}Fr");
        assert_eq!(groups[0].time, "09:00 \u{2013} 17:00");
        assert_eq!(groups[1].days, "Sa");
    }

    #[test]
    fn test_closed_day_does_not_split_matching_hours() {
        let week = vec![
            day(1, Some((t(9, 0), t(17, 0)))),
            day(2, None),
            day(3, Some((t(9, 0), t(17, 0)))),
        ];
        let groups = compute_weekly_hours(&week, false);
        assert_eq!(groups[0].days, "Mon & Wed");
        assert_eq!(groups[1].days, "Tue");
        assert_eq!(groups[1].time, "Closed");
    }

    #[test]
    fn test_two_days_use_ampersand() {
        assert_eq!(
            format_day_groupings(&[Weekday::Sat, Weekday::Sun], false),
            "Sat & Sun"
        );
        assert_eq!(
            format_day_groupings(&[Weekday::Sat, Weekday::Sun], true),
            "Sa\u{2013}Su"
        );
    }

    #[test]
    fn test_weekend_run_is_contiguous_monday_first() {
        assert_eq!(
            format_day_groupings(&[Weekday::Fri, Weekday::Sat, Weekday::Sun], false),
            "Fri \u{2013} Sun"
        );
    }

    #[test]
    fn test_gapped_days_are_listed() {
        let days = [Weekday::Mon, Weekday::Wed, Weekday::Fri];
        assert_eq!(format_day_groupings(&days, false), "Mon, Wed, Fri");
        assert_eq!(format_day_groupings(&days, true), "Mo,We,Fr");
    }

    #[test]
    fn test_next_day_helpers() {
        assert_eq!(days_until(Weekday::Fri, Weekday::Mon), 3);
        assert_eq!(days_until(Weekday::Sun, Weekday::Sun), 0);
        assert_eq!(next_day_label(Weekday::Sat, Weekday::Sun), "tomorrow");
        assert_eq!(next_day_label(Weekday::Sat, Weekday::Mon), "Mon");
    }

    #[test]
    fn test_start_of_week_is_sunday() {
        let wednesday = chrono::NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        assert_eq!(
            start_of_week(wednesday),
            chrono::NaiveDate::from_ymd_opt(2024, 5, 12).unwrap()
        );
    }
}
