//! Reference appointment scheduling
//!
//! Visitors ask for a call back from library staff. Calls are offered on
//! weekdays between 8:30 am and 4:30 pm, no sooner than four hours from
//! now, rounded up to the half hour, and at most a week ahead.

use crate::db::schedule;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};
use sqlx::SqlitePool;
use stacks_common::clock::SharedClock;
use stacks_common::db::{ScheduleRequest, ScheduleRequestSubject};
use stacks_common::{Error, Result};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::hours::format_status_time;

const START_HOUR: u32 = 8;
const START_MINUTE: u32 = 30;
const AVAILABLE_HOURS: i64 = 8;
const BUFFER_HOURS: i64 = 4;
const QUANTIZE_MINUTES: i64 = 30;
const SCHEDULE_DAYS_AHEAD: i64 = 7;
const PHONE_DIGITS: usize = 10;

pub const PHONE_FORMAT_MESSAGE: &str = "Please enter a telephone number in the format: ###-###-####";

fn start_time() -> NaiveTime {
    NaiveTime::from_hms_opt(START_HOUR, START_MINUTE, 0).unwrap_or(NaiveTime::MIN)
}

fn end_time() -> NaiveTime {
    start_time() + Duration::hours(AVAILABLE_HOURS)
}

/// Round up to the next quantization boundary
fn round_up(value: NaiveDateTime) -> NaiveDateTime {
    let minutes = i64::from(value.hour()) * 60 + i64::from(value.minute());
    let has_remainder = value.second() > 0 || value.nanosecond() > 0;
    let mut rounded = (minutes + QUANTIZE_MINUTES - 1) / QUANTIZE_MINUTES * QUANTIZE_MINUTES;
    if has_remainder && rounded == minutes {
        rounded += QUANTIZE_MINUTES;
    }
    value.date().and_time(NaiveTime::MIN) + Duration::minutes(rounded)
}

fn skip_weekend(value: NaiveDateTime) -> NaiveDateTime {
    match value.weekday() {
        Weekday::Sat => value + Duration::days(2),
        Weekday::Sun => value + Duration::days(1),
        _ => value,
    }
}

/// Earliest bookable appointment as of `now`
///
/// Weekends move to Monday morning. On a weekday the buffer is applied when
/// it still lands inside today's window; otherwise the next weekday at the
/// start of the window.
pub fn first_available(now: NaiveDateTime) -> NaiveDateTime {
    let start = now.date().and_time(start_time());

    match start.weekday() {
        Weekday::Sat | Weekday::Sun => skip_weekend(start),
        _ => {
            let buffered = now + Duration::hours(BUFFER_HOURS);
            if now > start && buffered < start + Duration::hours(AVAILABLE_HOURS) {
                round_up(buffered)
            } else {
                skip_weekend(start + Duration::days(1))
            }
        }
    }
}

fn format_short_date(date: NaiveDate) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

static PHONE_FILTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^0-9.]").expect("phone filter regex is valid"));

/// Digits (and dots) of a telephone number as entered
pub fn normalize_phone(phone: &str) -> String {
    PHONE_FILTER.replace_all(phone, "").into_owned()
}

/// Submitted appointment request
///
/// Blank date, time and subject inputs arrive as empty strings and read as
/// unset, so validation reports them instead of the form being rejected.
#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleForm {
    #[serde(default)]
    #[serde_as(deserialize_as = "NoneAsEmptyString")]
    pub requested_date: Option<NaiveDate>,
    #[serde(default)]
    #[serde_as(deserialize_as = "NoneAsEmptyString")]
    pub requested_time: Option<NaiveTime>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    #[serde_as(deserialize_as = "NoneAsEmptyString")]
    pub subject_id: Option<i64>,
}

/// Field name to message
pub type FieldErrors = BTreeMap<&'static str, String>;

/// Check a request against the booking window
///
/// Out-of-range dates and times are clamped to the nearest allowed value so
/// the redisplayed form offers a valid choice.
pub fn validate_request(
    form: &mut ScheduleForm,
    first_available: NaiveDateTime,
    subjects: &[ScheduleRequestSubject],
) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let first_date = first_available.date();
    let last_date = first_date + Duration::days(SCHEDULE_DAYS_AHEAD);

    let requested_date = form.requested_date.unwrap_or(first_date);
    if requested_date < first_date {
        errors.insert(
            "requested_date",
            format!("You must request a date on or after {}", format_short_date(first_date)),
        );
        form.requested_date = Some(first_date);
    } else if requested_date > last_date {
        errors.insert(
            "requested_date",
            format!(
                "The furthest date you can schedule a call is {}",
                format_short_date(last_date)
            ),
        );
        form.requested_date = Some(last_date);
    } else {
        form.requested_date = Some(requested_date);
    }

    let earliest = if form.requested_date == Some(first_date) {
        first_available.time()
    } else {
        start_time()
    };
    let requested_time = form.requested_time.unwrap_or(earliest);

    if requested_time < earliest {
        errors.insert(
            "requested_time",
            format!("The earliest time you can select is {}", format_status_time(earliest)),
        );
        form.requested_time = Some(earliest);
    } else if requested_time > end_time() {
        errors.insert(
            "requested_time",
            format!("You must request a time before {}", format_status_time(end_time())),
        );
        form.requested_time = Some(end_time());
    } else {
        form.requested_time = Some(requested_time);
    }

    if normalize_phone(&form.phone).len() != PHONE_DIGITS {
        errors.insert("phone", PHONE_FORMAT_MESSAGE.to_string());
    }

    if form.name.trim().is_empty() {
        errors.insert("name", "Please enter your name.".to_string());
    }

    let subject_known = form
        .subject_id
        .is_some_and(|id| subjects.iter().any(|s| s.id == id));
    if !subject_known {
        errors.insert("subject_id", "Please select a subject.".to_string());
    }

    errors
}

#[derive(Clone)]
pub struct ScheduleService {
    db: SqlitePool,
    clock: SharedClock,
}

impl ScheduleService {
    pub fn new(db: SqlitePool, clock: SharedClock) -> Self {
        Self { db, clock }
    }

    pub fn first_available(&self) -> NaiveDateTime {
        first_available(self.clock.now())
    }

    pub async fn get_subjects(&self) -> Result<Vec<ScheduleRequestSubject>> {
        schedule::get_subjects(&self.db).await
    }

    /// Store a validated request, creating the telephone record if needed
    pub async fn add(&self, form: &ScheduleForm, language: Option<&str>) -> Result<ScheduleRequest> {
        let (Some(date), Some(time), Some(subject_id)) =
            (form.requested_date, form.requested_time, form.subject_id)
        else {
            return Err(Error::InvalidInput(
                "A date, time and subject are required.".to_string(),
            ));
        };

        let phone: String = form.phone.chars().filter(char::is_ascii_digit).collect();
        let telephone_id = schedule::get_or_add_telephone(&self.db, &phone).await?;

        let mut request = ScheduleRequest {
            requested_time: date.and_time(time),
            name: form.name.trim().to_string(),
            email: form.email.as_deref().map(str::trim).filter(|e| !e.is_empty()).map(String::from),
            notes: form.notes.clone(),
            language: language.map(String::from),
            schedule_request_subject_id: subject_id,
            schedule_request_telephone_id: telephone_id,
            created_at: self.clock.now(),
            ..Default::default()
        };

        request.id = schedule::add_request(&self.db, &request).await?;

        tracing::info!(
            request_id = request.id,
            requested_time = %request.requested_time,
            "Scheduled reference appointment"
        );

        Ok(request)
    }
}
