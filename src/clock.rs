/// Injected wall clock and the calendar helpers built on it.
///
/// Every date floor ("thirteen weeks ago, Monday midnight", "24 hours ago") is
/// computed from a `Clock` at call time so tests can pin "now".
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Earliest publish date the platform can report; used when a dataset has no floor
pub fn platform_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Midnight UTC of the Monday starting the week that contains `at`
pub fn week_start(at: DateTime<Utc>) -> DateTime<Utc> {
    let date = at.date_naive() - Duration::days(i64::from(at.weekday().num_days_from_monday()));
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(at)
}

/// Monday midnight `weeks` whole weeks before the current week's start
pub fn weeks_ago_monday(now: DateTime<Utc>, weeks: u32) -> DateTime<Utc> {
    saturating_before(week_start(now), Duration::try_weeks(i64::from(weeks)))
}

/// Exactly `hours` hours before `now`
pub fn hours_ago(now: DateTime<Utc>, hours: u32) -> DateTime<Utc> {
    saturating_before(now, Duration::try_hours(i64::from(hours)))
}

/// Out-of-range spans clamp to the earliest representable instant
fn saturating_before(at: DateTime<Utc>, span: Option<Duration>) -> DateTime<Utc> {
    span.and_then(|span| at.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
