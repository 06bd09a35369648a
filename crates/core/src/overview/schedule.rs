use chrono::{DateTime, Duration, Offset, Timelike, Utc};
use chrono_tz::Tz;

/// Next `:00` or `:30` wall-clock boundary in `tz`, strictly after `now`.
pub fn next_half_hour_boundary(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let offset = now.with_timezone(&tz).offset().fix();
    let local = now.naive_utc() + offset;

    let into_slot = Duration::seconds(i64::from((local.minute() % 30) * 60 + local.second()))
        + Duration::nanoseconds(i64::from(local.nanosecond()));
    let boundary = local - into_slot + Duration::minutes(30);

    (boundary - offset).and_utc()
}
