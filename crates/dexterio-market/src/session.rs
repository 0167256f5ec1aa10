use chrono::{DateTime, Timelike, Utc};
use chrono_tz::America::New_York;
use dexterio_schemas::Session;

/// Trading session for a given instant, in ET wall-clock terms (DST-aware).
/// Boundaries belong to the earlier session (testable property: a bar at
/// exactly a boundary minute is in the session that ends there).
pub fn session_for(ts: DateTime<Utc>) -> Session {
    let et = ts.with_timezone(&New_York);
    let minute_of_day = et.hour() * 60 + et.minute();

    // asia: 18:00-02:00 (wraps midnight)
    if minute_of_day >= 18 * 60 || minute_of_day <= 2 * 60 {
        return Session::Asia;
    }
    if minute_of_day >= 3 * 60 && minute_of_day <= 8 * 60 {
        return Session::London;
    }
    if minute_of_day >= 9 * 60 + 30 && minute_of_day <= 11 * 60 {
        return Session::NyAm;
    }
    if minute_of_day > 11 * 60 && minute_of_day <= 14 * 60 {
        return Session::NyLunch;
    }
    if minute_of_day > 14 * 60 && minute_of_day <= 16 * 60 {
        return Session::NyPm;
    }
    Session::Off
}

/// Minute-of-day in ET, used by playbook time-window gating.
pub fn et_minute_of_day(ts: DateTime<Utc>) -> u32 {
    let et = ts.with_timezone(&New_York);
    et.hour() * 60 + et.minute()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ny_am_kill_zone_boundaries() {
        // Aug 1 2025 EDT: 09:30 ET = 13:30 UTC.
        let open = Utc.with_ymd_and_hms(2025, 8, 1, 13, 30, 0).unwrap();
        assert_eq!(session_for(open), Session::NyAm);
        let last_minute = Utc.with_ymd_and_hms(2025, 8, 1, 14, 59, 0).unwrap();
        assert_eq!(session_for(last_minute), Session::NyAm);
        // 11:00 ET is the NyAm/NyLunch boundary; it belongs to the earlier
        // session (NyAm), and NyLunch starts strictly after it.
        let lunch_boundary = Utc.with_ymd_and_hms(2025, 8, 1, 15, 0, 0).unwrap();
        assert_eq!(session_for(lunch_boundary), Session::NyAm);
        let lunch_start = Utc.with_ymd_and_hms(2025, 8, 1, 15, 1, 0).unwrap();
        assert_eq!(session_for(lunch_start), Session::NyLunch);
    }

    #[test]
    fn asia_wraps_midnight() {
        let late = Utc.with_ymd_and_hms(2025, 8, 1, 23, 0, 0).unwrap(); // 19:00 ET
        assert_eq!(session_for(late), Session::Asia);
        let early = Utc.with_ymd_and_hms(2025, 8, 2, 5, 0, 0).unwrap(); // 01:00 ET
        assert_eq!(session_for(early), Session::Asia);
    }

    #[test]
    fn dst_shift_tracked_in_winter() {
        // Jan 2 2025 EST: 09:30 ET = 14:30 UTC.
        let open = Utc.with_ymd_and_hms(2025, 1, 2, 14, 30, 0).unwrap();
        assert_eq!(session_for(open), Session::NyAm);
    }
}
