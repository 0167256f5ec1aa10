use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use chrono_tz::America::New_York;
use dexterio_schemas::Timeframe;

/// True if `ts` is the last minute of a 5-minute bucket.
pub fn closes_m5(ts: DateTime<Utc>) -> bool {
    ts.minute() % 5 == 4
}

/// True if `ts` is the last minute of a 15-minute bucket.
pub fn closes_m15(ts: DateTime<Utc>) -> bool {
    matches!(ts.minute(), 14 | 29 | 44 | 59)
}

/// True if `ts` is the last minute of an hour.
pub fn closes_h1(ts: DateTime<Utc>) -> bool {
    ts.minute() == 59
}

/// True if `ts` closes a 4-hour bucket anchored to 00:00 UTC, restricted to
/// the three boundaries overlapping the trading day (12:00/16:00/20:00 UTC
/// closes, i.e. hours 11/15/19). The other three mod-4 boundaries
/// (3/7/23) fall entirely inside the overnight session and never close a
/// bucket.
pub fn closes_h4(ts: DateTime<Utc>) -> bool {
    ts.minute() == 59 && matches!(ts.hour(), 11 | 15 | 19)
}

/// True if `ts` closes the trading day, i.e. is the minute of the NYSE
/// 16:00 ET close, DST-aware.
pub fn closes_d1(ts: DateTime<Utc>) -> bool {
    if ts.minute() != 59 {
        return false;
    }
    let et = ts.with_timezone(&New_York);
    et.hour() == 15 && et.minute() == 59
}

/// Which timeframes this bar closes, in ascending Timeframe order.
pub fn closed_timeframes(ts: DateTime<Utc>) -> Vec<Timeframe> {
    let mut out = Vec::new();
    if closes_m5(ts) {
        out.push(Timeframe::M5);
    }
    if closes_m15(ts) {
        out.push(Timeframe::M15);
    }
    if closes_h1(ts) {
        out.push(Timeframe::H1);
    }
    if closes_h4(ts) {
        out.push(Timeframe::H4);
    }
    if closes_d1(ts) {
        out.push(Timeframe::D1);
    }
    out
}

/// Start-of-bucket timestamp for a bar closing at `ts` at timeframe `tf`.
/// Used to pick the bucket's open price (open of the first bar in the
/// bucket).
pub fn bucket_start(ts: DateTime<Utc>, tf: Timeframe) -> DateTime<Utc> {
    match tf {
        Timeframe::M1 => ts,
        Timeframe::M5 => ts - chrono::Duration::minutes(4),
        Timeframe::M15 => {
            let minute_in_bucket = ts.minute() % 15;
            ts - chrono::Duration::minutes(minute_in_bucket as i64)
        }
        Timeframe::H1 => ts - chrono::Duration::minutes(59),
        Timeframe::H4 => {
            let hour_in_bucket = ts.hour() % 4;
            let base = ts - chrono::Duration::hours(hour_in_bucket as i64);
            Utc.with_ymd_and_hms(base.year(), base.month(), base.day(), base.hour(), 0, 0)
                .unwrap()
        }
        Timeframe::D1 => {
            // Start of the trading day in ET, converted back to UTC: the
            // minute after the previous day's 16:00 ET close.
            let et = ts.with_timezone(&New_York);
            let day_start_et = et
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                .and_local_timezone(New_York)
                .single()
                .unwrap();
            day_start_et.with_timezone(&Utc)
        }
    }
}
