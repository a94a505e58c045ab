//! Equity trading-session boundaries.
//!
//! The provider serves intraday equity bars only between 09:30 and 15:59
//! local exchange time. Boundary dates supplied with a wall-clock time
//! outside that window are clamped to the nearest session edge so a query
//! never asks for minutes that cannot exist.

use chrono::{NaiveDateTime, NaiveTime, Timelike};

/// First intraday bar of a session.
pub const SESSION_OPEN: (u32, u32) = (9, 30);
/// Last intraday bar of a session.
pub const SESSION_CLOSE: (u32, u32) = (15, 59);

fn session_open(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date()
        .and_time(NaiveTime::from_hms_opt(SESSION_OPEN.0, SESSION_OPEN.1, 0).expect("valid time"))
}

fn session_close(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date().and_time(
        NaiveTime::from_hms_opt(SESSION_CLOSE.0, SESSION_CLOSE.1, 0).expect("valid time"),
    )
}

fn in_session(ts: NaiveDateTime) -> bool {
    let minute_of_day = ts.hour() * 60 + ts.minute();
    let open = SESSION_OPEN.0 * 60 + SESSION_OPEN.1;
    let close = SESSION_CLOSE.0 * 60 + SESSION_CLOSE.1;
    (open..=close).contains(&minute_of_day)
}

/// Clamp a range start to the session open of its day when it falls outside
/// the session.
pub fn clamp_start(ts: NaiveDateTime) -> NaiveDateTime {
    if in_session(ts) {
        ts
    } else {
        session_open(ts)
    }
}

/// Clamp a range end to the session close of its day when it falls outside
/// the session.
pub fn clamp_end(ts: NaiveDateTime) -> NaiveDateTime {
    if in_session(ts) {
        ts
    } else {
        session_close(ts)
    }
}
