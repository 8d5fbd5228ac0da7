//! List screens: a dated header row followed by one row per record.
//!
//! Records are sorted (stably) before selection, so ties keep their
//! stored order and unparsable values always land at the bottom.

use std::cmp::Ordering;

use chrono::{Datelike, Days, NaiveDate};

use super::format::join_columns;
use super::{DisplayMatrix, DisplayRow, ROWS};
use crate::records::{Event, Flight};

/// Record rows available below the header.
pub const LIST_ROWS: usize = ROWS - 1;

/// Parse a time of day into minutes since midnight.
///
/// Accepts `HH:MM`, `H:MM`, `HHMM` and `HMM`. Returns `None` for anything
/// else, including out-of-range hours or minutes.
#[must_use]
pub fn time_to_minutes(time: &str) -> Option<u32> {
    let time = time.trim();
    let (hours, minutes) = match time.split_once(':') {
        Some(parts) => parts,
        None if (3..=4).contains(&time.len()) && time.is_ascii() => time.split_at(time.len() - 2),
        None => return None,
    };
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return None;
    }
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    (hours < 24 && minutes < 60).then_some(hours * 60 + minutes)
}

/// Parse an `MM/DD` string into a month and day.
#[must_use]
pub fn parse_month_day(date: &str) -> Option<(u32, u32)> {
    let (month, day) = date.trim().split_once('/')?;
    let month: u32 = month.trim().parse().ok()?;
    let day: u32 = day.trim().parse().ok()?;
    ((1..=12).contains(&month) && (1..=31).contains(&day)).then_some((month, day))
}

/// The date a month/day falls on in `year`. Days past the end of the
/// month roll forward into the next one (02/29 in a common year is
/// 03/01).
fn occurrence(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)?.checked_add_days(Days::new(u64::from(day - 1)))
}

/// Days from `today` until the next occurrence of an `MM/DD` date.
///
/// A date already passed this year counts toward next year's
/// occurrence; today itself is zero days away.
#[must_use]
pub fn days_until(today: NaiveDate, month_day: &str) -> Option<i64> {
    let (month, day) = parse_month_day(month_day)?;
    let mut next = occurrence(today.year(), month, day)?;
    if next < today {
        next = occurrence(today.year() + 1, month, day)?;
    }
    Some((next - today).num_days())
}

/// Ascending with `None` last.
fn none_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort flights by time of day.
#[must_use]
pub fn sort_flights(flights: &[Flight]) -> Vec<&Flight> {
    let mut sorted: Vec<&Flight> = flights.iter().collect();
    sorted.sort_by(|a, b| none_last(time_to_minutes(&a.time), time_to_minutes(&b.time)));
    sorted
}

/// Sort events by days until their next occurrence.
#[must_use]
pub fn sort_events(events: &[Event], today: NaiveDate) -> Vec<&Event> {
    let mut sorted: Vec<&Event> = events.iter().collect();
    sorted.sort_by(|a, b| none_last(days_until(today, &a.date), days_until(today, &b.date)));
    sorted
}

fn header(label: &str, today: NaiveDate) -> DisplayRow {
    DisplayRow::from_text(&format!("{label} {}", today.format("%m/%d")))
}

/// The checkride board: `CHECKRIDES MM/DD`, then up to [`LIST_ROWS`]
/// flights as `time callsign type destination`.
#[must_use]
pub fn flights(flights: &[Flight], today: NaiveDate) -> DisplayMatrix {
    let rows = sort_flights(flights).into_iter().take(LIST_ROWS).map(|flight| {
        DisplayRow::from_text(&join_columns(&[
            (flight.time.trim(), 4),
            (flight.callsign.trim(), 6),
            (flight.aircraft_type.trim(), 3),
            (flight.destination.trim(), 6),
        ]))
    });
    DisplayMatrix::from_rows(std::iter::once(header("CHECKRIDES", today)).chain(rows))
}

/// The events board: `EVENTS MM/DD`, then up to [`LIST_ROWS`] events as
/// `date time description`, soonest first.
#[must_use]
pub fn events(events: &[Event], today: NaiveDate) -> DisplayMatrix {
    let rows = sort_events(events, today)
        .into_iter()
        .take(LIST_ROWS)
        .map(|event| {
            DisplayRow::from_text(&join_columns(&[
                (event.date.trim(), 5),
                (event.time.trim(), 4),
                (event.description.trim(), 11),
            ]))
        });
    DisplayMatrix::from_rows(std::iter::once(header("EVENTS", today)).chain(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::charset::{encode_str, BLANK};
    use crate::board::COLS;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn flight(time: &str, callsign: &str) -> Flight {
        Flight {
            id: None,
            time: time.to_string(),
            callsign: callsign.to_string(),
            aircraft_type: "PPL".to_string(),
            destination: "KXNA".to_string(),
        }
    }

    fn event(date: &str, description: &str) -> Event {
        Event {
            id: None,
            date: date.to_string(),
            time: "1800".to_string(),
            description: description.to_string(),
        }
    }

    fn text_of(matrix: &DisplayMatrix, row: usize) -> Vec<u8> {
        matrix.rows()[row].codes().to_vec()
    }

    #[test]
    fn test_time_to_minutes_formats() {
        assert_eq!(time_to_minutes("09:30"), Some(570));
        assert_eq!(time_to_minutes("9:30"), Some(570));
        assert_eq!(time_to_minutes("0930"), Some(570));
        assert_eq!(time_to_minutes("930"), Some(570));
        assert_eq!(time_to_minutes("23:59"), Some(1439));
        assert_eq!(time_to_minutes("00:00"), Some(0));
    }

    #[test]
    fn test_time_to_minutes_rejects_garbage() {
        assert_eq!(time_to_minutes(""), None);
        assert_eq!(time_to_minutes("24:00"), None);
        assert_eq!(time_to_minutes("12:60"), None);
        assert_eq!(time_to_minutes("noon"), None);
        assert_eq!(time_to_minutes("1:2"), None);
        assert_eq!(time_to_minutes("12345"), None);
        assert_eq!(time_to_minutes("-1:30"), None);
    }

    #[test]
    fn test_parse_month_day() {
        assert_eq!(parse_month_day("12/25"), Some((12, 25)));
        assert_eq!(parse_month_day("1/5"), Some((1, 5)));
        assert_eq!(parse_month_day("13/01"), None);
        assert_eq!(parse_month_day("12/32"), None);
        assert_eq!(parse_month_day("1225"), None);
        assert_eq!(parse_month_day(""), None);
    }

    #[test]
    fn test_days_until_wraps_to_next_year() {
        let today = day(2025, 12, 20);
        assert_eq!(days_until(today, "12/25"), Some(5));
        assert_eq!(days_until(today, "01/05"), Some(16));
        assert!(days_until(today, "12/25") < days_until(today, "01/05"));
    }

    #[test]
    fn test_days_until_today_is_zero() {
        assert_eq!(days_until(day(2025, 6, 1), "06/01"), Some(0));
        assert_eq!(days_until(day(2025, 6, 2), "06/01"), Some(364));
    }

    #[test]
    fn test_days_until_rolls_forward_missing_day() {
        // 2025 has no Feb 29; it lands on Mar 1
        assert_eq!(days_until(day(2025, 2, 27), "02/29"), Some(2));
        assert_eq!(days_until(day(2024, 2, 27), "02/29"), Some(2));
        assert_eq!(days_until(day(2025, 3, 1), "02/29"), Some(0));
    }

    #[test]
    fn test_flights_header_and_rows() {
        let matrix = flights(&[flight("0930", "N123AB")], day(2025, 4, 9));
        let mut header = encode_str("CHECKRIDES 04/09");
        header.resize(COLS, BLANK);
        assert_eq!(text_of(&matrix, 0), header);
        assert_eq!(text_of(&matrix, 1), encode_str("0930 N123AB PPL KXNA  "));
        assert_eq!(text_of(&matrix, 2), vec![BLANK; COLS]);
    }

    #[test]
    fn test_flights_sorted_with_unparsable_last() {
        let list = [
            flight("later", "BAD"),
            flight("14:00", "PM"),
            flight("8:15", "AM"),
        ];
        let sorted: Vec<&str> = sort_flights(&list).iter().map(|f| f.callsign.as_str()).collect();
        assert_eq!(sorted, ["AM", "PM", "BAD"]);
    }

    #[test]
    fn test_flights_sort_is_stable() {
        let list = [flight("10:00", "FIRST"), flight("1000", "SECOND")];
        let sorted: Vec<&str> = sort_flights(&list).iter().map(|f| f.callsign.as_str()).collect();
        assert_eq!(sorted, ["FIRST", "SECOND"]);
    }

    #[test]
    fn test_flights_always_six_by_twenty_two() {
        let today = day(2025, 1, 1);
        for count in 0..=8 {
            let list: Vec<Flight> = (0..count).map(|i| flight(&format!("{i}:00"), "N1")).collect();
            let matrix = flights(&list, today);
            assert_eq!(matrix.to_codes().len(), ROWS);
            assert!(matrix.to_codes().iter().all(|row| row.len() == COLS));
        }
    }

    #[test]
    fn test_flights_caps_at_five() {
        let list: Vec<Flight> = (0..7).map(|i| flight(&format!("{i}:00"), &format!("N{i}"))).collect();
        let matrix = flights(&list, day(2025, 1, 1));
        assert_eq!(&text_of(&matrix, 5)[..9], encode_str("4:00 N4  ").as_slice());
    }

    #[test]
    fn test_flight_fields_truncate() {
        let mut long = flight("09:30", "N123ABCDE");
        long.aircraft_type = "C172".to_string();
        long.destination = "SPRINGDALE".to_string();
        let matrix = flights(&[long], day(2025, 1, 1));
        assert_eq!(text_of(&matrix, 1), encode_str("09:3 N123AB C17 SPRING"));
    }

    #[test]
    fn test_events_sorted_by_days_until() {
        let list = [
            event("01/05", "NEW YEAR FLY"),
            event("bogus", "UNKNOWN"),
            event("12/25", "XMAS PARTY"),
        ];
        let today = day(2025, 12, 20);
        let sorted: Vec<&str> = sort_events(&list, today)
            .iter()
            .map(|e| e.description.as_str())
            .collect();
        assert_eq!(sorted, ["XMAS PARTY", "NEW YEAR FLY", "UNKNOWN"]);

        let matrix = events(&list, today);
        assert_eq!(&text_of(&matrix, 0)[..12], encode_str("EVENTS 12/20").as_slice());
        assert_eq!(text_of(&matrix, 1), encode_str("12/25 1800 XMAS PARTY "));
        assert_eq!(text_of(&matrix, 2), encode_str("01/05 1800 NEW YEAR FL"));
    }

    #[test]
    fn test_events_empty_list() {
        let matrix = events(&[], day(2025, 7, 4));
        for row in 1..ROWS {
            assert_eq!(text_of(&matrix, row), vec![BLANK; COLS]);
        }
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let list = [event("03/01", "SAFETY BRIEF")];
        let today = day(2025, 2, 1);
        assert_eq!(events(&list, today), events(&list, today));
    }
}
