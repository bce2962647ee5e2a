//! Relative-date resolution for dictated due dates and follow-ups.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Resolves a spoken or model-produced date against `today`.
///
/// Accepts ISO dates, `MM/DD/YYYY`, month-name dates, and phrases such as
/// "today", "tomorrow", "day after tomorrow", "next week", "in 3 days",
/// "in 2 weeks" and weekday names ("friday", "next tuesday"). A bare weekday
/// always means the next occurrence strictly after today.
pub fn resolve_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = raw.trim().trim_end_matches('.').to_ascii_lowercase();
    if text.is_empty() {
        return None;
    }

    for format in [DATE_FORMAT, "%m/%d/%Y", "%B %d, %Y", "%B %d %Y", "%b %d, %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&text, format) {
            return Some(date);
        }
    }

    match text.as_str() {
        "today" | "tonight" | "this afternoon" | "this evening" => return Some(today),
        "tomorrow" | "tomorrow morning" | "tomorrow afternoon" => {
            return Some(today + Duration::days(1))
        }
        "day after tomorrow" | "the day after tomorrow" => return Some(today + Duration::days(2)),
        "next week" => return Some(today + Duration::days(7)),
        "end of week" | "end of the week" | "this week" => {
            return Some(next_weekday(today, Weekday::Fri, true))
        }
        _ => {}
    }

    if let Some(offset) = in_n_units(&text) {
        return today.checked_add_signed(offset);
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    match words.as_slice() {
        [day] | ["on", day] | ["this", day] | ["next", day] | ["this", "coming", day] => {
            parse_weekday(day).map(|wd| next_weekday(today, wd, false))
        }
        _ => month_day_without_year(&text, today),
    }
}

/// "in 3 days", "in a week", "in 2 weeks". Offsets outside the calendar
/// range yield `None`.
fn in_n_units(text: &str) -> Option<Duration> {
    let rest = text.strip_prefix("in ")?;
    let mut parts = rest.split_whitespace();
    let count = match parts.next()? {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        n => n.parse::<i64>().ok()?,
    };
    let unit = parts.next()?;
    if parts.next().is_some() || count < 0 {
        return None;
    }
    let days = match unit.trim_end_matches('s') {
        "day" => count,
        "week" => count.checked_mul(7)?,
        _ => return None,
    };
    Duration::try_days(days)
}

fn parse_weekday(word: &str) -> Option<Weekday> {
    let day = match word.trim_end_matches(',') {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tue" | "tues" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thu" | "thurs" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" | "sat" => Weekday::Sat,
        "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

fn next_weekday(today: NaiveDate, target: Weekday, allow_today: bool) -> NaiveDate {
    let current = today.weekday().num_days_from_monday() as i64;
    let wanted = target.num_days_from_monday() as i64;
    let mut delta = (wanted - current).rem_euclid(7);
    if delta == 0 && !allow_today {
        delta = 7;
    }
    today + Duration::days(delta)
}

/// "march 5" resolves to the next March 5th on or after today.
fn month_day_without_year(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let with_year = format!("{text} {}", today.year());
    let date = NaiveDate::parse_from_str(&with_year, "%B %d %Y")
        .or_else(|_| NaiveDate::parse_from_str(&with_year, "%b %d %Y"))
        .ok()?;
    if date < today {
        date.with_year(today.year() + 1)
    } else {
        Some(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2026-01-07 is a Wednesday.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 7).unwrap()
    }

    fn resolved(raw: &str) -> Option<String> {
        resolve_date(raw, today()).map(format_date)
    }

    #[test]
    fn absolute_formats() {
        assert_eq!(resolved("2026-02-14").as_deref(), Some("2026-02-14"));
        assert_eq!(resolved("02/14/2026").as_deref(), Some("2026-02-14"));
        assert_eq!(resolved("February 14, 2026").as_deref(), Some("2026-02-14"));
    }

    #[test]
    fn relative_phrases() {
        assert_eq!(resolved("today").as_deref(), Some("2026-01-07"));
        assert_eq!(resolved("Tomorrow").as_deref(), Some("2026-01-08"));
        assert_eq!(resolved("day after tomorrow").as_deref(), Some("2026-01-09"));
        assert_eq!(resolved("next week").as_deref(), Some("2026-01-14"));
        assert_eq!(resolved("in 3 days").as_deref(), Some("2026-01-10"));
        assert_eq!(resolved("in two weeks").as_deref(), Some("2026-01-21"));
        assert_eq!(resolved("end of the week").as_deref(), Some("2026-01-09"));
    }

    #[test]
    fn weekday_names_pick_next_occurrence() {
        assert_eq!(resolved("friday").as_deref(), Some("2026-01-09"));
        assert_eq!(resolved("next Monday").as_deref(), Some("2026-01-12"));
        assert_eq!(resolved("on wednesday").as_deref(), Some("2026-01-14"));
    }

    #[test]
    fn month_day_rolls_into_next_year_when_past() {
        assert_eq!(resolved("march 5").as_deref(), Some("2026-03-05"));
        assert_eq!(resolved("January 2").as_deref(), Some("2027-01-02"));
    }

    #[test]
    fn unparseable_is_none() {
        assert_eq!(resolved("sometime soon"), None);
        assert_eq!(resolved(""), None);
        assert_eq!(resolved("in many days"), None);
    }

    #[test]
    fn out_of_range_offsets_are_none() {
        assert_eq!(resolved("in 99999999 days"), None);
        assert_eq!(resolved("in 9223372036854775807 days"), None);
        assert_eq!(resolved("in 9223372036854775807 weeks"), None);
        assert_eq!(resolved("in 2000000000000000 weeks"), None);
    }
}
