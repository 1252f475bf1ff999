//! Norwegian weekday and month names and a parser for the date texts used in pickup calendars.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, Weekday};
use regex::Regex;

// "fredag 12. mar", "12 mars 2025", "Mandag 17.mar"
static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:(?P<weekday>\p{L}+)\s+)?(?P<day>\d{1,2})\.?\s*(?P<month>\p{L}+)\.?(?:\s+(?P<year>\d{4}))?",
    )
    .expect("date pattern is valid")
});

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Errors produced by [`DateParser::parse`].
pub enum ParseError {
    /// Text holds no "day month" pattern.
    #[error("no date found in {0:?}")]
    NoMatch(String),
    /// Month name is not part of the locale.
    #[error("unknown month {0:?}")]
    UnknownMonth(String),
    /// Day does not exist in the given month and year.
    #[error("invalid date {year}-{month:02}-{day:02}")]
    InvalidDate {
        /// Year.
        year: i32,
        /// Month number.
        month: u32,
        /// Day of month.
        day: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Weekday and month names of one language.
pub struct Locale {
    weekdays: [String; 7],
    months: [String; 12],
}

impl Locale {
    /// Build a locale from weekday names (Monday first) and full month names (January first).
    #[must_use]
    pub fn new(weekdays: [&str; 7], months: [&str; 12]) -> Self {
        Self {
            weekdays: weekdays.map(str::to_lowercase),
            months: months.map(str::to_lowercase),
        }
    }

    /// Norwegian bokmål names.
    #[must_use]
    pub fn norwegian() -> Self {
        Self::new(
            [
                "mandag", "tirsdag", "onsdag", "torsdag", "fredag", "lørdag", "søndag",
            ],
            [
                "januar",
                "februar",
                "mars",
                "april",
                "mai",
                "juni",
                "juli",
                "august",
                "september",
                "oktober",
                "november",
                "desember",
            ],
        )
    }

    /// Weekday for a name, accepting plural forms such as "fredager".
    #[must_use]
    pub fn weekday(&self, name: &str) -> Option<Weekday> {
        let name = name.trim().trim_end_matches(['.', ':', ',']).to_lowercase();
        if name.is_empty() {
            return None;
        }
        let mut day = Weekday::Mon;
        for weekday in &self.weekdays {
            if name.starts_with(weekday.as_str()) {
                return Some(day);
            }
            day = day.succ();
        }
        None
    }

    /// Month number for a full name or an abbreviation of at least three letters.
    #[must_use]
    pub fn month(&self, name: &str) -> Option<u32> {
        let name = name.trim().trim_end_matches('.').to_lowercase();
        if name.chars().count() < 3 {
            return None;
        }
        (1_u32..)
            .zip(&self.months)
            .find(|(_number, month)| month.starts_with(name.as_str()))
            .map(|(number, _month)| number)
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::norwegian()
    }
}

#[derive(Debug, Clone, Default)]
/// Turns calendar texts like "fredag 12. mar" into dates.
pub struct DateParser {
    locale: Locale,
}

impl DateParser {
    /// Create a parser for the given locale.
    #[must_use]
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Locale used for name lookups.
    #[must_use]
    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Parse the first date found in `text`.
    ///
    /// The year is taken from `explicit_year`, then from a four digit year in the text.
    /// Without either, the date is placed in `today`'s year, or the following year if it
    /// would already have passed. Pickup calendars omit the year and never list past dates.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when no date pattern is found, the month name is unknown,
    /// or the day does not exist in that month.
    pub fn parse(
        &self,
        text: &str,
        explicit_year: Option<i32>,
        today: NaiveDate,
    ) -> Result<NaiveDate, ParseError> {
        let captures = DATE_PATTERN
            .captures_iter(text)
            .find(|captures| {
                captures
                    .name("month")
                    .is_some_and(|month| self.locale.month(month.as_str()).is_some())
            })
            .or_else(|| DATE_PATTERN.captures(text))
            .ok_or_else(|| ParseError::NoMatch(text.to_owned()))?;

        let month_name = captures.name("month").map_or("", |month| month.as_str());
        let month = self
            .locale
            .month(month_name)
            .ok_or_else(|| ParseError::UnknownMonth(month_name.to_owned()))?;
        let day = captures
            .name("day")
            .and_then(|day| day.as_str().parse::<u32>().ok())
            .ok_or_else(|| ParseError::NoMatch(text.to_owned()))?;
        let written_year = captures
            .name("year")
            .and_then(|year| year.as_str().parse::<i32>().ok());

        if let Some(year) = explicit_year.or(written_year) {
            return NaiveDate::from_ymd_opt(year, month, day)
                .ok_or(ParseError::InvalidDate { year, month, day });
        }

        let year = today.year();
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or(ParseError::InvalidDate { year, month, day })?;
        if date >= today {
            return Ok(date);
        }
        NaiveDate::from_ymd_opt(year + 1, month, day).ok_or(ParseError::InvalidDate {
            year: year + 1,
            month,
            day,
        })
    }

    /// Parse the first day of a range such as "12.–16. mai", or a single date.
    ///
    /// When the start lacks a month it borrows month and year from the end of the range.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when neither end of the range can be parsed.
    pub fn parse_range_start(&self, text: &str, today: NaiveDate) -> Result<NaiveDate, ParseError> {
        let Some((start, end)) = text.split_once(['-', '–']) else {
            return self.parse(text, None, today);
        };
        if let Ok(date) = self.parse(start, None, today) {
            return Ok(date);
        }

        let end = self.parse(end, None, today)?;
        let day = start
            .trim()
            .trim_end_matches('.')
            .rsplit(char::is_whitespace)
            .next()
            .and_then(|day| day.parse::<u32>().ok())
            .ok_or_else(|| ParseError::NoMatch(text.to_owned()))?;
        if day <= end.day() {
            return end
                .with_day(day)
                .ok_or(ParseError::InvalidDate {
                    year: end.year(),
                    month: end.month(),
                    day,
                });
        }
        // "28.–3. mars" starts in the month before.
        let previous = end
            .with_day(1)
            .and_then(|first| first.pred_opt())
            .ok_or_else(|| ParseError::NoMatch(text.to_owned()))?;
        previous.with_day(day).ok_or(ParseError::InvalidDate {
            year: previous.year(),
            month: previous.month(),
            day,
        })
    }
}
