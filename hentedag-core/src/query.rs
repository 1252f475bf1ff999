//! "When is the next pickup?" queries.

use chrono::NaiveDate;

use crate::model::{Schedule, WasteCategory};

/// Earliest date on or after `today`, whatever the order of `dates`.
#[must_use]
pub fn next_pickup_in<'dates, I>(dates: I, today: NaiveDate) -> Option<NaiveDate>
where
    I: IntoIterator<Item = &'dates NaiveDate>,
{
    dates.into_iter().copied().filter(|date| *date >= today).min()
}

/// Next pickup of `category`, or `None` when the schedule holds no upcoming date for it.
#[must_use]
pub fn next_pickup(
    schedule: &Schedule,
    category: &WasteCategory,
    today: NaiveDate,
) -> Option<NaiveDate> {
    schedule
        .dates(category)
        .and_then(|dates| next_pickup_in(dates, today))
}

/// Whole days from `today` until the next pickup of `category`.
#[must_use]
pub fn days_until_pickup(
    schedule: &Schedule,
    category: &WasteCategory,
    today: NaiveDate,
) -> Option<i64> {
    next_pickup(schedule, category, today).map(|date| (date - today).num_days())
}
