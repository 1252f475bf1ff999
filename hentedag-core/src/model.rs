//! Domain data structures for categories, households, and pickup schedules.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Tag for a class of waste collected on its own schedule, e.g. `paper` or `residual`.
///
/// The set of known categories comes from configuration, so this is a plain string tag.
pub struct WasteCategory(pub String);

impl WasteCategory {
    /// Create a category tag.
    #[must_use]
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    /// Tag as string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WasteCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<&str> for WasteCategory {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Geographic coordinate of the household.
pub struct Location {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Key used to request the calendar document of one household.
pub enum HouseholdIdentifier {
    /// Street id and municipality supplied directly by the user.
    Street {
        /// Provider street id.
        street_id: String,
        /// Municipality name or number.
        municipality: String,
    },
    /// Property reference, either resolved through the address lookup or configured as a
    /// combined street key.
    Property(String),
}

impl fmt::Display for HouseholdIdentifier {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Street {
                street_id,
                municipality,
            } => write!(formatter, "{street_id}@{municipality}"),
            Self::Property(reference) => write!(formatter, "{reference}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Address returned from a provider address lookup.
pub struct AddressCandidate {
    /// Address including municipality, e.g. "Kongeveien 1, Kristiansand".
    pub label: String,
    /// Address without municipality, e.g. "Kongeveien 1".
    pub value: String,
    /// Property reference used when requesting the calendar.
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Holiday override replacing one pickup date by another within a category.
pub struct ExceptionPair {
    /// Category the override applies to.
    pub category: WasteCategory,
    /// Regular pickup date that is cancelled.
    pub original: NaiveDate,
    /// Date the pickup is moved to.
    pub replacement: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Pickup dates per category as resolved from one calendar document.
pub struct Schedule {
    pickups: BTreeMap<WasteCategory, BTreeSet<NaiveDate>>,
    /// Weekday announced by the provider, set when the baseline was generated from it.
    pub pickup_weekday: Option<Weekday>,
    /// Time of the refresh that produced this schedule.
    pub refreshed_at: Option<NaiveDateTime>,
}

impl Schedule {
    /// Empty schedule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pickup date to a category. Returns `false` if the date was already present.
    pub fn insert(&mut self, category: &WasteCategory, date: NaiveDate) -> bool {
        self.pickups
            .entry(category.clone())
            .or_default()
            .insert(date)
    }

    /// Add one pickup date to every listed category.
    pub fn insert_fan_out(&mut self, categories: &[WasteCategory], date: NaiveDate) {
        for category in categories {
            self.insert(category, date);
        }
    }

    /// Remove a pickup date from a category. Returns `true` if the date was present.
    pub fn remove(&mut self, category: &WasteCategory, date: NaiveDate) -> bool {
        self.pickups
            .get_mut(category)
            .is_some_and(|dates| dates.remove(&date))
    }

    /// Pickup dates of a category in ascending order.
    #[must_use]
    pub fn dates(&self, category: &WasteCategory) -> Option<&BTreeSet<NaiveDate>> {
        self.pickups.get(category)
    }

    /// Categories that have at least one entry.
    pub fn categories(&self) -> impl Iterator<Item = &WasteCategory> {
        self.pickups
            .iter()
            .filter(|(_category, dates)| !dates.is_empty())
            .map(|(category, _dates)| category)
    }

    /// Whether any category holds a date.
    #[must_use]
    pub fn has_dates(&self) -> bool {
        self.pickups.values().any(|dates| !dates.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Maps provider markup containing `pattern` to one or more categories.
pub struct CategoryRule {
    /// Case-insensitive fragment looked for in labels or attributes.
    pub pattern: String,
    /// Categories the markup feeds. More than one fans the date out.
    pub categories: Vec<WasteCategory>,
}

impl CategoryRule {
    /// Build a rule from a pattern and category names.
    #[must_use]
    pub fn new(pattern: &str, categories: &[&str]) -> Self {
        Self {
            pattern: pattern.to_lowercase(),
            categories: categories.iter().copied().map(WasteCategory::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Ordered list of [`CategoryRule`]s; the first matching rule wins.
pub struct CategoryMap {
    rules: Vec<CategoryRule>,
}

impl CategoryMap {
    /// Build a map from rules in priority order.
    #[must_use]
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    /// Return a map consulting `overrides` before the existing rules.
    #[must_use]
    pub fn with_overrides(self, overrides: &[CategoryRule]) -> Self {
        let mut rules = overrides.to_vec();
        rules.extend(self.rules);
        Self { rules }
    }

    /// Categories for a label or attribute value; empty when nothing matches.
    #[must_use]
    pub fn lookup(&self, text: &str) -> &[WasteCategory] {
        let haystack = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| haystack.contains(&rule.pattern.to_lowercase()))
            .map_or(&[], |rule| rule.categories.as_slice())
    }
}
