//! Layout detection: an ordered list of extraction strategies, first non-empty result wins.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::model::{ExceptionPair, Schedule};
use crate::ports::CalendarError;
use crate::reconcile::reconcile;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Raw output of one extraction strategy.
pub struct Extraction {
    /// Pickup dates found in the document, or the generated baseline.
    pub schedule: Schedule,
    /// Holiday overrides to apply on top of a generated baseline.
    pub exceptions: Vec<ExceptionPair>,
}

impl Extraction {
    /// Extraction without exceptions.
    #[must_use]
    pub fn from_schedule(schedule: Schedule) -> Self {
        Self {
            schedule,
            exceptions: Vec::new(),
        }
    }
}

/// One known document layout.
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Extract pickup data, or `None` if the document is not in this layout.
    ///
    /// `today` anchors year inference for dates printed without a year.
    fn try_extract(&self, document: &str, today: NaiveDate) -> Option<Extraction>;
}

/// Runs strategies in order and reconciles exceptions for baseline schedules.
#[derive(Clone, Default)]
pub struct CalendarExtractor {
    strategies: Vec<Arc<dyn ExtractionStrategy>>,
}

impl CalendarExtractor {
    /// Build an extractor trying `strategies` in the given order.
    #[must_use]
    pub fn new(strategies: Vec<Arc<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Extract the schedule from a calendar document.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::UnrecognizedFormat`] when no strategy finds any pickup date.
    pub fn extract(&self, document: &str, today: NaiveDate) -> Result<Schedule, CalendarError> {
        for strategy in &self.strategies {
            let Some(extraction) = strategy
                .try_extract(document, today)
                .filter(|extraction| extraction.schedule.has_dates())
            else {
                debug!(layout = strategy.name(), "Layout did not match");
                continue;
            };

            info!(layout = strategy.name(), "Extracted pickup calendar");
            // Only a generated baseline carries a pickup weekday.
            let schedule = if extraction.schedule.pickup_weekday.is_some() {
                reconcile(extraction.schedule, extraction.exceptions)
            } else {
                extraction.schedule
            };
            return Ok(schedule);
        }

        Err(CalendarError::UnrecognizedFormat)
    }
}
