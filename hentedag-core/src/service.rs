//! Scheduled calendar cache and the status facade used by clients.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::extract::CalendarExtractor;
use crate::model::{HouseholdIdentifier, Schedule, WasteCategory};
use crate::plugin::{ProviderMeta, ProviderPlugin};
use crate::ports::{CalendarError, CalendarSourcePort};
use crate::query::{days_until_pickup, next_pickup};
use crate::resolver::{HouseholdQuery, IdentifierResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Result of a [`PickupService::refresh`] call.
pub enum RefreshOutcome {
    /// A new schedule was fetched and installed.
    Refreshed,
    /// The minimum interval has not elapsed; nothing was fetched.
    Throttled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Display state of one category.
pub struct PickupStatus {
    /// Category reported on.
    pub category: WasteCategory,
    /// Next pickup date, if known.
    pub next_pickup: Option<NaiveDate>,
    /// Days until the next pickup, if known.
    pub days_until: Option<i64>,
    /// Time of the last successful refresh.
    pub last_updated: Option<NaiveDateTime>,
}

#[derive(Default)]
struct RefreshState {
    identifier: Option<HouseholdIdentifier>,
    last_success: Option<NaiveDateTime>,
}

/// Holds the current schedule of one household and refreshes it at most once per interval.
pub struct PickupService {
    meta: ProviderMeta,
    resolver: IdentifierResolver,
    calendar_source: Arc<dyn CalendarSourcePort>,
    extractor: CalendarExtractor,
    household: HouseholdQuery,
    categories: Vec<WasteCategory>,
    min_interval: TimeDelta,
    // Held across "check interval, fetch, swap" so overlapping refreshes fetch once.
    refresh_state: Mutex<RefreshState>,
    current: RwLock<Arc<Schedule>>,
}

impl PickupService {
    /// Create a service for the household described by `settings`, starting with an empty
    /// schedule.
    #[must_use]
    pub fn new(plugin: &ProviderPlugin, settings: &Settings) -> Self {
        Self {
            meta: plugin.meta.clone(),
            resolver: plugin.resolver(),
            calendar_source: Arc::clone(&plugin.calendar_source),
            extractor: plugin.extractor(),
            household: settings.household(),
            categories: settings.categories.clone(),
            min_interval: settings.refresh_interval(),
            refresh_state: Mutex::new(RefreshState::default()),
            current: RwLock::new(Arc::new(Schedule::new())),
        }
    }

    /// Provider serving this household.
    #[must_use]
    pub fn provider(&self) -> &ProviderMeta {
        &self.meta
    }

    /// Categories reported on.
    #[must_use]
    pub fn categories(&self) -> &[WasteCategory] {
        &self.categories
    }

    /// Resolve the household identifier now, so configuration errors surface before the
    /// first scheduled refresh. The result is cached for later refreshes.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidLocation`] or [`CalendarError::IdentifierNotFound`]
    /// when the household cannot be located.
    pub async fn verify(&self) -> Result<HouseholdIdentifier, CalendarError> {
        let mut state = self.refresh_state.lock().await;
        self.identifier(&mut state).await
    }

    /// Fetch and install a new schedule unless the last successful refresh is more recent
    /// than the minimum interval.
    ///
    /// On failure the previous schedule and its timestamp stay in place.
    ///
    /// # Errors
    ///
    /// Returns the [`CalendarError`] of the failing step: identifier resolution, the
    /// document fetch, or extraction.
    pub async fn refresh(&self, now: NaiveDateTime) -> Result<RefreshOutcome, CalendarError> {
        let mut state = self.refresh_state.lock().await;

        if let Some(last) = state.last_success
            && now.signed_duration_since(last) < self.min_interval
        {
            debug!(%last, "Schedule is fresh, skipping refresh");
            return Ok(RefreshOutcome::Throttled);
        }

        let result = self.fetch_schedule(&mut state, now).await;
        match result {
            Ok(schedule) => {
                *self.current.write().unwrap_or_else(PoisonError::into_inner) =
                    Arc::new(schedule);
                state.last_success = Some(now);
                info!(provider = %self.meta.id, "Pickup calendar refreshed");
                Ok(RefreshOutcome::Refreshed)
            }
            Err(err) => {
                warn!(provider = %self.meta.id, error = %err, "Refresh failed, keeping previous schedule");
                Err(err)
            }
        }
    }

    async fn fetch_schedule(
        &self,
        state: &mut RefreshState,
        now: NaiveDateTime,
    ) -> Result<Schedule, CalendarError> {
        let identifier = self.identifier(state).await?;
        let document = self.calendar_source.fetch_document(&identifier).await?;
        let mut schedule = self.extractor.extract(&document, now.date())?;
        schedule.refreshed_at = Some(now);
        Ok(schedule)
    }

    async fn identifier(
        &self,
        state: &mut RefreshState,
    ) -> Result<HouseholdIdentifier, CalendarError> {
        if let Some(identifier) = &state.identifier {
            return Ok(identifier.clone());
        }
        let identifier = self.resolver.resolve(&self.household).await?;
        info!(%identifier, "Resolved household identifier");
        state.identifier = Some(identifier.clone());
        Ok(identifier)
    }

    /// Snapshot of the current schedule.
    #[must_use]
    pub fn current(&self) -> Arc<Schedule> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Time of the last successful refresh.
    #[must_use]
    pub fn last_updated(&self) -> Option<NaiveDateTime> {
        self.current().refreshed_at
    }

    /// Next pickup of `category` on or after `today`.
    #[must_use]
    pub fn next_pickup(&self, category: &WasteCategory, today: NaiveDate) -> Option<NaiveDate> {
        next_pickup(&self.current(), category, today)
    }

    /// Status of every configured category.
    #[must_use]
    pub fn statuses(&self, today: NaiveDate) -> Vec<PickupStatus> {
        let schedule = self.current();
        self.categories
            .iter()
            .map(|category| PickupStatus {
                category: category.clone(),
                next_pickup: next_pickup(&schedule, category, today),
                days_until: days_until_pickup(&schedule, category, today),
                last_updated: schedule.refreshed_at,
            })
            .collect()
    }
}
