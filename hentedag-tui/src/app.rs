use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{Local, NaiveDate, NaiveDateTime};
use hentedag_core::{PickupService, PickupStatus};

// Dates listed for the selected category.
const UPCOMING_LIMIT: usize = 8;

pub(crate) struct App {
    pub service: Arc<PickupService>,

    pub statuses: Vec<PickupStatus>,
    pub selected: usize,
    pub upcoming: Vec<NaiveDate>,
    pub last_updated: Option<NaiveDateTime>,

    pub auto_refresh: bool,
    pub last_attempt: Option<Instant>,

    pub is_loading: bool,
    pub notice: Option<String>,
    pub error_message: Option<String>,
}

impl App {
    pub(crate) fn new(service: Arc<PickupService>) -> Self {
        let mut app = Self {
            service,
            statuses: Vec::new(),
            selected: 0,
            upcoming: Vec::new(),
            last_updated: None,
            auto_refresh: true,
            last_attempt: None,
            is_loading: false,
            notice: None,
            error_message: None,
        };
        app.reload(Local::now().date_naive());
        app
    }

    /// Re-read statuses and upcoming dates from the service's current schedule.
    pub(crate) fn reload(&mut self, today: NaiveDate) {
        self.statuses = self.service.statuses(today);
        self.last_updated = self.service.last_updated();
        if self.selected >= self.statuses.len() {
            self.selected = self.statuses.len().saturating_sub(1);
        }
        self.reload_upcoming(today);
    }

    pub(crate) fn reload_upcoming(&mut self, today: NaiveDate) {
        let schedule = self.service.current();
        self.upcoming = self
            .statuses
            .get(self.selected)
            .and_then(|status| schedule.dates(&status.category))
            .map(|dates| {
                dates
                    .range(today..)
                    .take(UPCOMING_LIMIT)
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
    }

    pub(crate) fn select_previous(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.reload_upcoming(Local::now().date_naive());
        }
    }

    pub(crate) fn select_next(&mut self) {
        if self.selected + 1 < self.statuses.len() {
            self.selected += 1;
            self.reload_upcoming(Local::now().date_naive());
        }
    }

    pub(crate) fn mark_attempt(&mut self) {
        self.last_attempt = Some(Instant::now());
    }

    pub(crate) fn refresh_due(&self, every: Duration) -> bool {
        self.last_attempt
            .is_none_or(|attempt| attempt.elapsed() >= every)
    }
}
