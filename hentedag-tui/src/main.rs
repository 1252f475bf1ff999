//! Terminal UI for hentedag that shows the next pickup of each waste category.

mod app;
mod input;
mod ui;

use std::{
    fs::OpenOptions,
    io,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration as StdDuration,
};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use hentedag_core::{LoggingSettings, PickupService, RefreshOutcome, Settings};
use hentedag_provider_avfallsor as avfallsor;
use ratatui::{Terminal, backend::CrosstermBackend};
use reqwest::Client;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::input::Action;

const DEFAULT_CONFIG: &str = "hentedag.toml";
const AUTO_REFRESH_EVERY: StdDuration = StdDuration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
    let settings = Settings::from_file(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    settings.validate()?;
    init_logging(&settings.logging)?;

    // HTTP + service setup
    let client = Client::builder()
        .user_agent("hentedag/0.1")
        .timeout(settings.request_timeout())
        .build()?;
    let endpoints = avfallsor::Endpoints {
        timeout: settings.request_timeout(),
        ..avfallsor::Endpoints::default()
    };
    let plugin = avfallsor::plugin_with_endpoints(client, &endpoints, &settings.category_rules);
    let service = Arc::new(PickupService::new(&plugin, &settings));
    info!(provider = %service.provider().name, "Starting hentedag");

    // App state
    let app = App::new(service);

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

// Log lines would corrupt the alternate screen, so they only go to a file.
fn init_logging(logging: &LoggingSettings) -> Result<()> {
    let Some(file) = &logging.file else {
        return Ok(());
    };
    let writer = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)
        .with_context(|| format!("Failed to open log file {}", file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&logging.filter)?)
        .with_writer(Mutex::new(writer))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    app.is_loading = true;
    terminal.draw(|frame| ui::draw(frame, &app))?;
    if let Err(err) = app.service.verify().await {
        warn!(error = %err, "Household could not be resolved");
        app.auto_refresh = err.is_retriable();
        app.error_message = Some(format!("Household lookup failed: {err}"));
    }
    if app.auto_refresh {
        refresh(terminal, &mut app).await?;
    }
    app.is_loading = false;

    loop {
        // Draw current UI
        terminal.draw(|frame| ui::draw(frame, &app))?;

        if app.auto_refresh && app.refresh_due(AUTO_REFRESH_EVERY) {
            refresh(terminal, &mut app).await?;
            continue;
        }

        // Poll for input (non-blocking, small timeout to keep CPU low)
        if event::poll(StdDuration::from_millis(100))?
            && let CEvent::Key(key) = event::read()?
        {
            match input::handle_key_event(key, &mut app) {
                Action::Quit => break,
                Action::None => {}
                Action::Refresh => refresh(terminal, &mut app).await?,
            }
        }
    }

    Ok(())
}

async fn refresh(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    app.is_loading = true;
    app.notice = None;
    terminal.draw(|frame| ui::draw(frame, app))?;

    let now = Local::now().naive_local();
    let res = app.service.refresh(now).await;

    app.is_loading = false;
    app.mark_attempt();
    match res {
        Ok(RefreshOutcome::Refreshed) => {
            app.error_message = None;
            app.auto_refresh = true;
        }
        Ok(RefreshOutcome::Throttled) => {
            app.notice = Some("Schedule is up to date".into());
        }
        Err(err) => {
            if !err.is_retriable() {
                app.auto_refresh = false;
            }
            app.error_message = Some(format!("Refresh failed: {err}"));
        }
    }
    app.reload(now.date());
    Ok(())
}
