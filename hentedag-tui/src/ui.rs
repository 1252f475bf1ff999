use chrono::{Local, NaiveDate};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
};

use crate::app::App;

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();

    // Outer layout: title, main content, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [header_area, content_area, status_area] = chunks else {
        return;
    };

    // Title / header
    let header = Paragraph::new(format!(
        "hentedag – waste pickup days from {}",
        app.service.provider().name
    ))
    .block(Block::default().borders(Borders::ALL).title("Hentedag"));
    frame.render_widget(header, *header_area);

    // Main content: statuses on the left, dates of the selected category on the right
    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(*content_area);
    let [status_table_area, upcoming_area] = content_chunks.as_ref() else {
        return;
    };

    let today = Local::now().date_naive();
    draw_statuses(frame, app, *status_table_area);
    draw_upcoming(frame, app, today, *upcoming_area);

    // Status bar
    let nav_hint = "↑/↓ select category · r refresh · q/Ctrl-C quit";
    let updated = app.last_updated.map_or_else(
        || "never updated".to_owned(),
        |at| format!("updated {}", at.format("%d.%m.%Y %H:%M")),
    );

    let status_text = if app.is_loading {
        format!("Refreshing… · {nav_hint}")
    } else if let Some(msg) = &app.error_message {
        format!("{msg} · {updated} · {nav_hint}")
    } else if let Some(msg) = &app.notice {
        format!("{msg} · {updated} · {nav_hint}")
    } else {
        format!("{updated} · {nav_hint}")
    };

    let status_style = if app.error_message.is_some() {
        Style::default().fg(Color::Red)
    } else if app.is_loading {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let status = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, *status_area);
}

fn draw_statuses(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let title = "Next pickup";

    if app.statuses.is_empty() {
        let paragraph = Paragraph::new("No categories configured.")
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let rows = app.statuses.iter().enumerate().map(|(idx, status)| {
        let date = status
            .next_pickup
            .map_or_else(|| "–".to_owned(), |date| date.format("%a %d.%m.%Y").to_string());
        let relative = status.days_until.map_or_else(String::new, relative_day_label);

        let mut style = Style::default().fg(category_color(status.category.as_str()));
        if status.days_until.is_some_and(|days| days <= 1) {
            style = style.add_modifier(Modifier::BOLD);
        }
        if idx == app.selected {
            style = style.add_modifier(Modifier::REVERSED);
        }

        Row::new(vec![
            Cell::from(status.category.to_string()),
            Cell::from(date),
            Cell::from(relative),
        ])
        .style(style)
    });

    let column_widths = [
        Constraint::Min(14),
        Constraint::Length(16),
        Constraint::Length(12),
    ];

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec!["Category", "Date", "In"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .column_spacing(1);

    frame.render_widget(table, area);
}

fn draw_upcoming(frame: &mut Frame<'_>, app: &App, today: NaiveDate, area: Rect) {
    let category = app
        .statuses
        .get(app.selected)
        .map_or("<category>", |status| status.category.as_str());

    let items = if app.upcoming.is_empty() {
        vec![ListItem::new("No upcoming pickups known.")]
    } else {
        app.upcoming
            .iter()
            .map(|date| {
                let days = (*date - today).num_days();
                ListItem::new(format!(
                    "{} ({})",
                    date.format("%a %d.%m.%Y"),
                    relative_day_label(days)
                ))
            })
            .collect()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Upcoming {category}")),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !app.upcoming.is_empty() {
        state.select(Some(0));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn category_color(category: &str) -> Color {
    match category {
        "residual" => Color::Gray,
        "bio" => Color::Green,
        "paper" => Color::Blue,
        "plastic" => Color::Yellow,
        "glass" => Color::Cyan,
        "metal" => Color::LightBlue,
        _ => Color::Magenta,
    }
}

fn relative_day_label(days: i64) -> String {
    match days {
        0 => "today".to_owned(),
        1 => "tomorrow".to_owned(),
        days if days > 1 => format!("in {days} days"),
        -1 => "yesterday".to_owned(),
        days => format!("{} days ago", days.abs()),
    }
}
