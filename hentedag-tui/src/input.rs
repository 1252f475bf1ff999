use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Action {
    None,
    Quit,
    /// Run `service.refresh`(...) now, subject to the minimum interval
    Refresh,
}

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    use KeyCode::{Char, Down, Up};

    // Global quit shortcuts
    if key.code == Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }
    if !key.modifiers.is_empty() {
        return Action::None;
    }

    match key.code {
        Char('q') => Action::Quit,
        Char('r') => Action::Refresh,
        Up | Char('k') => {
            app.select_previous();
            Action::None
        }
        Down | Char('j') => {
            app.select_next();
            Action::None
        }
        _ => Action::None,
    }
}
