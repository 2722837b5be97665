//! Input handling for TUI key events.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{Action, App, Focus};

use super::TermEvent;

/// Lines moved per PageUp/PageDown.
const PAGE: u16 = 10;

/// Process a terminal event, updating app state and returning what the event
/// loop should do with the session.
pub fn handle_term_event(app: &mut App, event: TermEvent) -> Action {
    match event {
        TermEvent::Key(key) => handle_key(app, key),
        TermEvent::Resize(_, _) => Action::None,
    }
}

fn handle_key(app: &mut App, key: KeyEvent) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => return Action::Quit,
            KeyCode::Char('l') => {
                app.clear_output();
                return Action::None;
            }
            // Unbound chords must not type their letter.
            KeyCode::Char(_) => return Action::None,
            _ => {}
        }
    }
    match key.code {
        KeyCode::PageUp => {
            app.scroll_up(PAGE);
            return Action::None;
        }
        KeyCode::PageDown => {
            app.scroll_down(PAGE);
            return Action::None;
        }
        _ => {}
    }

    match app.focus {
        Focus::Menu => handle_menu_key(app, key.code),
        Focus::Input => handle_input_key(app, key.code),
    }
}

fn handle_menu_key(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Up | KeyCode::Char('k') => {
            app.select_prev();
            Action::None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.select_next();
            Action::None
        }
        KeyCode::Enter => app.activate_selected(),
        KeyCode::Tab | KeyCode::Char('i') => {
            app.focus_input();
            Action::None
        }
        _ => Action::None,
    }
}

fn handle_input_key(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Enter => app.submit_input().map_or(Action::None, Action::Send),
        KeyCode::Esc | KeyCode::Tab => {
            app.focus = Focus::Menu;
            Action::None
        }
        KeyCode::Char(c) => {
            app.insert_char(c);
            Action::None
        }
        KeyCode::Backspace => {
            app.backspace();
            Action::None
        }
        KeyCode::Delete => {
            app.delete();
            Action::None
        }
        KeyCode::Left => {
            app.cursor_left();
            Action::None
        }
        KeyCode::Right => {
            app.cursor_right();
            Action::None
        }
        KeyCode::Home => {
            app.cursor_pos = 0;
            Action::None
        }
        KeyCode::End => {
            app.cursor_pos = app.input.len();
            Action::None
        }
        _ => Action::None,
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use cmdmenu_core::{Config, MenuItem};

    fn app() -> App {
        App::new(&Config {
            menu_items: vec![
                MenuItem::action("One", "echo one"),
                MenuItem::Separator,
                MenuItem::action("Two", "echo two"),
            ],
            ..Config::default()
        })
    }

    fn press(app: &mut App, code: KeyCode) -> Action {
        handle_term_event(app, TermEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn ctrl(app: &mut App, c: char) -> Action {
        handle_term_event(
            app,
            TermEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)),
        )
    }

    #[test]
    fn unbound_ctrl_chords_do_not_type() {
        let mut app = app();
        app.on_started();
        app.focus_input();
        assert_eq!(ctrl(&mut app, 'a'), Action::None);
        assert_eq!(ctrl(&mut app, 'u'), Action::None);
        assert!(app.input.is_empty());
        assert_eq!(app.focus, Focus::Input);
    }

    #[test]
    fn ctrl_c_quits_from_any_focus() {
        let mut app = app();
        assert_eq!(ctrl(&mut app, 'c'), Action::Quit);
        app.on_started();
        app.focus_input();
        assert_eq!(ctrl(&mut app, 'c'), Action::Quit);
    }

    #[test]
    fn down_then_enter_runs_second_entry() {
        let mut app = app();
        press(&mut app, KeyCode::Down);
        assert_eq!(
            press(&mut app, KeyCode::Enter),
            Action::Run {
                label: "Two".to_string(),
                command: "echo two".to_string(),
            }
        );
    }

    #[test]
    fn typing_in_input_does_not_navigate_menu() {
        let mut app = app();
        app.on_started();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Input);

        for c in ['j', 'q'] {
            assert_eq!(press(&mut app, KeyCode::Char(c)), Action::None);
        }
        assert_eq!(app.input, "jq");
        assert_eq!(app.selected, Some(0));
        assert_eq!(press(&mut app, KeyCode::Enter), Action::Send("jq".to_string()));
    }

    #[test]
    fn tab_is_refused_when_idle() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Menu);
    }

    #[test]
    fn escape_leaves_input_then_quits() {
        let mut app = app();
        app.on_started();
        press(&mut app, KeyCode::Tab);
        assert_eq!(press(&mut app, KeyCode::Esc), Action::None);
        assert_eq!(app.focus, Focus::Menu);
        assert_eq!(press(&mut app, KeyCode::Esc), Action::Quit);
    }

    #[test]
    fn ctrl_l_clears_output() {
        let mut app = app();
        app.output.append("noise\n", false);
        assert_eq!(ctrl(&mut app, 'l'), Action::None);
        assert!(app.output.is_empty());
    }

    #[test]
    fn home_and_end_move_cursor() {
        let mut app = app();
        app.on_started();
        app.focus_input();
        for c in "abc".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Home);
        assert_eq!(app.cursor_pos, 0);
        press(&mut app, KeyCode::End);
        assert_eq!(app.cursor_pos, 3);
    }
}
