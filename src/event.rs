//! Event Handling
//!
//! Keyboard handling for washpro. Overlays take keys first, then the open
//! dialog, then the row menu, then the list.

use crate::app::{App, Mode};
use anyhow::Result;
use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use std::time::{Duration, Instant};
use washpro::core::{MenuAction, ModalKind};

/// Handle events, returns true if app should quit
pub fn handle_events(app: &mut App) -> Result<bool> {
    if poll(Duration::from_millis(100))? {
        if let Event::Key(key) = read()? {
            return handle_key_event(app, key.code, key.modifiers);
        }
    }
    Ok(false)
}

pub fn handle_key_event(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Result<bool> {
    // Global quit shortcut
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Ok(true);
    }

    match app.mode {
        Mode::Help => return handle_help_mode(app, code),
        Mode::Notifications => return handle_notifications_mode(app, code),
        Mode::Normal | Mode::Filter => {},
    }

    match app.session.modal().kind() {
        ModalKind::Viewing => return handle_view_dialog(app, code),
        ModalKind::Editing | ModalKind::Creating => return handle_form_dialog(app, code, modifiers),
        ModalKind::Deleting => return handle_delete_dialog(app, code),
        ModalKind::Closed => {},
    }

    if app.session.selection().is_menu_open() {
        return handle_menu(app, code);
    }

    match app.mode {
        Mode::Filter => handle_filter_mode(app, code, modifiers),
        _ => handle_normal_mode(app, code),
    }
}

fn handle_normal_mode(app: &mut App, code: KeyCode) -> Result<bool> {
    // Double-g goes to top
    if code == KeyCode::Char('g') {
        if let Some((KeyCode::Char('g'), time)) = app.last_key_press {
            if time.elapsed() < Duration::from_millis(1000) {
                app.go_to_top();
                app.last_key_press = None;
                return Ok(false);
            }
        }
        app.last_key_press = Some((code, Instant::now()));
        return Ok(false);
    }
    app.last_key_press = None;

    match code {
        // Quit
        KeyCode::Char('q') => return Ok(true),

        // Navigation - vim style + accessible alternatives
        KeyCode::Char('j') | KeyCode::Down => app.next(),
        KeyCode::Char('k') | KeyCode::Up => app.previous(),
        KeyCode::Home => app.go_to_top(),
        KeyCode::End | KeyCode::Char('G') => app.go_to_bottom(),

        // Pagination
        KeyCode::Char(']') | KeyCode::PageDown | KeyCode::Right => app.next_page(),
        KeyCode::Char('[') | KeyCode::PageUp | KeyCode::Left => app.prev_page(),

        // Resource kinds
        KeyCode::Tab => {
            let next = app.kind().next();
            app.switch_resource(next)?;
        },
        KeyCode::BackTab => {
            let prev = app.kind().prev();
            app.switch_resource(prev)?;
        },

        KeyCode::Char('R') => app.refresh(),
        KeyCode::Char('/') => app.enter_filter_mode(),
        KeyCode::Char('c') => app.cycle_category(),
        KeyCode::Enter | KeyCode::Char('m') => app.open_menu(),
        KeyCode::Char('a') => app.open_create(),

        // Row shortcuts skip the menu
        KeyCode::Char(c @ ('v' | 'e' | 'd')) => {
            if let Some(action) = MenuAction::ALL.into_iter().find(|a| a.shortcut() == c) {
                app.open_menu();
                if app.session.selection().is_menu_open() {
                    app.choose(action);
                }
            }
        },

        KeyCode::Char('?') => app.enter_help_mode(),
        KeyCode::Char('n') => app.enter_notifications_mode(),
        KeyCode::Esc => app.notifications.dismiss_toast(),
        _ => {},
    }
    Ok(false)
}

fn handle_filter_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Result<bool> {
    match code {
        KeyCode::Esc => {
            app.clear_filter();
        },
        KeyCode::Enter => {
            app.exit_mode();
        },
        KeyCode::Backspace => {
            app.filter_input.pop();
            app.apply_filter();
        },
        KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
            app.filter_input.push(c);
            app.apply_filter();
        },
        _ => {},
    }
    Ok(false)
}

fn handle_menu(app: &mut App, code: KeyCode) -> Result<bool> {
    match code {
        KeyCode::Esc | KeyCode::Char('q') => {
            app.close_menu();
        },
        KeyCode::Char(c) => {
            if let Some(action) = MenuAction::ALL.into_iter().find(|a| a.shortcut() == c) {
                app.choose(action);
            }
        },
        _ => {},
    }
    Ok(false)
}

fn handle_view_dialog(app: &mut App, code: KeyCode) -> Result<bool> {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter => {
            app.cancel_modal();
        },
        KeyCode::Char('j') | KeyCode::Down => {
            app.view_scroll = app.view_scroll.saturating_add(1);
        },
        KeyCode::Char('k') | KeyCode::Up => {
            app.view_scroll = app.view_scroll.saturating_sub(1);
        },
        KeyCode::Char('g') | KeyCode::Home => {
            app.view_scroll = 0;
        },
        _ => {},
    }
    Ok(false)
}

fn handle_form_dialog(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Result<bool> {
    match code {
        KeyCode::Esc => {
            app.cancel_modal();
        },
        KeyCode::Enter => {
            app.submit();
        },
        KeyCode::Tab | KeyCode::Down => {
            app.next_field();
        },
        KeyCode::BackTab | KeyCode::Up => {
            app.prev_field();
        },
        KeyCode::Right => {
            app.cycle_choice(true);
        },
        KeyCode::Left => {
            app.cycle_choice(false);
        },
        KeyCode::Backspace => {
            app.backspace();
        },
        KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
            app.type_char(c);
        },
        _ => {},
    }
    Ok(false)
}

fn handle_delete_dialog(app: &mut App, code: KeyCode) -> Result<bool> {
    match code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
            app.submit();
        },
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.cancel_modal();
        },
        _ => {},
    }
    Ok(false)
}

fn handle_help_mode(app: &mut App, code: KeyCode) -> Result<bool> {
    match code {
        KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => {
            app.exit_mode();
        },
        _ => {},
    }
    Ok(false)
}

fn handle_notifications_mode(app: &mut App, code: KeyCode) -> Result<bool> {
    match code {
        KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('q') => {
            app.exit_mode();
        },
        KeyCode::Char('c') => {
            app.notifications.clear();
        },
        _ => {},
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;
    use std::sync::Arc;
    use washpro::api::memory::InMemoryTransport;
    use washpro::core::SessionOptions;
    use washpro::resource::ResourceKind;

    async fn loaded_app(readonly: bool) -> App {
        let transport = InMemoryTransport::new();
        transport
            .seed(
                "/toilet-facilities",
                vec![
                    json!({"_id": "t1", "ward": "Kudan", "village": "Hunkuyi", "hamlet": "A",
                           "facilityType": "Western Style", "status": "Functional"}),
                    json!({"_id": "t2", "ward": "Likoro", "village": "Zabi", "hamlet": "B",
                           "facilityType": "Pit Latrine", "status": "Under Repair"}),
                ],
            )
            .await;
        let options = SessionOptions {
            readonly,
            ..SessionOptions::default()
        };
        let mut app = App::new(
            Arc::new(transport),
            ResourceKind::ToiletFacilities,
            options,
            Config::default(),
            "memory".to_string(),
        )
        .unwrap();
        app.refresh();
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            app.process_events();
            if !app.session.fetch_status().is_loading() {
                break;
            }
        }
        app
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_key_event(app, code, KeyModifiers::NONE).unwrap()
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let mut app = loaded_app(false).await;
        assert!(press(&mut app, KeyCode::Char('q')));
        assert!(handle_key_event(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL).unwrap());
    }

    #[tokio::test]
    async fn test_filter_typing_is_live() {
        let mut app = loaded_app(false).await;
        press(&mut app, KeyCode::Char('/'));
        assert_eq!(app.mode, Mode::Filter);
        for c in "zabi".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        assert_eq!(app.page().total_matching, 1);

        // 'q' is text while filtering
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.page().total_matching, 2);
    }

    #[tokio::test]
    async fn test_menu_then_view() {
        let mut app = loaded_app(false).await;
        press(&mut app, KeyCode::Enter);
        assert!(app.session.selection().is_menu_open());
        press(&mut app, KeyCode::Char('v'));
        assert_eq!(app.session.modal().kind(), ModalKind::Viewing);

        // list keys are inert while the dialog is up
        assert!(!press(&mut app, KeyCode::Char('a')));
        assert_eq!(app.session.modal().kind(), ModalKind::Viewing);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.session.modal().kind(), ModalKind::Closed);
    }

    #[tokio::test]
    async fn test_delete_dialog_can_be_declined() {
        let mut app = loaded_app(false).await;
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.session.modal().kind(), ModalKind::Deleting);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.session.modal().kind(), ModalKind::Closed);
        assert_eq!(app.session.collection().len(), 2);
    }

    #[tokio::test]
    async fn test_readonly_shortcuts_warn() {
        let mut app = loaded_app(true).await;
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.session.modal().kind(), ModalKind::Closed);
        assert!(!app.session.selection().is_menu_open());
        let toast = app.notifications.current_toast().unwrap();
        assert!(toast.message.contains("Read-only"));
    }

    #[tokio::test]
    async fn test_tab_switches_resource() {
        let mut app = loaded_app(false).await;
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.kind(), ResourceKind::OpenDefecation);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.kind(), ResourceKind::ToiletFacilities);
    }
}
