use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::debug;

use crate::app::{App, InputMode};
use crate::dashboard::OverlayLayer;
use crate::reply::ReplyService;
use crate::tab::Tab;
use crate::tui::AppEvent;

pub async fn handle_event<S: ReplyService>(app: &mut App<S>, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(width, height) => {
            debug!(width, height, "terminal resized");
            app.dashboard.invalidate_maps();
        }
        AppEvent::Tick => app.tick().await,
    }
    Ok(())
}

fn handle_key<S: ReplyService>(app: &mut App<S>, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.dashboard.show_login {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            app.dashboard.dismiss_login();
        }
        return;
    }

    // Quick actions work whenever the chat panel is showing
    if app.chat.is_open() {
        if let KeyCode::F(n @ 1..=3) = key.code {
            app.chat.send_quick_action(usize::from(n - 1));
            return;
        }
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode<S: ReplyService>(app: &mut App<S>, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Tabs
        KeyCode::Char('1') => app.activate_tab(Tab::Admin),
        KeyCode::Char('2') => app.activate_tab(Tab::Worker),
        KeyCode::Char('3') => app.activate_tab(Tab::Citizen),
        KeyCode::Tab => {
            let tab = app.dashboard.active_tab.next();
            app.activate_tab(tab);
        }
        KeyCode::BackTab => {
            let tab = app.dashboard.active_tab.prev();
            app.activate_tab(tab);
        }

        // Chat
        KeyCode::Char('c') => app.toggle_chat(),
        KeyCode::Char('i') if app.chat.is_open() => app.input_mode = InputMode::Editing,
        KeyCode::Esc if app.chat.is_open() => app.close_chat(),
        KeyCode::PageUp if app.chat.is_open() => app.chat.scroll_up(),
        KeyCode::PageDown if app.chat.is_open() => app.chat.scroll_down(),

        _ => match app.dashboard.active_tab {
            Tab::Admin => handle_admin_key(app, key),
            Tab::Worker => handle_worker_key(app, key),
            Tab::Citizen => {}
        },
    }
}

fn handle_admin_key<S: ReplyService>(app: &mut App<S>, key: KeyEvent) {
    let dashboard = &mut app.dashboard;
    match key.code {
        KeyCode::Char('p') => dashboard.set_period(dashboard.period.next()),
        KeyCode::Char('P') => dashboard.set_period(dashboard.period.prev()),
        KeyCode::Char('t') => dashboard.toggle_layer(OverlayLayer::Trucks),
        KeyCode::Char('d') => dashboard.toggle_layer(OverlayLayer::Deviations),
        KeyCode::Char('r') => dashboard.toggle_layer(OverlayLayer::Reports),
        KeyCode::Char('f') => {
            dashboard.focus_deviations();
        }
        _ => {}
    }
}

fn handle_worker_key<S: ReplyService>(app: &mut App<S>, key: KeyEvent) {
    let dashboard = &mut app.dashboard;
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => dashboard.task_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => dashboard.task_nav_up(),
        KeyCode::Enter => {
            if let Some(id) = dashboard.selected_task().map(|t| t.id) {
                dashboard.task_action(id);
            }
        }
        _ => {}
    }
}

fn handle_editing_mode<S: ReplyService>(app: &mut App<S>, key: KeyEvent) {
    match key.code {
        // Escape closes the chat, same as the close button
        KeyCode::Esc => app.close_chat(),
        // Leave the input but keep the panel open
        KeyCode::Tab => app.input_mode = InputMode::Normal,
        KeyCode::Enter => {
            app.chat.submit();
        }
        KeyCode::PageUp => app.chat.scroll_up(),
        KeyCode::PageDown => app.chat.scroll_down(),
        KeyCode::Backspace => app.chat.input.backspace(),
        KeyCode::Delete => app.chat.input.delete(),
        KeyCode::Left => app.chat.input.left(),
        KeyCode::Right => app.chat.input.right(),
        KeyCode::Home => app.chat.input.home(),
        KeyCode::End => app.chat.input.end(),
        KeyCode::Char(c) => app.chat.input.insert(c),
        _ => {}
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse<S: ReplyService>(app: &mut App<S>, mouse: MouseEvent) {
    let (x, y) = (mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollUp if app.chat.is_open() => app.chat.scroll_up(),
        MouseEventKind::ScrollDown if app.chat.is_open() => app.chat.scroll_down(),
        MouseEventKind::Down(MouseButton::Left) => {
            if app.dashboard.show_login {
                return;
            }
            handle_click(app, x, y);
        }
        _ => {}
    }
}

fn handle_click<S: ReplyService>(app: &mut App<S>, x: u16, y: u16) {
    let hit = |rect: &Rect| point_in_rect(x, y, *rect);
    let areas = &app.hit_areas;

    let on_toggle = areas.chat_toggle.as_ref().is_some_and(hit);
    let on_tab = areas.tabs.iter().find(|(_, r)| hit(r)).map(|(tab, _)| *tab);
    let on_suggestion = areas.suggestions.iter().position(hit);
    let on_input = areas.chat_input.as_ref().is_some_and(hit);
    let on_period = areas.periods.iter().find(|(_, r)| hit(r)).map(|(period, _)| *period);
    let on_deviations = areas.deviation_card.as_ref().is_some_and(hit);
    // Rows sit strictly inside the list border
    let on_task_row = areas
        .task_list
        .filter(|list| hit(list) && y > list.y && y + 1 < list.y + list.height)
        .map(|list| usize::from(y - list.y - 1) + app.dashboard.task_state.offset());
    let on_task_action = areas.task_action.as_ref().is_some_and(hit);

    if on_toggle {
        app.toggle_chat();
    } else if let Some(tab) = on_tab {
        app.activate_tab(tab);
    } else if let Some(index) = on_suggestion {
        app.chat.send_quick_action(index);
    } else if on_input {
        app.input_mode = InputMode::Editing;
    } else {
        match app.dashboard.active_tab {
            Tab::Admin => {
                if let Some(period) = on_period {
                    app.dashboard.set_period(period);
                } else if on_deviations {
                    app.dashboard.focus_deviations();
                }
            }
            Tab::Worker => {
                if let Some(row) = on_task_row {
                    if let Some(id) = app.dashboard.tasks.get(row).map(|t| t.id) {
                        app.dashboard.select_task(id);
                    }
                } else if on_task_action {
                    if let Some(id) = app.dashboard.selected_task().map(|t| t.id) {
                        app.dashboard.task_action(id);
                    }
                }
            }
            Tab::Citizen => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatRole;
    use crate::config::{Config, Overrides, Settings};
    use crate::reply::ReplyError;
    use std::future::Future;

    #[derive(Clone)]
    struct EchoService;

    impl ReplyService for EchoService {
        fn reply(&self, message: String) -> impl Future<Output = Result<String, ReplyError>> + Send + 'static {
            async move { Ok(format!("echo: {message}")) }
        }
    }

    fn app() -> App<EchoService> {
        let settings = Settings::resolve(&Config::new(), Overrides::default());
        let mut app = App::with_service(EchoService, &settings);
        app.dashboard.dismiss_login();
        app
    }

    fn press(app: &mut App<EchoService>, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App<EchoService>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn login_overlay_swallows_keys_until_dismissed() {
        let settings = Settings::resolve(&Config::new(), Overrides::default());
        let mut app = App::with_service(EchoService, &settings);

        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.dashboard.active_tab, Tab::Admin);
        press(&mut app, KeyCode::Enter);
        assert!(!app.dashboard.show_login);
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.dashboard.active_tab, Tab::Worker);
    }

    #[test]
    fn tab_switch_refreshes_quick_actions() {
        let mut app = app();
        assert_eq!(app.chat.suggestions()[0], "Show latest route deviations");

        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.dashboard.active_tab, Tab::Citizen);
        assert_eq!(app.chat.suggestions()[0], "How do I report an issue?");

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.dashboard.active_tab, Tab::Admin);
    }

    #[test]
    fn opening_chat_focuses_input_and_escape_closes_it() {
        let mut app = app();
        press(&mut app, KeyCode::Char('c'));
        assert!(app.chat.is_open());
        assert_eq!(app.input_mode, InputMode::Editing);

        // 'q' is text while editing
        type_text(&mut app, "q");
        assert!(!app.should_quit);
        assert_eq!(app.chat.input.as_str(), "q");

        press(&mut app, KeyCode::Esc);
        assert!(!app.chat.is_open());
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn typed_message_round_trips_through_ticks() {
        let mut app = app();
        press(&mut app, KeyCode::Char('c'));
        type_text(&mut app, "hello");
        press(&mut app, KeyCode::Enter);
        assert!(app.chat.is_typing());

        app.chat.wait_for_reply().await;
        let last = app.chat.transcript().last().unwrap();
        assert_eq!(last.role, ChatRole::Bot);
        assert_eq!(last.content, "echo: hello");
    }

    #[tokio::test]
    async fn function_keys_send_quick_actions() {
        let mut app = app();
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('c'));
        press(&mut app, KeyCode::F(3));

        app.chat.wait_for_reply().await;
        assert_eq!(app.chat.transcript().last().unwrap().content, "echo: Show my route map");
    }

    #[test]
    fn admin_keys_drive_period_and_layers() {
        let mut app = app();
        press(&mut app, KeyCode::Char('p'));
        assert_eq!(app.dashboard.stats().co2, 6100);
        press(&mut app, KeyCode::Char('d'));
        assert!(!app.dashboard.overlays.deviations);
    }

    #[test]
    fn worker_keys_move_and_act_on_tasks() {
        let mut app = app();
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.dashboard.selected_task().map(|t| t.id), Some(2));
        press(&mut app, KeyCode::Enter);
        assert_eq!(
            app.dashboard.selected_task().map(|t| t.status),
            Some(crate::data::TaskStatus::InProgress)
        );
    }

    #[test]
    fn clicks_hit_recorded_areas() {
        let mut app = app();
        app.hit_areas.tabs = vec![(Tab::Worker, Rect::new(10, 0, 8, 1))];
        app.hit_areas.chat_toggle = Some(Rect::new(70, 0, 10, 1));

        handle_click(&mut app, 12, 0);
        assert_eq!(app.dashboard.active_tab, Tab::Worker);
        handle_click(&mut app, 75, 0);
        assert!(app.chat.is_open());
        handle_click(&mut app, 40, 10);
        assert!(app.chat.is_open());
    }

    #[test]
    fn task_list_borders_do_not_select_rows() {
        let mut app = app();
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('j'));
        app.hit_areas.task_list = Some(Rect::new(0, 5, 30, 6));
        let selected = |app: &App<EchoService>| app.dashboard.selected_task().map(|t| t.id);

        handle_click(&mut app, 3, 5);
        assert_eq!(selected(&app), Some(2));
        handle_click(&mut app, 3, 10);
        assert_eq!(selected(&app), Some(2));

        handle_click(&mut app, 3, 6);
        assert_eq!(selected(&app), Some(1));
        handle_click(&mut app, 3, 9);
        assert_eq!(selected(&app), Some(4));
    }
}
