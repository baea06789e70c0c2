use std::path::Path;
use std::time::Instant;

use ratatui::layout::Rect;
use tracing::{info, warn};

use crate::chat::ChatSession;
use crate::config::{Config, Settings};
use crate::dashboard::Dashboard;
use crate::data::Period;
use crate::reply::{HttpReplyService, ReplyService};
use crate::tab::Tab;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Keys go to the chat input line
    Editing,
}

/// Screen regions recorded during render for mouse hit-testing
#[derive(Debug, Default)]
pub struct HitAreas {
    pub tabs: Vec<(Tab, Rect)>,
    pub periods: Vec<(Period, Rect)>,
    pub chat_toggle: Option<Rect>,
    pub deviation_card: Option<Rect>,
    pub task_list: Option<Rect>,
    pub task_action: Option<Rect>,
    pub suggestions: Vec<Rect>,
    pub chat_input: Option<Rect>,
}

pub struct App<S: ReplyService = HttpReplyService> {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub dashboard: Dashboard,
    pub chat: ChatSession<S>,
    pub endpoint: String,

    // Animation state
    pub animation_frame: u8, // 0-2 for the typing indicator

    pub hit_areas: HitAreas,
}

impl App<HttpReplyService> {
    pub fn new(settings: &Settings) -> Self {
        let service = HttpReplyService::new(&settings.endpoint);
        info!(endpoint = service.endpoint(), timeout = ?settings.timeout, "chat reply service ready");
        Self::with_service(service, settings)
    }
}

impl<S: ReplyService> App<S> {
    pub fn with_service(service: S, settings: &Settings) -> Self {
        let dashboard = Dashboard::new(settings.tab, settings.period, Instant::now());
        let mut chat = ChatSession::new(service, settings.timeout);
        chat.update_quick_actions(settings.tab);

        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            dashboard,
            chat,
            endpoint: settings.endpoint.clone(),
            animation_frame: 0,
            hit_areas: HitAreas::default(),
        }
    }

    /// Switch the dashboard view and refresh the chat suggestions for it.
    pub fn activate_tab(&mut self, tab: Tab) {
        self.dashboard.activate_tab(tab, Instant::now());
        self.chat.update_quick_actions(tab);
    }

    pub fn open_chat(&mut self) {
        self.chat.open();
        self.input_mode = InputMode::Editing;
    }

    pub fn close_chat(&mut self) {
        self.chat.close();
        self.input_mode = InputMode::Normal;
    }

    pub fn toggle_chat(&mut self) {
        self.chat.toggle();
        self.input_mode = if self.chat.is_open() {
            InputMode::Editing
        } else {
            InputMode::Normal
        };
    }

    /// Called by the Tick event
    pub async fn tick(&mut self) {
        self.chat.poll_reply().await;
        if self.chat.is_typing() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Drop the in-flight request and remember where the user left off.
    pub fn shutdown(&mut self) {
        self.chat.dispose();

        match Config::get_config_path() {
            Ok(path) => self.save_position(&path),
            Err(err) => warn!(error = %err, "could not locate config"),
        }
    }

    /// Writes the active tab and period into the config at `path`. A config
    /// that exists but cannot be read is left as it is.
    pub fn save_position(&self, path: &Path) {
        let mut config = match Config::load_from(path) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "config unreadable, not saving position");
                return;
            }
        };

        config.default_tab = Some(self.dashboard.active_tab.as_str().to_string());
        config.default_period = Some(self.dashboard.period.as_str().to_string());
        if let Err(err) = config.save_to(path) {
            warn!(path = %path.display(), error = %err, "could not save config");
        }
    }
}
