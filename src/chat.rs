//! EcoBot chat session.
//!
//! Owns the panel's open/closed state, the transcript, the input line and the
//! single in-flight reply request. Rendering reads this state; nothing here
//! touches the terminal, so the send/receive cycle runs in plain unit tests.

use std::time::Duration;

use chrono::Local;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::reply::{ReplyError, ReplyService};
use crate::tab::Tab;

pub const ERROR_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";
pub const WELCOME_TITLE: &str = "Welcome to EcoBot!";
pub const WELCOME_TEXT: &str = "I'm here to help you with waste management queries. Ask me anything!";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const ADMIN_ACTIONS: &[&str] = &[
    "Show latest route deviations",
    "Environmental impact summary",
    "Generate weekly report",
];

const WORKER_ACTIONS: &[&str] = &[
    "What's my next task?",
    "How do I mark task complete?",
    "Show my route map",
];

const CITIZEN_ACTIONS: &[&str] = &[
    "How do I report an issue?",
    "Check my Green Points",
    "What rewards can I redeem?",
];

/// Suggested prompts for a tab id. Ids match exactly; anything else has no
/// suggestions.
pub fn quick_actions(tab_id: &str) -> &'static [&'static str] {
    match tab_id {
        "admin" => ADMIN_ACTIONS,
        "worker" => WORKER_ACTIONS,
        "citizen" => CITIZEN_ACTIONS,
        _ => &[],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    Welcome,
    User,
    Bot,
    Error,
}

#[derive(Debug, Clone)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub content: String,
    /// Display time, e.g. `3:07 PM`. Welcome and error entries have none.
    pub time: Option<String>,
}

impl ChatEntry {
    fn stamped(role: ChatRole, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            time: Some(Local::now().format("%-I:%M %p").to_string()),
        }
    }

    fn plain(role: ChatRole, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            time: None,
        }
    }
}

/// One completed message/reply pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub user: String,
    pub bot: String,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line text field with a character cursor.
#[derive(Debug, Clone, Default)]
pub struct InputLine {
    text: String,
    cursor: usize,
}

impl InputLine {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn set(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.text.chars().count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.text.chars().count();
    }
}

struct Pending {
    message: String,
    task: JoinHandle<Result<String, ReplyError>>,
}

pub struct ChatSession<S: ReplyService> {
    service: S,
    timeout: Duration,
    is_open: bool,
    is_typing: bool,
    unread: bool,
    pub input: InputLine,
    transcript: Vec<ChatEntry>,
    history: Vec<Exchange>,
    suggestions: &'static [&'static str],
    pending: Option<Pending>,

    // Scroll state, sized by the renderer
    pub scroll: u16,
    view_height: u16,
    view_width: u16,
    /// Wrapped transcript height from the last frame. Cleared whenever the
    /// transcript changes so the estimate covers the gap until the next draw.
    rendered_lines: Option<u16>,
    follow_tail: bool,
}

impl<S: ReplyService> ChatSession<S> {
    pub fn new(service: S, timeout: Duration) -> Self {
        Self {
            service,
            timeout,
            is_open: false,
            is_typing: false,
            unread: true,
            input: InputLine::default(),
            transcript: vec![ChatEntry::plain(ChatRole::Welcome, WELCOME_TEXT)],
            history: Vec::new(),
            suggestions: &[],
            pending: None,
            scroll: 0,
            view_height: 0,
            view_width: 0,
            rendered_lines: None,
            follow_tail: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    pub fn has_unread(&self) -> bool {
        self.unread
    }

    pub fn transcript(&self) -> &[ChatEntry] {
        &self.transcript
    }

    pub fn history(&self) -> &[Exchange] {
        &self.history
    }

    pub fn suggestions(&self) -> &'static [&'static str] {
        self.suggestions
    }

    /// Shows the panel and clears the unread badge. Returns false if it was
    /// already open.
    pub fn open(&mut self) -> bool {
        if self.is_open {
            return false;
        }
        self.is_open = true;
        self.unread = false;
        self.scroll_to_bottom();
        true
    }

    /// Hides the panel. An in-flight request keeps running.
    pub fn close(&mut self) -> bool {
        if !self.is_open {
            return false;
        }
        self.is_open = false;
        true
    }

    pub fn toggle(&mut self) {
        if self.is_open {
            self.close();
        } else {
            self.open();
        }
    }

    pub fn update_quick_actions(&mut self, tab: Tab) {
        self.suggestions = quick_actions(tab.as_str());
    }

    /// Sends whatever is in the input line.
    pub fn submit(&mut self) -> bool {
        let text = self.input.as_str().to_string();
        self.send_message(&text)
    }

    pub fn send_quick_action(&mut self, index: usize) -> bool {
        let Some(prompt) = self.suggestions.get(index) else {
            return false;
        };
        self.input.set(prompt);
        self.submit()
    }

    /// Starts one message/reply exchange.
    ///
    /// Blank input, or a request already in flight, is ignored and returns
    /// false. Must be called from within a tokio runtime.
    pub fn send_message(&mut self, text: &str) -> bool {
        let message = text.trim();
        if message.is_empty() || self.is_typing {
            return false;
        }
        let message = message.to_string();

        self.input.clear();
        self.transcript.push(ChatEntry::stamped(ChatRole::User, &message));
        self.is_typing = true;
        self.rendered_lines = None;
        self.scroll_to_bottom();

        debug!(chars = message.chars().count(), "sending chat message");

        let request = self.service.reply(message.clone());
        let timeout = self.timeout;
        let task = tokio::spawn(async move {
            match tokio::time::timeout(timeout, request).await {
                Ok(result) => result,
                Err(_) => Err(ReplyError::Timeout(timeout)),
            }
        });

        self.pending = Some(Pending { message, task });
        true
    }

    /// Applies the in-flight reply if it has finished. Returns true when a
    /// reply (or failure) was applied.
    pub async fn poll_reply(&mut self) -> bool {
        let finished = self
            .pending
            .as_ref()
            .map_or(false, |pending| pending.task.is_finished());
        if !finished {
            return false;
        }
        self.wait_for_reply().await
    }

    /// Waits for the in-flight reply, however long it takes, and applies it.
    pub async fn wait_for_reply(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                let outcome = pending.task.await;
                self.finish(pending.message, outcome);
                true
            }
            None => false,
        }
    }

    fn finish(&mut self, message: String, outcome: Result<Result<String, ReplyError>, JoinError>) {
        match outcome {
            Ok(Ok(reply)) => {
                self.transcript.push(ChatEntry::stamped(ChatRole::Bot, &reply));
                self.history.push(Exchange {
                    user: message,
                    bot: reply,
                });
            }
            Ok(Err(err)) => {
                warn!(kind = err.kind(), error = %err, "chat reply failed");
                self.transcript.push(ChatEntry::plain(ChatRole::Error, ERROR_MESSAGE));
            }
            Err(err) => {
                warn!(error = %err, "chat reply task did not complete");
                self.transcript.push(ChatEntry::plain(ChatRole::Error, ERROR_MESSAGE));
            }
        }

        self.is_typing = false;
        if !self.is_open {
            self.unread = true;
        }
        self.rendered_lines = None;
        self.scroll_to_bottom();
    }

    /// Drops any in-flight request. Called once on shutdown.
    pub fn dispose(&mut self) {
        if let Some(pending) = self.pending.take() {
            info!("aborting in-flight chat request");
            pending.task.abort();
        }
        self.is_typing = false;
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(3);
        self.follow_tail = self.scroll >= self.max_scroll();
    }

    pub fn scroll_down(&mut self) {
        let max = self.max_scroll();
        self.scroll = self.scroll.saturating_add(3).min(max);
        self.follow_tail = self.scroll >= max;
    }

    /// Scroll so the newest entry (and the typing indicator) is visible, and
    /// keep it there as the transcript grows.
    pub fn scroll_to_bottom(&mut self) {
        self.follow_tail = true;
        self.scroll = self.max_scroll();
    }

    /// Records the transcript area and its wrapped height as drawn, then
    /// re-clamps the scroll offset against them.
    pub fn set_viewport(&mut self, width: u16, height: u16, content_lines: u16) {
        self.view_width = width;
        self.view_height = height;
        self.rendered_lines = Some(content_lines);

        let max = self.max_scroll();
        self.scroll = if self.follow_tail { max } else { self.scroll.min(max) };
    }

    fn max_scroll(&self) -> u16 {
        self.content_lines().saturating_sub(self.visible_height())
    }

    fn visible_height(&self) -> u16 {
        if self.view_height > 0 {
            self.view_height
        } else {
            20
        }
    }

    fn content_lines(&self) -> u16 {
        self.rendered_lines.unwrap_or_else(|| self.estimated_lines())
    }

    /// Rough wrapped height of the transcript before it has been drawn.
    fn estimated_lines(&self) -> u16 {
        let wrap_width = if self.view_width > 0 {
            self.view_width as usize
        } else {
            40
        };

        let mut total: usize = 0;
        for entry in &self.transcript {
            total += match entry.role {
                ChatRole::Welcome => 1,
                ChatRole::Error => 0,
                ChatRole::User | ChatRole::Bot => 1,
            };
            for line in entry.content.lines() {
                let chars = line.chars().count();
                total += chars / wrap_width + 1;
            }
            total += 1;
        }
        if self.is_typing {
            total += 2;
        }
        total.min(u16::MAX as usize) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    #[derive(Clone)]
    enum Outcome {
        Reply(&'static str),
        Fail(u16),
        Hang,
    }

    /// In-memory reply service that records every message it receives.
    #[derive(Clone)]
    struct FakeService {
        outcome: Outcome,
        calls: Arc<AtomicUsize>,
        received: Arc<Mutex<Vec<String>>>,
        release: Arc<Notify>,
        gated: bool,
    }

    impl FakeService {
        fn new(outcome: Outcome) -> Self {
            Self {
                outcome,
                calls: Arc::new(AtomicUsize::new(0)),
                received: Arc::new(Mutex::new(Vec::new())),
                release: Arc::new(Notify::new()),
                gated: false,
            }
        }

        /// Replies are held back until `release` is notified.
        fn gated(outcome: Outcome) -> Self {
            Self {
                gated: true,
                ..Self::new(outcome)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ReplyService for FakeService {
        fn reply(
            &self,
            message: String,
        ) -> impl std::future::Future<Output = Result<String, ReplyError>> + Send + 'static {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.received.lock().unwrap().push(message);
            let outcome = self.outcome.clone();
            let release = self.release.clone();
            let gated = self.gated;
            async move {
                if gated {
                    release.notified().await;
                }
                match outcome {
                    Outcome::Reply(text) => Ok(text.to_string()),
                    Outcome::Fail(status) => Err(ReplyError::Status { status }),
                    Outcome::Hang => std::future::pending().await,
                }
            }
        }
    }

    fn session(service: &FakeService) -> ChatSession<FakeService> {
        ChatSession::new(service.clone(), DEFAULT_TIMEOUT)
    }

    fn last_roles(chat: &ChatSession<FakeService>, n: usize) -> Vec<ChatRole> {
        let t = chat.transcript();
        t[t.len().saturating_sub(n)..].iter().map(|e| e.role).collect()
    }

    #[test]
    fn starts_closed_with_welcome_and_unread_badge() {
        let chat = session(&FakeService::new(Outcome::Reply("hi")));
        assert!(!chat.is_open());
        assert!(!chat.is_typing());
        assert!(chat.has_unread());
        assert_eq!(chat.transcript().len(), 1);
        assert_eq!(chat.transcript()[0].role, ChatRole::Welcome);
    }

    #[test]
    fn toggle_twice_restores_state() {
        let mut chat = session(&FakeService::new(Outcome::Reply("hi")));
        chat.toggle();
        assert!(chat.is_open());
        chat.toggle();
        assert!(!chat.is_open());

        chat.open();
        chat.toggle();
        chat.toggle();
        assert!(chat.is_open());
    }

    #[test]
    fn open_and_close_are_idempotent() {
        let mut chat = session(&FakeService::new(Outcome::Reply("hi")));
        assert!(chat.open());
        assert!(!chat.has_unread());
        assert!(!chat.open());
        assert!(chat.is_open());
        assert!(chat.close());
        assert!(!chat.close());
        assert!(!chat.is_open());
    }

    #[test]
    fn quick_action_table() {
        assert_eq!(
            quick_actions("worker"),
            &["What's my next task?", "How do I mark task complete?", "Show my route map"]
        );
        assert_eq!(quick_actions("admin").len(), 3);
        assert_eq!(quick_actions("citizen")[1], "Check my Green Points");
        assert!(quick_actions("driver").is_empty());
        assert!(quick_actions("").is_empty());
        // Ids are matched as given, without trimming or case folding
        assert!(quick_actions(" worker ").is_empty());
        assert!(quick_actions("WORKER").is_empty());
        assert!(quick_actions("Admin").is_empty());
    }

    #[test]
    fn update_quick_actions_follows_tab() {
        let mut chat = session(&FakeService::new(Outcome::Reply("hi")));
        assert!(chat.suggestions().is_empty());
        chat.update_quick_actions(Tab::Citizen);
        assert_eq!(chat.suggestions(), quick_actions("citizen"));
    }

    #[test]
    fn blank_input_is_ignored() {
        let service = FakeService::new(Outcome::Reply("hi"));
        let mut chat = session(&service);

        for text in ["", "   ", "\t\n"] {
            assert!(!chat.send_message(text));
        }
        chat.input.set("   ");
        assert!(!chat.submit());

        assert_eq!(service.calls(), 0);
        assert_eq!(chat.transcript().len(), 1);
        assert!(!chat.is_typing());
    }

    #[tokio::test]
    async fn successful_exchange_appends_user_then_bot() {
        let service = FakeService::new(Outcome::Reply("Here are the deviations."));
        let mut chat = session(&service);
        chat.input.set("Show latest route deviations");

        assert!(chat.submit());
        assert!(chat.is_typing());
        assert!(chat.input.is_empty());
        assert_eq!(chat.transcript().last().unwrap().role, ChatRole::User);

        assert!(chat.wait_for_reply().await);

        assert_eq!(service.calls(), 1);
        assert_eq!(last_roles(&chat, 2), vec![ChatRole::User, ChatRole::Bot]);
        let transcript = chat.transcript();
        assert_eq!(transcript[transcript.len() - 2].content, "Show latest route deviations");
        assert_eq!(transcript.last().unwrap().content, "Here are the deviations.");
        assert!(!chat.is_typing());
        assert_eq!(
            chat.history(),
            &[Exchange {
                user: "Show latest route deviations".to_string(),
                bot: "Here are the deviations.".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn message_is_trimmed_before_sending() {
        let service = FakeService::new(Outcome::Reply("ok"));
        let mut chat = session(&service);

        assert!(chat.send_message("  hello  "));
        chat.wait_for_reply().await;

        assert_eq!(service.received.lock().unwrap().as_slice(), &["hello".to_string()]);
    }

    #[tokio::test]
    async fn server_error_shows_generic_message() {
        let service = FakeService::new(Outcome::Fail(500));
        let mut chat = session(&service);

        assert!(chat.send_message("hello"));
        chat.wait_for_reply().await;

        assert_eq!(last_roles(&chat, 2), vec![ChatRole::User, ChatRole::Error]);
        assert_eq!(chat.transcript().last().unwrap().content, ERROR_MESSAGE);
        assert!(!chat.is_typing());
        assert!(chat.history().is_empty());

        // Still usable afterwards
        assert!(chat.send_message("hello again"));
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test]
    async fn sends_are_rejected_while_typing() {
        let service = FakeService::gated(Outcome::Reply("first reply"));
        let mut chat = session(&service);

        assert!(chat.send_message("first"));
        assert!(!chat.send_message("second"));
        chat.input.set("third");
        assert!(!chat.submit());
        assert_eq!(chat.input.as_str(), "third");
        assert!(!chat.poll_reply().await);

        assert_eq!(service.calls(), 1);
        assert_eq!(chat.transcript().len(), 2);

        service.release.notify_one();
        chat.wait_for_reply().await;
        assert_eq!(chat.transcript().last().unwrap().content, "first reply");
        assert!(!chat.is_typing());
    }

    #[tokio::test]
    async fn poll_reply_applies_finished_request() {
        let service = FakeService::new(Outcome::Reply("done"));
        let mut chat = session(&service);
        chat.send_message("hi");

        let mut applied = false;
        for _ in 0..100 {
            if chat.poll_reply().await {
                applied = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(applied);
        assert_eq!(chat.transcript().last().unwrap().content, "done");
        assert!(!chat.poll_reply().await);
    }

    #[tokio::test]
    async fn timeout_releases_typing_flag() {
        let service = FakeService::new(Outcome::Hang);
        let mut chat = ChatSession::new(service.clone(), Duration::from_millis(20));

        assert!(chat.send_message("anyone there?"));
        chat.wait_for_reply().await;

        assert!(!chat.is_typing());
        assert_eq!(chat.transcript().last().unwrap().content, ERROR_MESSAGE);
        assert!(chat.send_message("retry by hand"));
    }

    #[tokio::test]
    async fn reply_lands_while_closed_and_marks_unread() {
        let service = FakeService::gated(Outcome::Reply("late reply"));
        let mut chat = session(&service);
        chat.open();
        chat.send_message("hi");
        chat.close();

        service.release.notify_one();
        chat.wait_for_reply().await;

        assert_eq!(chat.transcript().last().unwrap().content, "late reply");
        assert!(chat.has_unread());
        chat.open();
        assert!(!chat.has_unread());
    }

    #[tokio::test]
    async fn quick_action_sends_prompt() {
        let service = FakeService::new(Outcome::Reply("Task 2 is next."));
        let mut chat = session(&service);
        chat.update_quick_actions(Tab::Worker);

        assert!(chat.send_quick_action(0));
        chat.wait_for_reply().await;
        assert_eq!(service.received.lock().unwrap()[0], "What's my next task?");
        assert!(!chat.send_quick_action(7));
    }

    #[tokio::test]
    async fn dispose_aborts_in_flight_request() {
        let service = FakeService::new(Outcome::Hang);
        let mut chat = session(&service);
        chat.send_message("hi");

        chat.dispose();
        assert!(!chat.is_typing());
        assert!(!chat.wait_for_reply().await);
    }

    #[test]
    fn input_line_edits_by_character() {
        let mut input = InputLine::default();
        for c in "héllo".chars() {
            input.insert(c);
        }
        input.left();
        input.left();
        input.backspace();
        assert_eq!(input.as_str(), "hélo");
        input.home();
        input.delete();
        assert_eq!(input.as_str(), "élo");
        input.end();
        input.right();
        assert_eq!(input.cursor(), 3);
    }

    #[test]
    fn scrolling_uses_the_drawn_height() {
        let mut chat = session(&FakeService::new(Outcome::Reply("hi")));
        chat.set_viewport(44, 10, 40);
        assert_eq!(chat.scroll, 30);

        chat.scroll_up();
        assert_eq!(chat.scroll, 27);
        // Taller transcript while scrolled back: offset stays put
        chat.set_viewport(44, 10, 50);
        assert_eq!(chat.scroll, 27);

        for _ in 0..10 {
            chat.scroll_down();
        }
        assert_eq!(chat.scroll, 40);
        // Back at the bottom, so growth is followed
        chat.set_viewport(44, 10, 55);
        assert_eq!(chat.scroll, 45);

        // Shrinking clamps
        chat.set_viewport(44, 10, 8);
        assert_eq!(chat.scroll, 0);
    }
}
