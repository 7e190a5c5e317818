use std::path::PathBuf;

use askdocs_core::{
    AskClient, ChatRole, Config, Conversation, DefaultPrompt, Source, Theme, DEFAULT_PROMPTS,
    KNOWN_SOURCES,
};
use futures_util::StreamExt;
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::tui::{AppEvent, ReplyEvent};
use crate::ui;

pub const APP_TITLE: &str = "Ask Barfield AI";
pub const INPUT_PLACEHOLDER: &str = "Ask a question about your documents...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Ask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Input,
    Transcript,
    Prompts, // Only reachable while the transcript is empty
    Sources,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Conversation
    pub conversation: Conversation,
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in chars
    pub reply_task: Option<JoinHandle<()>>,

    // Transcript scrolling
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of the transcript for scroll calculations
    pub chat_width: u16,  // Inner width of the transcript for wrap calculations

    // Side lists
    pub prompt_state: ListState,
    pub source_state: ListState,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Short status line shown in the footer (e.g. after opening a source)
    pub notice: Option<String>,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub sources_area: Option<Rect>,

    pub config: Config,
    // Where theme changes are saved; None keeps them in memory only
    pub config_path: Option<PathBuf>,
    pub client: AskClient,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        config: Config,
        config_path: Option<PathBuf>,
        client: AskClient,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        let mut prompt_state = ListState::default();
        prompt_state.select(Some(0));
        let mut source_state = ListState::default();
        source_state.select(Some(0));

        Self {
            should_quit: false,
            screen: Screen::Home,
            input_mode: InputMode::Normal,
            focus: FocusPane::Input,

            conversation: Conversation::new(),
            input: String::new(),
            input_cursor: 0,
            reply_task: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            prompt_state,
            source_state,

            animation_frame: 0,
            notice: None,

            chat_area: None,
            sources_area: None,

            config,
            config_path,
            client,
            events,
        }
    }

    pub fn theme(&self) -> Theme {
        self.config.theme
    }

    pub fn open_chat(&mut self) {
        self.screen = Screen::Ask;
        self.focus = FocusPane::Input;
        self.input_mode = InputMode::Editing;
        self.input_cursor = self.input.chars().count();
    }

    /// Send whatever is in the input box.
    pub fn submit_input(&mut self) {
        if self.conversation.is_loading() || self.input.trim().is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.input);
        self.input_cursor = 0;
        self.submit_question(&text);
    }

    /// Start a turn and spawn the task that streams the answer back as
    /// [`ReplyEvent`]s. Blank questions and questions asked while an answer
    /// is still streaming are ignored.
    pub fn submit_question(&mut self, text: &str) {
        let Some(question) = self.conversation.begin_turn(text) else {
            return;
        };

        info!(chars = question.chars().count(), "question submitted");
        self.notice = None;
        self.scroll_chat_to_bottom();

        let client = self.client.clone();
        let events = self.events.clone();
        self.reply_task = Some(tokio::spawn(stream_reply(client, question, events)));
    }

    pub fn submit_selected_prompt(&mut self) {
        if let Some(prompt) = self.selected_prompt() {
            self.submit_question(prompt.prompt);
        }
    }

    /// Apply one reply event from the streaming task to the transcript.
    pub fn apply_reply(&mut self, event: ReplyEvent) {
        match event {
            ReplyEvent::Started => self.conversation.start_reply(),
            ReplyEvent::Delta(delta) => self.conversation.append_delta(&delta),
            ReplyEvent::Finished => {
                self.conversation.finish_reply();
                self.reply_task = None;
            }
            ReplyEvent::Failed(error) => {
                warn!(%error, "answer failed");
                self.conversation.fail_reply(error);
                self.reply_task = None;
            }
        }
        self.scroll_chat_to_bottom();
    }

    pub fn clear_conversation(&mut self) {
        if self.conversation.clear() {
            self.chat_scroll = 0;
            self.prompt_state.select(Some(0));
            if self.focus == FocusPane::Transcript {
                self.focus = FocusPane::Input;
            }
        }
    }

    pub fn toggle_theme(&mut self) {
        self.config.theme = self.config.theme.toggled();
        if let Some(path) = &self.config_path {
            if let Err(err) = self.config.save_to(path) {
                warn!(%err, "could not save theme");
            }
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Whether the "Thinking..." placeholder is shown below the transcript
    pub fn is_thinking(&self) -> bool {
        self.conversation.is_loading() && !self.conversation.is_streaming()
    }

    /// Scroll the transcript so the newest line is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let total_lines = self.transcript_line_count();
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    /// Rendered line count of the transcript after wrapping.
    pub fn transcript_line_count(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 { self.chat_width } else { 50 };
        u16::try_from(ui::transcript_height(self, wrap_width)).unwrap_or(u16::MAX)
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        let max_scroll = self
            .transcript_line_count()
            .saturating_sub(self.chat_height.max(1));
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max_scroll);
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    /// Tab order: Input -> Transcript or Prompts -> Sources -> Input
    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Input => {
                if self.conversation.is_empty() {
                    FocusPane::Prompts
                } else {
                    FocusPane::Transcript
                }
            }
            FocusPane::Transcript | FocusPane::Prompts => FocusPane::Sources,
            FocusPane::Sources => FocusPane::Input,
        };

        // Auto-enter editing mode when focusing input
        self.input_mode = if self.focus == FocusPane::Input {
            self.input_cursor = self.input.chars().count();
            InputMode::Editing
        } else {
            InputMode::Normal
        };
    }

    // List navigation
    pub fn prompt_nav_down(&mut self) {
        list_down(&mut self.prompt_state, DEFAULT_PROMPTS.len());
    }

    pub fn prompt_nav_up(&mut self) {
        list_up(&mut self.prompt_state);
    }

    pub fn source_nav_down(&mut self) {
        list_down(&mut self.source_state, KNOWN_SOURCES.len());
    }

    pub fn source_nav_up(&mut self) {
        list_up(&mut self.source_state);
    }

    pub fn selected_prompt(&self) -> Option<&'static DefaultPrompt> {
        self.prompt_state.selected().and_then(|i| DEFAULT_PROMPTS.get(i))
    }

    pub fn selected_source(&self) -> Option<&'static Source> {
        self.source_state.selected().and_then(|i| KNOWN_SOURCES.get(i))
    }

    pub fn selected_source_url(&self) -> Option<String> {
        self.selected_source().map(|s| s.url(&self.config.files_url))
    }

    // Input editing
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
        self.input.insert(byte_pos, c);
        self.input_cursor += 1;
    }

    pub fn delete_char_before_cursor(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete_char_at_cursor(&mut self) {
        if self.input_cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.input_cursor = (self.input_cursor + 1).min(self.input.chars().count());
    }

    pub fn move_cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.input_cursor = self.input.chars().count();
    }

    pub fn last_answer(&self) -> Option<&str> {
        self.conversation
            .messages()
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::Assistant)
            .map(|m| m.content.as_str())
    }
}

/// Stream one answer, forwarding it to the UI loop as reply events.
async fn stream_reply(client: AskClient, question: String, events: UnboundedSender<AppEvent>) {
    let send = |event: ReplyEvent| events.send(AppEvent::Reply(event)).is_ok();

    let mut deltas = match client.ask_stream(&question).await {
        Ok(deltas) => deltas,
        Err(err) => {
            send(ReplyEvent::Failed(err.to_string()));
            return;
        }
    };

    if !send(ReplyEvent::Started) {
        return;
    }

    while let Some(delta) = deltas.next().await {
        match delta {
            Ok(delta) => {
                if !send(ReplyEvent::Delta(delta)) {
                    return;
                }
            }
            Err(err) => {
                send(ReplyEvent::Failed(err.to_string()));
                return;
            }
        }
    }

    send(ReplyEvent::Finished);
}

fn list_down(state: &mut ListState, len: usize) {
    if len == 0 {
        return;
    }
    let i = state.selected().map(|i| (i + 1).min(len - 1)).unwrap_or(0);
    state.select(Some(i));
}

fn list_up(state: &mut ListState) {
    let i = state.selected().map(|i| i.saturating_sub(1)).unwrap_or(0);
    state.select(Some(i));
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use askdocs_core::Endpoint;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    pub(crate) fn test_app(base_url: &str) -> (App, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = AskClient::new(base_url, Endpoint::Ask);
        (App::new(Config::new(), None, client, tx), rx)
    }

    /// Drain reply events into the app until the turn settles
    async fn run_until_idle(app: &mut App, rx: &mut UnboundedReceiver<AppEvent>) {
        while app.conversation.is_loading() {
            match rx.recv().await {
                Some(AppEvent::Reply(event)) => app.apply_reply(event),
                Some(_) => {}
                None => break,
            }
        }
    }

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("h\u{e9}llo", 2), 3);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[test]
    fn test_utf8_input_editing() {
        let (mut app, _rx) = test_app("http://127.0.0.1:9");
        for c in "caf\u{e9}".chars() {
            app.insert_char(c);
        }
        app.move_cursor_left();
        app.delete_char_before_cursor();
        assert_eq!(app.input, "ca\u{e9}");
        app.move_cursor_end();
        app.delete_char_before_cursor();
        assert_eq!(app.input, "ca");
        app.move_cursor_home();
        app.delete_char_at_cursor();
        assert_eq!(app.input, "a");
    }

    #[test]
    fn test_reply_events_build_answer() {
        let (mut app, _rx) = test_app("http://127.0.0.1:9");
        // Drive the conversation directly; no request is spawned here
        app.conversation.begin_turn("question").unwrap();
        assert!(app.is_thinking());

        app.apply_reply(ReplyEvent::Started);
        assert!(!app.is_thinking());
        app.apply_reply(ReplyEvent::Delta("Hello".into()));
        app.apply_reply(ReplyEvent::Delta(" there".into()));
        app.apply_reply(ReplyEvent::Finished);

        assert_eq!(app.last_answer(), Some("Hello there"));
        assert!(!app.conversation.is_loading());
    }

    #[test]
    fn test_failed_reply_drops_partial_answer() {
        let (mut app, _rx) = test_app("http://127.0.0.1:9");
        app.conversation.begin_turn("question").unwrap();
        app.apply_reply(ReplyEvent::Started);
        app.apply_reply(ReplyEvent::Delta("partial".into()));
        app.apply_reply(ReplyEvent::Failed("connection closed".into()));

        assert_eq!(app.last_answer(), None);
        assert_eq!(app.conversation.error(), Some("connection closed"));
    }

    #[test]
    fn test_scroll_follows_new_lines() {
        let (mut app, _rx) = test_app("http://127.0.0.1:9");
        app.chat_height = 4;
        app.chat_width = 10;
        app.conversation.begin_turn("q").unwrap();
        app.apply_reply(ReplyEvent::Started);
        app.apply_reply(ReplyEvent::Delta("0123456789abcdefghij\nsecond".into()));

        // You: / q / blank / AI: / 2 wrapped / second / blank
        assert_eq!(app.transcript_line_count(), 8);
        assert_eq!(app.chat_scroll, 4);

        app.scroll_chat_up(10);
        assert_eq!(app.chat_scroll, 0);
        app.scroll_chat_down(100);
        assert_eq!(app.chat_scroll, 4);
    }

    #[test]
    fn test_focus_cycle_depends_on_transcript() {
        let (mut app, _rx) = test_app("http://127.0.0.1:9");
        app.open_chat();
        app.cycle_focus();
        assert_eq!(app.focus, FocusPane::Prompts);
        assert_eq!(app.input_mode, InputMode::Normal);
        app.cycle_focus();
        assert_eq!(app.focus, FocusPane::Sources);
        app.cycle_focus();
        assert_eq!(app.focus, FocusPane::Input);
        assert_eq!(app.input_mode, InputMode::Editing);

        app.conversation.begin_turn("q").unwrap();
        app.cycle_focus();
        assert_eq!(app.focus, FocusPane::Transcript);
    }

    #[test]
    fn test_toggle_theme_saves_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let (mut app, _rx) = test_app("http://127.0.0.1:9");
        app.config_path = Some(path.clone());

        app.toggle_theme();
        assert_eq!(app.theme(), Theme::Dark);
        assert_eq!(Config::load_from(&path).unwrap().theme, Theme::Dark);
    }

    #[test]
    fn test_source_url_uses_config() {
        let (mut app, _rx) = test_app("http://127.0.0.1:9");
        app.config.files_url = "https://docs.example.com/files".into();
        app.source_nav_down();
        assert_eq!(
            app.selected_source_url().as_deref(),
            Some("https://docs.example.com/files/aeronautics-introduction.pdf")
        );
        app.source_nav_down();
        app.source_nav_down();
        app.source_nav_down();
        assert_eq!(app.source_state.selected(), Some(KNOWN_SOURCES.len() - 1));
    }

    #[tokio::test]
    async fn test_streamed_answer_reaches_transcript() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/ask")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(
                "data: {\"content\": \"Wear \"}\n\n\
                 data: {\"content\": \"eye protection.\"}\n\n\
                 data: [DONE]\n\n",
            )
            .create_async()
            .await;

        let (mut app, mut rx) = test_app(&server.url());
        app.submit_question(DEFAULT_PROMPTS[1].prompt);
        assert!(app.conversation.is_loading());

        run_until_idle(&mut app, &mut rx).await;

        let messages = app.conversation.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, DEFAULT_PROMPTS[1].prompt);
        assert_eq!(messages[1].content, "Wear eye protection.");
        assert_eq!(app.conversation.error(), None);
    }

    #[tokio::test]
    async fn test_http_error_surfaces_in_banner() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/ask")
            .with_status(500)
            .create_async()
            .await;

        let (mut app, mut rx) = test_app(&server.url());
        app.input = "why?".into();
        app.submit_input();
        assert!(app.input.is_empty());

        run_until_idle(&mut app, &mut rx).await;

        assert_eq!(app.conversation.error(), Some("HTTP error! status: 500"));
        assert_eq!(app.conversation.messages().len(), 1);
        assert_eq!(app.last_answer(), None);
    }
}
