use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use crate::config::Config;
use crate::gemini::{GeminiClient, TextGenerator, DEFAULT_MODEL};
use crate::transcript::Transcript;
use crate::tui::AppEvent;

pub const WELCOME_MESSAGE: &str =
    "Hello! I'm your Gemini chatbot. How can I help you today?";

pub const NOT_CONFIGURED_MESSAGE: &str =
    "Bot is not properly configured. Please check your API key.";

const MISSING_KEY_MESSAGE: &str =
    "GEMINI_API_KEY not found. Export it or add \"api_key\" to the config file, then restart.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub sending: bool,

    // Transcript state
    pub transcript: Transcript,
    pub scroll: u16,
    pub chat_height: u16, // Height of transcript area for scroll calculations
    pub chat_width: u16,  // Width of transcript area for wrap calculations

    // Input box state
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Generation backend
    pub model: String,
    generator: Option<Arc<dyn TextGenerator>>,
    events_tx: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(config: &Config, events_tx: UnboundedSender<AppEvent>) -> Self {
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let generator: Option<Arc<dyn TextGenerator>> = config
            .resolve_api_key()
            .map(|key| Arc::new(GeminiClient::new(&key, &model)) as Arc<dyn TextGenerator>);

        let mut app = Self::with_generator(generator, &model, events_tx);

        app.transcript.push_bot(WELCOME_MESSAGE);
        if app.generator.is_none() {
            // Announced once at startup; later submits short-circuit.
            app.transcript.push_bot(MISSING_KEY_MESSAGE);
        }

        app
    }

    pub fn with_generator(
        generator: Option<Arc<dyn TextGenerator>>,
        model: &str,
        events_tx: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            sending: false,

            transcript: Transcript::new(),
            scroll: 0,
            chat_height: 0,
            chat_width: 0,

            input: String::new(),
            cursor: 0,

            animation_frame: 0,

            model: model.to_string(),
            generator,
            events_tx,
        }
    }

    /// Submit the current input box contents as a new user message.
    ///
    /// No-op while a request is in flight or when the trimmed input is
    /// empty. Otherwise appends the user message plus a pending placeholder
    /// and hands the network call to a background task; the result comes
    /// back through the event channel as `AppEvent::Response`.
    pub fn submit_message(&mut self) {
        if self.sending {
            return;
        }

        let user_message = self.input.trim().to_string();
        if user_message.is_empty() {
            return;
        }

        self.input.clear();
        self.cursor = 0;

        self.transcript.push_user(user_message.clone());
        self.transcript.push_pending();
        self.scroll_to_bottom();

        let Some(generator) = self.generator.clone() else {
            // Startup configuration failure: no network call, fixed reply.
            self.transcript.resolve_pending(NOT_CONFIGURED_MESSAGE);
            return;
        };

        self.sending = true;

        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = generator.generate(&user_message).await;
            let _ = tx.send(AppEvent::Response(result));
        });
    }

    /// Runs on the UI task once the dispatcher task reports back.
    pub fn complete_response(&mut self, result: anyhow::Result<String>) {
        let content = match result {
            Ok(text) => text,
            Err(e) => format!(
                "Error: {:#}\nTry the model 'gemini-1.5-flash' or 'gemini-1.5-pro'.",
                e
            ),
        };

        self.transcript.resolve_pending(content);
        self.sending = false;
        self.scroll_to_bottom();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.sending {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Transcript scrolling
    pub fn scroll_down(&mut self) {
        let max_scroll = self
            .transcript_line_count()
            .saturating_sub(self.visible_height());
        if self.scroll < max_scroll {
            self.scroll = self.scroll.saturating_add(1);
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    pub fn scroll_half_page_down(&mut self) {
        let half_page = self.visible_height() / 2;
        let max_scroll = self
            .transcript_line_count()
            .saturating_sub(self.visible_height());
        self.scroll = (self.scroll + half_page).min(max_scroll);
    }

    pub fn scroll_half_page_up(&mut self) {
        let half_page = self.visible_height() / 2;
        self.scroll = self.scroll.saturating_sub(half_page);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self
            .transcript_line_count()
            .saturating_sub(self.visible_height());
    }

    /// Rendered line count of the transcript at the current wrap width.
    /// Mirrors the layout in ui.rs: a role label line, the wrapped content,
    /// and a blank separator per message.
    fn transcript_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.transcript.messages() {
            total_lines += 1; // Role label line ("You:" or "Bot:")
            if msg.is_pending() {
                total_lines += 1; // "Thinking..." line
            } else {
                for line in msg.content.lines() {
                    // Use character count, not byte length, for proper UTF-8 handling
                    let char_count = line.chars().count();
                    if char_count == 0 {
                        total_lines += 1; // Empty line still takes one line
                    } else {
                        total_lines += ((char_count / wrap_width) + 1) as u16;
                    }
                }
            }
            total_lines += 1; // Blank line after message
        }

        total_lines
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::ChatRole;
    use crate::tui::AppEvent;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct CannedGenerator {
        reply: String,
    }

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.reply.clone())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(anyhow!("quota exceeded"))
        }
    }

    fn test_app(
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (App::with_generator(generator, DEFAULT_MODEL, tx), rx)
    }

    async fn drive_response(app: &mut App, rx: &mut mpsc::UnboundedReceiver<AppEvent>) {
        match rx.recv().await {
            Some(AppEvent::Response(result)) => app.complete_response(result),
            other => panic!("expected a response event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn whitespace_submit_is_rejected() {
        let (mut app, mut rx) = test_app(Some(Arc::new(CannedGenerator {
            reply: "unused".to_string(),
        })));

        app.input = "   ".to_string();
        app.submit_message();

        assert!(app.transcript.is_empty());
        assert!(!app.sending);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn submit_appends_user_then_placeholder() {
        let (mut app, _rx) = test_app(Some(Arc::new(CannedGenerator {
            reply: "unused".to_string(),
        })));

        app.input = "Hi".to_string();
        app.submit_message();

        let messages = app.transcript.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[0].content, "Hi");
        assert_eq!(messages[1].role, ChatRole::Bot);
        assert!(messages[1].is_pending());
        assert!(app.sending);
        assert!(app.input.is_empty());
    }

    #[tokio::test]
    async fn success_replaces_placeholder_with_single_reply() {
        let (mut app, mut rx) = test_app(Some(Arc::new(CannedGenerator {
            reply: "Hello!".to_string(),
        })));

        app.input = "Hi".to_string();
        app.submit_message();
        drive_response(&mut app, &mut rx).await;

        assert!(!app.sending);
        assert!(!app.transcript.has_pending());
        let bot: Vec<_> = app
            .transcript
            .messages()
            .iter()
            .filter(|m| m.role == ChatRole::Bot)
            .collect();
        assert_eq!(bot.len(), 1);
        assert_eq!(bot[0].content, "Hello!");
    }

    #[tokio::test]
    async fn failure_surfaces_diagnostic_and_reenables() {
        let (mut app, mut rx) = test_app(Some(Arc::new(FailingGenerator)));

        app.input = "Hi".to_string();
        app.submit_message();
        drive_response(&mut app, &mut rx).await;

        assert!(!app.sending);
        assert!(!app.transcript.has_pending());
        let last = app.transcript.messages().last().unwrap();
        assert_eq!(last.role, ChatRole::Bot);
        assert!(last.content.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn second_submit_while_sending_is_rejected() {
        let (mut app, mut rx) = test_app(Some(Arc::new(CannedGenerator {
            reply: "Hello!".to_string(),
        })));

        app.input = "Hi".to_string();
        app.submit_message();

        app.input = "again".to_string();
        app.submit_message();

        // Second submit changed nothing: still one user line, one placeholder.
        assert_eq!(app.transcript.len(), 2);
        assert_eq!(app.input, "again");

        drive_response(&mut app, &mut rx).await;
        assert_eq!(app.transcript.len(), 2);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unconfigured_submit_short_circuits() {
        let (mut app, mut rx) = test_app(None);

        app.input = "Hi".to_string();
        app.submit_message();

        assert!(!app.sending);
        assert!(!app.transcript.has_pending());
        let last = app.transcript.messages().last().unwrap();
        assert_eq!(last.content, NOT_CONFIGURED_MESSAGE);
        // No network task was spawned.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn animation_only_advances_while_sending() {
        let (mut app, _rx) = test_app(None);

        app.tick_animation();
        assert_eq!(app.animation_frame, 0);

        app.sending = true;
        app.tick_animation();
        assert_eq!(app.animation_frame, 1);
    }
}
