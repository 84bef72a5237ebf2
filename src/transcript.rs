#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Bot,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pending: bool,
}

impl ChatMessage {
    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Append-only chat log. The only mutation besides appending is
/// `resolve_pending`, which swaps the in-flight placeholder for the real
/// response. Placeholders are tracked by flag, not by matching rendered
/// text, so a response that happens to say "Thinking..." is never eaten.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage {
            role: ChatRole::User,
            content: content.into(),
            pending: false,
        });
    }

    pub fn push_bot(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage {
            role: ChatRole::Bot,
            content: content.into(),
            pending: false,
        });
    }

    /// Append the placeholder shown while a response is in flight.
    pub fn push_pending(&mut self) {
        self.messages.push(ChatMessage {
            role: ChatRole::Bot,
            content: String::new(),
            pending: true,
        });
    }

    /// Remove the most recent pending placeholder (if one exists) and append
    /// the resolved Bot message. With no placeholder present this is a plain
    /// append.
    pub fn resolve_pending(&mut self, content: impl Into<String>) {
        if let Some(idx) = self.messages.iter().rposition(|m| m.pending) {
            self.messages.remove(idx);
        }
        self.push_bot(content);
    }

    pub fn has_pending(&self) -> bool {
        self.messages.iter().any(|m| m.pending)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_in_order() {
        let mut t = Transcript::new();
        t.push_user("Hi");
        t.push_pending();
        assert_eq!(t.len(), 2);
        assert_eq!(t.messages()[0].role, ChatRole::User);
        assert_eq!(t.messages()[0].content, "Hi");
        assert_eq!(t.messages()[1].role, ChatRole::Bot);
        assert!(t.messages()[1].is_pending());
    }

    #[test]
    fn resolve_replaces_placeholder() {
        let mut t = Transcript::new();
        t.push_user("Hi");
        t.push_pending();
        t.resolve_pending("Hello!");

        assert_eq!(t.len(), 2);
        assert!(!t.has_pending());
        let bot: Vec<_> = t
            .messages()
            .iter()
            .filter(|m| m.role == ChatRole::Bot)
            .collect();
        assert_eq!(bot.len(), 1);
        assert_eq!(bot[0].content, "Hello!");
    }

    #[test]
    fn resolve_without_placeholder_appends() {
        let mut t = Transcript::new();
        t.push_user("Hi");
        t.resolve_pending("late reply");
        assert_eq!(t.len(), 2);
        assert_eq!(t.messages()[1].content, "late reply");
    }

    #[test]
    fn resolve_removes_most_recent_pending() {
        let mut t = Transcript::new();
        t.push_bot("welcome");
        t.push_pending();
        t.resolve_pending("answer");
        assert_eq!(t.messages()[0].content, "welcome");
        assert_eq!(t.messages()[1].content, "answer");
    }

    #[test]
    fn response_text_matching_placeholder_is_not_special() {
        let mut t = Transcript::new();
        t.push_pending();
        t.resolve_pending("Thinking...");
        assert!(!t.has_pending());
        assert_eq!(t.messages()[0].content, "Thinking...");

        // A resolved message that reads like the placeholder must survive
        // the next turn's resolution untouched.
        t.push_pending();
        t.resolve_pending("second answer");
        assert_eq!(t.len(), 2);
        assert_eq!(t.messages()[0].content, "Thinking...");
        assert_eq!(t.messages()[1].content, "second answer");
    }
}
