//! Seam between the synchronisation core and whatever draws it.

use crate::avatar::avatar_url_with_base;
use crate::models::chat::{ Conversation, Message };
use crate::models::websocket::ChannelState;
use crate::viewport::ViewportMetrics;
use chrono::Local;
use log::warn;
use std::collections::HashMap;
use std::io::{ self, Write };

/// The open conversation as handed to a renderer.
#[derive(Debug, Clone, Copy)]
pub struct MessagePane<'a> {
    pub comm_id: &'a str,
    pub title: &'a str,
    /// Goal stated by the first message of the conversation.
    pub goal: Option<&'a str>,
    pub messages: &'a [Message],
}

pub trait Renderer {
    /// Current scroll geometry of the message surface, if one is on screen.
    fn viewport(&self) -> Option<ViewportMetrics>;

    fn render_conversations(&mut self, conversations: &[Conversation], selected: Option<&str>);

    fn render_messages(&mut self, pane: MessagePane<'_>, scroll_to_bottom: bool);

    fn render_channel_state(&mut self, state: ChannelState);
}

/// Line-oriented renderer for a terminal. It only prints what changed since the
/// last call: new or updated list entries and newly appended messages.
pub struct TerminalRenderer<W: Write> {
    out: W,
    avatar_base_url: String,
    previews: HashMap<String, (String, String)>,
    printed: HashMap<String, usize>,
    // Conversations whose header is out, and whether their goal was shown with it.
    headers: HashMap<String, bool>,
}

impl TerminalRenderer<io::Stdout> {
    pub fn stdout(avatar_base_url: &str) -> Self {
        Self::new(io::stdout(), avatar_base_url)
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, avatar_base_url: &str) -> Self {
        Self {
            out,
            avatar_base_url: avatar_base_url.to_string(),
            previews: HashMap::new(),
            printed: HashMap::new(),
            headers: HashMap::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line) {
            warn!("Failed to write to terminal: {}", e);
        }
    }

    fn format_message(&self, message: &Message) -> Vec<String> {
        let mut lines = vec![
            format!(
                "[{}] {} ({}) <{}>",
                Local::now().format("%H:%M:%S"),
                message.sender,
                message.message_type,
                avatar_url_with_base(&self.avatar_base_url, &message.sender)
            )
        ];
        lines.extend(message.content.lines().map(|l| format!("    {}", l)));
        if !message.next_speaker.is_empty() {
            lines.push(format!("    Next Speaker: {}", message.next_speaker_display()));
        }
        if !message.updated_plan.is_empty() {
            lines.push(format!("    Updated Plan: {}", message.updated_plan));
        }
        lines
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn viewport(&self) -> Option<ViewportMetrics> {
        // Output always follows the newest line.
        Some(ViewportMetrics { scroll_top: 0.0, scroll_height: 0.0, client_height: 0.0 })
    }

    fn render_conversations(&mut self, conversations: &[Conversation], selected: Option<&str>) {
        for conversation in conversations {
            let current = (
                conversation.display_name.clone(),
                conversation.latest_message_preview.clone(),
            );
            if self.previews.get(&conversation.id) == Some(&current) {
                continue;
            }
            let marker = if selected == Some(conversation.id.as_str()) { "*" } else { "-" };
            let line = if current.1.is_empty() {
                format!("{} {} [{}]", marker, current.0, conversation.id)
            } else {
                format!("{} {} [{}] {}", marker, current.0, conversation.id, current.1)
            };
            self.emit(&line);
            self.previews.insert(conversation.id.clone(), current);
        }
    }

    fn render_messages(&mut self, pane: MessagePane<'_>, _scroll_to_bottom: bool) {
        let goal_shown = match self.headers.get(pane.comm_id) {
            Some(&shown) => shown,
            None => {
                self.emit(&format!("=== {} ===", pane.title));
                false
            }
        };
        if let (false, Some(goal)) = (goal_shown, pane.goal) {
            self.emit(&format!("Goal: {}", goal));
        }
        self.headers.insert(pane.comm_id.to_string(), goal_shown || pane.goal.is_some());

        let already = self.printed.get(pane.comm_id).copied().unwrap_or(0);
        for message in pane.messages.iter().skip(already) {
            for line in self.format_message(message) {
                self.emit(&line);
            }
        }
        self.printed.insert(pane.comm_id.to_string(), pane.messages.len().max(already));
    }

    fn render_channel_state(&mut self, state: ChannelState) {
        match state {
            ChannelState::Failed => {
                self.emit("!!! Live updates unavailable: could not reach the server");
            }
            ChannelState::Connected => self.emit("*** Live updates connected"),
            ChannelState::Connecting | ChannelState::Disconnected => {}
        }
    }
}
