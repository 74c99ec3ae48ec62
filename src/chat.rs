use crate::conversation::{Conversation, RelayTransport, Sender};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

const GREETING: &str = "Hello I'm OSM AI. How can I help you today?";
const HELP: &str = "Commands: /new starts a new chat, /dismiss hides the last error, /quit exits.";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    NewChat,
    Dismiss,
    Quit,
    Help,
    Message(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    match line.trim() {
        "/new" => Command::NewChat,
        "/dismiss" => Command::Dismiss,
        "/quit" | "/exit" => Command::Quit,
        "/help" => Command::Help,
        _ => Command::Message(line),
    }
}

/// Prints turns as they are appended. Tracks how far it has printed so
/// only the newest turns are written after each change.
#[derive(Debug, Default)]
pub struct TerminalView {
    rendered: usize,
}

impl TerminalView {
    pub fn render(&mut self, conversation: &Conversation, out: &mut impl Write) -> io::Result<()> {
        let turns = conversation.turns();
        if turns.len() < self.rendered {
            self.rendered = 0;
        }
        if turns.is_empty() {
            if self.rendered == 0 {
                writeln!(out, "{}", GREETING)?;
            }
            return Ok(());
        }
        let end = conversation.scroll_anchor().map_or(0, |i| i + 1);
        for turn in &turns[self.rendered..end] {
            let who = match turn.sender {
                Sender::User => "you",
                Sender::Bot => "bot",
            };
            writeln!(out, "[{}] {}", who, turn.content)?;
        }
        self.rendered = end;
        if let Some(error) = conversation.error() {
            writeln!(out, "! {}", error)?;
        }
        out.flush()
    }
}

pub async fn run_chat<T: RelayTransport>(transport: &T) -> anyhow::Result<()> {
    let mut conversation = Conversation::new();
    let mut view = TerminalView::default();
    let mut stdout = io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    writeln!(stdout, "{}", HELP)?;
    view.render(&conversation, &mut stdout)?;

    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Quit => break,
            Command::Help => writeln!(stdout, "{}", HELP)?,
            Command::Dismiss => conversation.dismiss_error(),
            Command::NewChat => {
                info!("Starting a new chat");
                conversation.reset();
                view.rendered = 0;
                view.render(&conversation, &mut stdout)?;
            }
            Command::Message(text) => {
                let Some(request) = conversation.begin_submit(text) else {
                    continue;
                };
                view.render(&conversation, &mut stdout)?;
                writeln!(stdout, "... Thinking...")?;
                let result = transport.send(&request).await;
                conversation.finish_submit(result);
                view.render(&conversation, &mut stdout)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render_to_string(view: &mut TerminalView, conversation: &Conversation) -> String {
        let mut out = Vec::new();
        view.render(conversation, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("/new"), Command::NewChat);
        assert_eq!(parse_command(" /quit "), Command::Quit);
        assert_eq!(parse_command("/dismiss"), Command::Dismiss);
        assert_eq!(parse_command("hello /new"), Command::Message("hello /new"));
    }

    #[test]
    fn test_render_prints_only_new_turns() {
        let mut conversation = Conversation::new();
        let mut view = TerminalView::default();
        assert_eq!(render_to_string(&mut view, &conversation), format!("{}\n", GREETING));

        conversation.begin_submit("hi");
        assert_eq!(render_to_string(&mut view, &conversation), "[you] hi\n");

        conversation.finish_submit(Ok(json!({
            "candidates": [{ "content": { "parts": [{ "text": "hello" }] } }]
        })));
        assert_eq!(render_to_string(&mut view, &conversation), "[bot] hello\n");
    }

    #[test]
    fn test_render_after_reset_shows_greeting_again() {
        let mut conversation = Conversation::new();
        let mut view = TerminalView::default();
        conversation.begin_submit("hi");
        render_to_string(&mut view, &conversation);

        conversation.reset();
        assert_eq!(render_to_string(&mut view, &conversation), format!("{}\n", GREETING));
    }
}
