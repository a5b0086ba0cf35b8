//! Chat command - open a widget session and render it in the terminal.

use std::io::Write;

use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, warn};

use cw_core::config::AppConfig;
use cw_core::error::CwResult;
use cw_core::platform::Platform;
use cw_session::{ConnectionState, RenderedMessage, Sender, ViewUpdate, Widget};
use cw_socket::WsTransport;

use super::truncate;

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput {
    Message(String),
    Skip,
    Feedback { number: usize, helpful: bool },
    Reopen,
    Quit,
    Help,
    Empty,
    Invalid(String),
}

impl ChatInput {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Message(line.to_string());
        };

        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("quit" | "exit"), None) => Self::Quit,
            (Some("skip"), None) => Self::Skip,
            (Some("reopen"), None) => Self::Reopen,
            (Some("help"), None) => Self::Help,
            (Some(verb @ ("good" | "bad")), Some(n)) => match n.parse::<usize>() {
                Ok(number) if number > 0 => Self::Feedback {
                    number,
                    helpful: verb == "good",
                },
                _ => Self::Invalid(format!("not a message number: {n}")),
            },
            _ => Self::Invalid(format!("unknown command: /{command}")),
        }
    }
}

/// Where the reply being revealed stands on the terminal.
#[derive(Debug, Default, PartialEq, Eq)]
enum StreamLine {
    #[default]
    Idle,
    /// Revealing on the current line; holds what is printed so far.
    Printing(String),
    /// Other output landed in between; the reply is printed whole on commit.
    Interrupted,
}

#[derive(Default)]
struct Screen {
    stream: StreamLine,
    /// Set by `StreamEnded`: the next commit is the revealed reply.
    ending: bool,
}

impl Screen {
    fn render(&mut self, update: ViewUpdate) {
        match update {
            ViewUpdate::Connection(state) => {
                self.interrupt();
                let label = format!("[{state}]");
                let label = match state {
                    ConnectionState::Open => style(label).green(),
                    ConnectionState::Reconnecting | ConnectionState::Connecting => style(label).yellow(),
                    ConnectionState::Closed => style(label).red(),
                    _ => style(label).dim(),
                };
                println!("  {label}");
            }
            ViewUpdate::Typing(true) => {
                self.interrupt();
                println!("  {}", style("bot is typing...").dim().italic());
            }
            ViewUpdate::Typing(false) => {}
            ViewUpdate::StreamStarted => {
                self.interrupt();
                print!("  {} ", style("bot:").cyan().bold());
                self.stream = StreamLine::Printing(String::new());
                flush();
            }
            ViewUpdate::StreamProgress(text) => {
                if let StreamLine::Printing(printed) = &mut self.stream {
                    if let Some(rest) = text.strip_prefix(printed.as_str()) {
                        print!("{rest}");
                        flush();
                    }
                    *printed = text;
                }
            }
            ViewUpdate::StreamEnded => self.ending = true,
            ViewUpdate::Committed { index, message } => self.committed(index, &message),
        }
    }

    fn committed(&mut self, index: usize, message: &RenderedMessage) {
        if std::mem::take(&mut self.ending) {
            self.finish_stream(message);
        } else {
            self.interrupt();
            if message.sender == Sender::User {
                // Already on screen as typed
                return;
            }
            print_line(message);
        }

        for (i, source) in message.sources.iter().enumerate() {
            let title = truncate(&source.display_title(i), 60);
            match source.url.as_deref() {
                Some(url) => println!("    {} {title} <{url}>", style(format!("[{}]", i + 1)).dim()),
                None => println!("    {} {title}", style(format!("[{}]", i + 1)).dim()),
            }
        }
        if message.feedback_enabled {
            println!(
                "    {}",
                style(format!(
                    "#{} {}  /good {} or /bad {}",
                    index + 1,
                    message.display_time(),
                    index + 1,
                    index + 1
                ))
                .dim()
            );
        }
    }

    fn finish_stream(&mut self, message: &RenderedMessage) {
        match std::mem::take(&mut self.stream) {
            StreamLine::Printing(printed) if message.text.starts_with(&printed) => {
                println!("{}", &message.text[printed.len()..]);
            }
            StreamLine::Printing(_) => {
                println!();
                print_line(message);
            }
            StreamLine::Interrupted | StreamLine::Idle => print_line(message),
        }
    }

    /// Move off a partially printed reply before printing something else.
    fn interrupt(&mut self) {
        if matches!(self.stream, StreamLine::Printing(_)) {
            println!();
            self.stream = StreamLine::Interrupted;
        }
    }
}

fn print_line(message: &RenderedMessage) {
    let who = match message.sender {
        Sender::Bot => style("bot:").cyan().bold(),
        Sender::User => style("you:").bold(),
        Sender::System => style("system:").magenta().bold(),
    };
    println!("  {who} {}", message.text);
}

fn flush() {
    let _ = std::io::stdout().flush();
}

fn print_help() {
    println!("  {}", style("Commands:").bold());
    println!("    /skip       show the current reply in full");
    println!("    /good N     rate reply #N as helpful");
    println!("    /bad N      rate reply #N as not helpful");
    println!("    /reopen     close the session and connect again");
    println!("    /quit       close the widget");
}

/// Run the chat command.
pub async fn run(
    mut config: AppConfig,
    url: Option<String>,
    room: Option<String>,
    theme: Option<String>,
) -> CwResult<()> {
    if let Some(url) = url {
        config.widget.api_url = url;
    }
    if let Some(room) = room {
        config.widget.room_key = room;
    }
    if let Some(theme) = theme {
        config.widget.theme = theme.parse()?;
    }

    println!(
        "{} Connecting to {} (room {})...",
        style(">>").bold().dim(),
        config.widget.api_url,
        config.widget.effective_room_key()
    );

    let mut widget = Widget::new(config);
    let mut updates = widget.subscribe();
    let theme = widget.open(WsTransport::new(), Platform::preferred_color_scheme())?;
    println!(
        "  Theme: {theme}. Type a message and press Enter. {} for commands, Ctrl+C to quit.",
        style("/help").bold()
    );
    println!();

    let mut screen = Screen::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(update) => screen.render(update),
                Err(RecvError::Lagged(n)) => {
                    println!("  {} Missed {n} updates (slow terminal)", style("WARN").yellow());
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => match line {
                Ok(Some(line)) => match ChatInput::parse(&line) {
                    ChatInput::Message(text) => widget.submit(text),
                    ChatInput::Skip => widget.skip_stream(),
                    ChatInput::Feedback { number, helpful } => {
                        widget.give_feedback(number - 1, helpful)
                    }
                    ChatInput::Reopen => {
                        println!("  Reopening...");
                        widget.close().await;
                        if let Err(e) = widget.open(WsTransport::new(), Platform::preferred_color_scheme()) {
                            println!("  {} {e}", style("ERROR").red().bold());
                        }
                    }
                    ChatInput::Help => print_help(),
                    ChatInput::Quit => break,
                    ChatInput::Empty => {}
                    ChatInput::Invalid(reason) => {
                        println!("  {} {reason}", style("??").yellow());
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    error!("failed to read input: {e}");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    println!("\n  Closing...");
    widget.close().await;
    while let Ok(update) = updates.try_recv() {
        screen.render(update);
    }

    let messages = widget.messages().await;
    if messages.is_empty() {
        warn!("session ended without any messages");
    }
    println!(
        "  {} {} message(s) in this conversation.",
        style("OK").green().bold(),
        messages.len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_message() {
        assert_eq!(
            ChatInput::parse("  Merhaba  "),
            ChatInput::Message("Merhaba".into())
        );
        assert_eq!(ChatInput::parse("   "), ChatInput::Empty);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ChatInput::parse("/quit"), ChatInput::Quit);
        assert_eq!(ChatInput::parse("/exit"), ChatInput::Quit);
        assert_eq!(ChatInput::parse("/skip"), ChatInput::Skip);
        assert_eq!(ChatInput::parse("/help"), ChatInput::Help);
        assert_eq!(ChatInput::parse("/reopen"), ChatInput::Reopen);
        assert_eq!(
            ChatInput::parse("/good 3"),
            ChatInput::Feedback {
                number: 3,
                helpful: true
            }
        );
        assert_eq!(
            ChatInput::parse("/bad 1"),
            ChatInput::Feedback {
                number: 1,
                helpful: false
            }
        );
    }

    #[test]
    fn test_parse_invalid_commands() {
        assert!(matches!(ChatInput::parse("/good"), ChatInput::Invalid(_)));
        assert!(matches!(ChatInput::parse("/good 0"), ChatInput::Invalid(_)));
        assert!(matches!(ChatInput::parse("/bad x"), ChatInput::Invalid(_)));
        assert!(matches!(ChatInput::parse("/dance"), ChatInput::Invalid(_)));
    }

    #[test]
    fn test_stream_tracks_printed_prefix() {
        let mut screen = Screen::default();
        screen.render(ViewUpdate::StreamStarted);
        screen.render(ViewUpdate::StreamProgress("Mer".into()));
        assert_eq!(screen.stream, StreamLine::Printing("Mer".into()));

        screen.render(ViewUpdate::StreamEnded);
        screen.render(ViewUpdate::Committed {
            index: 0,
            message: RenderedMessage::new(Sender::Bot, "Merhaba"),
        });
        assert_eq!(screen.stream, StreamLine::Idle);
        assert!(!screen.ending);
    }

    #[test]
    fn test_notice_right_after_stream_start_does_not_end_it() {
        let mut screen = Screen::default();
        screen.render(ViewUpdate::StreamStarted);
        screen.render(ViewUpdate::Committed {
            index: 0,
            message: RenderedMessage::new(Sender::Bot, "Welcome!"),
        });
        assert_eq!(screen.stream, StreamLine::Interrupted);

        // Progress after an interruption is held back until the commit
        screen.render(ViewUpdate::StreamProgress("Me".into()));
        assert_eq!(screen.stream, StreamLine::Interrupted);

        screen.render(ViewUpdate::StreamEnded);
        screen.render(ViewUpdate::Committed {
            index: 1,
            message: RenderedMessage::new(Sender::Bot, "Merhaba"),
        });
        assert_eq!(screen.stream, StreamLine::Idle);
    }
}
