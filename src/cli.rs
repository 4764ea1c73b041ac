//! Line-oriented command front end.
//!
//! One input line is split shell-style, parsed into a [`Command`] and run
//! against the calendar by a [`Session`]. Everything typed, and every error
//! shown, is also recorded in the activity history.

use std::io::{self, BufRead, Write};

use chrono::Utc;
use thiserror::Error;

use crate::{
    calendar::{Calendar, CalendarError},
    event::{Event, EventError},
    history::SharedActivityLog,
};

const HELP: &str = "\
Available commands:
  Add an event:          add \"title\" \"YYYY-MM-DD HH:MM\" high|medium|low
  Remove an event:       remove \"event id\"
  Update an event:       update \"event id\" \"title\" \"YYYY-MM-DD HH:MM\" high|medium|low
  List events:           list
  Set a reminder:        reminder \"event id\" \"message\" \"YYYY-MM-DD HH:MM\"
  Cancel a reminder:     cancel-reminder \"event id\"
  Show history:          history
  Quit:                  exit";

/// Input that could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CliError {
    /// A quote was opened and never closed.
    #[error("unterminated quote")]
    UnterminatedQuote,
    /// Line ends with a lone backslash.
    #[error("trailing escape character")]
    TrailingEscape,
    /// Too few arguments; carries the expected form.
    #[error("usage: {0}")]
    Usage(&'static str),
    /// First word is not a known command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

/// Splits a line on whitespace, honouring single quotes, double quotes and
/// backslash escapes.
pub fn split_args(line: &str) -> Result<Vec<String>, CliError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(CliError::UnterminatedQuote),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\')) => current.push(c),
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            }
                            None => return Err(CliError::UnterminatedQuote),
                        },
                        Some(c) => current.push(c),
                        None => return Err(CliError::UnterminatedQuote),
                    }
                }
            }
            '\\' => {
                in_word = true;
                current.push(chars.next().ok_or(CliError::TrailingEscape)?);
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        args.push(current);
    }
    Ok(args)
}

/// A parsed front-end command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `add <title> <date> <priority>`
    Add {
        /// Event title.
        title: String,
        /// Start date text.
        date: String,
        /// Priority text.
        priority: String,
    },
    /// `remove <id>`
    Remove {
        /// Event id.
        id: String,
    },
    /// `update <id> <title> <date> <priority>`
    Update {
        /// Event id.
        id: String,
        /// New title.
        title: String,
        /// New start date text.
        date: String,
        /// New priority text.
        priority: String,
    },
    /// `list`
    List,
    /// `reminder <id> <message> <date>`
    Reminder {
        /// Event id.
        id: String,
        /// Reminder text.
        message: String,
        /// Fire date text.
        date: String,
    },
    /// `cancel-reminder <id>`
    CancelReminder {
        /// Event id.
        id: String,
    },
    /// `history`
    History,
    /// `help`
    Help,
    /// `exit`
    Exit,
}

impl Command {
    /// Parses split arguments. Returns `Ok(None)` for an empty line.
    pub fn parse(args: &[String]) -> Result<Option<Self>, CliError> {
        let Some(word) = args.first() else {
            return Ok(None);
        };
        let arg = |i: usize, usage: &'static str| args.get(i).cloned().ok_or(CliError::Usage(usage));

        let cmd = match word.to_lowercase().as_str() {
            "add" => {
                const USAGE: &str = "add \"title\" \"date and time\" \"priority\"";
                Self::Add {
                    title: arg(1, USAGE)?,
                    date: arg(2, USAGE)?,
                    priority: arg(3, USAGE)?,
                }
            }
            "remove" => Self::Remove {
                id: arg(1, "remove \"event id\"")?,
            },
            "update" => {
                const USAGE: &str = "update \"event id\" \"title\" \"date and time\" \"priority\"";
                Self::Update {
                    id: arg(1, USAGE)?,
                    title: arg(2, USAGE)?,
                    date: arg(3, USAGE)?,
                    priority: arg(4, USAGE)?,
                }
            }
            "list" => Self::List,
            "reminder" => {
                const USAGE: &str = "reminder \"event id\" \"message\" \"date and time\"";
                Self::Reminder {
                    id: arg(1, USAGE)?,
                    message: arg(2, USAGE)?,
                    date: arg(3, USAGE)?,
                }
            }
            "cancel-reminder" => Self::CancelReminder {
                id: arg(1, "cancel-reminder \"event id\"")?,
            },
            "history" => Self::History,
            "help" => Self::Help,
            "exit" => Self::Exit,
            other => return Err(CliError::UnknownCommand(other.to_string())),
        };
        Ok(Some(cmd))
    }
}

/// Whether the read loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// `exit` was entered.
    Exit,
}

/// Runs commands against a calendar and records them in the history.
pub struct Session {
    calendar: Calendar,
    history: SharedActivityLog,
}

impl Session {
    /// Session over `calendar`, recording into `history`.
    pub fn new(calendar: Calendar, history: SharedActivityLog) -> Self {
        Self { calendar, history }
    }

    /// The calendar being driven.
    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Ends the session, handing the calendar back for shutdown.
    pub fn into_calendar(self) -> Calendar {
        self.calendar
    }

    /// Prompts and executes lines from `input` until `exit` or end of input.
    ///
    /// An I/O error ends the loop and is returned; the calendar stays in the
    /// session so the caller can still shut it down.
    pub fn run(&mut self, input: impl BufRead, out: &mut impl Write) -> io::Result<()> {
        let mut lines = input.lines();
        loop {
            write!(out, "> ")?;
            out.flush()?;
            let Some(line) = lines.next() else {
                return Ok(());
            };
            if self.execute(line?.trim(), out)? == Flow::Exit {
                return Ok(());
            }
        }
    }

    /// Executes one input line, writing user-facing output to `out`.
    pub fn execute(&mut self, line: &str, out: &mut impl Write) -> io::Result<Flow> {
        let args = match split_args(line) {
            Ok(args) => args,
            Err(err) => {
                writeln!(out, "Could not parse command: {err}")?;
                return Ok(Flow::Continue);
            }
        };
        if args.is_empty() {
            return Ok(Flow::Continue);
        }

        log::info!("command: {line}");
        self.record(line);

        let command = match Command::parse(&args) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Flow::Continue),
            Err(CliError::UnknownCommand(word)) => {
                writeln!(out, "Unknown command: {word}")?;
                writeln!(out, "Type 'help' for the list of commands")?;
                return Ok(Flow::Continue);
            }
            Err(err) => {
                writeln!(out, "{err}")?;
                return Ok(Flow::Continue);
            }
        };

        self.dispatch(command, out)
    }

    fn dispatch(&mut self, command: Command, out: &mut impl Write) -> io::Result<Flow> {
        match command {
            Command::Add { title, date, priority } => match self.calendar.add_event(&title, &date, &priority) {
                Ok(event) => writeln!(out, "Event {:?} added with id {}", event.title(), event.id())?,
                Err(err) => {
                    log::error!("adding event (title: {title}, date: {date}, priority: {priority}) failed: {err}");
                    self.report(&err, out)?;
                }
            },
            Command::Remove { id } => match self.calendar.delete_event(&id) {
                Ok(()) => writeln!(out, "Event {id} removed")?,
                Err(err) => {
                    log::error!("removing event {id} failed: {err}");
                    self.report(&err, out)?;
                }
            },
            Command::Update { id, title, date, priority } => {
                match self.calendar.edit_event(&id, &title, &date, &priority) {
                    Ok(()) => writeln!(out, "Event {id} updated")?,
                    Err(err) => {
                        log::error!("updating event {id} (title: {title}, date: {date}, priority: {priority}) failed: {err}");
                        self.report(&err, out)?;
                    }
                }
            }
            Command::List => {
                let mut events: Vec<Event> = self.calendar.get_events().into_values().collect();
                if events.is_empty() {
                    writeln!(out, "No events")?;
                }
                events.sort_by(|a, b| a.start_at().cmp(&b.start_at()).then_with(|| a.title().cmp(b.title())));
                for event in &events {
                    writeln!(out, "{event}")?;
                }
            }
            Command::Reminder { id, message, date } => {
                match self.calendar.set_event_reminder(&id, &message, &date) {
                    Ok(()) => writeln!(out, "Reminder for event {id} set")?,
                    Err(err) => {
                        log::error!("setting reminder (id: {id}, message: {message}, at: {date}) failed: {err}");
                        self.report(&err, out)?;
                    }
                }
            }
            Command::CancelReminder { id } => match self.calendar.cancel_event_reminder(&id) {
                Ok(()) => writeln!(out, "Reminder for event {id} cancelled")?,
                Err(err) => self.report(&err, out)?,
            },
            Command::History => {
                let history = self.history.lock();
                for entry in history.entries() {
                    writeln!(out, "{entry}")?;
                }
            }
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Exit => {
                log::info!(target: "system", "app is closing");
                return Ok(Flow::Exit);
            }
        }
        Ok(Flow::Continue)
    }

    fn report(&self, err: &CalendarError, out: &mut impl Write) -> io::Result<()> {
        self.record(&err.to_string());
        match err {
            CalendarError::Event(EventError::InvalidTitle(title)) => writeln!(
                out,
                "Error: invalid title {title:?}. It must contain between 3 and 50 letters, digits and spaces."
            ),
            CalendarError::Event(EventError::InvalidDate(_)) => {
                writeln!(out, "Error: invalid date. Please use the format YYYY-MM-DD HH:MM")
            }
            CalendarError::Event(EventError::InvalidPriority(_)) => {
                writeln!(out, "Error: invalid priority. Please use 'high', 'medium', or 'low'.")
            }
            CalendarError::Event(EventError::EmptyMessage) => {
                writeln!(out, "Error: can't set a reminder with an empty message")
            }
            other => writeln!(out, "Error: {other}"),
        }
    }

    fn record(&self, message: &str) {
        if let Err(err) = self.history.lock().record(message, Utc::now()) {
            log::error!("saving history failed: {err}");
        }
    }
}
