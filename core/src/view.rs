//! Plain-text view layer.
//!
//! Rendering is stateless: each function takes the state it shows and
//! returns a `String`. Input goes the other way: `parse_command` turns a
//! shell line into a `Command`, and `to_intent` resolves its 1-based
//! positions against the visible (filtered) list into a reconciler `Intent`.

use std::fmt::Write as _;

use chrono::DateTime;
use uuid::Uuid;

use crate::clock::Clock;
use crate::detail::DetailView;
use crate::reconciler::{Intent, TodoList};
use crate::store::TodoStore;
use crate::types::{FilterType, Todo};

pub const HELP: &str = "\
commands:
  add <title>        add a todo
  toggle <n>         toggle todo n
  edit <n> <title>   rename todo n
  rm <n>             delete todo n
  clear              delete all completed todos
  mv <from> <to>     move todo <from> to position <to>
  filter <f>         show all, active or completed
  show <n>           show details of todo n
  reload             reload from the server
  help               show this help
  quit               leave";

pub const DETAIL_HELP: &str = "\
detail commands:
  title <text>       save a new title and go back
  toggle             toggle completion
  rm                 delete this todo and go back
  back               return to the list";

/// A parsed shell line. Positions are 1-based indexes into the visible list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(String),
    Toggle(usize),
    Edit(usize, String),
    Remove(usize),
    Clear,
    Move { from: usize, to: usize },
    Filter(FilterType),
    Show(usize),
    Reload,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("`{0}` needs {1}")]
    MissingArgument(&'static str, &'static str),
    #[error("`{0}` is not a position")]
    BadPosition(String),
    #[error("no todo at position {0}")]
    NoSuchPosition(usize),
    #[error(transparent)]
    BadFilter(#[from] crate::types::ParseFilterError),
}

fn position(arg: Option<&str>, command: &'static str) -> Result<usize, CommandError> {
    let arg = arg.ok_or(CommandError::MissingArgument(command, "a position"))?;
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CommandError::BadPosition(arg.to_string())),
    }
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let mut args = rest.split_whitespace();

    match word {
        "" => Err(CommandError::Empty),
        "add" | "a" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument("add", "a title"));
            }
            Ok(Command::Add(rest.to_string()))
        }
        "toggle" | "t" => Ok(Command::Toggle(position(args.next(), "toggle")?)),
        "edit" | "e" => {
            let n = position(args.next(), "edit")?;
            let title = rest
                .split_once(char::is_whitespace)
                .map(|(_, title)| title.trim())
                .unwrap_or("");
            if title.is_empty() {
                return Err(CommandError::MissingArgument("edit", "a title"));
            }
            Ok(Command::Edit(n, title.to_string()))
        }
        "rm" | "delete" => Ok(Command::Remove(position(args.next(), "rm")?)),
        "clear" => Ok(Command::Clear),
        "mv" | "move" => {
            let from = position(args.next(), "mv")?;
            let to = position(args.next(), "mv")?;
            Ok(Command::Move { from, to })
        }
        "filter" | "f" => {
            let name = args.next().ok_or(CommandError::MissingArgument("filter", "a filter"))?;
            Ok(Command::Filter(name.parse()?))
        }
        "show" | "s" => Ok(Command::Show(position(args.next(), "show")?)),
        "reload" | "r" => Ok(Command::Reload),
        "help" | "?" => Ok(Command::Help),
        "quit" | "q" | "exit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

/// A line typed while a detail view is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailCommand {
    Title(String),
    Toggle,
    Delete,
    Back,
    Help,
}

pub fn parse_detail_command(line: &str) -> Result<DetailCommand, CommandError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    match word {
        "" => Err(CommandError::Empty),
        "title" | "edit" | "e" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument("title", "a title"));
            }
            Ok(DetailCommand::Title(rest.to_string()))
        }
        "toggle" | "t" => Ok(DetailCommand::Toggle),
        "rm" | "delete" => Ok(DetailCommand::Delete),
        "back" | "b" | "q" | "quit" => Ok(DetailCommand::Back),
        "help" | "?" => Ok(DetailCommand::Help),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

/// The id shown at 1-based position `n` of the visible list.
pub fn visible_id<S: TodoStore, C: Clock>(list: &TodoList<S, C>, n: usize) -> Result<Uuid, CommandError> {
    n.checked_sub(1)
        .and_then(|i| list.visible().nth(i))
        .map(|t| t.id)
        .ok_or(CommandError::NoSuchPosition(n))
}

/// Resolve a command into an intent. `Show`, `Help` and `Quit` are handled
/// by the caller and resolve to `None`.
///
/// `mv` positions refer to the visible list; they are mapped onto the
/// underlying collection so moving within a filtered view lands next to the
/// item that was shown at the target position.
pub fn to_intent<S: TodoStore, C: Clock>(
    list: &TodoList<S, C>,
    command: &Command,
) -> Result<Option<Intent>, CommandError> {
    let intent = match command {
        Command::Add(title) => Intent::Add(title.clone()),
        Command::Toggle(n) => Intent::Toggle(visible_id(list, *n)?),
        Command::Edit(n, title) => Intent::Rename {
            id: visible_id(list, *n)?,
            title: title.clone(),
        },
        Command::Remove(n) => Intent::Remove(visible_id(list, *n)?),
        Command::Clear => Intent::ClearCompleted,
        Command::Move { from, to } => {
            let source = visible_id(list, *from)?;
            let from = list.position(source).ok_or(CommandError::NoSuchPosition(*from))?;
            let to = match visible_id(list, *to) {
                Ok(target) => list.position(target),
                Err(_) => Some(list.len()),
            };
            Intent::Reorder { from, to }
        }
        Command::Filter(filter) => Intent::SetFilter(*filter),
        Command::Reload => Intent::Load,
        Command::Show(_) | Command::Help | Command::Quit => return Ok(None),
    };
    Ok(Some(intent))
}

/// `2024-05-01T10:00:00.000Z` → `2024-05-01`; anything unparsable as-is.
fn short_date(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

fn long_date(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

pub fn render_filters(current: FilterType) -> String {
    FilterType::ALL
        .iter()
        .map(|f| {
            if *f == current {
                format!("[{f}]")
            } else {
                format!(" {f} ")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_item(n: usize, todo: &Todo) -> String {
    let mark = if todo.completed { 'x' } else { ' ' };
    let mut line = format!("{n:>3}. [{mark}] {}", todo.title);
    if todo.completed && !todo.completed_at.is_empty() {
        let _ = write!(line, "  (completed {})", short_date(&todo.completed_at));
    }
    line
}

pub fn render_list<S: TodoStore, C: Clock>(list: &TodoList<S, C>) -> String {
    let mut out = render_filters(list.filter());
    out.push('\n');

    let mut shown = 0;
    for (i, todo) in list.visible().enumerate() {
        out.push_str(&render_item(i + 1, todo));
        out.push('\n');
        shown += 1;
    }
    if shown == 0 {
        out.push_str("  nothing to show\n");
    }

    let counts = list.counts();
    let _ = write!(out, "{} active, {} completed", counts.active, counts.completed);
    if list.has_completed() {
        out.push_str(" · `clear` removes completed");
    }
    out
}

pub fn render_detail<S: TodoStore, C: Clock>(view: &DetailView<'_, S, C>) -> String {
    let todo = view.todo();
    let mut out = String::new();
    let _ = writeln!(out, "Title:   {}", todo.title);
    if view.draft() != todo.title {
        let _ = writeln!(out, "Draft:   {}", view.draft());
    }
    let status = if todo.completed { "Completed" } else { "Active" };
    let _ = writeln!(out, "Status:  {status}");
    if todo.completed && !todo.completed_at.is_empty() {
        let _ = writeln!(out, "Done at: {}", long_date(&todo.completed_at));
    }
    if !todo.created_at.is_empty() {
        let _ = writeln!(out, "Created: {}", long_date(&todo.created_at));
    }
    let _ = write!(out, "Id:      {}", todo.id);
    out
}
