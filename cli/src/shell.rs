//! Line-oriented interactive session over a loaded `TodoList`.

use std::io::{self, BufRead, Write};

use todo_core::view::{
    self, parse_command, parse_detail_command, render_detail, render_list, Command, DetailCommand,
};
use todo_core::{Clock, DetailView, Navigation, Outcome, Todo, TodoList, TodoStore};
use uuid::Uuid;

/// What happened to the todo while its detail view was open.
enum DetailExit {
    Unchanged,
    Changed(Todo),
    Deleted(Uuid),
    /// Input ran out.
    Eof,
}

pub fn run<S, C, R, W>(list: &mut TodoList<S, C>, mut input: R, mut out: W) -> io::Result<()>
where
    S: TodoStore,
    C: Clock,
    R: BufRead,
    W: Write,
{
    writeln!(out, "{}", render_list(list))?;
    let mut line = String::new();
    loop {
        write!(out, "> ")?;
        out.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(());
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(view::CommandError::Empty) => continue,
            Err(e) => {
                writeln!(out, "error: {e}")?;
                continue;
            }
        };

        match command {
            Command::Quit => return Ok(()),
            Command::Help => {
                writeln!(out, "{}", view::HELP)?;
                continue;
            }
            Command::Show(n) => {
                let id = match view::visible_id(list, n) {
                    Ok(id) => id,
                    Err(e) => {
                        writeln!(out, "error: {e}")?;
                        continue;
                    }
                };
                match detail(list.store(), id, &mut input, &mut out)? {
                    DetailExit::Changed(todo) => {
                        list.replace(todo);
                    }
                    DetailExit::Deleted(id) => {
                        list.forget(id);
                    }
                    DetailExit::Unchanged => {}
                    DetailExit::Eof => return Ok(()),
                }
            }
            command => {
                let intent = match view::to_intent(list, &command) {
                    Ok(Some(intent)) => intent,
                    Ok(None) => continue,
                    Err(e) => {
                        writeln!(out, "error: {e}")?;
                        continue;
                    }
                };
                match list.dispatch(intent) {
                    Ok(Outcome::Cleared(report)) => {
                        for (id, e) in &report.failed {
                            writeln!(out, "warning: server kept {id}: {e}")?;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => writeln!(out, "error: {e}")?,
                }
            }
        }
        writeln!(out, "{}", render_list(list))?;
    }
}

fn detail<S, R, W>(store: &S, id: Uuid, input: &mut R, out: &mut W) -> io::Result<DetailExit>
where
    S: TodoStore,
    R: BufRead,
    W: Write,
{
    let mut view = match DetailView::open(store, id) {
        Ok(view) => view,
        Err(e) => {
            writeln!(out, "error: {e}")?;
            return Ok(DetailExit::Unchanged);
        }
    };
    let original = view.todo().clone();
    let mut line = String::new();

    loop {
        writeln!(out, "{}", render_detail(&view))?;
        write!(out, "detail> ")?;
        out.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(DetailExit::Eof);
        }

        let command = match parse_detail_command(&line) {
            Ok(command) => command,
            Err(view::CommandError::Empty) => continue,
            Err(e) => {
                writeln!(out, "error: {e}")?;
                continue;
            }
        };

        match command {
            DetailCommand::Help => writeln!(out, "{}", view::DETAIL_HELP)?,
            DetailCommand::Title(title) => {
                view.set_draft(title);
                match view.update_title() {
                    Ok(Navigation::Back) => break,
                    Ok(Navigation::Stay) => writeln!(out, "error: title must not be blank")?,
                    Err(e) => writeln!(out, "error: {e}")?,
                }
            }
            DetailCommand::Toggle => {
                if let Err(e) = view.toggle_complete() {
                    writeln!(out, "error: {e}")?;
                }
            }
            DetailCommand::Delete => {
                let todo = view.todo().clone();
                let (_, result) = view.delete();
                return match result {
                    Ok(()) => Ok(DetailExit::Deleted(id)),
                    Err(e) => {
                        writeln!(out, "error: {e}")?;
                        Ok(exit_with(original, todo))
                    }
                };
            }
            DetailCommand::Back => break,
        }
    }

    Ok(exit_with(original, view.todo().clone()))
}

fn exit_with(original: Todo, todo: Todo) -> DetailExit {
    if todo == original {
        DetailExit::Unchanged
    } else {
        DetailExit::Changed(todo)
    }
}
