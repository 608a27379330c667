//! `todo`: command-line front end for the todo backend.
//!
//! One-shot subcommands load the list, apply one action and print the
//! result. `shell` (the default) keeps the list in memory so local-only
//! actions such as reordering stick for the session.

mod shell;

use std::io::Write;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use todo_core::view::{render_detail, render_list};
use todo_core::{
    Clock, DetailView, FilterType, RemoteStore, TodoClient, TodoList, TodoStore, UreqTransport,
    DEFAULT_BASE_URL,
};

#[derive(Parser)]
#[command(name = "todo", version, about = "Manage a todo list stored on a REST backend", long_about = None)]
struct Cli {
    /// Base URL of the todo backend
    #[arg(long, env = "TODO_API_URL", default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    /// Log filter directive (overrides RUST_LOG), e.g. `debug` or `todo_core=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the list
    List {
        /// all, active or completed
        #[arg(long, short, default_value_t = FilterType::All)]
        filter: FilterType,
    },
    /// Add a todo
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Toggle completion of a todo
    Toggle { id: Uuid },
    /// Change the title of a todo
    Rename {
        id: Uuid,
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Delete a todo
    Rm { id: Uuid },
    /// Delete every completed todo
    ClearCompleted,
    /// Show one todo in detail
    Show { id: Uuid },
    /// Interactive session (default)
    Shell,
}

fn init_logging(directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());
    debug!(base_url = %cli.base_url, "using backend");

    let store = RemoteStore::new(TodoClient::new(&cli.base_url), UreqTransport::new());
    let mut list = TodoList::new(store);

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => {
            load(&mut list, &cli.base_url)?;
            let stdin = std::io::stdin();
            shell::run(&mut list, stdin.lock(), std::io::stdout())?;
        }
        command => execute(&mut list, command, &cli.base_url, &mut std::io::stdout())?,
    }
    Ok(())
}

/// Run one non-interactive subcommand against `list`.
fn execute<S, C, W>(list: &mut TodoList<S, C>, command: Commands, base_url: &str, out: &mut W) -> Result<()>
where
    S: TodoStore,
    C: Clock,
    W: Write,
{
    match command {
        Commands::List { filter } => {
            load(list, base_url)?;
            list.set_filter(filter);
            writeln!(out, "{}", render_list(list))?;
        }
        Commands::Add { title } => {
            let title = title.join(" ");
            match list.add(&title).context("adding todo failed")? {
                Some(todo) => writeln!(out, "added {}", todo.id)?,
                None => bail!("title must not be blank"),
            }
        }
        Commands::Toggle { id } => {
            load(list, base_url)?;
            match list.toggle(id).context("toggling todo failed")? {
                Some(todo) if todo.completed => writeln!(out, "completed {}", todo.title)?,
                Some(todo) => writeln!(out, "reopened {}", todo.title)?,
                None => bail!("no todo with id {id}"),
            }
        }
        Commands::Rename { id, title } => {
            load(list, base_url)?;
            let title = title.join(" ");
            if list.get(id).is_none() {
                bail!("no todo with id {id}");
            }
            match list.rename(id, &title).context("renaming todo failed")? {
                Some(todo) => writeln!(out, "renamed to {}", todo.title)?,
                None => bail!("title must not be blank"),
            }
        }
        Commands::Rm { id } => {
            load(list, base_url)?;
            if list.get(id).is_none() {
                bail!("no todo with id {id}");
            }
            list.remove(id).context("deleting todo failed")?;
            writeln!(out, "deleted {id}")?;
        }
        Commands::ClearCompleted => {
            load(list, base_url)?;
            let report = list.clear_completed();
            writeln!(out, "cleared {} completed", report.total())?;
            for (id, err) in &report.failed {
                warn!(%id, error = %err, "server kept completed todo");
                eprintln!("warning: server kept {id}: {err}");
            }
        }
        Commands::Show { id } => {
            let view = DetailView::open(list.store(), id).context("loading todo failed")?;
            writeln!(out, "{}", render_detail(&view))?;
        }
        Commands::Shell => bail!("the shell is interactive"),
    }
    Ok(())
}

fn load<S: TodoStore, C: Clock>(list: &mut TodoList<S, C>, base_url: &str) -> Result<()> {
    list.load()
        .with_context(|| format!("could not load todos from {base_url}"))?;
    Ok(())
}
