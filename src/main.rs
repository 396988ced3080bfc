use chrono::{Local, TimeZone};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use eyre::Result;
use recordbook::{Collection, Config, Filter, Record, RecordId, Schema, Selection, StoreError};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use tracing::{Level, debug};

#[derive(Parser)]
#[command(name = "recordbook")]
#[command(about = "RecordBook CLI - contact book and to-do list backed by JSONL or SQLite")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the data directory from config
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the contact book
    Contacts {
        #[command(subcommand)]
        action: ContactAction,
    },

    /// Manage the to-do list
    Tasks {
        #[command(subcommand)]
        action: TaskAction,
    },
}

#[derive(Subcommand)]
enum ContactAction {
    /// Add a contact (name and phone are required)
    Add(ContactFields),

    /// List contacts, optionally filtered by name or phone
    List {
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Replace every field of a contact
    Update {
        id: RecordId,
        #[command(flatten)]
        fields: ContactFields,
    },

    /// Delete a contact
    Delete {
        id: RecordId,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args)]
struct ContactFields {
    #[arg(long)]
    name: String,
    #[arg(long)]
    phone: String,
    #[arg(long, default_value = "")]
    email: String,
    #[arg(long, default_value = "")]
    address: String,
}

impl ContactFields {
    fn pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("name", self.name.as_str()),
            ("phone", self.phone.as_str()),
            ("email", self.email.as_str()),
            ("address", self.address.as_str()),
        ]
    }
}

#[derive(Subcommand)]
enum TaskAction {
    /// Add a task
    Add { description: String },

    /// List tasks
    List {
        /// Only completed tasks
        #[arg(long, conflicts_with = "pending")]
        done: bool,
        /// Only tasks still ongoing
        #[arg(long)]
        pending: bool,
    },

    /// Change a task's description
    Edit { id: RecordId, description: String },

    /// Flip a task between ongoing and done
    Toggle { id: RecordId },

    /// Delete a task
    Delete {
        id: RecordId,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Asks the user to confirm a destructive action
type Confirm<'a> = &'a mut dyn FnMut(&str) -> Result<bool>;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        report(&e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    // Setup tracing
    let level = match cli.verbose {
        0 => config.level()?,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
    debug!(data_dir = ?config.data_dir, backend = ?config.backend, "Starting");

    match cli.command {
        Commands::Contacts { action } => run_contacts(&config, action),
        Commands::Tasks { action } => run_tasks(&config, action),
    }
}

fn run_contacts(config: &Config, action: ContactAction) -> Result<()> {
    let mut contacts = Collection::open(config, Schema::contacts())?;
    contacts_action(&mut contacts, action, &mut confirm_on_stdin, &mut io::stdout())
}

fn run_tasks(config: &Config, action: TaskAction) -> Result<()> {
    let mut tasks = Collection::open(config, Schema::tasks())?;
    tasks_action(&mut tasks, action, &mut confirm_on_stdin, &mut io::stdout())
}

fn contacts_action(
    contacts: &mut Collection,
    action: ContactAction,
    confirm: Confirm<'_>,
    out: &mut dyn Write,
) -> Result<()> {
    let mut selection = Selection::new();

    match action {
        ContactAction::Add(fields) => {
            let record = contacts.store.add(fields.pairs())?;
            contacts.save()?;
            writeln!(out, "{} {}", "Contact added:".green(), record.id())?;
        }
        ContactAction::List { search } => {
            let query = search.as_deref().map(str::trim).unwrap_or_default();
            if query.is_empty() {
                let all = contacts.store.list(&[]);
                if all.is_empty() {
                    writeln!(out, "No contacts yet!")?;
                }
                for record in &all {
                    write_contact(out, record)?;
                }
            } else {
                let found = contacts.store.list(&[Filter::search(query, &["name", "phone"])]);
                if found.is_empty() {
                    writeln!(out, "No matching contacts.")?;
                }
                for record in &found {
                    write_contact(out, record)?;
                }
            }
        }
        ContactAction::Update { id, fields } => {
            selection.select(&contacts.store, id)?;
            selection.update_selected(&mut contacts.store, fields.pairs())?;
            contacts.save()?;
            writeln!(out, "{}", "Contact updated!".green())?;
        }
        ContactAction::Delete { id, yes } => {
            // Resolve first: a missing record never reaches the prompt
            let target = selection.select(&contacts.store, id)?;
            let name = target.get("name").unwrap_or_default();
            if !yes && !confirm(&format!("Delete {}?", name))? {
                writeln!(out, "Kept {}.", name)?;
                return Ok(());
            }
            selection.delete_selected(&mut contacts.store)?;
            contacts.save()?;
            writeln!(out, "{}", "Contact deleted!".green())?;
        }
    }

    Ok(())
}

fn tasks_action(tasks: &mut Collection, action: TaskAction, confirm: Confirm<'_>, out: &mut dyn Write) -> Result<()> {
    let mut selection = Selection::new();

    match action {
        TaskAction::Add { description } => {
            let record = tasks.store.add([("description", description.as_str())])?;
            tasks.save()?;
            writeln!(
                out,
                "{} '{}' {}",
                "Added".green(),
                record.get("description").unwrap_or_default(),
                record.id()
            )?;
        }
        TaskAction::List { done, pending } => {
            let filters = match (done, pending) {
                (true, _) => vec![Filter::completed(true)],
                (_, true) => vec![Filter::completed(false)],
                _ => Vec::new(),
            };
            let listed = tasks.store.list(&filters);
            if listed.is_empty() {
                if filters.is_empty() {
                    writeln!(out, "No tasks yet!")?;
                } else {
                    writeln!(out, "No matching tasks.")?;
                }
            }
            for record in &listed {
                write_task(out, record)?;
            }
        }
        TaskAction::Edit { id, description } => {
            selection.select(&tasks.store, id)?;
            let record = selection.update_selected(&mut tasks.store, [("description", description.as_str())])?;
            tasks.save()?;
            writeln!(
                out,
                "{} '{}'",
                "Task updated to".green(),
                record.get("description").unwrap_or_default()
            )?;
        }
        TaskAction::Toggle { id } => {
            selection.select(&tasks.store, id)?;
            let record = selection.toggle_selected(&mut tasks.store)?;
            tasks.save()?;
            let status = if record.is_completed() {
                "marked as DONE".green()
            } else {
                "marked as ONGOING again".yellow()
            };
            writeln!(out, "'{}' {}", record.get("description").unwrap_or_default(), status)?;
        }
        TaskAction::Delete { id, yes } => {
            let target = selection.select(&tasks.store, id)?;
            let description = target.get("description").unwrap_or_default();
            if !yes && !confirm(&format!("Remove '{}'? This cannot be undone.", description))? {
                writeln!(out, "Kept '{}'.", description)?;
                return Ok(());
            }
            selection.delete_selected(&mut tasks.store)?;
            tasks.save()?;
            writeln!(out, "'{}' {}", description, "has been removed.".green())?;
        }
    }

    Ok(())
}

fn write_contact(out: &mut dyn Write, record: &Record) -> io::Result<()> {
    writeln!(
        out,
        "{}  {} - {}",
        record.id().to_string().as_str().dimmed(),
        record.get("name").unwrap_or_default().bold(),
        record.get("phone").unwrap_or_default()
    )?;
    for field in ["email", "address"] {
        match record.get(field) {
            Some(value) if !value.is_empty() => writeln!(out, "    {}: {}", field, value)?,
            _ => {}
        }
    }
    Ok(())
}

fn write_task(out: &mut dyn Write, record: &Record) -> io::Result<()> {
    let status = if record.is_completed() {
        "DONE   ".green()
    } else {
        "ONGOING".yellow()
    };
    writeln!(
        out,
        "{}  [{}] {}  {}",
        record.id().to_string().as_str().dimmed(),
        status,
        record.get("description").unwrap_or_default(),
        format_timestamp(record.created_at()).as_str().dimmed()
    )
}

fn format_timestamp(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// Ask a yes/no question on stdin; anything but y/yes declines
fn confirm_on_stdin(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn report(e: &eyre::Report) {
    match e.downcast_ref::<StoreError>() {
        Some(StoreError::Validation(v)) => eprintln!("{} {}", "Input error:".yellow().bold(), v),
        Some(err @ StoreError::NotFound(_)) => eprintln!("{} {}", "Error:".red().bold(), err),
        _ => eprintln!("{} {:#}", "Error:".red().bold(), e),
    }
}
