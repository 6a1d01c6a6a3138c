//! Noteful CLI - folders, tags and notes backed by a local SQLite database.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use http::header::CONTENT_TYPE;
use http::{Method, Request};
use noteful_api::Api;
use noteful_core::{Note, NoteInput, NoteQuery, NotefulService};
use noteful_sqlite::SqliteDatabase;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "noteful", about = "Folders, tags and notes from the command line", version)]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, env = "NOTEFUL_DB", default_value = "noteful.sqlite", global = true)]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and its schema
    Init {
        /// Delete an existing database first
        #[arg(long)]
        reinitialize: bool,
    },
    /// Work with notes
    #[command(subcommand)]
    Notes(NotesCommand),
    /// Work with folders
    #[command(subcommand)]
    Folders(NamedCommand),
    /// Work with tags
    #[command(subcommand)]
    Tags(NamedCommand),
    /// Send one request through the HTTP route table and print the response
    Api {
        /// Request method, e.g. GET or POST
        method: String,
        /// Request path including any query string, e.g. "/notes?searchTerm=cats"
        path: String,
        /// JSON request body
        #[arg(long, short = 'd')]
        data: Option<String>,
        /// Path prefix the routes are mounted under
        #[arg(long, env = "NOTEFUL_API_PREFIX", default_value = "")]
        prefix: String,
    },
}

#[derive(Subcommand)]
enum NotesCommand {
    /// List notes
    Ls {
        /// Only notes whose title contains this text
        #[arg(long, short = 's')]
        search_term: Option<String>,
        /// Only notes in this folder
        #[arg(long)]
        folder_id: Option<i64>,
        /// Only notes carrying this tag
        #[arg(long)]
        tag_id: Option<i64>,
        /// Number of notes to show (0 for all)
        #[arg(short = 'n', long, default_value = "100")]
        limit: i64,
    },
    /// Show one or more notes as JSON
    Show {
        /// Comma-separated note IDs
        ids: String,
    },
    /// Add a new note
    Add {
        #[arg(long)]
        title: String,
        /// Note content (reads from stdin if not provided)
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        folder_id: Option<i64>,
        /// Comma-separated tag IDs
        #[arg(long)]
        tags: Option<String>,
    },
    /// Edit a note; fields not given keep their current value
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        /// New content (reads from stdin if not provided and stdin is not a tty)
        #[arg(long)]
        content: Option<String>,
        #[arg(long, conflicts_with = "no_folder")]
        folder_id: Option<i64>,
        /// Remove the note from its folder
        #[arg(long)]
        no_folder: bool,
        /// New comma-separated tag IDs, replacing the current tags
        #[arg(long)]
        tags: Option<String>,
    },
    /// Delete one or more notes
    Rm {
        /// Comma-separated note IDs
        ids: String,
    },
}

#[derive(Subcommand)]
enum NamedCommand {
    /// List all entries
    Ls,
    /// Add an entry
    Add { name: String },
    /// Rename an entry
    Rename { id: i64, name: String },
    /// Delete an entry
    Rm { id: i64 },
}

/// Which named resource a [`NamedCommand`] applies to.
#[derive(Clone, Copy)]
enum Named {
    Folder,
    Tag,
}

fn init_logging() {
    // RUST_LOG    - standard env filter (default: "noteful=warn")
    // LOG_FORMAT  - "text" (default) or "json"
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "noteful=warn".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    let json = std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

fn parse_ids(ids: &str) -> Result<Vec<i64>> {
    ids.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().context(format!("Invalid ID: {}", s)))
        .collect()
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read from stdin")?;
    Ok(buf)
}

fn is_stdin_tty() -> bool {
    atty::is(atty::Stream::Stdin)
}

fn open_database(path: &Path) -> Result<SqliteDatabase> {
    debug!(path = %path.display(), "opening database");
    SqliteDatabase::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn open_service(path: &Path) -> Result<NotefulService<SqliteDatabase>> {
    Ok(NotefulService::new(open_database(path)?))
}

/// Create the database at `path`, refusing to touch an existing one unless
/// `reinitialize` is set.
fn init_database(path: &Path, reinitialize: bool) -> Result<()> {
    if path.exists() {
        if !reinitialize {
            bail!(
                "{} already exists. Use --reinitialize to delete and recreate.",
                path.display()
            );
        }
        std::fs::remove_file(path).context("Failed to remove existing database")?;
    }
    open_database(path)?;
    info!(path = %path.display(), "initialized database");
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_summary(note: &Note) -> String {
    let tags: Vec<&str> = note.tags.iter().map(|t| t.name.as_str()).collect();
    let folder = note
        .folder_name
        .as_deref()
        .map(|f| format!(" [{}]", f))
        .unwrap_or_default();
    format!("{}: {}{} ({})", note.id, note.title, folder, tags.join(","))
}

async fn run_notes(service: &NotefulService<SqliteDatabase>, command: NotesCommand) -> Result<()> {
    match command {
        NotesCommand::Ls {
            search_term,
            folder_id,
            tag_id,
            limit,
        } => {
            let query = NoteQuery {
                search_term,
                folder_id,
                tag_id,
                limit: Some(limit),
            };
            for note in service.list_notes(query).await? {
                println!("{}", format_summary(&note));
            }
        }

        NotesCommand::Show { ids } => {
            let ids = parse_ids(&ids)?;
            if ids.is_empty() {
                bail!("No note IDs provided");
            }
            let mut notes = Vec::new();
            for id in ids {
                notes.push(service.get_note(id).await?);
            }
            print_json(&notes)?;
        }

        NotesCommand::Add {
            title,
            content,
            folder_id,
            tags,
        } => {
            let content = match content {
                Some(c) => c,
                None if !is_stdin_tty() => read_stdin()?,
                None => String::new(),
            };
            let tags = tags.map(|t| parse_ids(&t)).transpose()?.unwrap_or_default();
            let note = service
                .create_note(NoteInput {
                    title,
                    content,
                    folder_id,
                    tags,
                })
                .await?;
            println!("Added note {}", note.id);
        }

        NotesCommand::Edit {
            id,
            title,
            content,
            folder_id,
            no_folder,
            tags,
        } => {
            let content = if content.is_none() && !is_stdin_tty() {
                Some(read_stdin()?)
            } else {
                content
            };

            // Updates replace the whole note, so start from its current state
            let current = service.get_note(id).await?;
            let input = NoteInput {
                title: title.unwrap_or(current.title),
                content: content.unwrap_or(current.content),
                folder_id: if no_folder {
                    None
                } else {
                    folder_id.or(current.folder_id)
                },
                tags: match tags {
                    Some(t) => parse_ids(&t)?,
                    None => current.tags.iter().map(|t| t.id).collect(),
                },
            };
            let note = service.update_note(id, input).await?;
            println!("Edited note {}", note.id);
        }

        NotesCommand::Rm { ids } => {
            let ids = parse_ids(&ids)?;
            if ids.is_empty() {
                bail!("No note IDs provided");
            }
            for id in ids {
                service.delete_note(id).await?;
                println!("Deleted note {}", id);
            }
        }
    }
    Ok(())
}

async fn run_named(
    service: &NotefulService<SqliteDatabase>,
    kind: Named,
    command: NamedCommand,
) -> Result<()> {
    let noun = match kind {
        Named::Folder => "folder",
        Named::Tag => "tag",
    };

    match command {
        NamedCommand::Ls => {
            let entries: Vec<(i64, String)> = match kind {
                Named::Folder => service
                    .list_folders()
                    .await?
                    .into_iter()
                    .map(|f| (f.id, f.name))
                    .collect(),
                Named::Tag => service
                    .list_tags()
                    .await?
                    .into_iter()
                    .map(|t| (t.id, t.name))
                    .collect(),
            };
            for (id, name) in entries {
                println!("{}: {}", id, name);
            }
        }
        NamedCommand::Add { name } => {
            let id = match kind {
                Named::Folder => service.create_folder(&name).await?.id,
                Named::Tag => service.create_tag(&name).await?.id,
            };
            println!("Added {} {}", noun, id);
        }
        NamedCommand::Rename { id, name } => {
            let name = match kind {
                Named::Folder => service.update_folder(id, &name).await?.name,
                Named::Tag => service.update_tag(id, &name).await?.name,
            };
            println!("Renamed {} {} to {}", noun, id, name);
        }
        NamedCommand::Rm { id } => {
            match kind {
                Named::Folder => service.delete_folder(id).await?,
                Named::Tag => service.delete_tag(id).await?,
            }
            println!("Deleted {} {}", noun, id);
        }
    }
    Ok(())
}

async fn run_api(
    service: NotefulService<SqliteDatabase>,
    method: &str,
    path: &str,
    data: Option<String>,
    prefix: &str,
) -> Result<()> {
    let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .context(format!("Invalid method: {}", method))?;
    let req = Request::builder()
        .method(method)
        .uri(path)
        .header(CONTENT_TYPE, "application/json")
        .body(data.unwrap_or_default())
        .context("Failed to build request")?;

    let api = Api::new(service).with_prefix(prefix);
    let response = api.handle(req).await;

    eprintln!("{}", response.status());
    for (name, value) in response.headers() {
        eprintln!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
    if !response.body().is_empty() {
        println!("{}", response.body());
    }
    if !response.status().is_success() {
        std::process::exit(1);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { reinitialize } => {
            init_database(&cli.db, reinitialize)?;
            println!("Initialized noteful database in {}", cli.db.display());
        }
        Commands::Notes(command) => run_notes(&open_service(&cli.db)?, command).await?,
        Commands::Folders(command) => {
            run_named(&open_service(&cli.db)?, Named::Folder, command).await?
        }
        Commands::Tags(command) => run_named(&open_service(&cli.db)?, Named::Tag, command).await?,
        Commands::Api {
            method,
            path,
            data,
            prefix,
        } => run_api(open_service(&cli.db)?, &method, &path, data, &prefix).await?,
    }

    Ok(())
}
