mod config;
mod organize;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use mv_organizer::{AttributeKind, MovieId};

use crate::organize::MovieOrganizer;

#[derive(Parser)]
#[command(author, version, name = env!("CARGO_BIN_NAME"), about = "Organize a movie library with metadata in filenames")]
pub(crate) struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Base directory holding the library, inbox and link directories
    #[arg(short, long, value_hint = clap::ValueHint::DirPath, global = true)]
    base: Option<PathBuf>,

    /// Write a journal of all changes to ~/logs
    #[arg(short, long, global = true)]
    journal: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Move new files from the inbox into the library
    Import {
        /// Read metadata from the filenames
        #[arg(short, long)]
        parse: bool,
    },

    /// List inbox files that have not been imported
    Untracked,

    /// List all movies
    List {
        /// Print as JSON
        #[arg(short = 'J', long)]
        json: bool,
    },

    /// Show movie details
    Show {
        id: MovieId,

        /// Print as JSON
        #[arg(short = 'J', long)]
        json: bool,
    },

    /// Update movie metadata
    Update {
        id: MovieId,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,

        /// Studio name
        #[arg(short, long, conflicts_with = "clear_studio")]
        studio: Option<String>,

        /// Series name
        #[arg(short = 'e', long, conflicts_with = "clear_series")]
        series: Option<String>,

        /// Number within the series
        #[arg(short = 'u', long, conflicts_with = "clear_number")]
        number: Option<u32>,

        /// Remove the studio
        #[arg(long)]
        clear_studio: bool,

        /// Remove the series and series number
        #[arg(long)]
        clear_series: bool,

        /// Remove the series number
        #[arg(long)]
        clear_number: bool,
    },

    /// Add an actor, category, series or studio to a movie
    Add {
        id: MovieId,

        #[arg(value_enum)]
        kind: AttributeKind,

        name: String,

        /// Create the entity if it does not exist
        #[arg(short, long)]
        create: bool,
    },

    /// Remove an actor, category, series or studio from a movie
    Remove {
        id: MovieId,

        #[arg(value_enum)]
        kind: AttributeKind,

        name: String,
    },

    /// Move a movie back to the inbox and delete its record
    Delete { id: MovieId },

    /// Manage actors, categories, series and studios
    Entity {
        #[command(subcommand)]
        action: EntityCommand,
    },

    /// Create records for untracked library files
    Rebuild,

    /// Regenerate all link directories from the records
    Relink,

    /// Print the metadata parsed from a filename
    Parse {
        filename: String,

        /// Print as JSON
        #[arg(short = 'J', long)]
        json: bool,
    },

    /// Print the canonical form of a filename
    Render { filename: String },
}

#[derive(Subcommand)]
pub(crate) enum EntityCommand {
    /// Create a new entity
    Add {
        #[arg(value_enum)]
        kind: AttributeKind,
        name: String,
    },

    /// Rename an entity and all movies that reference it
    Rename {
        #[arg(value_enum)]
        kind: AttributeKind,
        name: String,
        new_name: String,
    },

    /// Delete an entity that no movie references
    Delete {
        #[arg(value_enum)]
        kind: AttributeKind,
        name: String,
    },

    /// List entities
    List {
        #[arg(value_enum)]
        kind: AttributeKind,

        /// Print as JSON
        #[arg(short = 'J', long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Some(ref shell) = args.completion {
        mv_organizer::generate_shell_completion(*shell, Args::command(), true, env!("CARGO_BIN_NAME"))
    } else if args.command.is_none() {
        Args::command().print_help()?;
        Ok(())
    } else {
        MovieOrganizer::run_with_args(args)
    }
}
