use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use mv_organizer::filename::{decode_filename, encode_filename};
use mv_organizer::journal::Journal;
use mv_organizer::organizer::{LinkReport, MovieChange};
use mv_organizer::{AttributeKind, Database, MovieId, MovieRecord, MovieStore, MovieUpdate, Organizer};

use crate::config::Config;
use crate::{Args, Command, EntityCommand};

/// Runs `mvorg` subcommands against the configured library.
pub struct MovieOrganizer {
    organizer: Organizer<Database>,
}

impl MovieOrganizer {
    /// Parse config, open the library and run the given command.
    pub fn run_with_args(args: Args) -> Result<()> {
        let config = Config::from_args(&args)?;
        let Some(command) = args.command else {
            return Ok(());
        };
        Self::new(config)?.run(command)
    }

    /// Open the database and create missing library directories.
    pub fn new(config: Config) -> Result<Self> {
        config.paths.create_directories()?;
        let database = Database::open(&config.paths.database)
            .with_context(|| format!("Failed to open database: {}", config.paths.database.display()))?;

        if config.verbose
            && let Some(path) = database.path()
        {
            println!("Database: {}", mv_organizer::path_to_string(path));
        }

        let mut organizer = Organizer::new(config.paths, database)?.with_verbose(config.verbose);
        if config.journal {
            let journal = Journal::new()?;
            if config.verbose {
                println!("Journal: {}", journal.path().display());
            }
            organizer = organizer.with_journal(journal);
        }

        Ok(Self { organizer })
    }

    pub fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Import { parse } => self.import(parse),
            Command::Untracked => {
                for filename in self.organizer.list_untracked()? {
                    println!("{filename}");
                }
                Ok(())
            }
            Command::List { json } => {
                let movies = self.organizer.movies()?;
                if json {
                    print_json(&movies)
                } else {
                    for movie in &movies {
                        print_movie_line(movie);
                    }
                    Ok(())
                }
            }
            Command::Show { id, json } => {
                let movie = self.organizer.movie(id)?;
                if json {
                    print_json(&movie)
                } else {
                    print_movie_details(&movie);
                    Ok(())
                }
            }
            Command::Update {
                id,
                name,
                studio,
                series,
                number,
                clear_studio,
                clear_series,
                clear_number,
            } => {
                let current = self.organizer.movie(id)?;
                let update = MovieUpdate {
                    name: name.or(current.name),
                    studio: if clear_studio {
                        None
                    } else {
                        studio.or_else(|| current.studio.map(|e| e.name))
                    },
                    series: if clear_series {
                        None
                    } else {
                        series.or_else(|| current.series.map(|e| e.name))
                    },
                    series_number: if clear_number || clear_series {
                        None
                    } else {
                        number.or(current.series_number)
                    },
                };
                let change = self.organizer.update_movie(id, &update)?;
                print_change(&change);
                Ok(())
            }
            Command::Add { id, kind, name, create } => {
                if create && self.organizer.store().entity_by_name(kind, &name)?.is_none() {
                    let entity = self.organizer.add_entity(kind, &name)?;
                    println!("Created {kind}: {}", entity.name.green());
                }
                let change = self.organizer.add_attribute(id, kind, &name)?;
                print_change(&change);
                Ok(())
            }
            Command::Remove { id, kind, name } => {
                let change = self.organizer.remove_attribute(id, kind, &name)?;
                print_change(&change);
                Ok(())
            }
            Command::Delete { id } => self.delete(id),
            Command::Entity { action } => self.entity(action),
            Command::Rebuild => {
                let report = self.organizer.rebuild()?;
                for movie in &report.movies {
                    print_movie_line(movie);
                }
                print_link_summary(&report.links);
                println!("{report}");
                println!("Library has {} movies", self.organizer.store().movie_count()?);
                Ok(())
            }
            Command::Relink => {
                let report = self.organizer.relink()?;
                print_link_summary(&report);
                println!("{report}");
                Ok(())
            }
            Command::Parse { filename, json } => {
                let metadata = decode_filename(&filename);
                if json {
                    print_json(&metadata)
                } else {
                    print_field("studio", metadata.studio.as_deref().unwrap_or_default());
                    print_field("series", metadata.series.as_deref().unwrap_or_default());
                    print_field(
                        "number",
                        &metadata.series_number.map(|n| n.to_string()).unwrap_or_default(),
                    );
                    print_field("name", metadata.name.as_deref().unwrap_or_default());
                    print_field("actors", &metadata.actors.join(", "));
                    Ok(())
                }
            }
            Command::Render { filename } => {
                let rendered = encode_filename(&decode_filename(&filename), &filename);
                mv_organizer::show_diff(&filename, &rendered);
                Ok(())
            }
        }
    }

    fn import(&mut self, parse: bool) -> Result<()> {
        let report = self.organizer.import(parse)?;
        for movie in &report.movies {
            print_movie_line(movie);
        }
        for filename in &report.skipped {
            println!("{} {filename}", "Skipped:".yellow());
        }
        print_link_summary(&report.links);
        println!(
            "Imported {} movies, skipped {}",
            report.movies.len().to_string().bold(),
            report.skipped.len()
        );
        Ok(())
    }

    fn delete(&mut self, id: MovieId) -> Result<()> {
        let change = self.organizer.delete_movie(id)?;
        println!(
            "{} {} -> {}",
            "Deleted:".red(),
            change.movie.filename,
            self.organizer.paths().inbox.display()
        );
        print_link_summary(&change.links);
        Ok(())
    }

    fn entity(&mut self, action: EntityCommand) -> Result<()> {
        match action {
            EntityCommand::Add { kind, name } => {
                let entity = self.organizer.add_entity(kind, &name)?;
                println!("Created {kind}: {}", entity.name.green());
            }
            EntityCommand::Rename { kind, name, new_name } => {
                let changes = self.organizer.rename_entity(kind, &name, &new_name)?;
                println!("Renamed {kind}: {name} -> {}", new_name.green());
                for change in &changes {
                    print_change(change);
                }
            }
            EntityCommand::Delete { kind, name } => {
                let entity = self.organizer.delete_entity(kind, &name)?;
                println!("Deleted {kind}: {}", entity.name.red());
            }
            EntityCommand::List { kind, json } => {
                let entities = self.organizer.entities(kind)?;
                if json {
                    return print_json(&entities);
                }
                for entity in &entities {
                    println!("{:>5}  {}", entity.id, entity.name);
                }
            }
        }
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    println!("{json}");
    Ok(())
}

fn print_movie_line(movie: &MovieRecord) {
    if movie.processed {
        println!("{movie}");
    } else {
        println!("{}", movie.to_string().yellow());
    }
}

fn print_field(name: &str, value: &str) {
    println!("{:>12}: {value}", name.bold());
}

fn print_movie_details(movie: &MovieRecord) {
    let names = |kind: AttributeKind| movie.entity_names(kind).join(", ");
    print_field("id", &movie.id.to_string());
    print_field("filename", &movie.filename);
    print_field("name", movie.name.as_deref().unwrap_or_default());
    print_field("studio", &names(AttributeKind::Studio));
    print_field("series", &names(AttributeKind::Series));
    print_field(
        "number",
        &movie.series_number.map(|n| n.to_string()).unwrap_or_default(),
    );
    print_field("actors", &names(AttributeKind::Actor));
    print_field("categories", &names(AttributeKind::Category));
    print_field("processed", &mv_organizer::colorize_bool(movie.processed).to_string());
}

fn print_change(change: &MovieChange) {
    if change.renamed() {
        mv_organizer::show_diff(&change.previous_filename, &change.movie.filename);
    } else {
        println!("{}", change.movie.filename);
    }
    print_link_summary(&change.links);
}

/// Link failures have already been printed as warnings when they happened.
fn print_link_summary(report: &LinkReport) {
    if !report.failures.is_empty() {
        mv_organizer::print_warning!("{} link updates failed", report.failures.len());
    }
}
