//! End-to-end tests running the organizer against a temporary library with an on-disk database.

use std::fs;
use std::fs::File;
use std::path::Path;

use tempfile::tempdir;

use mv_organizer::config::LibraryPaths;
use mv_organizer::{AttributeKind, Database, Error, MovieStore, MovieUpdate, Organizer};

fn open(base: &Path) -> Organizer<Database> {
    let paths = LibraryPaths::under(base);
    paths.create_directories().unwrap();
    let database = Database::open(&paths.database).unwrap();
    Organizer::new(paths, database).unwrap()
}

fn entity_links(root: &Path, entity: &str) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(root.join(entity))
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[test]
fn organize_movie_from_inbox_to_canonical_name() {
    let dir = tempdir().unwrap();
    let mut organizer = open(dir.path());
    File::create(organizer.paths().inbox.join("Old Title.mp4")).unwrap();

    let movie = organizer.import(false).unwrap().movies.remove(0);
    assert_eq!(movie.filename, "Old Title.mp4");

    for (kind, name) in [
        (AttributeKind::Studio, "Acme"),
        (AttributeKind::Series, "Saga"),
        (AttributeKind::Actor, "Bo"),
        (AttributeKind::Actor, "Al"),
        (AttributeKind::Category, "Drama"),
    ] {
        organizer.add_entity(kind, name).unwrap();
    }

    let update = MovieUpdate {
        name: Some("Finale".to_string()),
        studio: Some("Acme".to_string()),
        series: Some("Saga".to_string()),
        series_number: Some(2),
    };
    organizer.update_movie(movie.id, &update).unwrap();
    organizer.add_attribute(movie.id, AttributeKind::Actor, "Bo").unwrap();
    organizer.add_attribute(movie.id, AttributeKind::Actor, "Al").unwrap();
    let change = organizer.add_attribute(movie.id, AttributeKind::Category, "Drama").unwrap();

    let filename = "[Acme] {Saga 2} Finale (Al, Bo).mp4";
    assert_eq!(change.movie.filename, filename);
    assert!(change.movie.processed);

    let library: Vec<String> = fs::read_dir(&organizer.paths().library)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(library, vec![filename]);

    let paths = organizer.paths().clone();
    assert_eq!(entity_links(&paths.studios, "Acme"), vec![filename]);
    assert_eq!(entity_links(&paths.series, "Saga"), vec![filename]);
    assert_eq!(entity_links(&paths.actors, "Al"), vec![filename]);
    assert_eq!(entity_links(&paths.actors, "Bo"), vec![filename]);
    assert_eq!(entity_links(&paths.categories, "Drama"), vec![filename]);
    assert!(paths.categories.join("Drama").join(filename).exists());
}

#[test]
fn records_survive_reopening_the_database() {
    let dir = tempdir().unwrap();
    {
        let mut organizer = open(dir.path());
        File::create(organizer.paths().inbox.join("[Acme] Title (Al).mkv")).unwrap();
        organizer.import(true).unwrap();
    }

    let organizer = open(dir.path());
    let movies = organizer.movies().unwrap();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].filename, "[Acme] Title (Al).mkv");
    assert_eq!(movies[0].entity_names(AttributeKind::Actor), vec!["Al"]);
    assert!(
        organizer
            .store()
            .entity_by_name(AttributeKind::Studio, "ACME")
            .unwrap()
            .is_some()
    );
}

#[test]
fn rebuild_after_losing_the_database() {
    let dir = tempdir().unwrap();
    {
        let mut organizer = open(dir.path());
        File::create(organizer.paths().inbox.join("Title.mp4")).unwrap();
        let movie = organizer.import(false).unwrap().movies.remove(0);
        organizer.add_entity(AttributeKind::Category, "Drama").unwrap();
        organizer.add_entity(AttributeKind::Studio, "Acme").unwrap();
        organizer.add_attribute(movie.id, AttributeKind::Category, "Drama").unwrap();
        organizer.add_attribute(movie.id, AttributeKind::Studio, "Acme").unwrap();
    }
    for name in ["mvorganizer.db", "mvorganizer.db-wal", "mvorganizer.db-shm"] {
        let _ = fs::remove_file(dir.path().join(name));
    }

    let mut organizer = open(dir.path());
    let report = organizer.rebuild().unwrap();

    assert_eq!(report.movies.len(), 1);
    let movie = &report.movies[0];
    assert_eq!(movie.filename, "[Acme] Title.mp4");
    assert_eq!(movie.entity_names(AttributeKind::Category), vec!["Drama"]);
    assert_eq!(movie.entity_names(AttributeKind::Studio), vec!["Acme"]);
    assert!(report.links.failures.is_empty());
}

#[test]
fn delete_and_reimport() {
    let dir = tempdir().unwrap();
    let mut organizer = open(dir.path());
    File::create(organizer.paths().inbox.join("Title.mp4")).unwrap();
    let movie = organizer.import(false).unwrap().movies.remove(0);

    organizer.delete_movie(movie.id).unwrap();
    assert_eq!(organizer.list_untracked().unwrap(), vec!["Title.mp4"]);
    assert!(matches!(organizer.movie(movie.id), Err(Error::UnknownMovie(_))));

    let report = organizer.import(false).unwrap();
    assert_eq!(report.movies.len(), 1);
    assert!(organizer.list_untracked().unwrap().is_empty());
}
