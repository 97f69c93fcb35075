//! `SQLite` storage for movie records and metadata entities.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, Params, Row, Transaction, params};

use crate::error::{Error, Result};
use crate::sort_key;
use crate::store::{MovieStore, NewMovie, check_entity_name};
use crate::types::{AttributeKind, Entity, EntityId, MovieId, MovieRecord};

/// Columns selected for a movie row, in [`MovieRow`] order.
const MOVIE_COLUMNS: &str = "m.id, m.filename, m.name, m.studio_id, m.series_id, m.series_number, m.processed";

/// Joins used for the default movie ordering.
const MOVIE_JOINS: &str = "LEFT JOIN studios st ON st.id = m.studio_id LEFT JOIN series se ON se.id = m.series_id";

/// Default movie ordering: unprocessed first, then studio, series and name.
const MOVIE_ORDER: &str = "m.processed, st.name, se.name, m.sort_key, m.filename";

/// Database wrapper for movie and entity records.
pub struct Database {
    connection: Connection,
    path: Option<PathBuf>,
}

/// Raw movie columns before entities are resolved.
struct MovieRow {
    id: MovieId,
    filename: String,
    name: Option<String>,
    studio_id: Option<EntityId>,
    series_id: Option<EntityId>,
    series_number: Option<i64>,
    processed: bool,
}

impl Database {
    /// Open or create the database at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("Failed to create database directory: {}", parent.display()), e))?;
        }

        let connection = Connection::open(path)?;

        // Set busy timeout for concurrent access (5 seconds)
        connection.busy_timeout(std::time::Duration::from_secs(5))?;

        let database = Self {
            connection,
            path: Some(path.to_path_buf()),
        };
        database.initialize()?;

        Ok(database)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory()?;

        let database = Self { connection, path: None };
        database.initialize()?;

        Ok(database)
    }

    /// Database file path, `None` for in-memory databases.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get the number of movie records.
    pub fn movie_count(&self) -> Result<u64> {
        let count: i64 = self
            .connection
            .query_row("SELECT COUNT(*) FROM movies", [], |row| row.get(0))?;

        Ok(count as u64)
    }

    /// Initialize the database schema.
    fn initialize(&self) -> Result<()> {
        self.connection.execute_batch(
            r"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS actors (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                sort_key TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                sort_key TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS series (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                sort_key TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS studios (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                sort_key TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS movies (
                id INTEGER PRIMARY KEY,
                filename TEXT NOT NULL UNIQUE,
                name TEXT,
                sort_key TEXT NOT NULL,
                studio_id INTEGER REFERENCES studios(id),
                series_id INTEGER REFERENCES series(id),
                series_number INTEGER,
                processed INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS movie_actors (
                movie_id INTEGER NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
                actor_id INTEGER NOT NULL REFERENCES actors(id),
                PRIMARY KEY (movie_id, actor_id)
            );

            CREATE TABLE IF NOT EXISTS movie_categories (
                movie_id INTEGER NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                PRIMARY KEY (movie_id, category_id)
            );

            CREATE INDEX IF NOT EXISTS idx_movie_actors_actor ON movie_actors(actor_id);
            CREATE INDEX IF NOT EXISTS idx_movie_categories_category ON movie_categories(category_id);

            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(())
    }

    fn query_movies<P: Params>(&self, filter: &str, params: P) -> Result<Vec<MovieRecord>> {
        let sql = format!("SELECT {MOVIE_COLUMNS} FROM movies m {MOVIE_JOINS} {filter} ORDER BY {MOVIE_ORDER}");
        let mut stmt = self.connection.prepare(&sql)?;
        let rows = stmt
            .query_map(params, movie_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(|row| self.resolve_movie(row)).collect()
    }

    fn resolve_movie(&self, row: MovieRow) -> Result<MovieRecord> {
        let studio = match row.studio_id {
            Some(id) => self.entity(AttributeKind::Studio, id)?,
            None => None,
        };
        let series = match row.series_id {
            Some(id) => self.entity(AttributeKind::Series, id)?,
            None => None,
        };

        Ok(MovieRecord {
            id: row.id,
            filename: row.filename,
            name: row.name,
            studio,
            series,
            series_number: row.series_number.and_then(|n| u32::try_from(n).ok()),
            actors: self.movie_entities(row.id, AttributeKind::Actor)?,
            categories: self.movie_entities(row.id, AttributeKind::Category)?,
            processed: row.processed,
        })
    }

    /// Actors or categories of a movie sorted by name.
    fn movie_entities(&self, movie_id: MovieId, kind: AttributeKind) -> Result<Vec<Entity>> {
        let (join_table, column) = join_table(kind)?;
        let table = kind.table();
        let sql = format!(
            "SELECT e.id, e.name, e.sort_key FROM {table} e \
             JOIN {join_table} j ON j.{column} = e.id \
             WHERE j.movie_id = ?1 ORDER BY e.name COLLATE BINARY"
        );
        let mut stmt = self.connection.prepare(&sql)?;
        let entities = stmt
            .query_map([movie_id], |row| entity_row(row, kind))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entities)
    }

    /// Number of movies referencing an entity.
    fn reference_count(&self, kind: AttributeKind, id: EntityId) -> Result<usize> {
        let sql = match kind {
            AttributeKind::Actor => "SELECT COUNT(*) FROM movie_actors WHERE actor_id = ?1",
            AttributeKind::Category => "SELECT COUNT(*) FROM movie_categories WHERE category_id = ?1",
            AttributeKind::Series => "SELECT COUNT(*) FROM movies WHERE series_id = ?1",
            AttributeKind::Studio => "SELECT COUNT(*) FROM movies WHERE studio_id = ?1",
        };
        let count: i64 = self.connection.query_row(sql, [id], |row| row.get(0))?;

        Ok(count as usize)
    }

    /// Fail with an unknown entity error unless every referenced entity exists.
    fn verify_references(&self, movie: &MovieRecord) -> Result<()> {
        for kind in AttributeKind::ALL {
            for entity in movie.entities(kind) {
                if self.entity(kind, entity.id)?.is_none() {
                    return Err(Error::UnknownEntity {
                        kind,
                        name: entity.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl MovieStore for Database {
    fn movies(&self) -> Result<Vec<MovieRecord>> {
        self.query_movies("", [])
    }

    fn movie(&self, id: MovieId) -> Result<Option<MovieRecord>> {
        Ok(self.query_movies("WHERE m.id = ?1", [id])?.into_iter().next())
    }

    fn movie_by_filename(&self, filename: &str) -> Result<Option<MovieRecord>> {
        Ok(self
            .query_movies("WHERE m.filename = ?1", [filename])?
            .into_iter()
            .next())
    }

    fn movies_with_entity(&self, kind: AttributeKind, id: EntityId) -> Result<Vec<MovieRecord>> {
        let filter = match kind {
            AttributeKind::Actor => "WHERE m.id IN (SELECT movie_id FROM movie_actors WHERE actor_id = ?1)",
            AttributeKind::Category => "WHERE m.id IN (SELECT movie_id FROM movie_categories WHERE category_id = ?1)",
            AttributeKind::Series => "WHERE m.series_id = ?1",
            AttributeKind::Studio => "WHERE m.studio_id = ?1",
        };
        self.query_movies(filter, [id])
    }

    fn insert_movie(&self, movie: &NewMovie) -> Result<MovieRecord> {
        self.connection.execute(
            "INSERT INTO movies (filename, name, sort_key, processed) VALUES (?1, ?2, ?3, ?4)",
            params![
                movie.filename,
                movie.name,
                movie_sort_key(movie.name.as_deref(), &movie.filename),
                movie.processed
            ],
        )?;
        let id = self.connection.last_insert_rowid();

        self.movie(id)?
            .ok_or_else(|| Error::Internal(format!("Inserted movie {} not found", movie.filename)))
    }

    fn update_movie(&self, movie: &MovieRecord) -> Result<()> {
        self.verify_references(movie)?;

        let tx = self.connection.unchecked_transaction()?;
        write_movie(&tx, movie)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_movie(&self, id: MovieId) -> Result<()> {
        let deleted = self.connection.execute("DELETE FROM movies WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(Error::UnknownMovie(id));
        }
        Ok(())
    }

    fn entities(&self, kind: AttributeKind) -> Result<Vec<Entity>> {
        let sql = format!("SELECT id, name, sort_key FROM {} ORDER BY sort_key, name", kind.table());
        let mut stmt = self.connection.prepare(&sql)?;
        let entities = stmt
            .query_map([], |row| entity_row(row, kind))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entities)
    }

    fn entity(&self, kind: AttributeKind, id: EntityId) -> Result<Option<Entity>> {
        let sql = format!("SELECT id, name, sort_key FROM {} WHERE id = ?1", kind.table());
        Ok(self
            .connection
            .query_row(&sql, [id], |row| entity_row(row, kind))
            .optional()?)
    }

    fn entity_by_name(&self, kind: AttributeKind, name: &str) -> Result<Option<Entity>> {
        let sql = format!("SELECT id, name, sort_key FROM {} WHERE name = ?1", kind.table());
        Ok(self
            .connection
            .query_row(&sql, [name], |row| entity_row(row, kind))
            .optional()?)
    }

    fn insert_entity(&self, kind: AttributeKind, name: &str) -> Result<Entity> {
        check_entity_name(kind, name)?;
        let sql = format!("INSERT INTO {} (name, sort_key) VALUES (?1, ?2)", kind.table());
        self.connection
            .execute(&sql, params![name, sort_key(name)])
            .map_err(|e| duplicate_error(e, kind, name))?;

        Ok(Entity {
            id: self.connection.last_insert_rowid(),
            kind,
            name: name.to_string(),
            sort_key: sort_key(name),
        })
    }

    fn rename_entity(&self, kind: AttributeKind, id: EntityId, name: &str, movies: &[MovieRecord]) -> Result<Entity> {
        check_entity_name(kind, name)?;
        for movie in movies {
            self.verify_references(movie)?;
        }

        let tx = self.connection.unchecked_transaction()?;
        let sql = format!("UPDATE {} SET name = ?2, sort_key = ?3 WHERE id = ?1", kind.table());
        let updated = tx
            .execute(&sql, params![id, name, sort_key(name)])
            .map_err(|e| duplicate_error(e, kind, name))?;
        if updated == 0 {
            return Err(Error::UnknownEntity {
                kind,
                name: name.to_string(),
            });
        }
        for movie in movies {
            write_movie(&tx, movie)?;
        }
        tx.commit()?;

        Ok(Entity {
            id,
            kind,
            name: name.to_string(),
            sort_key: sort_key(name),
        })
    }

    fn delete_entity(&self, kind: AttributeKind, id: EntityId) -> Result<Entity> {
        let entity = self.entity(kind, id)?.ok_or_else(|| Error::UnknownEntity {
            kind,
            name: format!("#{id}"),
        })?;

        let movies = self.reference_count(kind, id)?;
        if movies > 0 {
            return Err(Error::ReferentialIntegrity {
                kind,
                name: entity.name,
                movies,
            });
        }

        let sql = format!("DELETE FROM {} WHERE id = ?1", kind.table());
        self.connection.execute(&sql, [id]).map_err(|e| {
            if constraint_code(&e) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) {
                Error::ReferentialIntegrity {
                    kind,
                    name: entity.name.clone(),
                    movies: 1,
                }
            } else {
                Error::Database(e)
            }
        })?;

        Ok(entity)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

/// Write every column and association of a movie inside an open transaction.
fn write_movie(tx: &Transaction<'_>, movie: &MovieRecord) -> Result<()> {
    let updated = tx.execute(
        r"
        UPDATE movies
        SET filename = ?2, name = ?3, sort_key = ?4, studio_id = ?5,
            series_id = ?6, series_number = ?7, processed = ?8
        WHERE id = ?1
        ",
        params![
            movie.id,
            movie.filename,
            movie.name,
            movie_sort_key(movie.name.as_deref(), &movie.filename),
            movie.studio.as_ref().map(|e| e.id),
            movie.series.as_ref().map(|e| e.id),
            movie.series_number,
            movie.processed
        ],
    )?;
    if updated == 0 {
        return Err(Error::UnknownMovie(movie.id));
    }

    tx.execute("DELETE FROM movie_actors WHERE movie_id = ?1", [movie.id])?;
    for actor in &movie.actors {
        tx.execute(
            "INSERT OR IGNORE INTO movie_actors (movie_id, actor_id) VALUES (?1, ?2)",
            [movie.id, actor.id],
        )?;
    }

    tx.execute("DELETE FROM movie_categories WHERE movie_id = ?1", [movie.id])?;
    for category in &movie.categories {
        tx.execute(
            "INSERT OR IGNORE INTO movie_categories (movie_id, category_id) VALUES (?1, ?2)",
            [movie.id, category.id],
        )?;
    }

    Ok(())
}

fn movie_row(row: &Row<'_>) -> rusqlite::Result<MovieRow> {
    Ok(MovieRow {
        id: row.get(0)?,
        filename: row.get(1)?,
        name: row.get(2)?,
        studio_id: row.get(3)?,
        series_id: row.get(4)?,
        series_number: row.get(5)?,
        processed: row.get(6)?,
    })
}

fn entity_row(row: &Row<'_>, kind: AttributeKind) -> rusqlite::Result<Entity> {
    Ok(Entity {
        id: row.get(0)?,
        kind,
        name: row.get(1)?,
        sort_key: row.get(2)?,
    })
}

/// Association table and entity column for multi-valued kinds.
fn join_table(kind: AttributeKind) -> Result<(&'static str, &'static str)> {
    match kind {
        AttributeKind::Actor => Ok(("movie_actors", "actor_id")),
        AttributeKind::Category => Ok(("movie_categories", "category_id")),
        AttributeKind::Series | AttributeKind::Studio => {
            Err(Error::Internal(format!("{kind} is not stored in an association table")))
        }
    }
}

/// Sort key for a movie: the display name if set, otherwise the filename.
fn movie_sort_key(name: Option<&str>, filename: &str) -> String {
    sort_key(name.unwrap_or(filename))
}

/// Extended result code of a failed constraint.
fn constraint_code(error: &rusqlite::Error) -> Option<std::ffi::c_int> {
    match error {
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == rusqlite::ErrorCode::ConstraintViolation => {
            Some(failure.extended_code)
        }
        _ => None,
    }
}

fn duplicate_error(error: rusqlite::Error, kind: AttributeKind, name: &str) -> Error {
    if constraint_code(&error) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) {
        Error::DuplicateEntity {
            kind,
            name: name.to_string(),
        }
    } else {
        Error::Database(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_movie(filename: &str) -> NewMovie {
        NewMovie {
            filename: filename.to_string(),
            name: Some(crate::filename::split_extension(filename).0.to_string()),
            processed: false,
        }
    }

    #[test]
    fn open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.movie_count().unwrap(), 0);
        assert!(db.path().is_none());
    }

    #[test]
    fn insert_and_get_movie() {
        let db = Database::open_in_memory().unwrap();
        let movie = db.insert_movie(&new_movie("Old Title.mp4")).unwrap();

        assert_eq!(movie.filename, "Old Title.mp4");
        assert_eq!(movie.name.as_deref(), Some("Old Title"));
        assert!(!movie.processed);
        assert_eq!(db.movie(movie.id).unwrap(), Some(movie.clone()));
        assert_eq!(db.movie_by_filename("Old Title.mp4").unwrap(), Some(movie));
        assert!(db.movie_by_filename("missing.mp4").unwrap().is_none());
    }

    #[test]
    fn entity_names_are_unique_ignoring_case() {
        let db = Database::open_in_memory().unwrap();
        db.insert_entity(AttributeKind::Actor, "Al Smith").unwrap();

        let result = db.insert_entity(AttributeKind::Actor, "al smith");
        assert!(matches!(result, Err(Error::DuplicateEntity { .. })));

        // Same name is fine for a different kind
        db.insert_entity(AttributeKind::Studio, "Al Smith").unwrap();

        let found = db.entity_by_name(AttributeKind::Actor, "AL SMITH").unwrap().unwrap();
        assert_eq!(found.name, "Al Smith");
        assert_eq!(found.sort_key, "al smith");
    }

    #[test]
    fn entities_sorted_by_sort_key() {
        let db = Database::open_in_memory().unwrap();
        db.insert_entity(AttributeKind::Series, "The Zoo").unwrap();
        db.insert_entity(AttributeKind::Series, "Middle").unwrap();
        db.insert_entity(AttributeKind::Series, "An Apple").unwrap();

        let names: Vec<String> = db
            .entities(AttributeKind::Series)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["An Apple", "Middle", "The Zoo"]);
    }

    #[test]
    fn update_movie_stores_associations() {
        let db = Database::open_in_memory().unwrap();
        let mut movie = db.insert_movie(&new_movie("Finale.mp4")).unwrap();
        movie.studio = Some(db.insert_entity(AttributeKind::Studio, "Acme").unwrap());
        movie.series = Some(db.insert_entity(AttributeKind::Series, "Saga").unwrap());
        movie.series_number = Some(2);
        movie.actors = vec![
            db.insert_entity(AttributeKind::Actor, "Al").unwrap(),
            db.insert_entity(AttributeKind::Actor, "Bo").unwrap(),
        ];
        movie.categories = vec![db.insert_entity(AttributeKind::Category, "Drama").unwrap()];
        movie.filename = "[Acme] {Saga 2} Finale (Al, Bo).mp4".to_string();
        movie.processed = true;

        db.update_movie(&movie).unwrap();

        assert_eq!(db.movie(movie.id).unwrap(), Some(movie));
    }

    #[test]
    fn actors_are_loaded_in_name_order() {
        let db = Database::open_in_memory().unwrap();
        let mut movie = db.insert_movie(&new_movie("Title.mp4")).unwrap();
        let bo = db.insert_entity(AttributeKind::Actor, "Bo").unwrap();
        let al = db.insert_entity(AttributeKind::Actor, "Al").unwrap();
        movie.actors = vec![bo, al];

        db.update_movie(&movie).unwrap();

        let stored = db.movie(movie.id).unwrap().unwrap();
        assert_eq!(stored.entity_names(AttributeKind::Actor), vec!["Al", "Bo"]);
    }

    #[test]
    fn update_movie_with_missing_entity_fails() {
        let db = Database::open_in_memory().unwrap();
        let mut movie = db.insert_movie(&new_movie("Title.mp4")).unwrap();
        movie.studio = Some(Entity {
            id: 42,
            kind: AttributeKind::Studio,
            name: "Ghost".to_string(),
            sort_key: "ghost".to_string(),
        });

        let result = db.update_movie(&movie);
        assert!(matches!(result, Err(Error::UnknownEntity { .. })));
    }

    #[test]
    fn delete_referenced_entity_fails() {
        let db = Database::open_in_memory().unwrap();
        let mut movie = db.insert_movie(&new_movie("Title.mp4")).unwrap();
        let actor = db.insert_entity(AttributeKind::Actor, "Al").unwrap();
        movie.actors = vec![actor.clone()];
        db.update_movie(&movie).unwrap();

        let result = db.delete_entity(AttributeKind::Actor, actor.id);
        assert!(matches!(result, Err(Error::ReferentialIntegrity { movies: 1, .. })));

        db.delete_movie(movie.id).unwrap();
        let deleted = db.delete_entity(AttributeKind::Actor, actor.id).unwrap();
        assert_eq!(deleted.name, "Al");
        assert!(db.entity(AttributeKind::Actor, actor.id).unwrap().is_none());
    }

    #[test]
    fn rename_entity_checks_duplicates() {
        let db = Database::open_in_memory().unwrap();
        let acme = db.insert_entity(AttributeKind::Studio, "Acme").unwrap();
        db.insert_entity(AttributeKind::Studio, "Other").unwrap();

        let result = db.rename_entity(AttributeKind::Studio, acme.id, "OTHER", &[]);
        assert!(matches!(result, Err(Error::DuplicateEntity { .. })));

        let renamed = db.rename_entity(AttributeKind::Studio, acme.id, "The Acme", &[]).unwrap();
        assert_eq!(renamed.sort_key, "acme");
    }

    #[test]
    fn rename_entity_stores_movies_together() {
        let db = Database::open_in_memory().unwrap();
        let acme = db.insert_entity(AttributeKind::Studio, "Acme").unwrap();
        let mut movie = db.insert_movie(&new_movie("[Acme] One.mp4")).unwrap();
        movie.studio = Some(acme.clone());
        db.update_movie(&movie).unwrap();

        let mut renamed = movie.clone();
        renamed.filename = "[Zenith] One.mp4".to_string();
        db.rename_entity(AttributeKind::Studio, acme.id, "Zenith", &[renamed]).unwrap();

        let stored = db.movie(movie.id).unwrap().unwrap();
        assert_eq!(stored.filename, "[Zenith] One.mp4");
        assert_eq!(stored.entity_names(AttributeKind::Studio), vec!["Zenith"]);
    }

    #[test]
    fn failed_rename_entity_changes_nothing() {
        let db = Database::open_in_memory().unwrap();
        let acme = db.insert_entity(AttributeKind::Studio, "Acme").unwrap();
        let mut movie = db.insert_movie(&new_movie("[Acme] One.mp4")).unwrap();
        db.insert_movie(&new_movie("[Zenith] One.mp4")).unwrap();
        movie.studio = Some(acme.clone());
        db.update_movie(&movie).unwrap();

        let mut renamed = movie.clone();
        renamed.filename = "[Zenith] One.mp4".to_string();
        let result = db.rename_entity(AttributeKind::Studio, acme.id, "Zenith", &[renamed]);

        assert!(matches!(result, Err(Error::Database(_))));
        assert_eq!(db.entity(AttributeKind::Studio, acme.id).unwrap().unwrap().name, "Acme");
        assert_eq!(db.movie(movie.id).unwrap().unwrap().filename, "[Acme] One.mp4");
    }

    #[test]
    fn entity_names_must_be_directory_names() {
        let db = Database::open_in_memory().unwrap();
        for name in ["", ".", "..", "../movies", "/x", "a\\b", "nul\0byte"] {
            let result = db.insert_entity(AttributeKind::Category, name);
            assert!(matches!(result, Err(Error::InvalidEntityName { .. })), "{name:?}");
        }
        let result = db.get_or_insert_entity(AttributeKind::Actor, "../movies");
        assert!(matches!(result, Err(Error::InvalidEntityName { .. })));

        let acme = db.insert_entity(AttributeKind::Studio, "Acme").unwrap();
        let result = db.rename_entity(AttributeKind::Studio, acme.id, "..", &[]);
        assert!(matches!(result, Err(Error::InvalidEntityName { .. })));
        assert!(db.entities(AttributeKind::Category).unwrap().is_empty());
    }

    #[test]
    fn movies_with_entity() {
        let db = Database::open_in_memory().unwrap();
        let category = db.insert_entity(AttributeKind::Category, "Drama").unwrap();
        let studio = db.insert_entity(AttributeKind::Studio, "Acme").unwrap();
        let mut first = db.insert_movie(&new_movie("First.mp4")).unwrap();
        let mut second = db.insert_movie(&new_movie("Second.mp4")).unwrap();
        first.categories = vec![category.clone()];
        second.studio = Some(studio.clone());
        db.update_movie(&first).unwrap();
        db.update_movie(&second).unwrap();

        let with_category = db.movies_with_entity(AttributeKind::Category, category.id).unwrap();
        assert_eq!(with_category.len(), 1);
        assert_eq!(with_category[0].filename, "First.mp4");

        let with_studio = db.movies_with_entity(AttributeKind::Studio, studio.id).unwrap();
        assert_eq!(with_studio.len(), 1);
        assert_eq!(with_studio[0].filename, "Second.mp4");
    }

    #[test]
    fn movies_ordered_by_processed_then_name() {
        let db = Database::open_in_memory().unwrap();
        let mut done = db.insert_movie(&new_movie("Alpha.mp4")).unwrap();
        db.insert_movie(&new_movie("The Zebra.mp4")).unwrap();
        db.insert_movie(&new_movie("Beta.mp4")).unwrap();
        done.processed = true;
        db.update_movie(&done).unwrap();

        let filenames: Vec<String> = db.movies().unwrap().into_iter().map(|m| m.filename).collect();
        assert_eq!(filenames, vec!["Beta.mp4", "The Zebra.mp4", "Alpha.mp4"]);
    }

    #[test]
    fn delete_missing_movie() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.delete_movie(7), Err(Error::UnknownMovie(7))));
    }
}
