//! Persistent record store used by the organizer.

use crate::error::{Error, Result};
use crate::migrate::is_plain_name;
use crate::types::{AttributeKind, Entity, EntityId, MovieId, MovieRecord};

/// Characters not allowed in entity names, which double as link directory names.
const FORBIDDEN_CHARACTERS: [char; 3] = ['/', '\\', '\0'];

/// Check that an entity name can be used as a link directory name.
///
/// ```rust
/// use mv_organizer::AttributeKind;
/// use mv_organizer::store::check_entity_name;
///
/// assert!(check_entity_name(AttributeKind::Studio, "Acme").is_ok());
/// assert!(check_entity_name(AttributeKind::Studio, "..").is_err());
/// assert!(check_entity_name(AttributeKind::Category, "a\\b").is_err());
/// ```
///
/// # Errors
/// Returns [`Error::InvalidEntityName`] for empty names, `.` and `..`,
/// and names containing path separators or NUL.
pub fn check_entity_name(kind: AttributeKind, name: &str) -> Result<()> {
    if name.contains(FORBIDDEN_CHARACTERS) || !is_plain_name(name) {
        return Err(Error::InvalidEntityName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Values for a new movie record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewMovie {
    pub filename: String,
    pub name: Option<String>,
    pub processed: bool,
}

/// CRUD operations on movie records and metadata entities.
///
/// Implementations enforce case-insensitive unique entity names
/// and refuse to delete entities that are still referenced by movies.
pub trait MovieStore {
    /// All movies ordered by processed flag, studio, series and name.
    fn movies(&self) -> Result<Vec<MovieRecord>>;

    fn movie(&self, id: MovieId) -> Result<Option<MovieRecord>>;

    fn movie_by_filename(&self, filename: &str) -> Result<Option<MovieRecord>>;

    /// Movies that reference the given entity.
    fn movies_with_entity(&self, kind: AttributeKind, id: EntityId) -> Result<Vec<MovieRecord>>;

    /// Insert a movie without metadata entities.
    fn insert_movie(&self, movie: &NewMovie) -> Result<MovieRecord>;

    /// Store every field of the record, including entity associations.
    fn update_movie(&self, movie: &MovieRecord) -> Result<()>;

    fn delete_movie(&self, id: MovieId) -> Result<()>;

    /// All entities of a kind ordered by sort key.
    fn entities(&self, kind: AttributeKind) -> Result<Vec<Entity>>;

    fn entity(&self, kind: AttributeKind, id: EntityId) -> Result<Option<Entity>>;

    /// Case-insensitive lookup by name.
    fn entity_by_name(&self, kind: AttributeKind, name: &str) -> Result<Option<Entity>>;

    /// Fails with [`Error::InvalidEntityName`] for names that cannot be a directory name,
    /// or [`Error::DuplicateEntity`] if the name is taken.
    fn insert_entity(&self, kind: AttributeKind, name: &str) -> Result<Entity>;

    /// Rename an entity and store the given movie records in one transaction.
    ///
    /// Nothing is changed if any step fails.
    /// Fails with [`Error::InvalidEntityName`] for names that cannot be a directory name,
    /// or [`Error::DuplicateEntity`] if the new name is taken by another entity.
    fn rename_entity(&self, kind: AttributeKind, id: EntityId, name: &str, movies: &[MovieRecord]) -> Result<Entity>;

    /// Fails with [`Error::ReferentialIntegrity`] while the entity is referenced.
    fn delete_entity(&self, kind: AttributeKind, id: EntityId) -> Result<Entity>;

    /// Look up an entity by name and create it if missing.
    fn get_or_insert_entity(&self, kind: AttributeKind, name: &str) -> Result<Entity> {
        check_entity_name(kind, name)?;
        match self.entity_by_name(kind, name)? {
            Some(entity) => Ok(entity),
            None => self.insert_entity(kind, name),
        }
    }

    /// Look up an entity by name, failing with [`Error::UnknownEntity`] if missing.
    fn require_entity(&self, kind: AttributeKind, name: &str) -> Result<Entity> {
        self.entity_by_name(kind, name)?
            .ok_or_else(|| Error::UnknownEntity {
                kind,
                name: name.to_string(),
            })
    }

    /// Look up a movie by ID, failing with [`Error::UnknownMovie`] if missing.
    fn require_movie(&self, id: MovieId) -> Result<MovieRecord> {
        self.movie(id)?.ok_or(Error::UnknownMovie(id))
    }
}
