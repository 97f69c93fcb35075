//! Keeps movie records, filenames and link directories in sync.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::config::LibraryPaths;
use crate::error::{Error, LinkError, Result};
use crate::filename::{decode_filename, encode_filename, split_extension};
use crate::journal::Journal;
use crate::links::{LinkDirectory, LinkOutcome, Prune};
use crate::migrate;
use crate::store::{MovieStore, NewMovie, check_entity_name};
use crate::types::{AttributeKind, Entity, MovieId, MovieRecord, MovieUpdate};

/// Link directory changes made by one operation.
#[derive(Debug, Default)]
pub struct LinkReport {
    pub created: usize,
    pub removed: usize,
    /// Entity directories removed because they became empty.
    pub pruned: usize,
    /// Link maintenance failures that were logged and skipped.
    pub failures: Vec<LinkFailure>,
}

/// A skipped link maintenance failure.
#[derive(Debug)]
pub struct LinkFailure {
    pub kind: AttributeKind,
    pub entity: String,
    pub filename: String,
    pub error: LinkError,
}

/// Result of an operation on a single movie.
#[derive(Debug)]
pub struct MovieChange {
    /// Record as stored after the operation.
    pub movie: MovieRecord,
    /// Filename before the operation.
    pub previous_filename: String,
    pub links: LinkReport,
}

/// Result of importing files from the inbox.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub movies: Vec<MovieRecord>,
    /// Files left in the inbox because the library already has a file with the same name.
    pub skipped: Vec<String>,
    pub links: LinkReport,
}

/// Organizer for a movie library.
///
/// Every mutation renders the canonical filename from the record metadata,
/// renames the file in the library, stores the record and then updates the link directories.
/// A name conflict aborts the operation before anything is changed.
/// Link directory failures after that point are logged and skipped.
pub struct Organizer<S: MovieStore> {
    paths: LibraryPaths,
    store: S,
    links: [LinkDirectory; 4],
    journal: Option<Journal>,
    verbose: bool,
}

impl LinkReport {
    /// Add the counts and failures from another report.
    pub fn merge(&mut self, other: Self) {
        self.created += other.created;
        self.removed += other.removed;
        self.pruned += other.pruned;
        self.failures.extend(other.failures);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created == 0 && self.removed == 0 && self.failures.is_empty()
    }
}

impl fmt::Display for LinkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} links created, {} removed, {} directories pruned, {} failed",
            self.created,
            self.removed,
            self.pruned,
            self.failures.len()
        )
    }
}

impl fmt::Display for LinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.kind, self.entity, self.error)
    }
}

impl MovieChange {
    fn unchanged(movie: MovieRecord) -> Self {
        Self {
            previous_filename: movie.filename.clone(),
            movie,
            links: LinkReport::default(),
        }
    }

    /// True if the movie file got a new name.
    #[must_use]
    pub fn renamed(&self) -> bool {
        self.movie.filename != self.previous_filename
    }
}

impl<S: MovieStore> Organizer<S> {
    /// Create an organizer for the given locations and record store.
    ///
    /// # Errors
    /// Returns an error if the library path cannot be made absolute.
    pub fn new(paths: LibraryPaths, store: S) -> Result<Self> {
        let library = absolute_path(&paths.library)?;
        let links = AttributeKind::ALL
            .map(|kind| LinkDirectory::new(kind, paths.link_root(kind).to_path_buf(), library.clone()));

        Ok(Self {
            paths,
            store,
            links,
            journal: None,
            verbose: false,
        })
    }

    /// Record every mutation in the given journal.
    #[must_use]
    pub fn with_journal(mut self, mut journal: Journal) -> Self {
        journal.log_init(&self.paths);
        self.journal = Some(journal);
        self
    }

    /// Print renames and link changes.
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub const fn paths(&self) -> &LibraryPaths {
        &self.paths
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn journal(&self) -> Option<&Journal> {
        self.journal.as_ref()
    }

    pub(crate) const fn journal_mut(&mut self) -> Option<&mut Journal> {
        self.journal.as_mut()
    }

    /// Link directory for the given kind.
    #[must_use]
    pub fn link_directory(&self, kind: AttributeKind) -> &LinkDirectory {
        &self.links[kind as usize]
    }

    /// All movies in display order.
    pub fn movies(&self) -> Result<Vec<MovieRecord>> {
        self.store.movies()
    }

    pub fn movie(&self, id: MovieId) -> Result<MovieRecord> {
        self.store.require_movie(id)
    }

    /// All entities of a kind in sort order.
    pub fn entities(&self, kind: AttributeKind) -> Result<Vec<Entity>> {
        self.store.entities(kind)
    }

    /// Files in the inbox that have no movie record yet.
    ///
    /// # Errors
    /// Returns [`Error::PathUnreadable`] if the inbox cannot be listed.
    pub fn list_untracked(&self) -> Result<Vec<String>> {
        let mut untracked = Vec::new();
        for filename in migrate::list_files(&self.paths.inbox)? {
            if filename.starts_with('.') {
                continue;
            }
            if self.store.movie_by_filename(&filename)?.is_none() {
                untracked.push(filename);
            }
        }
        Ok(untracked)
    }

    /// Move untracked inbox files into the library and create records for them.
    ///
    /// New records are named after the file stem.
    /// With `parse`, the filename is decoded, missing entities are created
    /// and the movie is renamed to its canonical filename.
    ///
    /// # Errors
    /// Returns an error if the inbox cannot be listed or a file cannot be moved or stored.
    /// Files whose name is already taken in the library are skipped.
    pub fn import(&mut self, parse: bool) -> Result<ImportReport> {
        let mut report = ImportReport::default();

        for filename in self.list_untracked()? {
            if !self.paths.inbox.join(&filename).is_file() {
                continue;
            }

            match migrate::migrate(&filename, &self.paths.inbox, &self.paths.library) {
                Ok(()) => {}
                Err(error) if error.is_path_conflict() => {
                    crate::print_warning!("{error}");
                    report.skipped.push(filename);
                    continue;
                }
                Err(error) => return Err(error),
            }
            if let Some(journal) = self.journal.as_mut() {
                journal.log_migrate(&filename, &self.paths.inbox, &self.paths.library);
            }

            let new_movie = NewMovie {
                filename: filename.clone(),
                name: Some(split_extension(&filename).0.to_string()),
                processed: false,
            };
            let movie = match self.store.insert_movie(&new_movie) {
                Ok(movie) => movie,
                Err(error) => {
                    migrate::migrate(&filename, &self.paths.library, &self.paths.inbox).map_err(|e| {
                        Error::Internal(format!("Failed to return {filename} to the inbox after: {error}: {e}"))
                    })?;
                    return Err(error);
                }
            };

            if self.verbose {
                println!("Imported {}", movie.filename.cyan());
            }

            let movie = if parse {
                match self.apply_decoded_metadata(movie.clone(), false) {
                    Ok(change) => {
                        report.links.merge(change.links);
                        change.movie
                    }
                    Err(error) if error.is_path_conflict() || matches!(error, Error::InvalidEntityName { .. }) => {
                        crate::print_warning!("{error}");
                        movie
                    }
                    Err(error) => return Err(error),
                }
            } else {
                movie
            };

            report.movies.push(movie);
        }

        if let Some(journal) = self.journal.as_mut() {
            journal.log_summary(
                "import",
                &format!("{} imported, {} skipped", report.movies.len(), report.skipped.len()),
            );
        }
        Ok(report)
    }

    /// Replace the display name, studio, series and series number of a movie.
    ///
    /// The movie is marked as processed.
    /// The series number is dropped when the movie has no series.
    ///
    /// # Errors
    /// Returns an error if the movie or a referenced entity does not exist,
    /// or the new filename is already taken.
    pub fn update_movie(&mut self, id: MovieId, update: &MovieUpdate) -> Result<MovieChange> {
        let before = self.store.require_movie(id)?;
        let studio = update
            .studio
            .as_deref()
            .map(|name| self.store.require_entity(AttributeKind::Studio, name))
            .transpose()?;
        let series = update
            .series
            .as_deref()
            .map(|name| self.store.require_entity(AttributeKind::Series, name))
            .transpose()?;

        let mut after = before.clone();
        after.name = update.name.clone().filter(|name| !name.is_empty());
        after.series_number = series.as_ref().and(update.series_number);
        after.studio = studio;
        after.series = series;

        if after == before {
            return Ok(MovieChange::unchanged(before));
        }

        after.processed = true;
        self.apply(&before, after)
    }

    /// Associate an existing entity with a movie.
    ///
    /// Studio and series replace the current one.
    /// Adding an entity the movie already has does nothing.
    ///
    /// # Errors
    /// Returns an error if the movie or entity does not exist, or the new filename is already taken.
    pub fn add_attribute(&mut self, id: MovieId, kind: AttributeKind, name: &str) -> Result<MovieChange> {
        let before = self.store.require_movie(id)?;
        let entity = self.store.require_entity(kind, name)?;
        if before.entities(kind).iter().any(|e| e.id == entity.id) {
            return Ok(MovieChange::unchanged(before));
        }

        let mut after = before.clone();
        after.insert_entity(entity);
        self.apply(&before, after)
    }

    /// Remove an entity from a movie.
    ///
    /// Removing the series also clears the series number.
    /// Removing an entity the movie does not have does nothing.
    ///
    /// # Errors
    /// Returns an error if the movie or entity does not exist, or the new filename is already taken.
    pub fn remove_attribute(&mut self, id: MovieId, kind: AttributeKind, name: &str) -> Result<MovieChange> {
        let before = self.store.require_movie(id)?;
        let entity = self.store.require_entity(kind, name)?;
        if !before.entities(kind).iter().any(|e| e.id == entity.id) {
            return Ok(MovieChange::unchanged(before));
        }

        let mut after = before.clone();
        after.remove_entity(kind, entity.id);
        self.apply(&before, after)
    }

    /// Move a movie back to the inbox, remove all of its links and delete its record.
    ///
    /// # Errors
    /// Returns an error if the movie does not exist or the inbox already has a file with the same name.
    pub fn delete_movie(&mut self, id: MovieId) -> Result<MovieChange> {
        let movie = self.store.require_movie(id)?;

        migrate::migrate(&movie.filename, &self.paths.library, &self.paths.inbox)?;
        if let Some(journal) = self.journal.as_mut() {
            journal.log_migrate(&movie.filename, &self.paths.library, &self.paths.inbox);
        }

        let mut links = LinkReport::default();
        for kind in AttributeKind::ALL {
            for name in movie.entity_names(kind) {
                self.set_link(kind, &movie.filename, name, false, &mut links);
            }
        }

        self.store.delete_movie(id).map_err(|e| {
            Error::Internal(format!(
                "Failed to delete record of {} after moving it to the inbox: {e}",
                movie.filename
            ))
        })?;
        if let Some(journal) = self.journal.as_mut() {
            journal.log_delete(&movie.filename);
        }
        if self.verbose {
            println!("Deleted {}", movie.filename.red());
        }

        Ok(MovieChange {
            previous_filename: movie.filename.clone(),
            movie,
            links,
        })
    }

    /// Create a new entity.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateEntity`] if the name is already taken.
    pub fn add_entity(&mut self, kind: AttributeKind, name: &str) -> Result<Entity> {
        let entity = self.store.insert_entity(kind, name)?;
        if let Some(journal) = self.journal.as_mut() {
            journal.log_entity("add", kind, &entity.name);
        }
        Ok(entity)
    }

    /// Rename an entity and every movie that references it.
    ///
    /// All new filenames are checked before anything is renamed,
    /// both against the library and against each other.
    /// The movie files are renamed first and the records are stored together afterwards.
    /// If a rename or the store fails, the files renamed so far are moved back.
    ///
    /// # Errors
    /// Returns an error if the entity does not exist, the new name is invalid or taken,
    /// or one of the new movie filenames is already taken.
    pub fn rename_entity(&mut self, kind: AttributeKind, name: &str, new_name: &str) -> Result<Vec<MovieChange>> {
        check_entity_name(kind, new_name)?;
        let entity = self.store.require_entity(kind, name)?;
        if let Some(existing) = self.store.entity_by_name(kind, new_name)?
            && existing.id != entity.id
        {
            return Err(Error::DuplicateEntity {
                kind,
                name: new_name.to_string(),
            });
        }

        let renamed_entity = Entity {
            name: new_name.to_string(),
            sort_key: crate::sort_key(new_name),
            ..entity
        };
        let mut targets = HashSet::new();
        let mut updated: Vec<(MovieRecord, MovieRecord)> = Vec::new();
        for before in self.store.movies_with_entity(kind, renamed_entity.id)? {
            let mut after = before.clone();
            after.replace_entity(renamed_entity.clone());
            after.filename = encode_filename(&after.metadata(), &before.filename);
            if !migrate::is_plain_name(&after.filename) {
                return Err(Error::InvalidFilename(after.filename));
            }
            let target = self.paths.library.join(&after.filename);
            let occupied = after.filename != before.filename && migrate::path_exists(&target);
            if occupied || !targets.insert(after.filename.clone()) {
                return Err(Error::PathConflict {
                    source_path: self.paths.library.join(&before.filename),
                    target_path: target,
                });
            }
            updated.push((before, after));
        }

        let mut moved: Vec<(PathBuf, PathBuf)> = Vec::new();
        for (before, after) in &updated {
            if before.filename == after.filename {
                continue;
            }
            let source = self.paths.library.join(&before.filename);
            let target = self.paths.library.join(&after.filename);
            if let Err(error) = migrate::rename(&source, &target) {
                return Err(undo_renames(moved, error));
            }
            moved.push((source, target));
        }

        let records: Vec<MovieRecord> = updated.iter().map(|(_, after)| after.clone()).collect();
        if let Err(error) = self.store.rename_entity(kind, renamed_entity.id, new_name, &records) {
            return Err(undo_renames(moved, error));
        }

        if let Some(journal) = self.journal.as_mut() {
            journal.log_entity("rename", kind, &format!("{name} -> {new_name}"));
            for (before, after) in &updated {
                if before.filename != after.filename {
                    journal.log_rename(&before.filename, &after.filename);
                }
            }
        }

        let mut changes = Vec::with_capacity(updated.len());
        for (before, after) in updated {
            let links = self.reconcile_links(&before, &after);
            changes.push(MovieChange {
                movie: after,
                previous_filename: before.filename,
                links,
            });
        }
        Ok(changes)
    }

    /// Delete an entity that no movie references.
    ///
    /// # Errors
    /// Returns an error if the entity does not exist or is still referenced.
    pub fn delete_entity(&mut self, kind: AttributeKind, name: &str) -> Result<Entity> {
        let entity = self.store.require_entity(kind, name)?;
        let entity = self.store.delete_entity(kind, entity.id)?;

        // Leftover empty directory from earlier link removals
        match self.link_directory(kind).prune(&entity.name) {
            Ok(Prune::Removed) if self.verbose => println!("Removed empty {kind} directory {}", entity.name),
            Ok(_) => {}
            Err(error) => crate::print_warning!("{error}"),
        }

        if let Some(journal) = self.journal.as_mut() {
            journal.log_entity("delete", kind, &entity.name);
        }
        Ok(entity)
    }

    /// Apply the metadata decoded from the current filename,
    /// creating missing entities and renaming the movie to its canonical filename.
    ///
    /// Entities created here are removed again if the movie cannot be updated.
    pub(crate) fn apply_decoded_metadata(&mut self, before: MovieRecord, processed: bool) -> Result<MovieChange> {
        let mut created = Vec::new();
        let result = match self.decoded_record(&before, processed, &mut created) {
            Ok(after) if after == before => return Ok(MovieChange::unchanged(before)),
            Ok(after) => self.apply(&before, after),
            Err(error) => Err(error),
        };

        if result.is_err() {
            for entity in created {
                if let Err(error) = self.store.delete_entity(entity.kind, entity.id) {
                    crate::print_warning!("Failed to remove unused {} {}: {error}", entity.kind, entity.name);
                }
            }
        }
        result
    }

    /// Copy of the record with the metadata decoded from its filename.
    /// Entities that did not exist yet are added to `created`.
    fn decoded_record(&self, before: &MovieRecord, processed: bool, created: &mut Vec<Entity>) -> Result<MovieRecord> {
        let metadata = decode_filename(&before.filename);
        let mut after = before.clone();
        after.name = metadata.name.filter(|name| !name.is_empty());
        after.processed = processed;

        if let Some(studio) = metadata.studio.as_deref().filter(|s| !s.is_empty()) {
            after.insert_entity(self.resolve_entity(AttributeKind::Studio, studio, created)?);
        }
        if let Some(series) = metadata.series.as_deref().filter(|s| !s.is_empty()) {
            after.insert_entity(self.resolve_entity(AttributeKind::Series, series, created)?);
            after.series_number = metadata.series_number;
        }
        for actor in metadata.actors.iter().filter(|a| !a.is_empty()) {
            after.insert_entity(self.resolve_entity(AttributeKind::Actor, actor, created)?);
        }
        Ok(after)
    }

    fn resolve_entity(&self, kind: AttributeKind, name: &str, created: &mut Vec<Entity>) -> Result<Entity> {
        if let Some(entity) = self.store.entity_by_name(kind, name)? {
            return Ok(entity);
        }
        let entity = self.store.insert_entity(kind, name)?;
        created.push(entity.clone());
        Ok(entity)
    }

    /// Rename the movie file to match the updated record, store it and reconcile links.
    ///
    /// Nothing is modified if the new filename is invalid or already taken,
    /// or an entity no longer exists.
    /// Once the file has been renamed, only link failures are tolerated.
    pub(crate) fn apply(&mut self, before: &MovieRecord, mut after: MovieRecord) -> Result<MovieChange> {
        let old_filename = before.filename.clone();
        let new_filename = encode_filename(&after.metadata(), &old_filename);
        let renamed = new_filename != old_filename;
        if renamed && !migrate::is_plain_name(&new_filename) {
            return Err(Error::InvalidFilename(new_filename));
        }

        for kind in AttributeKind::ALL {
            for entity in after.entities(kind) {
                if self.store.entity(kind, entity.id)?.is_none() {
                    return Err(Error::UnknownEntity {
                        kind,
                        name: entity.name.clone(),
                    });
                }
            }
        }

        if renamed {
            migrate::rename(
                &self.paths.library.join(&old_filename),
                &self.paths.library.join(&new_filename),
            )?;
            after.filename = new_filename;

            if let Some(journal) = self.journal.as_mut() {
                journal.log_rename(&old_filename, &after.filename);
            }

            self.store.update_movie(&after).map_err(|e| {
                Error::Internal(format!(
                    "Failed to update record after renaming {old_filename} -> {}: {e}",
                    after.filename
                ))
            })?;
        } else {
            self.store.update_movie(&after)?;
        }

        let links = self.reconcile_links(before, &after);
        Ok(MovieChange {
            movie: after,
            previous_filename: old_filename,
            links,
        })
    }

    /// Update the link directories from the memberships in `before` to those in `after`.
    /// If the filename changed, every link moves to the new name.
    fn reconcile_links(&mut self, before: &MovieRecord, after: &MovieRecord) -> LinkReport {
        let renamed = before.filename != after.filename;
        let mut links = LinkReport::default();
        for kind in AttributeKind::ALL {
            let old_names = before.entity_names(kind);
            let new_names = after.entity_names(kind);
            if !renamed && old_names == new_names {
                continue;
            }

            for name in &old_names {
                if renamed || !new_names.contains(name) {
                    self.set_link(kind, &before.filename, name, false, &mut links);
                }
            }
            for name in &new_names {
                self.set_link(kind, &after.filename, name, true, &mut links);
            }
        }
        links
    }

    /// Update a single link, recording the outcome.
    /// Failures are printed and journaled but never returned.
    pub(crate) fn set_link(
        &mut self,
        kind: AttributeKind,
        filename: &str,
        entity: &str,
        present: bool,
        report: &mut LinkReport,
    ) {
        let outcome = self.link_directory(kind).set_link(filename, entity, present);
        match outcome {
            Ok(LinkOutcome::Created) => {
                report.created += 1;
                if self.verbose {
                    println!("  {} {kind}: {entity}", "+".green());
                }
            }
            Ok(LinkOutcome::Removed(prune)) => {
                report.removed += 1;
                if prune == Prune::Removed {
                    report.pruned += 1;
                }
                if self.verbose {
                    println!("  {} {kind}: {entity}", "-".red());
                }
            }
            Ok(LinkOutcome::AlreadyPresent | LinkOutcome::Absent) => {}
            Err(error) => {
                crate::print_warning!("{error}");
                if let Some(journal) = self.journal.as_mut() {
                    journal.log_link_failure(kind, entity, &error.to_string());
                }
                report.failures.push(LinkFailure {
                    kind,
                    entity: entity.to_string(),
                    filename: filename.to_string(),
                    error,
                });
            }
        }
    }
}

impl<S: MovieStore + fmt::Debug> fmt::Debug for Organizer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Organizer")
            .field("paths", &self.paths)
            .field("store", &self.store)
            .field("journal", &self.journal)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

/// Move renamed files back to their original names and return the error to report.
fn undo_renames(moved: Vec<(PathBuf, PathBuf)>, error: Error) -> Error {
    for (source, target) in moved.into_iter().rev() {
        if let Err(undo) = migrate::rename(&target, &source) {
            return Error::Internal(format!(
                "Failed to move {} back to {} after: {error}: {undo}",
                target.display(),
                source.display()
            ));
        }
    }
    error
}

/// Absolute form of a path, resolving symlinks when the path exists.
fn absolute_path(path: &Path) -> Result<PathBuf> {
    dunce::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .map_err(|e| Error::io(format!("Failed to resolve absolute path for {}", path.display()), e))
}
