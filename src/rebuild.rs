//! Recovering records and links from the files on disk.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::fs;

use walkdir::WalkDir;

use crate::error::Result;
use crate::filename::{decode_filename, split_extension};
use crate::links::Prune;
use crate::migrate;
use crate::organizer::{LinkReport, Organizer};
use crate::store::{MovieStore, NewMovie, check_entity_name};
use crate::types::{AttributeKind, MovieRecord};

/// Summary of a rebuild.
#[derive(Debug, Default)]
pub struct RebuildReport {
    /// Records created for library files.
    pub movies: Vec<MovieRecord>,
    /// Library files skipped because they already have a record.
    pub tracked: usize,
    /// Movies that kept their filename because the canonical one was taken.
    pub conflicts: Vec<String>,
    pub links: LinkReport,
}

/// Metadata collected for one library file from its name and the link directories.
#[derive(Debug, Default)]
struct Discovered {
    name: Option<String>,
    series_number: Option<u32>,
    actors: BTreeSet<String>,
    categories: BTreeSet<String>,
    series: BTreeSet<String>,
    studios: BTreeSet<String>,
    /// Existing links to the file, by kind and entity directory.
    linked: Vec<(AttributeKind, String)>,
}

impl Discovered {
    fn names_mut(&mut self, kind: AttributeKind) -> &mut BTreeSet<String> {
        match kind {
            AttributeKind::Actor => &mut self.actors,
            AttributeKind::Category => &mut self.categories,
            AttributeKind::Series => &mut self.series,
            AttributeKind::Studio => &mut self.studios,
        }
    }

    fn add(&mut self, kind: AttributeKind, name: &str) {
        if check_entity_name(kind, name).is_ok() {
            self.names_mut(kind).insert(name.to_string());
        }
    }

    /// Entity names to assign for a kind.
    /// Single-valued kinds get the first name in sort order.
    fn assigned(&mut self, kind: AttributeKind) -> Vec<String> {
        let names = std::mem::take(self.names_mut(kind));
        if kind.is_single() {
            names.into_iter().take(1).collect()
        } else {
            names.into_iter().collect()
        }
    }
}

impl fmt::Display for RebuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} movies added, {} already tracked, {} conflicts, {}",
            self.movies.len(),
            self.tracked,
            self.conflicts.len(),
            self.links
        )
    }
}

/// Visible entries of a directory, or nothing if it cannot be read.
fn visible_entries(path: &std::path::Path) -> Vec<String> {
    migrate::list_files(path)
        .unwrap_or_default()
        .into_iter()
        .filter(|name| !name.starts_with('.'))
        .collect()
}

impl<S: MovieStore> Organizer<S> {
    /// Create records for untracked library files.
    ///
    /// Metadata is gathered from the filename and from the link directories:
    /// every entity directory becomes an entity, and every link inside it
    /// assigns that entity to the movie file with the same name.
    /// When several studios or series are found, the first one in sort order wins.
    /// Each new record is then renamed to its canonical filename and linked.
    ///
    /// # Errors
    /// Returns an error if the library cannot be listed or the store fails.
    pub fn rebuild(&mut self) -> Result<RebuildReport> {
        let mut report = RebuildReport::default();
        let mut discovered: BTreeMap<String, Discovered> = BTreeMap::new();

        for filename in migrate::list_files(&self.paths().library)? {
            if filename.starts_with('.') {
                continue;
            }
            if self.store().movie_by_filename(&filename)?.is_some() {
                report.tracked += 1;
                continue;
            }
            let metadata = decode_filename(&filename);
            let mut entry = Discovered {
                name: metadata.name.filter(|name| !name.is_empty()),
                series_number: metadata.series_number,
                ..Discovered::default()
            };
            if let Some(studio) = metadata.studio.as_deref() {
                entry.add(AttributeKind::Studio, studio);
            }
            if let Some(series) = metadata.series.as_deref() {
                entry.add(AttributeKind::Series, series);
            }
            for actor in &metadata.actors {
                entry.add(AttributeKind::Actor, actor);
            }
            discovered.insert(filename, entry);
        }

        for kind in AttributeKind::ALL {
            let root = self.paths().link_root(kind).to_path_buf();
            for entity in visible_entries(&root) {
                if !root.join(&entity).is_dir() {
                    continue;
                }
                if let Err(error) = check_entity_name(kind, &entity) {
                    crate::print_warning!("Skipping {}: {error}", root.join(&entity).display());
                    continue;
                }
                self.store().get_or_insert_entity(kind, &entity)?;
                for filename in visible_entries(&root.join(&entity)) {
                    if let Some(entry) = discovered.get_mut(&filename) {
                        entry.add(kind, &entity);
                        entry.linked.push((kind, entity.clone()));
                    }
                }
            }
        }

        for (filename, mut entry) in discovered {
            let before = self.store().insert_movie(&NewMovie {
                filename: filename.clone(),
                name: entry.name.clone(),
                processed: true,
            })?;

            let mut after = before.clone();
            for kind in AttributeKind::ALL {
                for name in entry.assigned(kind) {
                    after.insert_entity(self.store().get_or_insert_entity(kind, &name)?);
                }
            }
            if after.series.is_some() {
                after.series_number = entry.series_number;
            }
            let categories = after.categories.clone();

            let (movie, mut links) = match self.apply(&before, after) {
                Ok(change) => (change.movie, change.links),
                Err(error) if error.is_path_conflict() => {
                    crate::print_warning!("{error}");
                    // Name the record after the whole stem so it still renders to its filename.
                    // Categories are not part of the filename and can be kept.
                    let mut fallback = before;
                    fallback.name = Some(split_extension(&filename).0.to_string());
                    fallback.categories = categories;
                    self.store().update_movie(&fallback)?;
                    report.conflicts.push(filename.clone());
                    (fallback, LinkReport::default())
                }
                Err(error) => return Err(error),
            };

            // Links found for entities the record did not get, or under the old filename
            for (kind, entity) in entry.linked {
                if movie.filename != filename || !movie.entity_names(kind).contains(&entity.as_str()) {
                    self.set_link(kind, &filename, &entity, false, &mut links);
                }
            }
            report.links.merge(links);
            report.movies.push(movie);
        }

        if let Some(journal) = self.journal_mut() {
            journal.log_summary("rebuild", &report.to_string());
        }
        Ok(report)
    }

    /// Regenerate the link directories from the stored records.
    ///
    /// Symlinks that no record accounts for, or that point to the wrong file, are removed.
    /// Missing links are created. Regular files inside the link directories are left alone.
    ///
    /// # Errors
    /// Returns an error if the records cannot be read.
    pub fn relink(&mut self) -> Result<LinkReport> {
        let movies = self.store().movies()?;
        let mut report = LinkReport::default();

        let expected: HashSet<(AttributeKind, &str, &str)> = movies
            .iter()
            .flat_map(|movie| {
                AttributeKind::ALL.into_iter().flat_map(move |kind| {
                    movie
                        .entity_names(kind)
                        .into_iter()
                        .map(move |name| (kind, name, movie.filename.as_str()))
                })
            })
            .collect();

        for kind in AttributeKind::ALL {
            let links = self.link_directory(kind).clone();
            if !links.root().is_dir() {
                continue;
            }

            let stale: Vec<(String, String)> = WalkDir::new(links.root())
                .min_depth(2)
                .max_depth(2)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|entry| entry.path_is_symlink())
                .filter_map(|entry| {
                    let names = entry.file_name().to_str().zip(
                        entry
                            .path()
                            .parent()
                            .and_then(|p| p.file_name())
                            .and_then(|name| name.to_str()),
                    );
                    let Some((filename, entity)) = names else {
                        crate::print_warning!("Skipping {}: name is not valid UTF-8", entry.path().display());
                        return None;
                    };
                    let (filename, entity) = (filename.to_string(), entity.to_string());
                    let wanted = expected.contains(&(kind, entity.as_str(), filename.as_str()))
                        && fs::read_link(entry.path()).is_ok_and(|target| target == links.target_path(&filename));
                    (!wanted).then_some((entity, filename))
                })
                .collect();

            for (entity, filename) in stale {
                self.set_link(kind, &filename, &entity, false, &mut report);
            }

            for entity in visible_entries(links.root()) {
                if links.prune(&entity).is_ok_and(|prune| prune == Prune::Removed) {
                    report.pruned += 1;
                }
            }
        }

        for movie in &movies {
            for kind in AttributeKind::ALL {
                for name in movie.entity_names(kind) {
                    self.set_link(kind, &movie.filename, name, true, &mut report);
                }
            }
        }

        if let Some(journal) = self.journal_mut() {
            journal.log_summary("relink", &report.to_string());
        }
        Ok(report)
    }
}
