//! Link directories: symlink trees indexing movies by attribute.
//!
//! Each attribute kind has its own root with one directory per entity name,
//! holding a symlink per movie file that points back into the library:
//!
//! ```text
//! <root>/<entity name>/<movie filename> -> <library>/<movie filename>
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::LinkError;
use crate::migrate::{is_plain_name, path_exists};
use crate::types::AttributeKind;

/// Result of a successful [`LinkDirectory::set_link`] call.
#[derive(Debug, PartialEq, Eq)]
pub enum LinkOutcome {
    /// New symlink was created.
    Created,
    /// Symlink with the same name already existed.
    AlreadyPresent,
    /// Symlink was removed, followed by best-effort cleanup of the entity directory.
    Removed(Prune),
    /// There was no symlink to remove.
    Absent,
}

/// Best-effort removal of an entity directory.
#[derive(Debug, PartialEq, Eq)]
pub enum Prune {
    /// Directory was empty and got removed.
    Removed,
    /// Directory could not be removed, usually because it still holds other links.
    Ignored(io::ErrorKind),
}

/// Link directory tree for one attribute kind.
#[derive(Debug, Clone)]
pub struct LinkDirectory {
    kind: AttributeKind,
    root: PathBuf,
    library: PathBuf,
}

impl LinkDirectory {
    /// Create a link directory handle.
    ///
    /// Link targets are built from `library`, which should be an absolute path.
    #[must_use]
    pub const fn new(kind: AttributeKind, root: PathBuf, library: PathBuf) -> Self {
        Self { kind, root, library }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the links for one entity.
    ///
    /// # Errors
    /// Returns [`LinkError::InvalidName`] unless the entity name is a single plain path component.
    pub fn entity_dir(&self, entity: &str) -> Result<PathBuf, LinkError> {
        self.check_name(entity)?;
        Ok(self.root.join(entity))
    }

    /// Path of the link for a movie file under an entity.
    ///
    /// # Errors
    /// Returns [`LinkError::InvalidName`] unless both names are single plain path components.
    pub fn link_path(&self, filename: &str, entity: &str) -> Result<PathBuf, LinkError> {
        self.check_name(filename)?;
        Ok(self.entity_dir(entity)?.join(filename))
    }

    fn check_name(&self, name: &str) -> Result<(), LinkError> {
        if is_plain_name(name) {
            Ok(())
        } else {
            Err(LinkError::InvalidName {
                kind: self.kind,
                name: name.to_string(),
            })
        }
    }

    /// Path the link for a movie file should point to.
    #[must_use]
    pub fn target_path(&self, filename: &str) -> PathBuf {
        self.library.join(filename)
    }

    /// Add or remove the link for a movie file under an entity.
    ///
    /// Adding is idempotent: an existing entry with the same name is left as is.
    /// Removing a missing link does nothing.
    /// After removing a link the entity directory is removed if it became empty;
    /// failing to remove it is reported in the outcome, never as an error.
    ///
    /// # Errors
    /// Returns a [`LinkError`] if the entity directory or the link cannot be created,
    /// or an existing link cannot be removed.
    pub fn set_link(&self, filename: &str, entity: &str, present: bool) -> Result<LinkOutcome, LinkError> {
        if present {
            self.add_link(filename, entity)
        } else {
            self.remove_link(filename, entity)
        }
    }

    /// Remove the entity directory if it is empty.
    ///
    /// # Errors
    /// Returns [`LinkError::InvalidName`] if the entity name is not a plain directory name.
    pub fn prune(&self, entity: &str) -> Result<Prune, LinkError> {
        let entity_dir = self.entity_dir(entity)?;
        Ok(match fs::remove_dir(&entity_dir) {
            Ok(()) => Prune::Removed,
            Err(error) => Prune::Ignored(error.kind()),
        })
    }

    fn add_link(&self, filename: &str, entity: &str) -> Result<LinkOutcome, LinkError> {
        let link = self.link_path(filename, entity)?;
        let entity_dir = self.entity_dir(entity)?;
        if !entity_dir.is_dir() {
            fs::create_dir_all(&entity_dir).map_err(|source| LinkError::CreateDirectory {
                path: entity_dir.clone(),
                source,
            })?;
        }

        if path_exists(&link) {
            return Ok(LinkOutcome::AlreadyPresent);
        }

        let target = self.target_path(filename);
        symlink(&target, &link).map_err(|source| LinkError::CreateLink { target, link, source })?;

        Ok(LinkOutcome::Created)
    }

    fn remove_link(&self, filename: &str, entity: &str) -> Result<LinkOutcome, LinkError> {
        let link = self.link_path(filename, entity)?;
        if !path_exists(&link) {
            return Ok(LinkOutcome::Absent);
        }

        fs::remove_file(&link).map_err(|source| LinkError::RemoveLink { link, source })?;

        Ok(LinkOutcome::Removed(self.prune(entity)?))
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::File;

    use tempfile::{TempDir, tempdir};

    fn setup() -> (TempDir, LinkDirectory) {
        let dir = tempdir().unwrap();
        let library = dir.path().join("movies");
        fs::create_dir_all(&library).unwrap();
        File::create(library.join("[Acme] Title.mp4")).unwrap();
        let links = LinkDirectory::new(AttributeKind::Studio, dir.path().join("studios"), library);
        (dir, links)
    }

    #[test]
    fn add_link_creates_directory_and_symlink() {
        let (_dir, links) = setup();

        let outcome = links.set_link("[Acme] Title.mp4", "Acme", true).unwrap();

        assert_eq!(outcome, LinkOutcome::Created);
        let link = links.link_path("[Acme] Title.mp4", "Acme").unwrap();
        assert!(link.is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), links.target_path("[Acme] Title.mp4"));
        assert!(link.exists());
    }

    #[test]
    fn add_link_twice_is_idempotent() {
        let (_dir, links) = setup();

        links.set_link("[Acme] Title.mp4", "Acme", true).unwrap();
        let outcome = links.set_link("[Acme] Title.mp4", "Acme", true).unwrap();

        assert_eq!(outcome, LinkOutcome::AlreadyPresent);
        assert_eq!(fs::read_dir(links.entity_dir("Acme").unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn remove_link_prunes_empty_directory() {
        let (_dir, links) = setup();
        links.set_link("[Acme] Title.mp4", "Acme", true).unwrap();

        let outcome = links.set_link("[Acme] Title.mp4", "Acme", false).unwrap();

        assert_eq!(outcome, LinkOutcome::Removed(Prune::Removed));
        assert!(!links.entity_dir("Acme").unwrap().exists());
    }

    #[test]
    fn remove_link_keeps_directory_with_other_links() {
        let (_dir, links) = setup();
        links.set_link("[Acme] Title.mp4", "Acme", true).unwrap();
        links.set_link("[Acme] Other.mp4", "Acme", true).unwrap();

        let outcome = links.set_link("[Acme] Title.mp4", "Acme", false).unwrap();

        assert!(matches!(outcome, LinkOutcome::Removed(Prune::Ignored(_))));
        assert!(links.entity_dir("Acme").unwrap().is_dir());
        assert!(links.link_path("[Acme] Other.mp4", "Acme").unwrap().is_symlink());
    }

    #[test]
    fn remove_missing_link_is_noop() {
        let (_dir, links) = setup();
        links.set_link("[Acme] Title.mp4", "Acme", true).unwrap();
        links.set_link("[Acme] Title.mp4", "Acme", false).unwrap();

        let outcome = links.set_link("[Acme] Title.mp4", "Acme", false).unwrap();

        assert_eq!(outcome, LinkOutcome::Absent);
    }

    #[test]
    fn remove_broken_link() {
        let (_dir, links) = setup();
        links.set_link("Gone.mp4", "Acme", true).unwrap();
        let link = links.link_path("Gone.mp4", "Acme").unwrap();
        assert!(link.is_symlink());
        assert!(!link.exists());

        let outcome = links.set_link("Gone.mp4", "Acme", false).unwrap();

        assert_eq!(outcome, LinkOutcome::Removed(Prune::Removed));
        assert!(!link.is_symlink());
    }

    #[test]
    fn create_directory_failure_is_reported() {
        let (dir, _) = setup();
        let blocker = dir.path().join("blocker");
        File::create(&blocker).unwrap();
        let links = LinkDirectory::new(AttributeKind::Actor, blocker, dir.path().join("movies"));

        let result = links.set_link("[Acme] Title.mp4", "Al", true);

        assert!(matches!(result, Err(LinkError::CreateDirectory { .. })));
    }

    #[test]
    fn names_outside_the_root_are_refused() {
        let (dir, links) = setup();
        let library = dir.path().join("movies");

        for entity in ["", ".", "..", "../movies", "/tmp"] {
            let result = links.set_link("[Acme] Title.mp4", entity, false);
            assert!(matches!(result, Err(LinkError::InvalidName { .. })), "{entity:?}");
            let result = links.set_link("[Acme] Title.mp4", entity, true);
            assert!(matches!(result, Err(LinkError::InvalidName { .. })), "{entity:?}");
        }
        let result = links.set_link("../[Acme] Title.mp4", "Acme", false);
        assert!(matches!(result, Err(LinkError::InvalidName { .. })));

        assert!(library.join("[Acme] Title.mp4").is_file());
        assert!(matches!(links.prune(".."), Err(LinkError::InvalidName { .. })));
        assert!(library.is_dir());
    }

    #[test]
    fn prune_keeps_directory_with_links() {
        let (_dir, links) = setup();
        links.set_link("[Acme] Title.mp4", "Acme", true).unwrap();

        assert!(matches!(links.prune("Acme"), Ok(Prune::Ignored(_))));
        fs::remove_file(links.link_path("[Acme] Title.mp4", "Acme").unwrap()).unwrap();
        assert_eq!(links.prune("Acme").unwrap(), Prune::Removed);
    }

    #[cfg(unix)]
    #[test]
    fn create_link_failure_is_reported() {
        let (_dir, links) = setup();
        let filename = format!("{}.mp4", "x".repeat(300));

        let result = links.set_link(&filename, "Acme", true);

        assert!(matches!(result, Err(LinkError::CreateLink { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn remove_link_failure_is_reported() {
        let (_dir, links) = setup();
        // A directory where the link should be cannot be removed as a file
        fs::create_dir_all(links.link_path("[Acme] Title.mp4", "Acme").unwrap()).unwrap();

        let result = links.set_link("[Acme] Title.mp4", "Acme", false);

        assert!(matches!(result, Err(LinkError::RemoveLink { .. })));
        assert!(links.link_path("[Acme] Title.mp4", "Acme").unwrap().is_dir());
    }
}
