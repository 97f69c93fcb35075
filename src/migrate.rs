//! Moving files between the inbox and the library.

use std::fs;
use std::path::{Component, Path};

use itertools::Itertools;

use crate::error::{Error, Result};

/// List the entry names in a directory, sorted.
///
/// Names that are not valid UTF-8 cannot be stored in a record,
/// so they are skipped with a warning.
///
/// # Errors
/// Returns [`Error::PathUnreadable`] if the directory cannot be read.
pub fn list_files(path: &Path) -> Result<Vec<String>> {
    let unreadable = |source| Error::PathUnreadable {
        path: path.to_path_buf(),
        source,
    };

    let entries = fs::read_dir(path).map_err(unreadable)?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(unreadable)?;
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => crate::print_warning!(
                "Skipping {}: name is not valid UTF-8",
                path.join(name).display()
            ),
        }
    }

    Ok(names.into_iter().sorted_unstable().collect())
}

/// Check that a name is a single normal path component,
/// so joining it to a directory stays inside that directory.
///
/// ```rust
/// use mv_organizer::migrate::is_plain_name;
///
/// assert!(is_plain_name("[Acme] Title.mp4"));
/// assert!(!is_plain_name(""));
/// assert!(!is_plain_name(".."));
/// assert!(!is_plain_name("../movies"));
/// assert!(!is_plain_name("/x"));
/// ```
#[must_use]
pub fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Check if anything, including a dangling symlink, exists at the path.
#[must_use]
pub fn path_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Move a file from one root directory to another, keeping its name.
///
/// The source is left untouched when the destination already exists.
///
/// # Errors
/// Returns [`Error::PathConflict`] if the destination exists,
/// or [`Error::Io`] if the rename itself fails.
pub fn migrate(filename: &str, from_root: &Path, to_root: &Path) -> Result<()> {
    rename(&from_root.join(filename), &to_root.join(filename))
}

/// Rename a path, refusing to overwrite an existing destination.
///
/// # Errors
/// Returns [`Error::PathConflict`] if the destination exists,
/// or [`Error::Io`] if the rename itself fails.
pub fn rename(source: &Path, target: &Path) -> Result<()> {
    if path_exists(target) {
        return Err(Error::PathConflict {
            source_path: source.to_path_buf(),
            target_path: target.to_path_buf(),
        });
    }

    fs::rename(source, target).map_err(|e| {
        Error::io(
            format!("Failed to move {} -> {}", source.display(), target.display()),
            e,
        )
    })
}
