use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::AttributeKind;

const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "MOVIE_ORGANIZER_PATH";

/// Default database filename inside the base directory.
pub const DATABASE_FILENAME: &str = "mvorganizer.db";

/// Path to the user config file: `$HOME/.config/mv-organizer.toml`,
/// or the path given in the `MOVIE_ORGANIZER_PATH` environment variable.
///
/// Returns `None` if the home directory cannot be determined.
pub static CONFIG_PATH: LazyLock<Option<PathBuf>> = LazyLock::new(|| {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let home_dir = dirs::home_dir()?;
    Some(home_dir.join(".config").join(format!("{PROJECT_NAME}.toml")))
});

/// Filesystem locations used by the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryPaths {
    /// Newly discovered files waiting for import.
    pub inbox: PathBuf,
    /// Canonical location of every tracked movie file.
    pub library: PathBuf,
    pub actors: PathBuf,
    pub categories: PathBuf,
    pub series: PathBuf,
    pub studios: PathBuf,
    /// `SQLite` database file.
    pub database: PathBuf,
}

/// Config from the user config file.
#[derive(Debug, Default, Deserialize)]
pub struct OrganizerConfig {
    #[serde(default)]
    pub base: Option<PathBuf>,
    #[serde(default)]
    pub inbox: Option<PathBuf>,
    #[serde(default)]
    pub library: Option<PathBuf>,
    #[serde(default)]
    pub actors: Option<PathBuf>,
    #[serde(default)]
    pub categories: Option<PathBuf>,
    #[serde(default)]
    pub series: Option<PathBuf>,
    #[serde(default)]
    pub studios: Option<PathBuf>,
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub journal: bool,
    #[serde(default)]
    pub verbose: bool,
}

/// Wrapper needed for parsing the user config file section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    mvorganizer: OrganizerConfig,
}

impl LibraryPaths {
    /// Standard layout with every location inside a single base directory.
    #[must_use]
    pub fn under(base: &Path) -> Self {
        Self {
            inbox: base.join("imports"),
            library: base.join("movies"),
            actors: base.join("actors"),
            categories: base.join("categories"),
            series: base.join("series"),
            studios: base.join("studios"),
            database: base.join(DATABASE_FILENAME),
        }
    }

    /// Link directory root for the given attribute kind.
    #[must_use]
    pub fn link_root(&self, kind: AttributeKind) -> &Path {
        match kind {
            AttributeKind::Actor => &self.actors,
            AttributeKind::Category => &self.categories,
            AttributeKind::Series => &self.series,
            AttributeKind::Studio => &self.studios,
        }
    }

    /// Create any missing directories.
    ///
    /// # Errors
    /// Returns an error if a directory cannot be created.
    pub fn create_directories(&self) -> Result<()> {
        for dir in [
            &self.inbox,
            &self.library,
            &self.actors,
            &self.categories,
            &self.series,
            &self.studios,
        ] {
            fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        if let Some(parent) = self.database.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
        }
        Ok(())
    }
}

impl OrganizerConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    pub fn get_user_config() -> Result<Self> {
        let Some(path) = CONFIG_PATH.as_deref() else {
            return Ok(Self::default());
        };

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse config file {}:\n{e}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {error}",
                path.display()
            )),
        }
    }

    /// Parse config from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.mvorganizer)
            .with_context(|| "Failed to parse config TOML")
    }

    /// Resolve library locations.
    ///
    /// An explicit `base` takes precedence over the configured one.
    /// Locations not set individually are placed inside the base directory.
    ///
    /// # Errors
    /// Returns an error if no base directory is available and a location is missing.
    pub fn library_paths(&self, base: Option<&Path>) -> Result<LibraryPaths> {
        let base = base.map(Path::to_path_buf).or_else(|| self.base.clone());
        let resolve = |value: &Option<PathBuf>, name: &str, default: &dyn Fn(&Path) -> PathBuf| {
            value.clone().map_or_else(
                || {
                    base.as_deref()
                        .map(default)
                        .with_context(|| format!("No base directory configured for the {name} location"))
                },
                Ok,
            )
        };

        Ok(LibraryPaths {
            inbox: resolve(&self.inbox, "inbox", &|b| b.join("imports"))?,
            library: resolve(&self.library, "library", &|b| b.join("movies"))?,
            actors: resolve(&self.actors, "actors", &|b| b.join("actors"))?,
            categories: resolve(&self.categories, "categories", &|b| b.join("categories"))?,
            series: resolve(&self.series, "series", &|b| b.join("series"))?,
            studios: resolve(&self.studios, "studios", &|b| b.join("studios"))?,
            database: resolve(&self.database, "database", &|b| b.join(DATABASE_FILENAME))?,
        })
    }
}
