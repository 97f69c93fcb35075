use anyhow::Result;

use mv_organizer::config::{LibraryPaths, OrganizerConfig};

use crate::Args;

/// Final config combined from CLI arguments and user config file.
#[derive(Debug)]
pub struct Config {
    pub(crate) paths: LibraryPaths,
    pub(crate) journal: bool,
    pub(crate) verbose: bool,
}

impl Config {
    /// Create config from given command line args and user config file.
    ///
    /// # Errors
    /// Returns an error if the config file is invalid or no base directory is known.
    pub fn from_args(args: &Args) -> Result<Self> {
        let user_config = OrganizerConfig::get_user_config()?;
        Self::from_user_config(args, &user_config)
    }

    fn from_user_config(args: &Args, user_config: &OrganizerConfig) -> Result<Self> {
        let paths = user_config.library_paths(args.base.as_deref())?;
        Ok(Self {
            paths,
            journal: args.journal || user_config.journal,
            verbose: args.verbose || user_config.verbose,
        })
    }
}
