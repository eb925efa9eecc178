//! Command pattern interfaces
//!
//! Every CLI subcommand is a `Command` built by a `CommandFactory` from the
//! parsed arguments and the loaded settings.

use crate::config::Settings;
use crate::tiff::errors::TiffResult;

/// Represents an executable command in the application
pub trait Command {
    /// Execute the command
    ///
    /// # Returns
    /// Result indicating success or an error
    fn execute(&self) -> TiffResult<()>;
}

/// Factory for creating commands from CLI arguments
pub trait CommandFactory<'a> {
    /// Create a new Command instance based on CLI arguments
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `settings` - Settings loaded from the config file, or defaults
    ///
    /// # Returns
    /// A command that implements the Command trait, or an error
    fn create_command(&self, args: &clap::ArgMatches, settings: &'a Settings) -> TiffResult<Box<dyn Command + 'a>>;
}
