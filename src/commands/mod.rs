//! CLI command implementations
//!
//! Each subcommand of the `tiffgrid` binary is a thin consumer of the
//! reader, writer and copier APIs.

pub mod command_traits;
pub mod info_command;
pub mod copy_command;
pub mod compact_command;

pub use command_traits::{Command, CommandFactory};
pub use info_command::InfoCommand;
pub use copy_command::CopyCommand;
pub use compact_command::CompactCommand;

use clap::ArgMatches;
use crate::config::Settings;
use crate::tiff::errors::{TiffError, TiffResult};

/// Factory for creating command instances based on CLI arguments
pub struct TiffgridCommandFactory;

impl TiffgridCommandFactory {
    /// Create a new factory instance
    pub fn new() -> Self {
        TiffgridCommandFactory
    }
}

impl Default for TiffgridCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CommandFactory<'a> for TiffgridCommandFactory {
    fn create_command(&self, args: &ArgMatches, settings: &'a Settings) -> TiffResult<Box<dyn Command + 'a>> {
        match args.subcommand() {
            Some(("info", sub)) => Ok(Box::new(InfoCommand::new(sub, settings)?)),
            Some(("copy", sub)) => Ok(Box::new(CopyCommand::new(sub, settings)?)),
            Some(("compact", sub)) => Ok(Box::new(CompactCommand::new(sub, settings)?)),
            Some((name, _)) => Err(TiffError::GenericError(format!("Unknown command: {}", name))),
            None => Err(TiffError::GenericError("No command given; see --help".to_string())),
        }
    }
}

/// Reads a required string argument
pub(crate) fn required_arg(args: &ArgMatches, name: &str) -> TiffResult<String> {
    args.get_one::<String>(name)
        .cloned()
        .ok_or_else(|| TiffError::GenericError(format!("Missing argument: {}", name)))
}
