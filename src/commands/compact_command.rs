//! Compact command
//!
//! Rewrites a TIFF file in place, dropping data no IFD references, such as
//! IFDs relocated while completing images.

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::commands::required_arg;
use crate::config::Settings;
use crate::copier::TiffCopier;
use crate::tiff::errors::TiffResult;

/// Command compacting a file
pub struct CompactCommand<'a> {
    input_file: String,
    settings: &'a Settings,
}

impl<'a> CompactCommand<'a> {
    pub fn new(args: &ArgMatches, settings: &'a Settings) -> TiffResult<Self> {
        Ok(CompactCommand {
            input_file: required_arg(args, "input")?,
            settings,
        })
    }
}

impl<'a> Command for CompactCommand<'a> {
    fn execute(&self) -> TiffResult<()> {
        let before = std::fs::metadata(&self.input_file)?.len();
        let copier = TiffCopier::new()
            .with_direct_copy(true)
            .with_reader_options(self.settings.reader.clone());
        let outcome = copier.compact(&self.input_file)?;
        let after = std::fs::metadata(&self.input_file)?.len();
        info!("Compacted {}: {} image(s), {} -> {} bytes", self.input_file, outcome.images, before, after);
        Ok(())
    }
}
