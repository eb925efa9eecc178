//! Copy command
//!
//! Copies images of one TIFF file into a new file, re-encoding them or
//! copying their tiles directly.

use std::ops::Range;
use std::sync::{Arc, Mutex};

use clap::ArgMatches;
use log::{info, warn};

use crate::commands::command_traits::Command;
use crate::commands::required_arg;
use crate::compression::known::KnownCompression;
use crate::config::Settings;
use crate::copier::TiffCopier;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::reader::TiffReader;
use crate::tiff::writer::TiffWriter;
use crate::utils::progress::ProgressTracker;

/// Command copying images to a new file
pub struct CopyCommand<'a> {
    input_file: String,
    output_file: String,
    direct: bool,
    /// Target compression code
    compression: Option<u64>,
    big_tiff: bool,
    /// Image range as given on the command line
    images: Option<String>,
    settings: &'a Settings,
}

/// Parses an image range like `2..5`, `3..` or `4`
///
/// An open end stands for `count`.
pub fn parse_image_range(text: &str, count: usize) -> TiffResult<Range<usize>> {
    let invalid = || TiffError::GenericError(format!("Invalid image range: {}", text));
    let parse = |s: &str, default: usize| -> TiffResult<usize> {
        if s.trim().is_empty() {
            Ok(default)
        } else {
            s.trim().parse::<usize>().map_err(|_| invalid())
        }
    };
    match text.split_once("..") {
        Some((start, end)) => Ok(parse(start, 0)?..parse(end, count)?),
        None => {
            let index = parse(text, 0)?;
            Ok(index..index + 1)
        },
    }
}

impl<'a> CopyCommand<'a> {
    pub fn new(args: &ArgMatches, settings: &'a Settings) -> TiffResult<Self> {
        let input_file = required_arg(args, "input")?;
        let output_file = required_arg(args, "output")?;

        let compression = match args.get_one::<String>("compression") {
            Some(name) => Some(KnownCompression::from_name(name)?.code()),
            None => settings.copier.compression,
        };
        let direct = args.get_flag("direct") || settings.copier.direct_copy;
        if direct && args.get_one::<String>("compression").is_some() {
            warn!("--compression only applies to images that cannot be copied directly");
        }

        Ok(CopyCommand {
            input_file,
            output_file,
            direct,
            compression,
            big_tiff: args.get_flag("big-tiff") || settings.writer.big_tiff,
            images: args.get_one::<String>("images").cloned(),
            settings,
        })
    }
}

impl<'a> Command for CopyCommand<'a> {
    fn execute(&self) -> TiffResult<()> {
        info!("Copying {} to {}{}", self.input_file, self.output_file,
              if self.direct { " (direct)" } else { "" });

        let reader = TiffReader::open_with_options(&self.input_file, self.settings.reader.clone())?;
        let count = reader.number_of_images()?;
        let range = match &self.images {
            Some(text) => parse_image_range(text, count)?,
            None => 0..count,
        };

        let tracker = Arc::new(Mutex::new(ProgressTracker::new("copying")));
        let progress = tracker.clone();
        let mut copier = TiffCopier::new()
            .with_direct_copy(self.direct)
            .with_progress(move |info| {
                if let Ok(mut tracker) = progress.lock() {
                    tracker.update(info);
                }
            });
        if let Some(code) = self.compression {
            copier = copier.with_compression(code);
        }

        let options = self.settings.writer.clone().with_big_tiff(self.big_tiff);
        let writer = TiffWriter::create(&self.output_file, options)?;
        let result = copier.copy_images(&reader, &writer, range);

        if let Ok(tracker) = tracker.lock() {
            match &result {
                Ok(_) => tracker.finish(),
                Err(e) => tracker.abandon(&e.to_string()),
            }
        }
        let outcome = result?;
        writer.close()?;
        reader.close();

        info!("Copied {} image(s), {} tile position(s), {} tile(s) directly",
              outcome.images, outcome.tiles, outcome.direct_tiles);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn test_parse_image_range() {
        std::assert_eq!(parse_image_range("1..3", 5).unwrap(), 1..3);
        std::assert_eq!(parse_image_range("2..", 5).unwrap(), 2..5);
        std::assert_eq!(parse_image_range("..2", 5).unwrap(), 0..2);
        std::assert_eq!(parse_image_range("4", 5).unwrap(), 4..5);
        std::assert!(parse_image_range("a..b", 5).is_err());
    }
}
