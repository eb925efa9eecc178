//! File structure report
//!
//! Lists the IFD chain of a TIFF file with the geometry, tile grid and
//! storage of every image.

use std::sync::Arc;

use clap::ArgMatches;
use log::{info, warn};

use crate::commands::command_traits::Command;
use crate::commands::required_arg;
use crate::config::Settings;
use crate::tiff::errors::TiffResult;
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use crate::tiff::tag_names;

/// Command printing the structure of a TIFF file
pub struct InfoCommand<'a> {
    /// Path to the input file
    input_file: String,
    /// Also list every IFD entry
    verbose: bool,
    settings: &'a Settings,
}

impl<'a> InfoCommand<'a> {
    pub fn new(args: &ArgMatches, settings: &'a Settings) -> TiffResult<Self> {
        Ok(InfoCommand {
            input_file: required_arg(args, "input")?,
            verbose: args.get_flag("entries"),
            settings,
        })
    }

    fn display_image(&self, reader: &TiffReader, ifd: &Arc<IFD>) -> TiffResult<()> {
        info!("IFD #{} (offset: {})", ifd.number, ifd.offset);
        info!("  Entries: {}", ifd.entry_count());
        let (width, height) = (ifd.image_width()?, ifd.image_height()?);
        info!("  Dimensions: {}x{}", width, height);
        info!("  Samples per pixel: {}, bits per sample: {:?}",
              ifd.samples_per_pixel()?, ifd.bits_per_sample()?);
        let code = ifd.compression_code();
        info!("  Compression: {} ({})", code, tag_names::compression_name(code));
        if let Some(photometric) = ifd.photometric() {
            info!("  Photometric: {} ({})", photometric, tag_names::photometric_name(photometric as u64));
        }
        info!("  Planar configuration: {}", if ifd.is_planar_separated()? { "separate" } else { "chunky" });

        let map = reader.map(ifd.clone())?;
        let grid = map.grid();
        info!("  {}: {}x{}, grid {}x{}, {} plane(s), {} slot(s)",
              if grid.is_tiled { "Tiles" } else { "Strips" },
              grid.tile_size_x, grid.tile_size_y,
              grid.tile_count_x, grid.tile_count_y, grid.planes, grid.tile_count());
        let mut missing = 0;
        for index in grid.all_indices() {
            if map.is_missing(&index)? {
                missing += 1;
            }
        }
        info!("  Missing tiles: {}", missing);

        let sub_ifds = ifd.sub_ifd_offsets();
        if !sub_ifds.is_empty() {
            info!("  Sub-IFDs at {:?}", sub_ifds);
        }
        if self.verbose {
            for entry in ifd.entries() {
                info!("    {}", entry.description());
            }
        }
        Ok(())
    }
}

impl<'a> Command for InfoCommand<'a> {
    fn execute(&self) -> TiffResult<()> {
        let reader = TiffReader::open_with_options(&self.input_file, self.settings.reader.clone())?;
        let header = reader.header()?;
        info!("File: {}", self.input_file);
        info!("  Format: {} ({})",
              if header.is_big_tiff { "BigTIFF" } else { "TIFF" }, header.byte_order.name());
        info!("  Length: {} bytes", reader.file_length());

        let ifds = reader.all_ifds()?;
        info!("  Images: {}", ifds.len());
        for ifd in &ifds {
            if let Err(e) = self.display_image(&reader, ifd) {
                warn!("  IFD #{} cannot be mapped: {}", ifd.number, e);
            }
        }
        reader.close();
        Ok(())
    }
}
