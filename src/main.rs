use clap::{Arg, ArgAction, Command as ClapCommand};
use log::{error, Level};
use std::process;

use tiffgrid::commands::{CommandFactory, TiffgridCommandFactory};
use tiffgrid::config::Settings;
use tiffgrid::utils::logger::Logger;

fn cli() -> ClapCommand {
    ClapCommand::new("tiffgrid")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Inspect, copy and compact TIFF/BigTIFF files tile by tile")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Also write log records to this file")
                .value_name("FILE")
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("TOML settings file")
                .value_name("FILE")
                .global(true),
        )
        .subcommand(
            ClapCommand::new("info")
                .about("List the images of a TIFF file")
                .arg(Arg::new("input").help("Input TIFF file").required(true).index(1))
                .arg(
                    Arg::new("entries")
                        .long("entries")
                        .help("List every IFD entry")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            ClapCommand::new("copy")
                .about("Copy images into a new TIFF file")
                .arg(Arg::new("input").help("Source TIFF file").required(true).index(1))
                .arg(Arg::new("output").help("Target TIFF file").required(true).index(2))
                .arg(
                    Arg::new("direct")
                        .long("direct")
                        .help("Copy encoded tiles without re-encoding where possible")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("compression")
                        .long("compression")
                        .help("Target compression by code or name (none, deflate, zstd, packbits)")
                        .value_name("CODE|NAME"),
                )
                .arg(
                    Arg::new("big-tiff")
                        .long("big-tiff")
                        .help("Write a BigTIFF file")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("images")
                        .long("images")
                        .help("Images to copy, e.g. 0..2 or 3")
                        .value_name("RANGE"),
                ),
        )
        .subcommand(
            ClapCommand::new("compact")
                .about("Rewrite a TIFF file without unreferenced data")
                .arg(Arg::new("input").help("TIFF file to compact").required(true).index(1)),
        )
}

fn main() {
    let matches = cli().get_matches();

    let level = if matches.get_flag("verbose") { Level::Debug } else { Level::Info };
    match matches.get_one::<String>("log-file") {
        Some(log_file) => {
            if let Err(e) = Logger::init_global_logger(log_file, level) {
                eprintln!("Error setting up global logger: {}", e);
                process::exit(1);
            }
        },
        None => Logger::init_console_logger(level.to_level_filter()),
    }

    let settings = match matches.get_one::<String>("config") {
        Some(path) => match Settings::from_file(path) {
            Ok(settings) => settings,
            Err(e) => {
                error!("Failed to load settings: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            },
        },
        None => Settings::default(),
    };

    let factory = TiffgridCommandFactory::new();
    match factory.create_command(&matches, &settings) {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
}
