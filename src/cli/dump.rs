//! Argument parsing and dispatch for the `lfgdump` extraction tool.
//!
//! Options are recognised up to the first non-option argument; everything
//! after that is an archive path.  Extraction of a spanned archive may
//! consume several of those paths in one go, so dispatch advances by the
//! count each [`read_archive`](crate::archive::read::read_archive) call
//! reports.

use anyhow::{anyhow, Result};

use crate::archive::read::{read_archive, DumpOptions};
use crate::cli::constants::{
    set_display_level, DUMP_TOOL_NAME, DUMP_VERSION_MAJOR, DUMP_VERSION_MINOR,
};
use crate::displaylevel;

/// Everything the `lfgdump` entry point needs after parsing.
#[derive(Debug, Default)]
pub struct DumpArgs {
    pub options: DumpOptions,
    pub archives: Vec<String>,
    /// A version request was handled; the caller should exit 0.
    pub exit_early: bool,
}

pub fn print_usage() {
    crate::displayout!("Usage: lfgdump [options] archivefile\n");
    crate::displayout!("Extracts files from archives used in older LucasFilm Games (LFG) games.\n\n");
    crate::displayout!("Options:\n");
    crate::displayout!("   -d              Display process details\n");
    crate::displayout!("   -f              Force overwrite of existing files during extraction\n");
    crate::displayout!("   -h              Display this help\n");
    crate::displayout!("   -i              Show archive info only (do not extract)\n");
    crate::displayout!("   -l              Quiet extraction (errors only)\n");
    crate::displayout!("   -o output_dir   Extract to directory 'output_dir'\n");
    crate::displayout!("   -s              Display file stats\n");
    crate::displayout!("   -v              Display version info\n\n");
}

pub fn print_version() {
    crate::displayout!(
        "\n{} V{}.{}\n",
        DUMP_TOOL_NAME,
        DUMP_VERSION_MAJOR,
        DUMP_VERSION_MINOR
    );
    crate::displayout!("(c) Seltmann Software, 2016-2018\n\n");
}

/// Parses `std::env::args()` (skipping argv[0]).
pub fn parse_dump_args() -> Result<DumpArgs> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    parse_dump_args_from(&argv)
}

/// Parses an explicit argument list; callable from tests.
pub fn parse_dump_args_from(argv: &[String]) -> Result<DumpArgs> {
    let mut args = DumpArgs::default();
    let mut index = 0;

    while index < argv.len() {
        let arg = argv[index].as_str();
        match arg {
            "-i" => args.options.info_only = true,
            "-d" => set_display_level(3),
            "-l" => set_display_level(1),
            "-s" => args.options.show_stats = true,
            "-f" => args.options.overwrite = true,
            "-o" => {
                index += 1;
                let dir = argv
                    .get(index)
                    .ok_or_else(|| anyhow!("bad usage: -o requires a directory"))?;
                args.options.output_dir = Some(dir.clone());
            }
            "-v" => {
                print_version();
                args.exit_early = true;
                return Ok(args);
            }
            "-h" => {
                print_usage();
                args.exit_early = true;
                return Ok(args);
            }
            _ if arg.starts_with('-') => {
                return Err(anyhow!("bad usage: argument not recognized: {}", arg));
            }
            _ => break,
        }
        index += 1;
    }

    args.archives = argv[index..].to_vec();
    Ok(args)
}

/// Runs the extraction over every archive argument; returns the exit code.
pub fn run(args: &DumpArgs) -> i32 {
    if args.archives.is_empty() {
        print_usage();
        return 0;
    }

    let mut failures = 0;
    let mut index = 0;
    while index < args.archives.len() {
        match read_archive(&args.archives[index..], &args.options) {
            Ok(consumed) => index += consumed.max(1),
            Err(e) => {
                displaylevel!(1, "lfgdump: {:#}\n", e);
                failures += 1;
                index += 1;
            }
        }
    }
    if failures > 0 {
        1
    } else {
        0
    }
}
