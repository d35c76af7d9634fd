//! Argument parsing and dispatch for the `lfgmake` archiver tool.

use anyhow::{anyhow, Context, Result};

use crate::archive::write::{pack_archive, PackOptions};
use crate::cli::constants::{MAKE_TOOL_NAME, MAKE_VERSION_MAJOR, MAKE_VERSION_MINOR};
use crate::codec::types::{DictionarySize, LiteralMode};
use crate::displaylevel;

/// Everything the `lfgmake` entry point needs after parsing.
#[derive(Debug)]
pub struct MakeArgs {
    pub options: PackOptions,
    pub archive: Option<String>,
    pub members: Vec<String>,
    /// Member paths come from this list file instead of the command line.
    pub file_list: Option<String>,
    /// A version or help request was handled; the caller should exit 0.
    pub exit_early: bool,
}

impl Default for MakeArgs {
    fn default() -> Self {
        MakeArgs {
            options: PackOptions::default(),
            archive: None,
            members: Vec::new(),
            file_list: None,
            exit_early: false,
        }
    }
}

pub fn print_usage() {
    crate::displayout!(
        "Usage: lfgmake [options] archive_name archive_file_1 archive_file_2 ...\n"
    );
    crate::displayout!("Creates an LFG-type archive.\n\n");
    crate::displayout!("Options:\n");
    crate::displayout!("  -f filelist           Use filelist (text file) as archive file list\n");
    crate::displayout!("  -h                    Display this help\n");
    crate::displayout!("  -m initial_size size  Set max size for first and subsequent archive files\n");
    crate::displayout!("  -o optimize_level     0-5 (0 is fast; 1,3 look ahead versions; 5 find best)\n");
    crate::displayout!("  -s                    Print stats\n");
    crate::displayout!("  -t                    Use ASCII (text) mode encoding of literals\n");
    crate::displayout!("  -v                    Print version info\n");
    crate::displayout!("  -w N                  Force sliding window size of N k (where N=1,2,4)\n\n");
}

pub fn print_version() {
    crate::displayout!(
        "\n{} V{}.{}\n",
        MAKE_TOOL_NAME,
        MAKE_VERSION_MAJOR,
        MAKE_VERSION_MINOR
    );
    crate::displayout!("(c) Seltmann Software, 2016-2020\n\n");
}

/// Parses `std::env::args()` (skipping argv[0]).
pub fn parse_make_args() -> Result<MakeArgs> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    parse_make_args_from(&argv)
}

/// Parses an explicit argument list; callable from tests.
pub fn parse_make_args_from(argv: &[String]) -> Result<MakeArgs> {
    let mut args = MakeArgs::default();
    let mut index = 0;

    fn value<'a>(argv: &'a [String], index: &mut usize, flag: &str) -> Result<&'a str> {
        *index += 1;
        argv.get(*index)
            .map(|s| s.as_str())
            .ok_or_else(|| anyhow!("bad usage: {} requires a value", flag))
    }

    while index < argv.len() {
        let arg = argv[index].as_str();
        match arg {
            "-t" => args.options.literal_mode = LiteralMode::Ascii,
            "-s" => args.options.show_stats = true,
            "-o" => {
                let level: u32 = value(argv, &mut index, "-o")?
                    .parse()
                    .map_err(|_| anyhow!("bad usage: -o expects a number"))?;
                if !matches!(level, 0..=3 | 5) {
                    return Err(anyhow!("bad usage: optimize level must be 0-3 or 5"));
                }
                args.options.optimize_level = level;
            }
            "-f" => args.file_list = Some(value(argv, &mut index, "-f")?.to_owned()),
            "-m" => {
                args.options.first_disk_size = value(argv, &mut index, "-m")?
                    .parse()
                    .map_err(|_| anyhow!("bad usage: -m expects two sizes"))?;
                args.options.disk_size = value(argv, &mut index, "-m")?
                    .parse()
                    .map_err(|_| anyhow!("bad usage: -m expects two sizes"))?;
            }
            "-w" => {
                args.options.dictionary_size = Some(match value(argv, &mut index, "-w")? {
                    "1" => DictionarySize::Size1K,
                    "2" => DictionarySize::Size2K,
                    "4" => DictionarySize::Size4K,
                    other => {
                        return Err(anyhow!("bad usage: window size must be 1, 2 or 4 (got {})", other))
                    }
                });
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
            _ => {
                if args.archive.is_none() {
                    args.archive = Some(arg.to_owned());
                } else {
                    args.members.push(arg.to_owned());
                }
            }
        }
        index += 1;
    }

    Ok(args)
}

/// Reads a member list file: one path per line, blank lines skipped.
fn read_file_list(path: &str) -> Result<Vec<String>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("{} not found", path))?;
    Ok(text
        .lines()
        .map(|line| line.trim_end_matches(['\r', '\n']).to_owned())
        .filter(|line| !line.is_empty())
        .collect())
}

/// Builds the archive; returns the exit code.
pub fn run(args: &MakeArgs) -> i32 {
    let Some(archive) = &args.archive else {
        print_usage();
        return 0;
    };

    let members = match &args.file_list {
        Some(list) => match read_file_list(list) {
            Ok(members) => members,
            Err(e) => {
                displaylevel!(1, "lfgmake: {:#}\n", e);
                return 1;
            }
        },
        None => args.members.clone(),
    };

    match pack_archive(archive, &members, &args.options) {
        Ok(()) => 0,
        Err(e) => {
            displaylevel!(1, "lfgmake: {:#}\n", e);
            1
        }
    }
}
