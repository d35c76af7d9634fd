//! Archive reading: segment validation, the member walk, and extraction.
//!
//! The walk does not trust the decoder's exact consumption: each member's
//! end position is computed from the stored data length and sought to after
//! exploding, so a short or overlong payload cannot desynchronise the walk.
//!
//! Spanning is driven from two places with the same segment-advance routine:
//! the codec's EOF handler while a payload crosses disks, and the walk
//! itself when a member ends at or beyond the current segment.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::archive::types::{
    bump_segment_name, read_tag, read_u32_le, strip_path, ArchiveHeader, MemberHeader,
    SharedHandle, MEMBER_TAG, MEMBER_TRAILING_HEADER_LEN, SEGMENT_HEADER_LEN, SEGMENT_TAG,
    UNKNOWN_MEMBER_BYTES,
};
use crate::cli::constants::display_level;
use crate::codec::bitio::SourceHandler;
use crate::codec::explode::explode;
use crate::codec::types::ExplodeStats;
use crate::timefn;
use crate::{displaylevel, displayout};

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Behaviour switches for [`read_archive`].
#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    /// Show member information without extracting anything.
    pub info_only: bool,
    /// Append per-member codec statistics to the table.
    pub show_stats: bool,
    /// Replace existing destination files instead of failing.
    pub overwrite: bool,
    /// Directory receiving extracted members; current directory when unset.
    pub output_dir: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Segments
// ─────────────────────────────────────────────────────────────────────────────

/// Opens one segment and validates its common header.  Returns the handle
/// positioned after the header, plus the reported and physical lengths.
fn open_segment(path: &str) -> Result<(File, u64, u64)> {
    let mut file =
        File::open(path).with_context(|| format!("error opening file {}", path))?;
    let actual = file.metadata()?.len();
    if !read_tag(&mut file, SEGMENT_TAG) {
        bail!(
            "{} does not appear to be an LFG archive ('LFG!' tag not found)",
            path
        );
    }
    let reported = u64::from(read_u32_le(&mut file)?);
    if actual != reported + SEGMENT_HEADER_LEN {
        displaylevel!(
            1,
            "Warning: Actual archive file length ({}) does not match indicated length ({} + 8).\n",
            actual,
            reported
        );
    }
    Ok((file, reported, actual))
}

/// Position of the walk across the disk files of one archive.
struct DiskWalk<'p> {
    /// Candidate segment paths supplied on the command line.
    paths: &'p [String],
    path_index: usize,
    cur_path: String,
    handle: SharedHandle,
    /// Physical length of the current segment file.
    segment_actual: u64,
    /// Absolute end of the current member's data in the current segment.
    member_end: u64,
    disks_left: u8,
    total_length: u64,
}

impl<'p> DiskWalk<'p> {
    /// Moves to the next segment: first the incremented disk letter, then
    /// the next command-line path.  Carries the member-end bookkeeping
    /// across the boundary and returns the fresh handle.
    fn next_segment(&mut self) -> Option<SharedHandle> {
        if self.member_end >= self.segment_actual {
            self.member_end = self.member_end - self.segment_actual + SEGMENT_HEADER_LEN;
            self.disks_left = self.disks_left.wrapping_sub(1);
        }

        let bumped = bump_segment_name(&self.cur_path);
        let opened = match open_segment(&bumped) {
            Ok(triple) => Some((bumped, triple)),
            Err(_) => {
                if self.path_index + 1 < self.paths.len() {
                    self.path_index += 1;
                    let candidate = self.paths[self.path_index].clone();
                    open_segment(&candidate).ok().map(|t| (candidate, t))
                } else {
                    None
                }
            }
        };

        let Some((path, (file, _reported, actual))) = opened else {
            displaylevel!(1, "\nError: Continued file not found. Extraction incomplete.\n");
            return None;
        };

        self.cur_path = path;
        self.segment_actual = actual;
        self.handle = SharedHandle::new(file);
        self.total_length += actual;
        displaylevel!(
            3,
            "\n{}         {:>7} bytes\n",
            strip_path(&self.cur_path),
            actual
        );
        Some(self.handle.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry point
// ─────────────────────────────────────────────────────────────────────────────

/// Walks one archive starting at `paths[0]`, extracting or listing every
/// member.  Returns how many entries of `paths` the walk consumed, so a
/// caller iterating several archives knows where the next one starts.
pub fn read_archive(paths: &[String], opts: &DumpOptions) -> Result<usize> {
    let first = paths.first().context("no archive path given")?;
    let (file, _reported, actual) = open_segment(first)?;

    let mut walk = DiskWalk {
        paths,
        path_index: 0,
        cur_path: first.clone(),
        handle: SharedHandle::new(file),
        segment_actual: actual,
        member_end: 0,
        disks_left: 0,
        total_length: actual,
    };

    let header = ArchiveHeader::read(&mut walk.handle)
        .with_context(|| format!("{} does not appear to be a valid initial LFG archive", first))?;
    walk.disks_left = header.disk_count;
    if header.disk_count == 0 {
        displaylevel!(1, "Warning: Disk count of 0 indicated. File may be corrupted.\n");
    }

    if display_level() >= 2 {
        displayout!("Reported archive name: \t\t\t{}\n", header.name);
        displayout!("Disk count: \t\t\t\t{}\n", header.disk_count);
        displayout!(
            "Space needed for extraction: \t\t{} bytes\n\n",
            header.space_needed
        );
        if opts.info_only {
            displayout!("Archived file info:\n");
        } else if let Some(dir) = &opts.output_dir {
            displayout!("Extracting files to {}...\n", dir);
        } else {
            displayout!("Extracting files...\n");
        }
        displayout!("                    Archived      Extracted             Literal   Dictionary");
        if opts.show_stats {
            displayout!("   Literal  Dictionary      Min/Max     Min/Max     Elapsed");
        }
        displayout!("\n  Filename          size (B)       size (B)    Ratio       mode     size (B)");
        if opts.show_stats {
            displayout!("     count     lookups       offset      length    time (s)");
        }
        displayout!("\n------------------------------------------------------------------------------");
        if opts.show_stats {
            displayout!("---------------------------------------------------------------");
        }
        displayout!("\n");
    }
    displaylevel!(3, "{}         {:>7} bytes\n", strip_path(first), actual);

    let mut member_count = 0usize;
    let mut bytes_expanded: u64 = 0;
    let mut more = true;

    while more && read_tag(&mut walk.handle, MEMBER_TAG) {
        let member = MemberHeader::read(&mut walk.handle)
            .with_context(|| format!("unexpected end of file {}", walk.cur_path))?;
        let header_pos = walk.handle.stream_position()? - MEMBER_TRAILING_HEADER_LEN;
        if member.unknown != UNKNOWN_MEMBER_BYTES {
            displaylevel!(1, "Warning: Unexpected values in header. File may be corrupted.\n");
        }

        walk.member_end = header_pos + u64::from(member.data_length);
        if display_level() >= 2 {
            displayout!("  {:<13}", member.name);
        }
        member_count += 1;
        bytes_expanded += u64::from(member.final_length);
        if walk.member_end >= walk.segment_actual {
            more = false;
        }

        let mut sink: Box<dyn Write> = if opts.info_only {
            Box::new(io::sink())
        } else {
            let path = match &opts.output_dir {
                Some(dir) => format!("{}/{}", dir, member.name),
                None => member.name.clone(),
            };
            if !opts.overwrite && Path::new(&path).exists() {
                bail!("file {} already exists", path);
            }
            Box::new(
                File::create(&path)
                    .with_context(|| format!("failure while creating file {}", path))?,
            )
        };

        let start = timefn::get_time();
        let mut stats = ExplodeStats::default();
        let result = {
            let src = Box::new(walk.handle.clone()) as Box<dyn Read>;
            let walk_ref = &mut walk;
            let handler: SourceHandler<'_> = Box::new(move || {
                walk_ref
                    .next_segment()
                    .map(|handle| Box::new(handle) as Box<dyn Read>)
            });
            explode(
                src,
                &mut *sink,
                Some(u64::from(member.final_length)),
                Some(&mut stats),
                Some(handler),
            )
        };
        let elapsed = timefn::clock_span_secs(start);
        if let Err(e) = result {
            displaylevel!(1, "Error: {}\n", e);
        }

        if display_level() >= 2 {
            let archived = u64::from(member.data_length) + SEGMENT_HEADER_LEN;
            displayout!("   {:>10}", archived);
            displayout!("     {:>10}", member.final_length);
            let ratio = if member.final_length > 0 {
                100.0 - (archived * 100) as f64 / f64::from(member.final_length)
            } else {
                0.0
            };
            displayout!(" {:>8.2}%", ratio);
            displayout!("{}", match stats.literal_mode {
                crate::codec::types::LiteralMode::Ascii => "     ASCII",
                crate::codec::types::LiteralMode::Binary => "    BINARY",
            });
            displayout!("         {:>4}", stats.dictionary_size.window_bytes());
            if opts.show_stats {
                displayout!("{:>10}  {:>10}", stats.literal_count, stats.reference_count);
                if stats.reference_count != 0 {
                    displayout!(
                        "     {:>2}, {:>4}     {:>2}, {:>3}",
                        stats.min_offset,
                        stats.max_offset,
                        stats.min_length,
                        stats.max_length
                    );
                } else {
                    displayout!("          N/A         N/A");
                }
                displayout!("     {:>7.3}", elapsed);
            }
            displayout!("\n");
        }

        while walk.disks_left > 0 && walk.member_end > walk.segment_actual {
            if walk.next_segment().is_none() {
                bail!("continued file not found; extraction incomplete");
            }
        }
        walk.handle.seek(SeekFrom::Start(walk.member_end))?;
        if walk.disks_left > 0 && !more {
            more = true;
        }
    }

    if walk.member_end < walk.segment_actual {
        displaylevel!(1, "Warning: Unexpected end of file data.\n");
    }

    if display_level() >= 2 {
        displayout!("------------------------------------------------------------------------------");
        if opts.show_stats {
            displayout!("---------------------------------------------------------------");
        }
        displayout!(
            "\n {:>3} files        {:>10} bytes{:>9} bytes\n\n",
            member_count,
            walk.total_length,
            bytes_expanded
        );
    }

    Ok(walk.path_index + 1)
}
