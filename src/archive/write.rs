//! Archive writing: member headers, placeholder patching, disk splitting.
//!
//! Length fields are written as zero placeholders and patched once the real
//! sizes are known, so the segment files must stay seekable.  Three handles
//! can point at three different segments at once: the first segment (disk
//! count and space-needed patches), the segment where the current member's
//! header landed (data-length patch), and the segment currently receiving
//! payload bytes.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

use anyhow::{Context, Result};

use crate::archive::types::{
    bump_segment_name, strip_path, write_name_field, write_u32_le, SharedHandle,
    ARCHIVE_HEADER_LEN, MEMBER_HEADER_LEN, MEMBER_TRAILING_HEADER_LEN, MEMBER_TAG, SEGMENT_HEADER_LEN,
    SEGMENT_TAG, UNKNOWN_MEMBER_BYTES,
};
use crate::codec::implode::{find_best_implode, implode};
use crate::codec::types::{DictionarySize, ImplodeStats, LiteralMode};
use crate::timefn;
use crate::{displaylevel, displayout};

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Behaviour switches for [`pack_archive`].
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Fixed dictionary size; `None` picks per member by input length.
    pub dictionary_size: Option<DictionarySize>,
    /// Literal coding for levels 0..=3; level 5 auto-detects instead.
    pub literal_mode: LiteralMode,
    /// Token strategy 0..=3, or 5 for the per-member parameter search.
    pub optimize_level: u32,
    /// Byte budget of the first segment file.
    pub first_disk_size: u64,
    /// Byte budget of every later segment file.
    pub disk_size: u64,
    /// Append per-member codec statistics to the table.
    pub show_stats: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        PackOptions {
            dictionary_size: None,
            literal_mode: LiteralMode::Binary,
            optimize_level: 3,
            first_disk_size: u64::from(u32::MAX),
            disk_size: u64::from(u32::MAX),
            show_stats: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Disk splitting
// ─────────────────────────────────────────────────────────────────────────────

/// Offset of the segment-length field inside every segment.
const LENGTH_FIELD_POS: u64 = 4;

struct DiskSplit {
    cur_path: String,
    out: SharedHandle,
    first: SharedHandle,
    next_disk_size: u64,
    disk_count: u32,
    total_length: u64,
    /// Set when the current member rolled onto a new segment: bytes written
    /// at the last roll and the fresh segment's budget.
    roll_point: Option<(u64, u64)>,
}

impl DiskSplit {
    /// Finishes the current segment and opens the next one.  Patches the
    /// finished segment's length field, creates the bumped-letter path with
    /// a fresh common header, and returns the new sink with its budget.
    fn roll(&mut self, written_so_far: u64) -> Option<(Box<dyn Write>, u64)> {
        {
            let mut file = self.out.0.borrow_mut();
            let end = file.stream_position().ok()?;
            file.seek(SeekFrom::Start(LENGTH_FIELD_POS)).ok()?;
            write_u32_le(&mut *file, (end - SEGMENT_HEADER_LEN) as u32).ok()?;
            self.total_length += end;
        }

        self.cur_path = bump_segment_name(&self.cur_path);
        let mut file = match File::create(&self.cur_path) {
            Ok(f) => f,
            Err(_) => {
                displaylevel!(1, "Error creating file {} for archive.\n", self.cur_path);
                return None;
            }
        };
        file.write_all(SEGMENT_TAG).ok()?;
        write_u32_le(&mut file, 0).ok()?;

        self.out = SharedHandle::new(file);
        self.disk_count += 1;
        let budget = self.next_disk_size.saturating_sub(SEGMENT_HEADER_LEN);
        self.roll_point = Some((written_so_far, budget));
        Some((Box::new(self.out.clone()) as Box<dyn Write>, budget))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry point
// ─────────────────────────────────────────────────────────────────────────────

/// Implodes `member_paths` into a new archive at `archive_path`, splitting
/// into further segment files whenever a disk budget runs out.
pub fn pack_archive(
    archive_path: &str,
    member_paths: &[String],
    opts: &PackOptions,
) -> Result<()> {
    let first_file = File::create(archive_path)
        .with_context(|| format!("error creating file {} for archive", archive_path))?;
    let first = SharedHandle::new(first_file);
    let archive_name = strip_path(archive_path).to_owned();

    let mut split = DiskSplit {
        cur_path: archive_path.to_owned(),
        out: first.clone(),
        first: first.clone(),
        next_disk_size: opts.disk_size,
        disk_count: 1,
        total_length: 0,
        roll_point: None,
    };

    // Common header, then the first-segment archive block.  Length, disk
    // count, and space needed are placeholders patched at the end.
    let (disk_count_pos, space_needed_pos);
    {
        let mut file = first.0.borrow_mut();
        file.write_all(SEGMENT_TAG)?;
        write_u32_le(&mut *file, 0)?;
        write_name_field(&mut *file, &archive_name)?;
        file.write_all(&[0])?;
        disk_count_pos = file.stream_position()?;
        file.write_all(&[1, 0])?;
        space_needed_pos = file.stream_position()?;
        write_u32_le(&mut *file, 0)?;
    }

    displayout!(
        "\nImploding file(s) and creating archive {}...\n\n",
        archive_name
    );
    displayout!("                    Archived       Original             Literal   Dictionary");
    if opts.show_stats {
        displayout!("   Literal  Dictionary      Min/Max     Min/Max     Elapsed  Optimization");
    }
    displayout!("\n  Filename          size (B)       size (B)    Ratio       mode     size (B)");
    if opts.show_stats {
        displayout!("     count     lookups       offset      length    time (s)         level");
    }
    displayout!("\n------------------------------------------------------------------------------");
    if opts.show_stats {
        displayout!("-------------------------------------------------------------------------");
    }
    displayout!("\n");

    let mut space_left = opts.first_disk_size.saturating_sub(ARCHIVE_HEADER_LEN);
    let mut bytes_needed: u64 = 0;
    let mut member_count = 0usize;

    for path in member_paths {
        if path.is_empty() {
            continue;
        }
        let mut input =
            File::open(path).with_context(|| format!("error opening file {}", path))?;
        let length = input.metadata()?.len();
        let member_name = strip_path(path);
        displayout!("  {:<13}", member_name);

        // Member header; the data length is patched after imploding.
        let data_length_pos;
        let member_start = split.out.clone();
        {
            let mut file = split.out.0.borrow_mut();
            file.write_all(MEMBER_TAG)?;
            data_length_pos = file.stream_position()?;
            write_u32_le(&mut *file, 0)?;
            write_name_field(&mut *file, member_name)?;
            file.write_all(&[0])?;
            write_u32_le(&mut *file, length as u32)?;
            file.write_all(&UNKNOWN_MEMBER_BYTES)?;
        }
        bytes_needed += length;
        space_left = space_left.saturating_sub(MEMBER_HEADER_LEN);

        let (literal_mode, dictionary_size, level) = if opts.optimize_level == 5 {
            find_best_implode(&mut input, length)?
        } else {
            let dict = opts
                .dictionary_size
                .unwrap_or_else(|| DictionarySize::for_input_length(length));
            (opts.literal_mode, dict, opts.optimize_level)
        };

        let start = timefn::get_time();
        let mut stats = ImplodeStats::default();
        split.roll_point = None;
        let written = {
            let sink = Box::new(split.out.clone()) as Box<dyn Write>;
            let split_ref = &mut split;
            implode(
                &mut input,
                Some(sink),
                length,
                literal_mode,
                dictionary_size,
                level,
                Some(&mut stats),
                Some((space_left, Box::new(move |written| split_ref.roll(written)))),
            )?
        };
        let elapsed = timefn::clock_span_secs(start);
        member_count += 1;

        space_left = match split.roll_point {
            Some((at_roll, budget)) => budget.saturating_sub(written - at_roll),
            None => space_left.saturating_sub(written),
        };

        // Patch the member's data length (payload plus trailing header).
        {
            let mut file = member_start.0.borrow_mut();
            file.seek(SeekFrom::Start(data_length_pos))?;
            write_u32_le(&mut *file, (written + MEMBER_TRAILING_HEADER_LEN) as u32)?;
        }
        split.out.seek(SeekFrom::End(0))?;

        let archived = written + MEMBER_TRAILING_HEADER_LEN + SEGMENT_HEADER_LEN;
        displayout!("   {:>10}", archived);
        displayout!("     {:>10}", length);
        let ratio = if length > 0 {
            100.0 - (archived * 100) as f64 / length as f64
        } else {
            0.0
        };
        displayout!(" {:>8.2}%", ratio);
        displayout!("{}", match literal_mode {
            LiteralMode::Ascii => "     ASCII",
            LiteralMode::Binary => "    BINARY",
        });
        displayout!("         {:>4}", dictionary_size.window_bytes());
        if opts.show_stats {
            displayout!("{:>10}  {:>10}", stats.literal_count, stats.lookup_count);
            if stats.lookup_count != 0 {
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
            displayout!("             {}", level);
        }
        displayout!("\n");
    }

    // Patch the final segment's length, the disk count, and the space needed.
    let archive_length = {
        let mut file = split.out.0.borrow_mut();
        let end = file.seek(SeekFrom::End(0))?;
        file.seek(SeekFrom::Start(LENGTH_FIELD_POS))?;
        write_u32_le(&mut *file, (end - SEGMENT_HEADER_LEN) as u32)?;
        end - SEGMENT_HEADER_LEN
    };
    split.total_length += archive_length + SEGMENT_HEADER_LEN;
    {
        let mut file = split.first.0.borrow_mut();
        file.seek(SeekFrom::Start(disk_count_pos))?;
        file.write_all(&[(split.disk_count & 0xFF) as u8])?;
        file.seek(SeekFrom::Start(space_needed_pos))?;
        write_u32_le(&mut *file, bytes_needed as u32)?;
    }

    displayout!("------------------------------------------------------------------------------");
    if opts.show_stats {
        displayout!("-------------------------------------------------------------------------");
    }
    let ratio = if bytes_needed > 0 {
        100.0 - (split.total_length * 100) as f64 / bytes_needed as f64
    } else {
        0.0
    };
    displayout!(
        "\n                  {:>10}     {:>10}  {:>7.2}%\n",
        split.total_length,
        bytes_needed,
        ratio
    );
    displayout!(
        "Packed {} files onto {} disk file{}.\n",
        member_count,
        split.disk_count,
        if split.disk_count == 1 { "" } else { "s" }
    );

    Ok(())
}
