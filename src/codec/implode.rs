//! Implode: compress a byte stream into one payload.
//!
//! The encoder keeps an 8 KiB wrap-around window over the input: the bytes
//! already encoded are the dictionary, the bytes ahead are the look-ahead.
//! Fresh 2 KiB blocks are pulled in whenever the cursor enters the block
//! holding the next load point, which keeps at least 2 KiB of look-ahead
//! (for the 518-byte maximum match) and 4 KiB of history (for the largest
//! dictionary) available at all times.

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::codec::bitio::{BitWriter, SinkHandler};
use crate::codec::tables::{length_code, literal_code, offset_msb_code};
use crate::codec::types::{
    CodecError, DictionarySize, ImplodeStats, LiteralMode, MAX_COPY_LENGTH,
    MAX_SHORT_COPY_OFFSET,
};

// ─────────────────────────────────────────────────────────────────────────────
// Window geometry
// ─────────────────────────────────────────────────────────────────────────────

const WINDOW_SIZE: usize = 0x2000;
const WINDOW_MASK: usize = WINDOW_SIZE - 1;
/// Masked cursor MSBs select the 2 KiB block due for a refill.
const LOAD_REGION: usize = 0x1800;
const LOAD_CHUNK: usize = 0x800;

/// A usable back-reference candidate.
struct Match {
    offset: u32,
    length: u32,
}

/// Reads until `buf` is full or the stream ends; returns the byte count.
fn read_fully(src: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// ─────────────────────────────────────────────────────────────────────────────
// Encoder state
// ─────────────────────────────────────────────────────────────────────────────

struct Imploder<'w> {
    window: Box<[u8]>,
    writer: BitWriter<'w>,
    literal_mode: LiteralMode,
    dictionary_size: DictionarySize,
    bytes_encoded: u64,
    input_length: u64,
}

impl<'w> Imploder<'w> {
    /// Length of the common run starting at window positions `a` and `b`,
    /// comparing circularly, capped at `max`.
    fn run_length(&self, a: usize, b: usize, max: usize) -> usize {
        let mut n = 0;
        while n < max {
            if self.window[(a + n) & WINDOW_MASK] != self.window[(b + n) & WINDOW_MASK] {
                break;
            }
            n += 1;
        }
        n
    }

    /// Exhaustive longest-match search for the look-ahead at `index`.
    ///
    /// Scans every distance inside the dictionary; a strictly longer run is
    /// required to displace the best, so ties keep the smallest distance.
    /// Returns `None` when nothing of length ≥ 2 exists, or when the best is
    /// a length-2 run whose offset cannot be coded in a short reference.
    fn find_match(&self, index: usize) -> Option<Match> {
        let search = (self.dictionary_size.window_bytes() as u64).min(self.bytes_encoded) as usize;
        let max_len =
            (self.input_length - self.bytes_encoded).min(u64::from(MAX_COPY_LENGTH)) as usize;

        let mut best_length = 1usize;
        let mut best_offset = 0u32;
        let mut found = false;
        for dist in 1..=search {
            let run = self.run_length(index, index + WINDOW_SIZE - dist, max_len);
            if run > best_length {
                best_length = run;
                best_offset = (dist - 1) as u32;
                found = true;
            }
        }

        if !found || (best_length == 2 && best_offset > MAX_SHORT_COPY_OFFSET) {
            return None;
        }
        Some(Match {
            offset: best_offset,
            length: best_length as u32,
        })
    }

    /// Bit cost of one literal token, including the token bit.
    fn literal_cost(&self, byte: u8) -> u32 {
        match self.literal_mode {
            LiteralMode::Binary => 9,
            LiteralMode::Ascii => 1 + literal_code(byte).0,
        }
    }

    /// Bit cost of one copy token, including the token bit.
    fn entry_cost(&self, offset: u32, length: u32) -> u32 {
        let low_bits = if length == 2 {
            2
        } else {
            self.dictionary_size.low_bits()
        };
        let (length_bits, _, lsb_count, _) = length_code(length);
        let (offset_bits, _) = offset_msb_code(offset >> low_bits);
        1 + length_bits + lsb_count + offset_bits + low_bits
    }

    fn write_literal(&mut self, byte: u8) -> Result<(), CodecError> {
        self.writer.write_bit(0)?;
        match self.literal_mode {
            LiteralMode::Binary => self.writer.write_bits_lsb_first(8, u32::from(byte)),
            LiteralMode::Ascii => {
                let (bits, code) = literal_code(byte);
                self.writer.write_bits_msb_first(bits, code)
            }
        }
    }

    fn write_entry(&mut self, offset: u32, length: u32) -> Result<(), CodecError> {
        let low_bits = if length == 2 {
            2
        } else {
            self.dictionary_size.low_bits()
        };
        let (length_bits, length_bits_value, lsb_count, lsb_value) = length_code(length);
        self.writer.write_bit(1)?;
        self.writer.write_bits_msb_first(length_bits, length_bits_value)?;
        self.writer.write_bits_lsb_first(lsb_count, lsb_value)?;
        let (offset_bits, offset_code) = offset_msb_code(offset >> low_bits);
        self.writer.write_bits_msb_first(offset_bits, offset_code)?;
        self.writer.write_bits_lsb_first(low_bits, offset)
    }

    /// Decides whether to demote the match at `index` to a literal.
    ///
    /// Level 1 compares how far a deferred match reaches against the direct
    /// one.  Level 2 compares bit rates and then re-checks whether the direct
    /// match plus a cheaply coded tail still beats the deferred pair; the
    /// rate tie goes to the literal path.  Level 3 runs both rules, rate
    /// check first.
    fn prefer_literal(&self, index: usize, m: &Match, opt: u32) -> bool {
        if opt == 0 {
            return false;
        }
        let mut use_literal = false;
        let deferred = self.find_match((index + 1) & WINDOW_MASK);

        if opt > 1 {
            if let Some(next) = &deferred {
                let match_bits = self.entry_cost(m.offset, m.length);
                let deferred_bits = self.entry_cost(next.offset, next.length);
                let literal_bits = self.literal_cost(self.window[index]);

                let rate = match_bits as f32 / m.length as f32;
                let deferred_rate =
                    (deferred_bits + literal_bits) as f32 / (next.length + 1) as f32;
                if deferred_rate <= rate {
                    use_literal = true;

                    // The deferred match overlaps this one shifted by a byte.
                    // If its leftover tail can reuse the deferred offset (or
                    // be spelled as one or two literals) without the combined
                    // cost exceeding the deferred pair, keep the match.
                    let tail = i64::from(next.length) + 1 - i64::from(m.length);
                    if tail > 0 {
                        let tail_start = (index + m.length as usize) & WINDOW_MASK;
                        let tail_bits = if tail == 1 {
                            self.literal_cost(self.window[tail_start])
                        } else if tail == 2 && next.offset > MAX_SHORT_COPY_OFFSET {
                            self.literal_cost(self.window[tail_start])
                                + self.literal_cost(self.window[(tail_start + 1) & WINDOW_MASK])
                        } else {
                            self.entry_cost(next.offset, tail as u32)
                        };
                        if match_bits + tail_bits <= deferred_bits + literal_bits {
                            use_literal = false;
                        }
                    }
                }
            }
        }

        if opt == 1 || opt == 3 {
            let deferred_reach = deferred.as_ref().map_or(1, |d| d.length) + 1;
            let reach = if m.length == 2 && m.offset > MAX_SHORT_COPY_OFFSET {
                0
            } else {
                let follow = self
                    .find_match((index + m.length as usize) & WINDOW_MASK)
                    .map_or(1, |f| f.length);
                m.length + follow
            };
            if reach > deferred_reach {
                use_literal = false;
            } else if opt == 1 {
                use_literal = true;
            }
        }

        use_literal
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry points
// ─────────────────────────────────────────────────────────────────────────────

/// Compresses exactly `length` bytes from `src` into `sink`; returns the
/// number of payload bytes produced (header and end marker included).
///
/// `sink` may be `None` to measure the output size without storing it.
/// `optimization_level` selects the token strategy (0..=3); level 5 is the
/// parameter search in [`find_best_implode`].  `cap` bounds the bytes sent
/// to the sink before the handler must supply a continuation sink.
#[allow(clippy::too_many_arguments)]
pub fn implode<'a>(
    src: &mut dyn Read,
    sink: Option<Box<dyn Write + 'a>>,
    length: u64,
    literal_mode: LiteralMode,
    dictionary_size: DictionarySize,
    optimization_level: u32,
    stats: Option<&mut ImplodeStats>,
    cap: Option<(u64, SinkHandler<'a>)>,
) -> Result<u64, CodecError> {
    let writer = match (sink, cap) {
        (Some(sink), Some((cap, handler))) => BitWriter::with_cap(sink, cap, handler),
        (sink, _) => BitWriter::new(sink),
    };
    let mut imp = Imploder {
        window: vec![0u8; WINDOW_SIZE].into_boxed_slice(),
        writer,
        literal_mode,
        dictionary_size,
        bytes_encoded: 0,
        input_length: length,
    };

    let mut exhausted = false;
    let mut next_load_point = 0usize;
    if read_fully(src, &mut imp.window[..LOAD_CHUNK])? != LOAD_CHUNK {
        exhausted = true;
    }

    imp.writer.put_aligned_byte(literal_mode as u8)?;
    imp.writer.put_aligned_byte(dictionary_size as u8)?;

    let mut tally = ImplodeStats::default();
    let mut index = 0usize;

    while imp.bytes_encoded < length {
        index &= WINDOW_MASK;

        // Refill once the cursor enters the block holding the load point,
        // overwriting the oldest 2 KiB.
        if !exhausted && (index & LOAD_REGION) == (next_load_point & LOAD_REGION) {
            next_load_point = (next_load_point + LOAD_CHUNK) % WINDOW_SIZE;
            let end = next_load_point + LOAD_CHUNK;
            if read_fully(src, &mut imp.window[next_load_point..end])? != LOAD_CHUNK {
                exhausted = true;
            }
        }

        match imp.find_match(index) {
            Some(m) if !imp.prefer_literal(index, &m, optimization_level) => {
                imp.write_entry(m.offset, m.length)?;
                index += m.length as usize;
                imp.bytes_encoded += u64::from(m.length);

                tally.lookup_count += 1;
                tally.min_length = tally.min_length.min(m.length);
                tally.max_length = tally.max_length.max(m.length);
                tally.min_offset = tally.min_offset.min(m.offset);
                tally.max_offset = tally.max_offset.max(m.offset);
            }
            _ => {
                let byte = imp.window[index];
                imp.write_literal(byte)?;
                index += 1;
                imp.bytes_encoded += 1;
                tally.literal_count += 1;
            }
        }
    }

    // End marker: the length-519 symbol, then pad bits.
    imp.writer.write_bit(1)?;
    imp.writer.write_bits_msb_first(7, 0)?;
    imp.writer.write_bits_lsb_first(8, 0xFF)?;
    imp.writer.flush()?;

    if let Some(out) = stats {
        *out = tally;
    }
    Ok(imp.writer.bytes_written())
}

/// Inputs above this only try the 4 KiB dictionary in the parameter search.
const SINGLE_TRIAL_THRESHOLD: u64 = 4096 * 5;

/// Picks the literal mode by scanning the input.  Any byte in 0x80..=0xFE
/// forces binary mode; 0xFF does not, being indistinguishable from EOF in
/// the signed-char scan this reproduces.
fn detect_literal_mode<S: Read + Seek>(
    src: &mut S,
    length: u64,
) -> Result<LiteralMode, CodecError> {
    let mut mode = LiteralMode::Ascii;
    let mut remaining = length;
    let mut buf = [0u8; 4096];
    'scan: while remaining > 0 {
        let want = buf.len().min(remaining.min(usize::MAX as u64) as usize);
        let got = read_fully(src, &mut buf[..want])?;
        if got == 0 {
            break;
        }
        for &byte in &buf[..got] {
            if (0x80..=0xFE).contains(&byte) {
                mode = LiteralMode::Binary;
                break 'scan;
            }
        }
        remaining -= got as u64;
    }
    src.seek(SeekFrom::Start(0))?;
    Ok(mode)
}

/// Optimisation level 5: trial-implodes parameter combinations against a
/// counting sink and returns the smallest `(literal_mode, dictionary_size,
/// optimization_level)`.
///
/// The literal mode is auto-detected; dictionary trials cover all three
/// sizes for small inputs and only 4 KiB above [`SINGLE_TRIAL_THRESHOLD`];
/// token strategies tried are 1 and 3.  The source is rewound between
/// trials and left rewound on return.
pub fn find_best_implode<S: Read + Seek>(
    src: &mut S,
    length: u64,
) -> Result<(LiteralMode, DictionarySize, u32), CodecError> {
    let literal_mode = detect_literal_mode(src, length)?;

    let sizes: &[DictionarySize] = if length > SINGLE_TRIAL_THRESHOLD {
        &[DictionarySize::Size4K]
    } else {
        &DictionarySize::ALL
    };

    let mut best_size = u64::MAX;
    let mut best_dict = sizes[0];
    let mut best_opt = 1;
    for &dict in sizes {
        for opt in [1u32, 3] {
            let written = implode(src, None, length, literal_mode, dict, opt, None, None)?;
            src.seek(SeekFrom::Start(0))?;
            if written < best_size {
                best_size = written;
                best_dict = dict;
                best_opt = opt;
            }
        }
    }
    Ok((literal_mode, best_dict, best_opt))
}
