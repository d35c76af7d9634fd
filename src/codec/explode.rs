//! Explode: decompress one imploded payload.
//!
//! The payload is two plain header bytes (literal mode, dictionary size)
//! followed by a bitstream of literal and copy tokens, terminated by the
//! reserved copy length 519.  Decoded bytes pass through a 16 KiB output
//! ring that doubles as the back-reference window.

use std::io::{self, Read, Write};

use crate::codec::bitio::{BitReader, SourceHandler};
use crate::codec::tables::{LITERAL_DECODE, LITERAL_TABLE, OFFSET_DECODE};
use crate::codec::types::{
    CodecError, DictionarySize, ExplodeStats, LiteralMode, END_MARKER_LENGTH,
};
use crate::displaylevel;

// ─────────────────────────────────────────────────────────────────────────────
// Output ring
// ─────────────────────────────────────────────────────────────────────────────

/// Ring capacity.  Four times the largest dictionary, so every reachable
/// back-reference is still resident when it is needed.
const RING_SIZE: usize = 0x4000;

/// Circular output buffer feeding the sink.
///
/// Contents persist after a flush; only the write cursor resets.  That keeps
/// the most recent `RING_SIZE` decoded bytes addressable for copy tokens.
struct OutputRing<'w> {
    buf: Box<[u8]>,
    pos: usize,
    flushed: u64,
    sink: &'w mut dyn Write,
}

impl<'w> OutputRing<'w> {
    fn new(sink: &'w mut dyn Write) -> Self {
        OutputRing {
            buf: vec![0u8; RING_SIZE].into_boxed_slice(),
            pos: 0,
            flushed: 0,
            sink,
        }
    }

    fn emit(&mut self, byte: u8) -> io::Result<()> {
        self.buf[self.pos] = byte;
        self.pos += 1;
        if self.pos == RING_SIZE {
            self.flush()?;
        }
        Ok(())
    }

    /// Byte emitted `delta` positions ago, `delta >= 1`.
    fn peek_back(&self, delta: usize) -> u8 {
        self.buf[(self.pos + RING_SIZE - delta) % RING_SIZE]
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.write_all(&self.buf[..self.pos])?;
        self.flushed += self.pos as u64;
        self.pos = 0;
        Ok(())
    }

    fn total(&self) -> u64 {
        self.flushed + self.pos as u64
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Token decoding
// ─────────────────────────────────────────────────────────────────────────────

/// Decodes one copy-length symbol (2..=519).
///
/// The prefix does not follow a regular construction, and lengths 2 and 3
/// trade places relative to code order, so this walks the code tree
/// explicitly: prefix bits are collected MSB-first, extra bits LSB-first.
fn read_copy_length(reader: &mut BitReader<'_>) -> Result<u32, CodecError> {
    let length = match reader.read_bits_msb_first(2)? {
        0 => match reader.read_bits_msb_first(2)? {
            0 => match reader.read_bits_msb_first(2)? {
                0 => {
                    if reader.read_bit()? == 1 {
                        136 + reader.read_bits_lsb_first(7)?
                    } else {
                        264 + reader.read_bits_lsb_first(8)?
                    }
                }
                1 => 72 + reader.read_bits_lsb_first(6)?,
                2 => 40 + reader.read_bits_lsb_first(5)?,
                _ => 24 + reader.read_bits_lsb_first(4)?,
            },
            1 => {
                if reader.read_bit()? == 1 {
                    12 + reader.read_bits_lsb_first(2)?
                } else {
                    16 + reader.read_bits_lsb_first(3)?
                }
            }
            2 => {
                if reader.read_bit()? == 1 {
                    9
                } else {
                    10 + reader.read_bit()?
                }
            }
            _ => 8,
        },
        1 => {
            if reader.read_bit()? == 1 {
                5
            } else if reader.read_bit()? == 1 {
                6
            } else {
                7
            }
        }
        2 => {
            if reader.read_bit()? == 1 {
                2
            } else {
                4
            }
        }
        _ => 3,
    };
    Ok(length)
}

/// Decodes one copy offset.  The MSB part is a 2..8-bit prefix code; the low
/// part is 2 bits for length-2 copies, `dictionary_size` bits otherwise.
fn read_copy_offset(
    reader: &mut BitReader<'_>,
    length: u32,
    dictionary_size: DictionarySize,
) -> Result<u32, CodecError> {
    let mut raw = reader.read_bits_msb_first(2)?;
    let mut msb = None;
    for bucket in OFFSET_DECODE.iter().skip(2) {
        let diff = raw.wrapping_sub(bucket.base_bits);
        if diff < bucket.count {
            msb = Some(bucket.base_value - diff);
            break;
        }
        raw = (raw << 1) | reader.read_bit()?;
    }
    let msb = msb.ok_or(CodecError::MalformedCode("copy offset"))?;

    let low_bits = if length == 2 {
        2
    } else {
        dictionary_size.low_bits()
    };
    Ok((msb << low_bits) | reader.read_bits_lsb_first(low_bits)?)
}

/// Decodes one literal byte.
fn read_literal(reader: &mut BitReader<'_>, mode: LiteralMode) -> Result<u8, CodecError> {
    match mode {
        LiteralMode::Binary => Ok(reader.read_bits_lsb_first(8)? as u8),
        LiteralMode::Ascii => {
            let mut raw = reader.read_bits_msb_first(4)?;
            for bucket in LITERAL_DECODE.iter().skip(4) {
                let diff = raw.wrapping_sub(bucket.base_bits);
                if diff < bucket.count {
                    return Ok(LITERAL_TABLE[(bucket.base_value - diff) as usize]);
                }
                raw = (raw << 1) | reader.read_bit()?;
            }
            Err(CodecError::MalformedCode("literal"))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry point
// ─────────────────────────────────────────────────────────────────────────────

/// Decompresses one payload from `src` into `sink`; returns the number of
/// bytes written.
///
/// `expected_length`, when given, is checked against the decoded byte count;
/// a mismatch is reported as a warning and does not fail the call.  `on_eof`
/// lets the caller continue the stream across segment boundaries.
pub fn explode<'a>(
    src: Box<dyn Read + 'a>,
    sink: &mut dyn Write,
    expected_length: Option<u64>,
    stats: Option<&mut ExplodeStats>,
    on_eof: Option<SourceHandler<'a>>,
) -> Result<u64, CodecError> {
    let mut reader = BitReader::with_eof_handler(src, on_eof);

    let literal_byte = reader.read_aligned_byte()?;
    let dict_byte = reader.read_aligned_byte()?;
    if literal_byte > 1 || !(4..=6).contains(&dict_byte) {
        return Err(CodecError::BadHeader {
            literal_mode: literal_byte,
            dictionary_size: dict_byte,
        });
    }
    let literal_mode = LiteralMode::from_header_byte(literal_byte)?;
    let dictionary_size = DictionarySize::from_header_byte(dict_byte)?;

    let mut ring = OutputRing::new(sink);
    let mut tally = ExplodeStats {
        literal_mode,
        dictionary_size,
        ..ExplodeStats::default()
    };

    loop {
        if reader.read_bit()? == 0 {
            let value = read_literal(&mut reader, literal_mode)?;
            ring.emit(value)?;
            tally.literal_count += 1;
            continue;
        }

        let length = read_copy_length(&mut reader)?;
        if length == END_MARKER_LENGTH {
            break;
        }

        let offset = read_copy_offset(&mut reader, length, dictionary_size)?;

        // Copy byte-by-byte so a small offset replays bytes this same token
        // just produced; offset 0 repeats the previous byte `length` times.
        let delta = offset as usize + 1;
        for _ in 0..length {
            let value = ring.peek_back(delta);
            ring.emit(value)?;
        }

        tally.reference_count += 1;
        tally.length_histogram[length as usize] += 1;
        tally.min_length = tally.min_length.min(length);
        tally.max_length = tally.max_length.max(length);
        tally.min_offset = tally.min_offset.min(offset);
        tally.max_offset = tally.max_offset.max(offset);
    }

    ring.flush()?;
    let total = ring.total();

    if let Some(expected) = expected_length {
        if expected != total {
            displaylevel!(
                1,
                "Warning: number of bytes written ({}) doesn't match expected value ({}).\n",
                total,
                expected
            );
        }
    }

    if let Some(out) = stats {
        *out = tally;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::bitio::BitWriter;
    use crate::codec::tables::{length_code, literal_code, offset_msb_code};
    use std::io::Cursor;

    fn decode_all(payload: &[u8]) -> Result<(Vec<u8>, ExplodeStats), CodecError> {
        let mut out = Vec::new();
        let mut stats = ExplodeStats::default();
        explode(
            Box::new(Cursor::new(payload.to_vec())),
            &mut out,
            None,
            Some(&mut stats),
            None,
        )?;
        Ok((out, stats))
    }

    /// Hand-assembles a payload through the same primitives the encoder uses.
    struct StreamBuilder {
        out: Vec<u8>,
    }

    impl StreamBuilder {
        fn new(literal_mode: u8, dictionary_size: u8) -> Self {
            StreamBuilder {
                out: vec![literal_mode, dictionary_size],
            }
        }

        fn build(self, f: impl FnOnce(&mut BitWriter<'_>)) -> Vec<u8> {
            let mut payload = self.out;
            let mut body = Vec::new();
            {
                let mut writer = BitWriter::new(Some(Box::new(&mut body)));
                f(&mut writer);
                // End marker then pad.
                writer.write_bit(1).unwrap();
                writer.write_bits_msb_first(7, 0).unwrap();
                writer.write_bits_lsb_first(8, 0xFF).unwrap();
                writer.flush().unwrap();
            }
            payload.extend_from_slice(&body);
            payload
        }
    }

    fn put_binary_literal(w: &mut BitWriter<'_>, byte: u8) {
        w.write_bit(0).unwrap();
        w.write_bits_lsb_first(8, u32::from(byte)).unwrap();
    }

    fn put_copy(w: &mut BitWriter<'_>, offset: u32, length: u32, dict_bits: u32) {
        let (bits, code, lsb_count, lsb_value) = length_code(length);
        w.write_bit(1).unwrap();
        w.write_bits_msb_first(bits, code).unwrap();
        w.write_bits_lsb_first(lsb_count, lsb_value).unwrap();
        let low = if length == 2 { 2 } else { dict_bits };
        let (obits, ocode) = offset_msb_code(offset >> low);
        w.write_bits_msb_first(obits, ocode).unwrap();
        w.write_bits_lsb_first(low, offset).unwrap();
    }

    #[test]
    fn empty_payload_decodes_to_nothing() {
        let payload = StreamBuilder::new(0, 4).build(|_| {});
        let (out, stats) = decode_all(&payload).unwrap();
        assert!(out.is_empty());
        assert_eq!(stats.literal_count, 0);
        assert_eq!(stats.reference_count, 0);
    }

    #[test]
    fn self_overlapping_copy_replays_the_tail() {
        // "a" then offset 1, length 5 alternates two bytes: "ababab".
        let payload = StreamBuilder::new(0, 4).build(|w| {
            put_binary_literal(w, b'a');
            put_binary_literal(w, b'b');
            put_copy(w, 1, 4, 4);
        });
        let (out, _) = decode_all(&payload).unwrap();
        assert_eq!(out, b"ababab");
    }

    #[test]
    fn offset_zero_repeats_previous_byte() {
        let payload = StreamBuilder::new(0, 4).build(|w| {
            put_binary_literal(w, b'a');
            put_copy(w, 0, 5, 4);
        });
        let (out, _) = decode_all(&payload).unwrap();
        assert_eq!(out, b"aaaaaa");
    }

    #[test]
    fn ascii_literals_pass_through_the_permutation() {
        let payload = StreamBuilder::new(1, 4).build(|w| {
            for &byte in b"The " {
                let (bits, code) = literal_code(byte);
                w.write_bit(0).unwrap();
                w.write_bits_msb_first(bits, code).unwrap();
            }
        });
        let (out, stats) = decode_all(&payload).unwrap();
        assert_eq!(out, b"The ");
        assert_eq!(stats.literal_mode, LiteralMode::Ascii);
        assert_eq!(stats.literal_count, 4);
    }

    #[test]
    fn bad_dictionary_size_is_rejected_before_any_output() {
        for bad in [0u8, 3, 7, 0xFF] {
            let err = decode_all(&[0, bad, 0xFF, 0xFF]).unwrap_err();
            assert!(matches!(err, CodecError::BadHeader { .. }), "ds {}", bad);
        }
    }

    #[test]
    fn bad_literal_mode_is_rejected() {
        let err = decode_all(&[2, 4, 0xFF, 0xFF]).unwrap_err();
        assert!(matches!(err, CodecError::BadHeader { .. }));
    }

    #[test]
    fn truncated_stream_reports_eof() {
        let payload = StreamBuilder::new(0, 4).build(|w| {
            put_binary_literal(w, b'x');
        });
        // Drop the final byte so the end marker is cut off.
        let err = decode_all(&payload[..payload.len() - 1]).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedEof));
    }

    #[test]
    fn histogram_counts_each_copy_length() {
        let payload = StreamBuilder::new(0, 4).build(|w| {
            put_binary_literal(w, b'q');
            put_copy(w, 0, 7, 4);
            put_copy(w, 0, 7, 4);
            put_copy(w, 0, 300, 4);
        });
        let (out, stats) = decode_all(&payload).unwrap();
        assert_eq!(out.len(), 1 + 7 + 7 + 300);
        assert!(out.iter().all(|&b| b == b'q'));
        assert_eq!(stats.length_histogram[7], 2);
        assert_eq!(stats.length_histogram[300], 1);
        assert_eq!(stats.min_length, 7);
        assert_eq!(stats.max_length, 300);
        assert_eq!(stats.reference_count, 3);
    }

    #[test]
    fn decode_crosses_ring_flush_boundary() {
        // More than one ring of output: a literal and a long run of copies.
        let payload = StreamBuilder::new(0, 6).build(|w| {
            put_binary_literal(w, 0x5A);
            for _ in 0..40 {
                put_copy(w, 0, 518, 6);
            }
        });
        let (out, _) = decode_all(&payload).unwrap();
        assert_eq!(out.len(), 1 + 40 * 518);
        assert!(out.iter().all(|&b| b == 0x5A));
    }
}
