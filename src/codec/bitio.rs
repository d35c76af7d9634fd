//! Bit-level input and output over byte streams.
//!
//! Bits are packed LSB-first into successive bytes on both sides: bit 0 of a
//! byte is the first bit read or written, bit 7 the last.  On top of that the
//! token formats need *both* reassembly orders, so the reader and writer each
//! expose an MSB-first and an LSB-first multi-bit primitive; call sites state
//! which one the field uses.
//!
//! Both ends support swapping the underlying stream mid-payload, which is how
//! members spanning several disk files are handled: the reader consults an
//! EOF handler when its source runs dry, and the writer consults a cap
//! handler when its byte budget is reached.

use std::io::{self, Read, Write};

use crate::codec::types::CodecError;

/// Supplies a continuation source once the current one is exhausted.
/// Returning `None` means no further data exists.
pub type SourceHandler<'a> = Box<dyn FnMut() -> Option<Box<dyn Read + 'a>> + 'a>;

/// Supplies a continuation sink once the current byte budget is spent.
/// Receives the byte count written so far and returns the replacement sink
/// together with its own budget (bytes allowed on the new sink).
pub type SinkHandler<'a> = Box<dyn FnMut(u64) -> Option<(Box<dyn Write + 'a>, u64)> + 'a>;

// ─────────────────────────────────────────────────────────────────────────────
// Reader
// ─────────────────────────────────────────────────────────────────────────────

/// Pulls bits LSB-first from a byte source.
pub struct BitReader<'a> {
    src: Box<dyn Read + 'a>,
    on_eof: Option<SourceHandler<'a>>,
    current: u8,
    /// Bit position the next bit comes from; 0 means a fresh byte is needed.
    bit_pos: u32,
    total_bytes: u64,
}

impl<'a> BitReader<'a> {
    pub fn new(src: Box<dyn Read + 'a>) -> Self {
        Self::with_eof_handler(src, None)
    }

    pub fn with_eof_handler(src: Box<dyn Read + 'a>, on_eof: Option<SourceHandler<'a>>) -> Self {
        BitReader {
            src,
            on_eof,
            current: 0,
            bit_pos: 0,
            total_bytes: 0,
        }
    }

    /// Total bytes pulled from all sources so far.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    fn next_source_byte(&mut self) -> Result<u8, CodecError> {
        let mut byte = [0u8; 1];
        loop {
            match self.src.read(&mut byte) {
                Ok(0) => {
                    // Current source is done; ask for a continuation.
                    match self.on_eof.as_mut().and_then(|handler| handler()) {
                        Some(next) => self.src = next,
                        None => return Err(CodecError::UnexpectedEof),
                    }
                }
                Ok(_) => {
                    self.total_bytes += 1;
                    return Ok(byte[0]);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(CodecError::Io(e)),
            }
        }
    }

    /// Reads one whole byte.  Only meaningful at a byte boundary; used for
    /// the two plain header bytes in front of the bitstream.
    pub fn read_aligned_byte(&mut self) -> Result<u8, CodecError> {
        debug_assert_eq!(self.bit_pos, 0);
        self.next_source_byte()
    }

    /// Reads the next bit.
    pub fn read_bit(&mut self) -> Result<u32, CodecError> {
        if self.bit_pos == 0 {
            self.current = self.next_source_byte()?;
        }
        let bit = (self.current >> self.bit_pos) & 1;
        self.bit_pos = (self.bit_pos + 1) % 8;
        Ok(u32::from(bit))
    }

    /// Reads `count` bits; the i-th bit read lands at position i.
    pub fn read_bits_lsb_first(&mut self, count: u32) -> Result<u32, CodecError> {
        let mut bits = 0;
        for i in 0..count {
            bits |= self.read_bit()? << i;
        }
        Ok(bits)
    }

    /// Reads `count` bits, shifting each into the accumulator from the right,
    /// so the first bit read becomes the most significant.
    pub fn read_bits_msb_first(&mut self, count: u32) -> Result<u32, CodecError> {
        let mut bits = 0;
        for _ in 0..count {
            bits = (bits << 1) | self.read_bit()?;
        }
        Ok(bits)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Writer
// ─────────────────────────────────────────────────────────────────────────────

/// Packs bits LSB-first into bytes and emits them to a sink.
///
/// A writer built with no sink counts bytes without storing them; the
/// encoder's parameter search uses this to measure output sizes cheaply.
pub struct BitWriter<'a> {
    sink: Option<Box<dyn Write + 'a>>,
    on_cap: Option<SinkHandler<'a>>,
    /// Absolute byte-count budget; crossing it triggers the cap handler.
    cap: Option<u64>,
    current: u8,
    bit_pos: u32,
    bytes_written: u64,
}

impl<'a> BitWriter<'a> {
    pub fn new(sink: Option<Box<dyn Write + 'a>>) -> Self {
        BitWriter {
            sink,
            on_cap: None,
            cap: None,
            current: 0,
            bit_pos: 0,
            bytes_written: 0,
        }
    }

    pub fn with_cap(sink: Box<dyn Write + 'a>, cap: u64, on_cap: SinkHandler<'a>) -> Self {
        BitWriter {
            sink: Some(sink),
            on_cap: Some(on_cap),
            cap: Some(cap),
            current: 0,
            bit_pos: 0,
            bytes_written: 0,
        }
    }

    /// Total bytes emitted, including bytes handed to replaced sinks.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn emit_byte(&mut self, byte: u8) -> Result<(), CodecError> {
        if let Some(sink) = self.sink.as_mut() {
            sink.write_all(&[byte])?;
        }
        self.bytes_written += 1;

        // The budget only matters when bytes are actually going somewhere.
        if self.sink.is_some() {
            if let Some(cap) = self.cap {
                if self.bytes_written >= cap {
                    let written = self.bytes_written;
                    let rolled = self.on_cap.as_mut().and_then(|handler| handler(written));
                    match rolled {
                        Some((next_sink, budget)) => {
                            self.sink = Some(next_sink);
                            self.cap = Some(self.bytes_written + budget);
                        }
                        None => {
                            return Err(CodecError::Io(io::Error::other(
                                "output byte budget reached and no continuation sink",
                            )))
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Writes one whole byte.  Only meaningful at a byte boundary; used for
    /// the two plain header bytes in front of the bitstream.
    pub fn put_aligned_byte(&mut self, byte: u8) -> Result<(), CodecError> {
        debug_assert_eq!(self.bit_pos, 0);
        self.emit_byte(byte)
    }

    /// Writes one bit.
    pub fn write_bit(&mut self, bit: u32) -> Result<(), CodecError> {
        self.current |= ((bit & 1) as u8) << self.bit_pos;
        if self.bit_pos == 7 {
            let byte = self.current;
            self.current = 0;
            self.emit_byte(byte)?;
        }
        self.bit_pos = (self.bit_pos + 1) % 8;
        Ok(())
    }

    /// Writes bit `count - 1` of `bits` first.
    pub fn write_bits_msb_first(&mut self, count: u32, bits: u32) -> Result<(), CodecError> {
        for i in (0..count).rev() {
            self.write_bit((bits >> i) & 1)?;
        }
        Ok(())
    }

    /// Writes bit 0 of `bits` first.
    pub fn write_bits_lsb_first(&mut self, count: u32, bits: u32) -> Result<(), CodecError> {
        for i in 0..count {
            self.write_bit((bits >> i) & 1)?;
        }
        Ok(())
    }

    /// Zero-pads the current byte to a boundary and emits it.
    pub fn flush(&mut self) -> Result<(), CodecError> {
        let pad = (8 - self.bit_pos) % 8;
        for _ in 0..pad {
            self.write_bit(0)?;
        }
        Ok(())
    }
}
