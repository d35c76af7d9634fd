//! Codec parameter types, statistics, limits, and error handling.
//!
//! Covers:
//! - Payload header parameters: [`LiteralMode`], [`DictionarySize`]
//! - Copy-token limits (`MIN_COPY_LENGTH`, `MAX_COPY_LENGTH`, `END_MARKER_LENGTH`)
//! - [`ExplodeStats`] / [`ImplodeStats`] collected during one codec call
//! - [`CodecError`] with `Display` + `Error` impls

use core::fmt;
use std::io;

// ─────────────────────────────────────────────────────────────────────────────
// Copy-token limits
// ─────────────────────────────────────────────────────────────────────────────

/// Shortest back-reference the format can express.
pub const MIN_COPY_LENGTH: u32 = 2;

/// Longest back-reference the format can express.
pub const MAX_COPY_LENGTH: u32 = 518;

/// Reserved copy-length value marking the end of the compressed data.
pub const END_MARKER_LENGTH: u32 = 519;

/// Largest offset a length-2 reference can carry: its low-bit field is fixed
/// at 2 bits, leaving 8 bits of prefix-coded MSBs.
pub const MAX_SHORT_COPY_OFFSET: u32 = 255;

// ─────────────────────────────────────────────────────────────────────────────
// Header parameters
// ─────────────────────────────────────────────────────────────────────────────

/// How literal tokens are coded, selected by the first payload header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LiteralMode {
    /// Each literal is a raw byte, 8 bits LSB-first.
    #[default]
    Binary = 0,
    /// Each literal is a 4..13-bit prefix code permuted through the
    /// frequency-ordered literal table (shorter codes for common text bytes).
    Ascii = 1,
}

impl LiteralMode {
    /// Parses the first payload header byte.
    pub fn from_header_byte(byte: u8) -> Result<Self, CodecError> {
        match byte {
            0 => Ok(LiteralMode::Binary),
            1 => Ok(LiteralMode::Ascii),
            other => Err(CodecError::BadHeader {
                literal_mode: other,
                dictionary_size: 0,
            }),
        }
    }
}

impl fmt::Display for LiteralMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralMode::Binary => f.write_str("BINARY"),
            LiteralMode::Ascii => f.write_str("ASCII"),
        }
    }
}

/// Sliding-dictionary width, selected by the second payload header byte.
///
/// The stored value is also the number of low offset bits carried outside the
/// prefix code for copies of length ≥ 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum DictionarySize {
    /// 1 KiB window.
    Size1K = 4,
    /// 2 KiB window.
    Size2K = 5,
    /// 4 KiB window.
    #[default]
    Size4K = 6,
}

impl DictionarySize {
    /// Number of low offset bits for copies of length ≥ 3.
    #[inline]
    pub fn low_bits(self) -> u32 {
        self as u32
    }

    /// Window width in bytes: `1 << (6 + n)`.
    #[inline]
    pub fn window_bytes(self) -> usize {
        1usize << (6 + self as usize)
    }

    /// Parses the second payload header byte.
    pub fn from_header_byte(byte: u8) -> Result<Self, CodecError> {
        match byte {
            4 => Ok(DictionarySize::Size1K),
            5 => Ok(DictionarySize::Size2K),
            6 => Ok(DictionarySize::Size4K),
            other => Err(CodecError::BadHeader {
                literal_mode: 0,
                dictionary_size: other,
            }),
        }
    }

    /// Default window for an input of the given length: the smallest window
    /// that covers the whole input, capped at 4 KiB.
    pub fn for_input_length(length: u64) -> Self {
        if length <= 1024 {
            DictionarySize::Size1K
        } else if length <= 2048 {
            DictionarySize::Size2K
        } else {
            DictionarySize::Size4K
        }
    }

    /// All sizes, smallest first.
    pub const ALL: [DictionarySize; 3] = [
        DictionarySize::Size1K,
        DictionarySize::Size2K,
        DictionarySize::Size4K,
    ];
}

// ─────────────────────────────────────────────────────────────────────────────
// Statistics
// ─────────────────────────────────────────────────────────────────────────────

/// Counters filled in by one [`explode`](crate::codec::explode::explode) call.
#[derive(Debug, Clone)]
pub struct ExplodeStats {
    /// Literal mode echoed from the payload header.
    pub literal_mode: LiteralMode,
    /// Dictionary size echoed from the payload header.
    pub dictionary_size: DictionarySize,
    /// Number of literal tokens decoded.
    pub literal_count: u64,
    /// Number of copy tokens decoded (end marker excluded).
    pub reference_count: u64,
    /// Smallest / largest copy length observed. Meaningless when
    /// `reference_count == 0`.
    pub min_length: u32,
    pub max_length: u32,
    /// Smallest / largest copy offset observed. Meaningless when
    /// `reference_count == 0`.
    pub min_offset: u32,
    pub max_offset: u32,
    /// Copy-token count per decoded length; index range `[0, 520)`.
    pub length_histogram: Box<[u64; 520]>,
}

impl Default for ExplodeStats {
    fn default() -> Self {
        ExplodeStats {
            literal_mode: LiteralMode::Binary,
            dictionary_size: DictionarySize::Size4K,
            literal_count: 0,
            reference_count: 0,
            min_length: u32::MAX,
            max_length: 0,
            min_offset: u32::MAX,
            max_offset: 0,
            length_histogram: Box::new([0; 520]),
        }
    }
}

/// Counters filled in by one [`implode`](crate::codec::implode::implode) call.
#[derive(Debug, Clone)]
pub struct ImplodeStats {
    /// Number of literal tokens emitted.
    pub literal_count: u64,
    /// Number of copy tokens emitted (end marker excluded).
    pub lookup_count: u64,
    /// Smallest / largest copy length emitted. Meaningless when
    /// `lookup_count == 0`.
    pub min_length: u32,
    pub max_length: u32,
    /// Smallest / largest copy offset emitted. Meaningless when
    /// `lookup_count == 0`.
    pub min_offset: u32,
    pub max_offset: u32,
}

impl Default for ImplodeStats {
    fn default() -> Self {
        ImplodeStats {
            literal_count: 0,
            lookup_count: 0,
            min_length: u32::MAX,
            max_length: 0,
            min_offset: u32::MAX,
            max_offset: 0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Terminal failures of one implode/explode call.
///
/// An expected-length mismatch after decoding is deliberately *not* here: it
/// is reported as a warning and does not change the call's result.
#[derive(Debug)]
pub enum CodecError {
    /// Payload header carries a literal mode above 1 or a dictionary size
    /// outside 4..=6.
    BadHeader { literal_mode: u8, dictionary_size: u8 },
    /// The byte source ran dry mid-payload and no continuation source was
    /// available.
    UnexpectedEof,
    /// A prefix code did not resolve within its maximum bit budget. Only a
    /// corrupted stream can produce this.
    MalformedCode(&'static str),
    /// The underlying source or sink failed.
    Io(io::Error),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::BadHeader {
                literal_mode,
                dictionary_size,
            } => write!(
                f,
                "bad payload header (literal mode {}, dictionary size {})",
                literal_mode, dictionary_size
            ),
            CodecError::UnexpectedEof => f.write_str("unexpected end of compressed data"),
            CodecError::MalformedCode(what) => write!(f, "malformed {} code", what),
            CodecError::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        CodecError::Io(e)
    }
}
