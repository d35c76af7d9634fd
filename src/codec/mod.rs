//! The PKWARE DCL implode/explode codec.
//!
//! One payload is two plain header bytes (literal mode, dictionary size)
//! followed by an LSB-first-packed bitstream of literal and copy tokens,
//! terminated by the reserved copy length 519 and zero pad bits.  Copies
//! reference up to 4 KiB of decoded history and replay byte-by-byte, so
//! self-overlapping references repeat their own tail.

pub mod bitio;
pub mod explode;
pub mod implode;
pub mod tables;
pub mod types;

pub use bitio::{BitReader, BitWriter, SinkHandler, SourceHandler};
pub use explode::explode;
pub use implode::{find_best_implode, implode};
pub use types::{
    CodecError, DictionarySize, ExplodeStats, ImplodeStats, LiteralMode, END_MARKER_LENGTH,
    MAX_COPY_LENGTH, MAX_SHORT_COPY_OFFSET, MIN_COPY_LENGTH,
};
