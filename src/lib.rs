//! Pack and extract LucasFilm Games "LFG!" installer archives.
//!
//! The heart of the crate is the PKWARE DCL implode/explode codec in
//! [`codec`]: a bit-level compressor with irregular prefix codes and a
//! sliding dictionary of 1, 2, or 4 KiB.  [`archive`] wraps it in the
//! multi-segment "LFG!" container, and [`cli`] holds the two front-ends.

pub mod archive;
pub mod cli;
pub mod codec;
pub mod timefn;

// ── Convenience re-exports for the most common entry points ──────────────────

/// Decompress one imploded payload.
pub use codec::explode::explode;
/// Compress a byte stream into one imploded payload.
pub use codec::implode::implode;
/// Parameter search behind optimisation level 5.
pub use codec::implode::find_best_implode;
/// Codec parameter and error types.
pub use codec::types::{CodecError, DictionarySize, ExplodeStats, ImplodeStats, LiteralMode};
/// Extract or inspect an archive.
pub use archive::read::{read_archive, DumpOptions};
/// Create an archive.
pub use archive::write::{pack_archive, PackOptions};
