//! The "LFG!" multi-segment archive container around the codec.

pub mod read;
pub mod types;
pub mod write;

pub use read::{read_archive, DumpOptions};
pub use types::{ArchiveHeader, MemberHeader};
pub use write::{pack_archive, PackOptions};
