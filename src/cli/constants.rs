//! Identity constants, the global display level, and output macros shared
//! by the `lfgdump` and `lfgmake` front-ends.

use std::sync::atomic::{AtomicU32, Ordering};

// ── Identity ──────────────────────────────────────────────────────────────────
pub const DUMP_TOOL_NAME: &str = "LFGDump";
pub const DUMP_VERSION_MAJOR: u32 = 1;
pub const DUMP_VERSION_MINOR: u32 = 5;
pub const MAKE_TOOL_NAME: &str = "LFGMake";
pub const MAKE_VERSION_MAJOR: u32 = 1;
pub const MAKE_VERSION_MINOR: u32 = 6;

// ── Display level ─────────────────────────────────────────────────────────────
//
// Shared across modules as a crate-level atomic, like a file-scoped display
// global would be in a single-binary tool.
//
// 0 = no output; 1 = errors and warnings; 2 = normal tables; 3 = per-segment
// progress.
pub static DISPLAY_LEVEL: AtomicU32 = AtomicU32::new(2);

/// Returns the current display level.
#[inline]
pub fn display_level() -> u32 {
    DISPLAY_LEVEL.load(Ordering::Relaxed)
}

/// Sets the display level.
#[inline]
pub fn set_display_level(level: u32) {
    DISPLAY_LEVEL.store(level, Ordering::Relaxed);
}

// ── Output macros ─────────────────────────────────────────────────────────────

/// Print to stdout (tables, summaries).
#[macro_export]
macro_rules! displayout {
    ($($arg:tt)*) => { print!($($arg)*) };
}

/// Print to stderr unconditionally.
#[macro_export]
macro_rules! display {
    ($($arg:tt)*) => { eprint!($($arg)*) };
}

/// Print to stderr at or above `level` (warnings and diagnostics).
#[macro_export]
macro_rules! displaylevel {
    ($level:expr, $($arg:tt)*) => {
        if $crate::cli::constants::display_level() >= $level {
            eprint!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_level_round_trips() {
        let prev = display_level();
        set_display_level(3);
        assert_eq!(display_level(), 3);
        set_display_level(prev);
    }
}
