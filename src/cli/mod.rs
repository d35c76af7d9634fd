//! Command-line front-ends: `lfgdump` (extract) and `lfgmake` (create).

pub mod constants;
pub mod dump;
pub mod make;
