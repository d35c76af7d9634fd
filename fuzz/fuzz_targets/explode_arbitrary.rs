#![no_main]
use std::io::Cursor;

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Feed arbitrary bytes through the decoder.  Err results are expected;
    // what matters is the absence of panics and unbounded output.
    let mut out = Vec::new();
    let _ = lfg::explode(
        Box::new(Cursor::new(data.to_vec())),
        &mut out,
        None,
        None,
        None,
    );
});
