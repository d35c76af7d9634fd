#![no_main]
use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use lfg::{DictionarySize, LiteralMode};

fuzz_target!(|input: (Vec<u8>, bool, u8, u8)| {
    let (data, ascii, dict_sel, opt_sel) = input;
    let mode = if ascii {
        LiteralMode::Ascii
    } else {
        LiteralMode::Binary
    };
    let dict = match dict_sel % 3 {
        0 => DictionarySize::Size1K,
        1 => DictionarySize::Size2K,
        _ => DictionarySize::Size4K,
    };
    let opt = u32::from(opt_sel % 4);

    let mut src = Cursor::new(data.clone());
    let mut payload = Vec::new();
    lfg::implode(
        &mut src,
        Some(Box::new(&mut payload)),
        data.len() as u64,
        mode,
        dict,
        opt,
        None,
        None,
    )
    .expect("implode on in-memory buffers cannot fail");

    let mut out = Vec::new();
    lfg::explode(
        Box::new(Cursor::new(payload)),
        &mut out,
        Some(data.len() as u64),
        None,
        None,
    )
    .expect("own output must decode");
    assert_eq!(out, data, "round-trip mismatch");
});
