//! Helpers shared by the integration suites.

#![allow(dead_code)]

use std::io::Cursor;

use lfg::{explode, implode, DictionarySize, ExplodeStats, ImplodeStats, LiteralMode};

/// All encoder parameter combinations the format defines.
pub fn parameter_grid() -> Vec<(LiteralMode, DictionarySize, u32)> {
    let mut grid = Vec::new();
    for mode in [LiteralMode::Binary, LiteralMode::Ascii] {
        for dict in DictionarySize::ALL {
            for opt in 0..=3 {
                grid.push((mode, dict, opt));
            }
        }
    }
    grid
}

/// Deterministic xorshift32 byte stream.
pub fn random_bytes(mut state: u32, len: usize) -> Vec<u8> {
    assert_ne!(state, 0);
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        out.extend_from_slice(&state.to_le_bytes());
    }
    out.truncate(len);
    out
}

/// Compressible pseudo-random data: a small alphabet with frequent runs.
pub fn clustered_bytes(seed: u32, len: usize) -> Vec<u8> {
    let noise = random_bytes(seed, len);
    let mut out = Vec::with_capacity(len);
    let mut current = b'a';
    for byte in noise {
        if byte % 11 == 0 {
            current = b'a' + (byte % 7);
        }
        out.push(current);
    }
    out
}

pub fn implode_to_vec(
    data: &[u8],
    mode: LiteralMode,
    dict: DictionarySize,
    opt: u32,
) -> (Vec<u8>, ImplodeStats) {
    let mut src = Cursor::new(data.to_vec());
    let mut payload = Vec::new();
    let mut stats = ImplodeStats::default();
    implode(
        &mut src,
        Some(Box::new(&mut payload)),
        data.len() as u64,
        mode,
        dict,
        opt,
        Some(&mut stats),
        None,
    )
    .expect("implode should succeed");
    (payload, stats)
}

pub fn explode_to_vec(payload: &[u8]) -> (Vec<u8>, ExplodeStats) {
    let mut out = Vec::new();
    let mut stats = ExplodeStats::default();
    explode(
        Box::new(Cursor::new(payload.to_vec())),
        &mut out,
        None,
        Some(&mut stats),
        None,
    )
    .expect("explode should succeed");
    (out, stats)
}

/// Implode, explode, compare; returns the payload size.
pub fn assert_roundtrip(
    data: &[u8],
    mode: LiteralMode,
    dict: DictionarySize,
    opt: u32,
) -> usize {
    let (payload, stats) = implode_to_vec(data, mode, dict, opt);
    assert_eq!(payload[0], mode as u8);
    assert_eq!(payload[1], dict as u8);
    if stats.lookup_count > 0 {
        assert!(
            (stats.max_offset as usize) < dict.window_bytes(),
            "offset {} escapes the {:?} window",
            stats.max_offset,
            dict
        );
    }
    let (decoded, _) = explode_to_vec(&payload);
    assert_eq!(
        decoded, data,
        "round-trip mismatch (mode {:?}, dict {:?}, opt {})",
        mode, dict, opt
    );
    payload.len()
}
