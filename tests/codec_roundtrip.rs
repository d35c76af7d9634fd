//! Round-trip coverage: every parameter combination over a spread of input
//! shapes and the boundary lengths of the format.

mod common;

use common::{assert_roundtrip, clustered_bytes, parameter_grid, random_bytes};
use lfg::{DictionarySize, LiteralMode};
use proptest::prelude::*;

// ─────────────────────────────────────────────────────────────────────────────
// Boundary lengths
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn tiny_inputs_round_trip_everywhere() {
    for &len in &[0usize, 1, 2] {
        let data = random_bytes(0xBEEF + len as u32, len);
        for (mode, dict, opt) in parameter_grid() {
            assert_roundtrip(&data, mode, dict, opt);
        }
    }
}

#[test]
fn max_copy_boundaries_round_trip_everywhere() {
    // 518 is the longest copy; 519 forces a token split right at the limit.
    for &len in &[518usize, 519] {
        let uniform = vec![0x41u8; len];
        let mixed = clustered_bytes(0x1234, len);
        for (mode, dict, opt) in parameter_grid() {
            assert_roundtrip(&uniform, mode, dict, opt);
            assert_roundtrip(&mixed, mode, dict, opt);
        }
    }
}

#[test]
fn kilobyte_inputs_round_trip_everywhere() {
    let data = clustered_bytes(0xACE1, 1024);
    for (mode, dict, opt) in parameter_grid() {
        assert_roundtrip(&data, mode, dict, opt);
    }
}

#[test]
fn window_wrap_inputs_round_trip_everywhere() {
    // 8 KiB spans the whole encode window and forces refills.
    let data = clustered_bytes(0x00C0FFEE, 8192);
    for (mode, dict, opt) in parameter_grid() {
        assert_roundtrip(&data, mode, dict, opt);
    }
}

#[test]
fn large_input_round_trips() {
    // 64 KiB cycles the encode window eight times over.
    let data = clustered_bytes(0xD15C0, 65536);
    assert_roundtrip(&data, LiteralMode::Binary, DictionarySize::Size4K, 3);
    assert_roundtrip(&data, LiteralMode::Ascii, DictionarySize::Size1K, 0);
}

#[test]
fn incompressible_input_round_trips() {
    let data = random_bytes(0x5EED, 2048);
    for (mode, dict, opt) in parameter_grid() {
        assert_roundtrip(&data, mode, dict, opt);
    }
}

#[test]
fn text_round_trips_in_both_literal_modes() {
    let data = b"What is a scepter? It's a big stick with a knob on the end. ".repeat(20);
    for (mode, dict, opt) in parameter_grid() {
        assert_roundtrip(&data, mode, dict, opt);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Property: decode(encode(x)) == x for arbitrary bytes and parameters
// ─────────────────────────────────────────────────────────────────────────────

fn any_dict() -> impl Strategy<Value = DictionarySize> {
    prop_oneof![
        Just(DictionarySize::Size1K),
        Just(DictionarySize::Size2K),
        Just(DictionarySize::Size4K),
    ]
}

fn any_mode() -> impl Strategy<Value = LiteralMode> {
    prop_oneof![Just(LiteralMode::Binary), Just(LiteralMode::Ascii)]
}

proptest! {
    #[test]
    fn arbitrary_bytes_round_trip(
        data in proptest::collection::vec(any::<u8>(), 0..512),
        mode in any_mode(),
        dict in any_dict(),
        opt in 0u32..4,
    ) {
        assert_roundtrip(&data, mode, dict, opt);
    }

    #[test]
    fn repetitive_bytes_round_trip(
        seed in 1u32..u32::MAX,
        len in 0usize..2000,
        mode in any_mode(),
        dict in any_dict(),
        opt in 0u32..4,
    ) {
        let data = clustered_bytes(seed, len);
        assert_roundtrip(&data, mode, dict, opt);
    }
}
