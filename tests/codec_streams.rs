//! Stream-level behaviour: header echo, terminator handling, token shapes
//! on known inputs, the level-5 parameter search, and sink rollover.

mod common;

use std::cell::RefCell;
use std::io::{Cursor, Write};
use std::rc::Rc;

use common::{assert_roundtrip, explode_to_vec, implode_to_vec, parameter_grid};
use lfg::{
    explode, find_best_implode, implode, CodecError, DictionarySize, LiteralMode,
};

// ─────────────────────────────────────────────────────────────────────────────
// Header and terminator
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn empty_input_emits_header_marker_padding_only() {
    for mode in [LiteralMode::Binary, LiteralMode::Ascii] {
        for dict in DictionarySize::ALL {
            let (payload, _) = implode_to_vec(b"", mode, dict, 0);
            // Header, then the 16 end-marker bits flushed into two bytes.
            assert_eq!(payload, vec![mode as u8, dict as u8, 0x01, 0xFF]);
            let (decoded, _) = explode_to_vec(&payload);
            assert!(decoded.is_empty());
        }
    }
}

#[test]
fn decoder_stops_at_the_end_marker() {
    let data = b"terminator check";
    let (mut payload, _) =
        implode_to_vec(data, LiteralMode::Binary, DictionarySize::Size1K, 3);
    // Anything after the marker's padding must never reach the output.
    payload.extend_from_slice(&[0xAA; 32]);
    let (decoded, _) = explode_to_vec(&payload);
    assert_eq!(decoded, data);
}

#[test]
fn bad_header_fails_without_output() {
    let mut out = Vec::new();
    let err = explode(
        Box::new(Cursor::new(vec![0u8, 7, 0x80, 0xFF])),
        &mut out,
        None,
        None,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, CodecError::BadHeader { .. }));
    assert!(out.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Token shapes on the classic inputs
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn zero_block_is_one_literal_plus_self_copies() {
    let data = vec![0u8; 1024];
    let (payload, stats) = implode_to_vec(&data, LiteralMode::Binary, DictionarySize::Size1K, 0);
    assert_eq!(stats.literal_count, 1);
    assert_eq!(stats.min_offset, 0);
    assert_eq!(stats.max_offset, 0);
    let (decoded, _) = explode_to_vec(&payload);
    assert_eq!(decoded, data);
}

#[test]
fn abc_pattern_is_three_literals_plus_one_copy() {
    let data = b"ABCABCABCABCABC";
    let (payload, stats) = implode_to_vec(data, LiteralMode::Binary, DictionarySize::Size1K, 0);
    assert_eq!(stats.literal_count, 3);
    assert_eq!(stats.lookup_count, 1);
    assert_eq!(stats.max_offset, 2);
    assert_eq!(stats.max_length, 12);
    let (decoded, dstats) = explode_to_vec(&payload);
    assert_eq!(decoded, data);
    assert_eq!(dstats.reference_count, 1);
    assert_eq!(dstats.length_histogram[12], 1);
}

#[test]
fn ascii_mode_beats_binary_on_text() {
    let data = b"The quick brown fox";
    let (ascii, _) = implode_to_vec(data, LiteralMode::Ascii, DictionarySize::Size1K, 3);
    let (binary, _) = implode_to_vec(data, LiteralMode::Binary, DictionarySize::Size1K, 3);
    assert!(ascii.len() < binary.len());
    let (decoded, _) = explode_to_vec(&ascii);
    assert_eq!(decoded, data);
}

#[test]
fn every_level_shrinks_english_prose() {
    let data =
        b"How appropriate. You fight like a cow. I'm rubber, you're glue. ".repeat(16);
    for (mode, dict, opt) in parameter_grid() {
        let size = assert_roundtrip(&data, mode, dict, opt);
        assert!(size < data.len(), "mode {:?} dict {:?} opt {}", mode, dict, opt);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Level 5
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn best_search_never_loses_to_a_fixed_level() {
    let samples: Vec<Vec<u8>> = vec![
        b"look behind you, a three-headed monkey! ".repeat(12),
        common::clustered_bytes(77, 3000),
        common::random_bytes(99, 700),
        vec![9u8; 2600],
    ];
    for data in samples {
        let mut src = Cursor::new(data.clone());
        let (mode, dict, opt) = find_best_implode(&mut src, data.len() as u64).unwrap();
        let chosen = implode(
            &mut src,
            None,
            data.len() as u64,
            mode,
            dict,
            opt,
            None,
            None,
        )
        .unwrap();
        src.set_position(0);

        for (fixed_mode, fixed_dict, fixed_opt) in parameter_grid() {
            if fixed_mode != mode {
                continue; // level 5 fixes the literal mode by content scan
            }
            let size = implode(
                &mut src,
                None,
                data.len() as u64,
                fixed_mode,
                fixed_dict,
                fixed_opt,
                None,
                None,
            )
            .unwrap();
            src.set_position(0);
            if fixed_opt == 1 || fixed_opt == 3 {
                assert!(
                    chosen <= size,
                    "level 5 chose {} but ({:?},{}) gives {}",
                    chosen,
                    fixed_dict,
                    fixed_opt,
                    size
                );
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sink rollover
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct SegmentSink(Rc<RefCell<Vec<u8>>>);

impl Write for SegmentSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn capped_output_concatenates_to_the_uncapped_stream() {
    let data = common::clustered_bytes(0xFEED, 5000);
    let (single, _) = implode_to_vec(&data, LiteralMode::Binary, DictionarySize::Size4K, 2);

    let segments: Rc<RefCell<Vec<SegmentSink>>> = Rc::default();
    let first = SegmentSink::default();
    segments.borrow_mut().push(first.clone());

    let written = {
        let segments = segments.clone();
        let mut src = Cursor::new(data.clone());
        implode(
            &mut src,
            Some(Box::new(first)),
            data.len() as u64,
            LiteralMode::Binary,
            DictionarySize::Size4K,
            2,
            None,
            Some((
                40,
                Box::new(move |_written| {
                    let next = SegmentSink::default();
                    segments.borrow_mut().push(next.clone());
                    Some((Box::new(next) as Box<dyn Write>, 64))
                }),
            )),
        )
        .unwrap()
    };

    let parts = segments.borrow();
    assert!(parts.len() > 2, "cap of 40/64 bytes must split the stream");
    let mut joined = Vec::new();
    for part in parts.iter() {
        joined.extend_from_slice(&part.0.borrow()[..]);
    }
    assert_eq!(joined.len() as u64, written);
    assert_eq!(joined, single);

    // The reassembled stream still decodes.
    let (decoded, _) = explode_to_vec(&joined);
    assert_eq!(decoded, data);
}

// ─────────────────────────────────────────────────────────────────────────────
// Source rollover
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn split_payload_decodes_through_the_eof_handler() {
    let data = b"spanning members keep decoding across segment boundaries".to_vec();
    let (payload, _) = implode_to_vec(&data, LiteralMode::Ascii, DictionarySize::Size1K, 1);

    let (head, tail) = payload.split_at(payload.len() / 3);
    let chunks = Rc::new(RefCell::new(vec![tail.to_vec()]));
    let supplier = chunks.clone();

    let mut out = Vec::new();
    let total = explode(
        Box::new(Cursor::new(head.to_vec())),
        &mut out,
        Some(data.len() as u64),
        None,
        Some(Box::new(move || {
            supplier
                .borrow_mut()
                .pop()
                .map(|chunk| Box::new(Cursor::new(chunk)) as Box<dyn std::io::Read>)
        })),
    )
    .unwrap();
    assert_eq!(total, data.len() as u64);
    assert_eq!(out, data);
}
