use procmux::LineAccumulator;
use proptest::prelude::*;

#[test]
fn single_chunk_completes_lines() {
    let mut acc = LineAccumulator::new();
    assert_eq!(acc.push(b"one\ntwo\n"), vec!["one", "two"]);
    assert!(acc.is_empty());
}

#[test]
fn line_split_across_chunks() {
    let mut acc = LineAccumulator::new();
    assert!(acc.push(b"he").is_empty());
    assert_eq!(acc.push(b"llo\nwo"), vec!["hello"]);
    assert!(acc.push(b"rld").is_empty());
    assert_eq!(acc.flush(), Some("world".to_string()));
    assert!(acc.is_empty());
}

#[test]
fn flush_without_pending_data_is_none() {
    let mut acc = LineAccumulator::new();
    assert_eq!(acc.flush(), None);

    acc.push(b"tail");
    assert_eq!(acc.flush(), Some("tail".to_string()));
    // Flushing consumes the fragment.
    assert_eq!(acc.flush(), None);
}

#[test]
fn blank_lines_are_preserved() {
    let mut acc = LineAccumulator::new();
    assert_eq!(acc.push(b"\n\n"), vec!["", ""]);
}

#[test]
fn carriage_returns_are_not_stripped() {
    let mut acc = LineAccumulator::new();
    assert_eq!(acc.push(b"a\r\n"), vec!["a\r"]);
}

#[test]
fn utf8_sequence_split_across_chunks_survives() {
    // "é" is 0xC3 0xA9; cut between the two bytes.
    let mut acc = LineAccumulator::new();
    assert!(acc.push(&[0xC3]).is_empty());
    assert_eq!(acc.push(&[0xA9, b'\n']), vec!["é"]);
}

proptest! {
    // Concatenating every emitted line (terminators restored) plus the
    // flushed tail reconstructs the input exactly, no matter where the
    // chunk boundaries fall.
    #[test]
    fn round_trip_reconstructs_stream(
        input in "[ -~\n]{0,200}",
        cuts in proptest::collection::vec(0usize..=200, 0..8),
    ) {
        let bytes = input.as_bytes();
        let mut boundaries: Vec<usize> =
            cuts.into_iter().map(|c| c.min(bytes.len())).collect();
        boundaries.sort_unstable();
        boundaries.push(bytes.len());

        let mut acc = LineAccumulator::new();
        let mut rebuilt = String::new();
        let mut prev = 0;
        for end in boundaries {
            for line in acc.push(&bytes[prev..end]) {
                rebuilt.push_str(&line);
                rebuilt.push('\n');
            }
            prev = end;
        }
        if let Some(tail) = acc.flush() {
            rebuilt.push_str(&tail);
        }

        prop_assert_eq!(rebuilt, input);
    }
}
