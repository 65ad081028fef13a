//! Property tests: decoding must not depend on where chunks are cut

use bytes::Bytes;
use futures::executor::block_on;
use futures::stream;
use promptline_core::stream::{consume, split, FrameCodec, FramingMode};
use proptest::prelude::*;

/// Cut `data` at the given (unsorted, possibly duplicate) offsets
fn cut(data: &[u8], offsets: &[usize]) -> Vec<Vec<u8>> {
    let mut points: Vec<usize> = offsets.iter().map(|o| o % (data.len() + 1)).collect();
    points.push(0);
    points.push(data.len());
    points.sort_unstable();
    points.dedup();
    points.windows(2).map(|w| data[w[0]..w[1]].to_vec()).collect()
}

fn text_strategy() -> impl Strategy<Value = String> {
    // lines of mixed ASCII and multi-byte text, some empty
    prop::collection::vec("[a-zé€ 🙂\\\\n]{0,8}", 0..12).prop_map(|lines| lines.join("\n"))
}

fn prefixed_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[a-z ]{0,6}".prop_map(|t| format!("0:\"{}\"", t)),
            "[a-z]{0,6}".prop_map(|t| format!("0:\"{}\\n\"", t)),
            Just("e:{\"finishReason\":\"stop\"}".to_string()),
        ],
        0..10,
    )
    .prop_map(|lines| lines.into_iter().map(|l| l + "\n").collect::<String>())
}

proptest! {
    #[test]
    fn split_is_chunk_boundary_invariant(text in text_strategy(), offsets in prop::collection::vec(any::<usize>(), 0..6)) {
        let (whole_lines, whole_leftover) = split("", &text);

        let mut codec = FrameCodec::new();
        let mut lines = Vec::new();
        for piece in cut(text.as_bytes(), &offsets) {
            lines.extend(codec.push(&piece));
        }

        prop_assert_eq!(&lines, &whole_lines);
        prop_assert_eq!(codec.leftover(), whole_leftover.as_str());
    }

    #[test]
    fn consumed_text_is_chunk_boundary_invariant(body in prefixed_strategy(), offsets in prop::collection::vec(any::<usize>(), 0..6)) {
        let whole = block_on(consume(
            stream::iter(vec![Ok::<_, String>(Bytes::from(body.clone()))]),
            FramingMode::Prefixed,
            |_| {},
        ))
        .unwrap();

        let pieces: Vec<Result<Bytes, String>> = cut(body.as_bytes(), &offsets)
            .into_iter()
            .map(|p| Ok(Bytes::from(p)))
            .collect();
        let mut appended = String::new();
        let chunked = block_on(consume(stream::iter(pieces), FramingMode::Prefixed, |t| appended.push_str(t))).unwrap();

        prop_assert_eq!(&chunked, &whole);
        prop_assert_eq!(&appended, &whole);
    }
}

#[test]
fn test_hello_chunks() {
    let (lines, leftover) = split("", "0:\"Hel\"\n");
    assert_eq!(lines, vec!["0:\"Hel\""]);
    let (lines, leftover) = split(&leftover, "0:\"lo\"\n");
    assert_eq!(lines, vec!["0:\"lo\""]);
    assert!(leftover.is_empty());
}
