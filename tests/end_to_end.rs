//! End-to-end scenarios exercising the public API the way a caller would,
//! as opposed to the white-box unit tests embedded in each module.

use streamjson::{ByteDesc, JsonError, Parser, SegmentMode, TaggedSegmentSplitter, Value};

mod support {
    use streamjson::ChunkSource;
    use std::collections::VecDeque;
    use std::convert::Infallible;

    pub struct Fragments(VecDeque<String>);

    impl Fragments {
        pub fn new<I: IntoIterator<Item = &'static str>>(items: I) -> Self {
            Self(items.into_iter().map(str::to_string).collect())
        }
    }

    impl ChunkSource for Fragments {
        type Error = Infallible;

        async fn next_chunk(&mut self) -> Result<Option<String>, Self::Error> {
            Ok(self.0.pop_front())
        }
    }
}

use support::Fragments;

fn init_tracing() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::test]
async fn scenario_1_chunked_string_concatenates_decoded_escapes() {
    init_tracing();
    let mut p = Parser::new(Fragments::new([
        r#""Hello,\nWorld!\t\"Escaped\"A""#,
    ]));
    let mut chunks = p.read_string_chunked().await.unwrap();
    let mut joined = String::new();
    while let Some(fragment) = chunks.next_fragment().await.unwrap() {
        joined.push_str(&fragment);
    }
    assert_eq!(joined, "Hello,\nWorld!\t\"Escaped\"A");
}

#[tokio::test]
async fn scenario_2_object_iteration_matches_eager_materialization() {
    let mut p = Parser::new(Fragments::new(["{\"name\": \"Al", "ice\", \"age\": 30}"]));
    let mut cursor = p.enter_object().await.unwrap();
    let mut seen = Vec::new();
    while let Some((key, handle)) = cursor.next_entry().await.unwrap() {
        let value = cursor.read_value(handle).await.unwrap();
        seen.push((key, value));
    }
    assert_eq!(
        seen,
        vec![
            ("name".to_string(), Value::String("Alice".to_string())),
            ("age".to_string(), Value::Number(30.0)),
        ]
    );

    let mut p2 = Parser::new(Fragments::new(["{\"name\": \"Alice\", \"age\": 30}"]));
    let value = p2.read_value().await.unwrap();
    assert_eq!(
        value,
        Value::Object(vec![
            ("name".to_string(), Value::String("Alice".to_string())),
            ("age".to_string(), Value::Number(30.0)),
        ])
    );
}

#[tokio::test]
async fn scenario_3_nested_arrays_iterate_to_matching_values() {
    let mut p = Parser::new(Fragments::new(["[[1, 2], [3, 4]]"]));
    let mut cursor = p.enter_array().await.unwrap();
    let mut rows = Vec::new();
    while let Some(handle) = cursor.next_item().await.unwrap() {
        rows.push(cursor.read_value(handle).await.unwrap());
    }
    assert_eq!(
        rows,
        vec![
            Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]),
            Value::Array(vec![Value::Number(3.0), Value::Number(4.0)]),
        ]
    );
}

#[tokio::test]
async fn scenario_4_unconsumed_entries_still_finish_cleanly() {
    let mut p = Parser::new(Fragments::new(["{\"a\": 1, \"b\": 2}"]));
    {
        let mut cursor = p.enter_object().await.unwrap();
        while cursor.next_entry().await.unwrap().is_some() {
            // never read the handle; the cursor must auto-skip it
        }
    }
    let err = p.read_value().await.unwrap_err();
    assert_eq!(err, JsonError::ReadPastEndOfStream);
}

#[tokio::test]
async fn scenario_5_missing_colon_fails_on_first_entry() {
    let mut p = Parser::new(Fragments::new(["{\"key\" 123}"]));
    let mut cursor = p.enter_object().await.unwrap();
    let err = cursor.next_entry().await.unwrap_err();
    assert_eq!(
        err,
        JsonError::ExpectedCharacter {
            expected: ':',
            found: ByteDesc::Byte(b'1'),
        }
    );
}

#[tokio::test]
async fn scenario_6_truncated_keyword_reports_end_of_stream() {
    let mut p = Parser::new(Fragments::new(["tru"]));
    let err = p.read_bool().await.unwrap_err();
    assert_eq!(
        err,
        JsonError::ExpectedCharacter {
            expected: 'e',
            found: ByteDesc::EndOfStream,
        }
    );
}

#[test]
fn scenario_7_marker_split_across_fragments_yields_three_segments() {
    let mut splitter = TaggedSegmentSplitter::new();
    let mut dispatches = Vec::new();
    for fragment in ["Initial text", "<pl", "an>This is a thought</plan>More text"] {
        for segment in splitter.append(fragment) {
            dispatches.push((segment.mode, segment.generation_id, segment.text));
        }
    }
    assert_eq!(
        dispatches,
        vec![
            (SegmentMode::Prose, 0, "Initial text".to_string()),
            (SegmentMode::Reasoning, 1, "This is a thought".to_string()),
            (SegmentMode::Prose, 2, "More text".to_string()),
        ]
    );
    let ids: std::collections::HashSet<u64> =
        dispatches.iter().map(|(_, id, _)| *id).collect();
    assert_eq!(ids.len(), 3, "each segment carries a distinct generation id");
}

#[test]
fn scenario_8_lookalike_marker_never_switches_mode() {
    let mut splitter = TaggedSegmentSplitter::new();
    let mut dispatches = Vec::new();
    for segment in splitter.append("<play>Action</play> is what we need") {
        dispatches.push((segment.mode, segment.text));
    }
    assert_eq!(
        dispatches,
        vec![(
            SegmentMode::Prose,
            "<play>Action</play> is what we need".to_string()
        )]
    );
    assert_eq!(splitter.mode(), SegmentMode::Prose);
}
