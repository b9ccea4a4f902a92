use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use futures::{StreamExt, stream};
use lexiflow_common::VocabularyItem;
use lexiflow_llm::{GenerationRequest, ScriptedGenerator};
use lexiflow_stream::catalog::{vocabulary_contract, vocabulary_shape};
use lexiflow_stream::{FrameConsumer, StreamConsumer, StreamProducer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const RECORDS: [(&str, &str); 5] = [
    ("cat", "con mèo"),
    ("dog", "con chó"),
    ("bird", "con chim"),
    ("fish", "con cá"),
    ("buffalo", "con trâu"),
];

fn model_output() -> String {
    RECORDS
        .iter()
        .map(|(word, meaning)| format!("{{\"word\":\"{}\",\"meaning\":\"{}\"}}\n", word, meaning))
        .collect()
}

/// Split `text` at random character boundaries
fn random_deltas(text: &str, rng: &mut StdRng) -> Vec<String> {
    let mut deltas = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if rng.gen_bool(0.25) {
            deltas.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        deltas.push(current);
    }
    deltas
}

/// Re-cut a byte stream at random byte offsets, ignoring UTF-8 boundaries
fn random_byte_chunks(bytes: &[u8], rng: &mut StdRng) -> Vec<Vec<u8>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < bytes.len() {
        let len = rng.gen_range(1..=9).min(bytes.len() - start);
        chunks.push(bytes[start..start + len].to_vec());
        start += len;
    }
    chunks
}

async fn produce(generator: ScriptedGenerator) -> Vec<u8> {
    let producer = StreamProducer::domain(Arc::new(generator), vocabulary_contract());
    let (body, handle) = producer.spawn(GenerationRequest::new("animals")).into_parts();
    let chunks: Vec<Bytes> = body.collect().await;
    handle.await.unwrap();
    chunks.concat()
}

#[tokio::test]
async fn records_arrive_in_order_under_arbitrary_splits() {
    let mut rng = StdRng::seed_from_u64(42);
    let expected: Vec<(String, String)> = RECORDS
        .iter()
        .map(|(w, m)| (w.to_string(), m.to_string()))
        .collect();

    for _ in 0..50 {
        let deltas = random_deltas(&model_output(), &mut rng);
        let wire = produce(ScriptedGenerator::new(deltas)).await;
        let chunks = random_byte_chunks(&wire, &mut rng);

        let consumed = StreamConsumer::new(vocabulary_shape())
            .collect(stream::iter(chunks.into_iter().map(Ok::<_, Infallible>)))
            .await
            .unwrap();

        let received: Vec<(String, String)> = consumed
            .records
            .into_iter()
            .map(|VocabularyItem { word, meaning, .. }| (word, meaning))
            .collect();
        assert_eq!(received, expected);
    }
}

#[tokio::test]
async fn chunkings_yield_identical_lines() {
    let mut rng = StdRng::seed_from_u64(3);
    let wire = produce(ScriptedGenerator::new([model_output()])).await;

    let mut baseline: Option<Vec<VocabularyItem>> = None;
    for _ in 0..20 {
        let chunks = random_byte_chunks(&wire, &mut rng);
        let records = StreamConsumer::new(vocabulary_shape())
            .collect(stream::iter(chunks.into_iter().map(Ok::<_, Infallible>)))
            .await
            .unwrap()
            .records;
        match &baseline {
            Some(first) => assert_eq!(&records, first),
            None => baseline = Some(records),
        }
    }
}

#[tokio::test]
async fn fallback_hello_scenario() {
    let generator = ScriptedGenerator::new(Vec::<String>::new())
        .fail_on_open("stream refused")
        .with_completion("hello");
    let wire = produce(generator).await;
    assert_eq!(String::from_utf8(wire).unwrap(), "{\"content\":\"hello\"}\n");
}

#[tokio::test]
async fn fallback_records_reach_the_consumer() {
    let generator = ScriptedGenerator::new(Vec::<String>::new())
        .fail_on_open("stream refused")
        .with_completion("{\"word\":\"cat\",\"meaning\":\"mèo\"}\n{\"word\":\"dog\",\"meaning\":\"chó\"}\n");
    let wire = produce(generator).await;

    let consumed = StreamConsumer::new(vocabulary_shape())
        .collect(stream::iter([Ok::<_, Infallible>(wire)]))
        .await
        .unwrap();
    let words: Vec<&str> = consumed.records.iter().map(|r| r.word.as_str()).collect();
    assert_eq!(words, vec!["cat", "dog"]);
    assert_eq!(consumed.rejected, 0);
}

#[tokio::test]
async fn frame_session_starts_and_ends() {
    let mut rng = StdRng::seed_from_u64(11);
    let text = "{\"e\":\"data\",\"k\":\"answer\",\"c\":\"Chào \"}\n\
                {\"e\":\"data\",\"k\":\"answer\",\"c\":\"bạn!\"}\n";

    let producer = StreamProducer::frames(Arc::new(ScriptedGenerator::new(random_deltas(text, &mut rng))));
    let (body, _) = producer.spawn(GenerationRequest::new("greet")).into_parts();
    let wire: Vec<u8> = body.collect::<Vec<Bytes>>().await.concat();

    let lines: Vec<&str> = std::str::from_utf8(&wire).unwrap().lines().collect();
    assert_eq!(lines.first(), Some(&"{\"e\":\"start\"}"));
    assert_eq!(lines.last(), Some(&"{\"e\":\"end\"}"));

    let chunks = random_byte_chunks(&wire, &mut rng);
    let outcome = FrameConsumer::new()
        .collect(stream::iter(chunks.into_iter().map(Ok::<_, Infallible>)))
        .await
        .unwrap();
    assert!(!outcome.truncated());
    assert_eq!(outcome.text_for("answer"), "Chào bạn!");
}
